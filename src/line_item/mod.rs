pub mod raw;

use crate::money::Money;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    #[default]
    None,
    /// Value is in percentage points, 0 to 100.
    Percent,
    /// Value is an absolute amount in the document currency.
    Fixed,
}

/// Unknown discount types read as no discount.
impl From<&str> for DiscountType {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "percent" | "percentage" | "%" => DiscountType::Percent,
            "fixed" | "amount" => DiscountType::Fixed,
            _ => DiscountType::None,
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiscountType::None => "none",
            DiscountType::Percent => "percent",
            DiscountType::Fixed => "fixed",
        };
        write!(f, "{}", s)
    }
}

/// One invoice row.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Money,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    /// Fraction, 0.16 is 16%. Zero marks the row as VAT exempt.
    pub vat_rate: Decimal,
}

/// Everything derived from a single row, at full precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineAmounts {
    pub raw_subtotal: Money,
    pub discount_amount: Money,
    pub discounted_subtotal: Money,
    pub vat_amount: Money,
    pub line_total: Money,
}

impl LineItem {
    pub fn new(description: &str, quantity: Decimal, unit_price: Money) -> Self {
        LineItem {
            description: description.to_owned(),
            quantity,
            unit_price,
            discount_type: DiscountType::None,
            discount_value: Decimal::zero(),
            vat_rate: Decimal::zero(),
        }
    }

    pub fn with_discount(mut self, discount_type: DiscountType, value: Decimal) -> Self {
        self.discount_type = discount_type;
        self.discount_value = value;
        self
    }

    pub fn with_vat(mut self, vat_rate: Decimal) -> Self {
        self.vat_rate = vat_rate;
        self
    }

    /// A row counts towards totals only with a description and a positive quantity.
    pub fn is_billable(&self) -> bool {
        !self.description.trim().is_empty() && self.quantity > Decimal::zero()
    }

    /// Exempt rows carry an asterisk: a zero rate, or VAT that comes to
    /// nothing once rounded.
    pub fn is_exempt(&self) -> bool {
        self.vat_rate.is_zero() || compute_line(self).vat_amount.rounded().is_zero()
    }

    /// A discount that actually changes the row.
    pub fn has_discount(&self) -> bool {
        self.discount_type != DiscountType::None && self.discount_value > Decimal::zero()
    }

    pub fn amounts(&self) -> LineAmounts {
        compute_line(self)
    }
}

/// Amounts of a row. A row whose amounts overflow counts as zero.
pub fn compute_line(item: &LineItem) -> LineAmounts {
    checked_line(item).unwrap_or_else(|| {
        warn!("Amounts of row '{}' overflow, counting it as zero", item.description);
        LineAmounts::default()
    })
}

fn checked_line(item: &LineItem) -> Option<LineAmounts> {
    let raw_subtotal = item.quantity.checked_mul(item.unit_price.0)?;
    let discount_amount = match item.discount_type {
        DiscountType::None => Decimal::zero(),
        DiscountType::Percent => raw_subtotal
            .checked_mul(item.discount_value)?
            .checked_div(Decimal::from(100))?,
        // not clamped, a fixed discount above the subtotal yields a negative row
        DiscountType::Fixed => item.discount_value,
    };
    let discounted_subtotal = raw_subtotal.checked_sub(discount_amount)?;
    let vat_amount = discounted_subtotal.checked_mul(item.vat_rate)?;
    let line_total = discounted_subtotal.checked_add(vat_amount)?;
    Some(LineAmounts {
        raw_subtotal: Money(raw_subtotal),
        discount_amount: Money(discount_amount),
        discounted_subtotal: Money(discounted_subtotal),
        vat_amount: Money(vat_amount),
        line_total: Money(line_total),
    })
}

#[cfg(test)]
mod line_item_tests {
    use super::*;
    use crate::money::Amount;
    use anyhow::Result;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn no_discount_with_vat() -> Result<()> {
        let item = LineItem::new("Sample Product 1", d("2"), "500".parse()?).with_vat(d("0.16"));
        let amounts = dbg!(compute_line(&item));
        assert_eq!(amounts.raw_subtotal.to_string(), "1000.00");
        assert_eq!(amounts.discount_amount.to_string(), "0.00");
        assert_eq!(amounts.vat_amount.to_string(), "160.00");
        assert_eq!(amounts.line_total.to_string(), "1160.00");
        Ok(())
    }

    #[test]
    fn percent_discount_taxes_the_discounted_subtotal() -> Result<()> {
        let item = LineItem::new("Consulting", d("1"), "100".parse()?)
            .with_discount(DiscountType::Percent, d("10"))
            .with_vat(d("0.16"));
        let amounts = dbg!(compute_line(&item));
        assert_eq!(amounts.discount_amount.to_string(), "10.00");
        assert_eq!(amounts.discounted_subtotal.to_string(), "90.00");
        assert_eq!(amounts.vat_amount.to_string(), "14.40");
        assert_eq!(amounts.line_total.to_string(), "104.40");
        Ok(())
    }

    #[test]
    fn item_rate_is_used_not_a_flat_sixteen_percent() -> Result<()> {
        let item = LineItem::new("Books", d("4"), "25".parse()?)
            .with_discount(DiscountType::Fixed, d("20"))
            .with_vat(d("0.05"));
        let amounts = compute_line(&item);
        assert_eq!(amounts.discounted_subtotal.to_string(), "80.00");
        assert_eq!(amounts.vat_amount.to_string(), "4.00");
        assert_eq!(amounts.line_total.to_string(), "84.00");
        Ok(())
    }

    #[test]
    fn fixed_discount_is_not_clamped() -> Result<()> {
        let item = LineItem::new("Voucher", d("1"), "50".parse()?)
            .with_discount(DiscountType::Fixed, d("60"));
        let amounts = dbg!(compute_line(&item));
        assert_eq!(amounts.discount_amount.to_string(), "60.00");
        assert_eq!(amounts.discounted_subtotal.to_string(), "-10.00");
        assert_eq!(amounts.vat_amount.to_string(), "0.00");
        assert_eq!(amounts.line_total.to_string(), "-10.00");
        Ok(())
    }

    #[test]
    fn discounted_subtotal_is_exact_before_rounding() -> Result<()> {
        let item = LineItem::new("Cable", d("3"), "3.333".parse()?)
            .with_discount(DiscountType::Percent, d("12.5"))
            .with_vat(d("0.16"));
        let amounts = compute_line(&item);
        assert_eq!(
            amounts.discounted_subtotal.0,
            amounts.raw_subtotal.0 - amounts.discount_amount.0
        );
        assert_eq!(amounts.discounted_subtotal.0, d("8.749125"));
        assert_eq!(
            amounts.line_total.0,
            amounts.discounted_subtotal.0 + amounts.vat_amount.0
        );
        Ok(())
    }

    #[test]
    fn undiscounted_total_is_price_times_rate() -> Result<()> {
        for (qty, price, vat) in [("3", "19.99", "0.16"), ("0.5", "7", "0"), ("12", "1.05", "0.17")] {
            let item = LineItem::new("Row", d(qty), price.parse()?).with_vat(d(vat));
            let expected = d(qty) * d(price) * (Decimal::one() + d(vat));
            assert_eq!(compute_line(&item).line_total.0, expected);
        }
        Ok(())
    }

    #[test]
    fn billable_rows() -> Result<()> {
        assert!(LineItem::new("Row", d("1"), "1".parse()?).is_billable());
        assert!(!LineItem::new("  ", d("1"), "1".parse()?).is_billable());
        assert!(!LineItem::new("Row", d("0"), "1".parse()?).is_billable());
        assert!(!LineItem::new("Row", d("-1"), "1".parse()?).is_billable());
        Ok(())
    }

    #[test]
    fn overflowing_row_counts_as_zero() -> Result<()> {
        let item = raw::Item {
            description: Some("Huge".into()),
            quantity: Some(Amount(d("99999999999999999999"))),
            unit_price: Some(Amount(d("99999999999999999999"))),
            ..Default::default()
        }
        .into_line_item(d("0.16"));
        let amounts = dbg!(compute_line(&item));
        assert_eq!(amounts, LineAmounts::default());
        assert_eq!(amounts.line_total.to_string(), "0.00");
        Ok(())
    }

    #[test]
    fn rate_that_rounds_to_no_vat_is_exempt() -> Result<()> {
        assert!(LineItem::new("Pin", d("1"), "0.01".parse()?).with_vat(d("0.16")).is_exempt());
        assert!(LineItem::new("Pin", d("1"), "0.01".parse()?).is_exempt());
        assert!(!LineItem::new("Pin", d("1"), "0.10".parse()?).with_vat(d("0.16")).is_exempt());
        Ok(())
    }

    #[test]
    fn discount_type_from_str() {
        assert_eq!(DiscountType::from("Percent"), DiscountType::Percent);
        assert_eq!(DiscountType::from("fixed"), DiscountType::Fixed);
        assert_eq!(DiscountType::from("bogus"), DiscountType::None);
    }
}
