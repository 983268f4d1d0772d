use crate::line_item::{DiscountType, LineItem, compute_line};
use crate::money::{Currency, Money};
use itertools::Itertools;
use num_traits::Zero;
use rust_decimal::Decimal;
use tracing::warn;

/// Sums over the billable rows of an invoice. Always recomputed, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub total_discount: Money,
    pub subtotal_after_discount: Money,
    pub total_vat: Money,
    pub grand_total: Money,
    pub has_exempt_items: bool,
    pub discount: DiscountSummary,
}

/// How the discount line of the totals block is labelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiscountSummary {
    /// No row carries a discount, the discount lines are omitted.
    #[default]
    NoDiscount,
    /// Every row has the same discount, e.g. "Discount (10%)".
    Uniform(DiscountType, Decimal),
    /// Rows differ, only the generic label and the summed amount.
    Mixed,
}

impl DiscountSummary {
    fn of(items: &[&LineItem]) -> Self {
        if !items.iter().any(|item| item.has_discount()) {
            return DiscountSummary::NoDiscount;
        }
        let kinds = items
            .iter()
            .map(|item| (item.discount_type, item.discount_value.normalize()))
            .unique()
            .collect_vec();
        match kinds.as_slice() {
            [(discount_type, value)] => DiscountSummary::Uniform(*discount_type, *value),
            _ => DiscountSummary::Mixed,
        }
    }

    pub fn is_shown(&self) -> bool {
        *self != DiscountSummary::NoDiscount
    }

    /// Label with the shared rate or amount when there is one.
    pub fn label(&self, generic: &str, currency: &Currency) -> String {
        match self {
            DiscountSummary::Uniform(DiscountType::Percent, value) => {
                format!("{} ({}%)", generic, value)
            }
            DiscountSummary::Uniform(DiscountType::Fixed, value) => {
                format!("{} ({})", generic, currency.format(Money(*value)))
            }
            _ => generic.to_owned(),
        }
    }
}

/// Folds the billable rows into invoice totals. Blank rows and rows without
/// a positive quantity are skipped, so is a row that would overflow the sums.
pub fn aggregate(items: &[LineItem]) -> InvoiceTotals {
    let billable = items.iter().filter(|item| item.is_billable()).collect_vec();
    let mut totals = billable
        .iter()
        .fold(InvoiceTotals::default(), |totals, item| match add_row(&totals, item) {
            Some(sums) => sums,
            None => {
                warn!("Row '{}' overflows the invoice totals, leaving it out", item.description);
                totals
            }
        });
    totals.discount = DiscountSummary::of(&billable);
    totals
}

fn add_row(totals: &InvoiceTotals, item: &LineItem) -> Option<InvoiceTotals> {
    let amounts = compute_line(item);
    Some(InvoiceTotals {
        subtotal: totals.subtotal.checked_add(amounts.raw_subtotal)?,
        total_discount: totals.total_discount.checked_add(amounts.discount_amount)?,
        subtotal_after_discount: totals
            .subtotal_after_discount
            .checked_add(amounts.discounted_subtotal)?,
        total_vat: totals.total_vat.checked_add(amounts.vat_amount)?,
        grand_total: totals.grand_total.checked_add(amounts.line_total)?,
        has_exempt_items: totals.has_exempt_items || item.is_exempt(),
        discount: totals.discount,
    })
}

impl InvoiceTotals {
    pub fn is_empty(&self) -> bool {
        self.grand_total.is_zero() && self.subtotal.is_zero()
    }
}
