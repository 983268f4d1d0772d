use super::{DiscountType, LineItem};
use crate::money::{Amount, Money};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// Raw item row deserialized from a stored record or a form. Column names
/// differ between stores, so both spellings are accepted.
#[skip_serializing_none]
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Default)]
pub struct Item {
    pub description: Option<String>,
    #[serde(alias = "qty")]
    pub quantity: Option<Amount>,
    #[serde(alias = "unitPrice", alias = "price")]
    pub unit_price: Option<Amount>,
    #[serde(alias = "discountType")]
    pub discount_type: Option<String>,
    #[serde(alias = "discountValue", alias = "discount")]
    pub discount_value: Option<Amount>,
    #[serde(alias = "vatRate", alias = "vat", alias = "tax_rate")]
    pub vat_rate: Option<Amount>,
}

impl Item {
    /// A missing quantity is one, a missing rate is the business default.
    /// Rates above one are percentages ("16" is 16%).
    pub fn into_line_item(self, default_vat_rate: Decimal) -> LineItem {
        let vat_rate = self.vat_rate.map_or(default_vat_rate, Decimal::from);
        LineItem {
            description: self.description.unwrap_or_default(),
            quantity: self.quantity.map_or_else(Decimal::one, Decimal::from),
            unit_price: Money(self.unit_price.map(Decimal::from).unwrap_or_default()),
            discount_type: self
                .discount_type
                .as_deref()
                .map(DiscountType::from)
                .unwrap_or_default(),
            discount_value: self.discount_value.map(Decimal::from).unwrap_or_default(),
            vat_rate: rate_fraction(vat_rate),
        }
    }
}

impl From<&LineItem> for Item {
    fn from(item: &LineItem) -> Self {
        Item {
            description: Some(item.description.clone()),
            quantity: Some(Amount(item.quantity)),
            unit_price: Some(Amount(item.unit_price.0)),
            discount_type: Some(item.discount_type.to_string()),
            discount_value: Some(Amount(item.discount_value)),
            vat_rate: Some(Amount(item.vat_rate)),
        }
    }
}

pub fn rate_fraction(rate: Decimal) -> Decimal {
    if rate > Decimal::one() {
        rate / Decimal::from(100)
    } else {
        rate
    }
}
