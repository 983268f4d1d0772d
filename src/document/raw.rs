use super::{InvoiceData, InvoiceHeader};
use crate::labels::parse_date;
use crate::line_item::{LineItem, raw::Item};
use crate::money::{Amount, Currency};
use crate::settings::Settings;
use anyhow::{Context, Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::str::FromStr;

/// Raw party deserialized from a business profile or a client record.
#[skip_serializing_none]
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Default)]
pub struct Party {
    #[serde(alias = "company_name", alias = "customer_name", alias = "companyName")]
    pub name: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "telephone")]
    pub phone: Option<String>,
    #[serde(alias = "nuit", alias = "customer_tax_id", alias = "taxId")]
    pub tax_id: Option<String>,
    pub contact: Option<String>,
}

impl From<Party> for super::Party {
    fn from(raw: Party) -> Self {
        super::Party {
            name: raw.name.unwrap_or_default(),
            address: raw.address.unwrap_or_default(),
            email: raw.email.unwrap_or_default(),
            phone: raw.phone.unwrap_or_default(),
            tax_id: raw.tax_id.unwrap_or_default(),
            contact: raw.contact.unwrap_or_default(),
        }
    }
}

/// Raw invoice record deserialized from yaml or json
#[skip_serializing_none]
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Default)]
pub struct Invoice {
    pub id: Option<String>,
    #[serde(alias = "invoice_number", alias = "invoiceNumber")]
    pub number: Option<String>,
    pub serie: Option<String>,
    #[serde(alias = "displayNumber")]
    pub display_number: Option<String>,
    #[serde(alias = "issueDate")]
    pub issue_date: Option<String>,
    #[serde(alias = "dueDate")]
    pub due_date: Option<String>,
    pub status: Option<String>,
    pub currency: Option<String>,
    #[serde(alias = "business")]
    pub company: Option<Party>,
    pub client: Option<Party>,
    pub items: Option<Vec<Item>>,
    pub notes: Option<String>,
    /// Stored grand total, used when a record carries no rows.
    #[serde(alias = "total_amount", alias = "totalAmount")]
    pub total: Option<Amount>,
}

impl Invoice {
    pub fn line_items(&self, default_vat_rate: Decimal) -> Vec<LineItem> {
        self.items
            .iter()
            .flatten()
            .cloned()
            .map(|item| item.into_line_item(default_vat_rate))
            .collect()
    }

    /// Completes the record with the business settings: the company profile,
    /// currency, serie and VAT default apply where the record has none.
    pub fn into_data(self, settings: &Settings) -> InvoiceData {
        let invoice_settings = &settings.invoice;
        let items = self.line_items(invoice_settings.default_vat_rate);
        InvoiceData {
            company: self
                .company
                .map(Into::into)
                .unwrap_or_else(|| settings.company.clone()),
            client: self.client.map(Into::into).unwrap_or_default(),
            invoice: InvoiceHeader {
                number: self.number,
                serie: self.serie.or_else(|| invoice_settings.serie.clone()),
                display_number: self.display_number,
                issue_date: self.issue_date.as_deref().and_then(parse_date),
                due_date: self.due_date.as_deref().and_then(parse_date),
                currency: self
                    .currency
                    .map(|code| Currency::new(&code))
                    .unwrap_or_else(|| invoice_settings.currency.clone()),
            },
            items,
            notes: self.notes.unwrap_or_default(),
            language: invoice_settings.language,
        }
    }
}

impl FromStr for Invoice {
    type Err = Error;

    fn from_str(doc: &str) -> Result<Self> {
        serde_yaml::from_str(doc).with_context(|| format!("Failed to deserialize Invoice:\n{}", doc))
    }
}
