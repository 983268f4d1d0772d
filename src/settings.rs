use crate::document::{Party, raw};
use crate::labels::Language;
use crate::line_item::raw::rate_fraction;
use crate::money::{Amount, Currency};
use crate::template::{TemplateDescriptor, select_template_with_accent};
use anyhow::{Context, Error, Result};
use async_std::fs;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::str::FromStr;

/// Business profile and invoice preferences. Every field has a default so an
/// empty document is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub company: Party,
    pub invoice: InvoiceSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceSettings {
    pub template: String,
    pub accent_color: Option<String>,
    /// Prefix of generated invoice numbers, `INV` gives `INV-2024-0001`.
    pub prefix: String,
    pub serie: Option<String>,
    pub currency: Currency,
    pub default_vat_rate: Decimal,
    pub language: Language,
}

impl Default for InvoiceSettings {
    fn default() -> Self {
        InvoiceSettings {
            template: "classic".into(),
            accent_color: None,
            prefix: "INV".into(),
            serie: None,
            currency: Currency::default(),
            default_vat_rate: Decimal::new(16, 2),
            language: Language::default(),
        }
    }
}

impl Settings {
    pub async fn from_file(file: &str) -> Result<Self> {
        let doc = fs::read_to_string(file)
            .await
            .with_context(|| format!("Failed to read settings file {}", file))?;
        doc.parse()
    }

    pub fn template(&self) -> TemplateDescriptor {
        select_template_with_accent(&self.invoice.template, self.invoice.accent_color.as_deref())
    }
}

/// Raw settings deserialized from yaml
#[skip_serializing_none]
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Default)]
struct RawSettings {
    #[serde(alias = "business")]
    company: Option<raw::Party>,
    invoice: Option<RawInvoiceSettings>,
}

#[skip_serializing_none]
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Default)]
struct RawInvoiceSettings {
    template: Option<String>,
    #[serde(alias = "color", alias = "accentColor")]
    accent_color: Option<String>,
    prefix: Option<String>,
    serie: Option<String>,
    currency: Option<String>,
    currency_symbol: Option<String>,
    #[serde(alias = "vat_rate", alias = "vat")]
    default_vat_rate: Option<Amount>,
    language: Option<String>,
}

impl From<RawSettings> for Settings {
    fn from(raw: RawSettings) -> Self {
        let defaults = InvoiceSettings::default();
        let invoice = raw.invoice.unwrap_or_default();
        let mut currency = invoice
            .currency
            .map(|code| Currency::new(&code))
            .unwrap_or(defaults.currency);
        if let Some(symbol) = invoice.currency_symbol {
            currency = currency.with_symbol(&symbol);
        }
        Settings {
            company: raw.company.map(Into::into).unwrap_or_default(),
            invoice: InvoiceSettings {
                template: invoice.template.unwrap_or(defaults.template),
                accent_color: invoice.accent_color,
                prefix: invoice
                    .prefix
                    .map(|prefix| prefix.trim().to_owned())
                    .filter(|prefix| !prefix.is_empty())
                    .unwrap_or(defaults.prefix),
                serie: invoice.serie.filter(|serie| !serie.trim().is_empty()),
                currency,
                default_vat_rate: invoice
                    .default_vat_rate
                    .map(|rate| rate_fraction(rate.0))
                    .unwrap_or(defaults.default_vat_rate),
                language: invoice
                    .language
                    .as_deref()
                    .map(Language::from)
                    .unwrap_or(defaults.language),
            },
        }
    }
}

impl FromStr for Settings {
    type Err = Error;

    fn from_str(doc: &str) -> Result<Self> {
        if doc.trim().is_empty() {
            return Ok(Settings::default());
        }
        let raw: RawSettings = serde_yaml::from_str(doc)
            .with_context(|| format!("Failed to deserialize Settings:\n{}", doc))?;
        Ok(raw.into())
    }
}
