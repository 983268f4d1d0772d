use super::ReceiptDetails;
use crate::document::{Party, raw};
use crate::labels::parse_date;
use crate::money::{Amount, Currency};
use crate::settings::Settings;
use anyhow::{Context, Error, Result};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::str::FromStr;

/// Raw receipt record deserialized from yaml
#[skip_serializing_none]
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Default)]
pub struct Receipt {
    #[serde(alias = "receipt_number", alias = "receiptNumber")]
    pub number: Option<String>,
    pub date: Option<String>,
    #[serde(alias = "payment_method", alias = "paymentMethod")]
    pub method: Option<String>,
    pub status: Option<String>,
    pub amount: Option<Amount>,
    pub currency: Option<String>,
    #[serde(alias = "business")]
    pub company: Option<raw::Party>,
    #[serde(alias = "customer")]
    pub client: Option<raw::Party>,
    #[serde(alias = "invoice_numbers", alias = "invoiceNumbers")]
    pub invoices: Option<Vec<String>>,
    pub plan: Option<String>,
    pub price: Option<String>,
    #[serde(alias = "startDate")]
    pub start_date: Option<String>,
    #[serde(alias = "endDate")]
    pub end_date: Option<String>,
    pub notes: Option<String>,
}

impl Receipt {
    /// Completes the record with the business settings: the company profile
    /// issues it and the currency applies where the record has none. A record
    /// with a plan and a period is a subscription invoice-receipt.
    pub fn into_receipt(self, settings: &Settings) -> Result<super::Receipt> {
        let number = self.number.context("Number required for Receipt")?;
        let date = self
            .date
            .as_deref()
            .and_then(parse_date)
            .with_context(|| format!("Valid date required for Receipt {}", number))?;
        let details = match (self.plan, self.start_date, self.end_date) {
            (Some(plan), Some(start), Some(end)) => ReceiptDetails::Subscription {
                plan,
                price: self.price.unwrap_or_default(),
                start: parse_date(&start)
                    .with_context(|| format!("Bad start date '{}' for Receipt {}", start, number))?,
                end: parse_date(&end)
                    .with_context(|| format!("Bad end date '{}' for Receipt {}", end, number))?,
            },
            _ => ReceiptDetails::Payment {
                references: self.invoices.unwrap_or_default(),
            },
        };
        Ok(super::Receipt {
            number,
            issuer: self
                .company
                .map(Into::into)
                .unwrap_or_else(|| settings.company.clone()),
            recipient: self.client.map(Into::into).unwrap_or_default(),
            date,
            method: self.method.unwrap_or_default(),
            status: self.status.unwrap_or_else(|| "Paid".into()),
            amount: self.amount.map(|amount| amount.0.into()).unwrap_or_default(),
            currency: self
                .currency
                .map(|code| Currency::new(&code))
                .unwrap_or_else(|| settings.invoice.currency.clone()),
            notes: self.notes.unwrap_or_default(),
            details,
        })
    }

    /// Whether the record names an amount, otherwise it is summed from the
    /// invoices it references.
    pub fn has_amount(&self) -> bool {
        self.amount.is_some()
    }
}

impl From<&super::Receipt> for Receipt {
    fn from(receipt: &super::Receipt) -> Self {
        let party = |party: &Party| raw::Party {
            name: Some(party.name.clone()),
            address: Some(party.address.clone()).filter(|s| !s.is_empty()),
            email: Some(party.email.clone()).filter(|s| !s.is_empty()),
            phone: Some(party.phone.clone()).filter(|s| !s.is_empty()),
            tax_id: Some(party.tax_id.clone()).filter(|s| !s.is_empty()),
            contact: Some(party.contact.clone()).filter(|s| !s.is_empty()),
        };
        let mut raw = Receipt {
            number: Some(receipt.number.clone()),
            date: Some(receipt.date.to_string()),
            method: Some(receipt.method.clone()),
            status: Some(receipt.status.clone()),
            amount: Some(Amount(receipt.amount.0)),
            currency: Some(receipt.currency.code().to_owned()),
            company: Some(party(&receipt.issuer)),
            client: Some(party(&receipt.recipient)),
            notes: Some(receipt.notes.clone()).filter(|s| !s.is_empty()),
            ..Default::default()
        };
        match &receipt.details {
            ReceiptDetails::Payment { references } => raw.invoices = Some(references.clone()),
            ReceiptDetails::Subscription {
                plan,
                price,
                start,
                end,
            } => {
                raw.plan = Some(plan.clone());
                raw.price = Some(price.clone()).filter(|s| !s.is_empty());
                raw.start_date = Some(start.to_string());
                raw.end_date = Some(end.to_string());
            }
        }
        raw
    }
}

impl FromStr for Receipt {
    type Err = Error;

    fn from_str(doc: &str) -> Result<Self> {
        serde_yaml::from_str(doc).with_context(|| format!("Failed to deserialize Receipt:\n{}", doc))
    }
}

#[cfg(test)]
mod raw_receipt_tests {
    use super::*;
    use indoc::indoc;

    fn walaka() -> Settings {
        Settings {
            company: Party::new("Walaka Software, Lda"),
            ..Default::default()
        }
    }

    #[test]
    fn payment_record() -> Result<()> {
        let raw: Receipt = indoc! {"
            receipt_number: REC-2024-0010
            date: 2024-03-20
            payment_method: M-Pesa
            amount: 1 260,00
            client:
              customer_name: Sample Client
              nuit: '987654321'
            invoices: [INV-2024-0001, INV-2024-0002]
        "}
        .parse()?;
        let receipt = dbg!(raw.into_receipt(&walaka())?);
        assert_eq!(receipt.issuer.name, "Walaka Software, Lda");
        assert_eq!(receipt.recipient.tax_id, "987654321");
        assert_eq!(receipt.amount.to_string(), "1260.00");
        assert_eq!(receipt.status, "Paid");
        assert_eq!(
            receipt.details,
            ReceiptDetails::Payment {
                references: vec!["INV-2024-0001".into(), "INV-2024-0002".into()]
            }
        );
        Ok(())
    }

    #[test]
    fn subscription_record() -> Result<()> {
        let raw: Receipt = indoc! {"
            number: SUB-2024-0001
            date: 2024-01-31
            method: e-Mola
            amount: 250
            plan: Basic
            start_date: 2024-01-31
            end_date: 2024-02-29
        "}
        .parse()?;
        let receipt = raw.into_receipt(&Settings::default())?;
        assert_eq!(receipt.title(), "INVOICE-RECEIPT");
        assert!(matches!(receipt.details, ReceiptDetails::Subscription { .. }));
        Ok(())
    }

    #[test]
    fn number_is_required() -> Result<()> {
        let raw: Receipt = "date: 2024-03-20".parse()?;
        let err = raw.into_receipt(&Settings::default()).unwrap_err();
        assert_eq!(err.to_string(), "Number required for Receipt");
        Ok(())
    }

    #[test]
    fn written_back_as_a_record() -> Result<()> {
        let raw: Receipt = "{number: REC-2024-0001, date: 2024-03-20, amount: 10}".parse()?;
        let receipt = raw.into_receipt(&walaka())?;
        let yaml = serde_yaml::to_string(&Receipt::from(&receipt))?;
        let again: Receipt = yaml.parse()?;
        assert_eq!(again.into_receipt(&Settings::default())?, receipt);
        Ok(())
    }
}
