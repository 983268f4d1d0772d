pub mod document;
pub mod labels;
pub mod line_item;
pub mod lines;
pub mod metrics;
pub mod money;
pub mod numbering;
pub mod plan;
pub mod publish;
pub mod receipt;
pub mod settings;
pub mod template;
pub mod totals;
pub mod validation;

use anyhow::{Context, Error, Result};
use document::{InvoiceData, raw::Invoice};
use futures::stream::{Stream, TryStreamExt};
use money::Money;
use numbering::NumberSource;
use plan::Subscription;
use receipt::{Receipt, ReceiptDetails};
use settings::Settings;
use std::borrow::ToOwned;
use std::str::FromStr;
use totals::aggregate;
use tracing::debug;

/// Keys only a receipt record carries.
const RECEIPT_KEYS: [&str; 7] = [
    "receipt_number",
    "receiptNumber",
    "invoices",
    "invoice_numbers",
    "payment_method",
    "paymentMethod",
    "plan",
];

/// One yaml document of the records dir.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Invoice(Invoice),
    Receipt(receipt::raw::Receipt),
}

impl TryFrom<serde_yaml::Value> for Record {
    type Error = Error;

    /// An explicit `type: invoice | receipt` decides, otherwise a document with
    /// any receipt key is a receipt.
    fn try_from(value: serde_yaml::Value) -> Result<Self> {
        let is_receipt = match value.get("type").and_then(|kind| kind.as_str()) {
            Some(kind) => kind.eq_ignore_ascii_case("receipt"),
            None => RECEIPT_KEYS.iter().any(|key| value.get(*key).is_some()),
        };
        let doc = || serde_yaml::to_string(&value).unwrap_or_default();
        if is_receipt {
            let receipt = serde_yaml::from_value(value.clone())
                .with_context(|| format!("Failed to deserialize Receipt:\n{}", doc()))?;
            Ok(Record::Receipt(receipt))
        } else {
            let invoice = serde_yaml::from_value(value.clone())
                .with_context(|| format!("Failed to deserialize Invoice:\n{}", doc()))?;
            Ok(Record::Invoice(invoice))
        }
    }
}

impl FromStr for Record {
    type Err = Error;

    fn from_str(doc: &str) -> Result<Self> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(doc).with_context(|| format!("Failed to deserialize record:\n{}", doc))?;
        value.try_into()
    }
}

/// Invoice and receipt records kept as yaml documents in a dir, a file or
/// stdin, read with the business settings.
pub struct Records {
    pub settings: Settings,
    path: Option<String>,
}

impl Records {
    pub fn new(path: Option<&str>, settings: Settings) -> Self {
        Records {
            settings,
            path: path.map(ToOwned::to_owned),
        }
    }

    pub fn records(&self) -> impl Stream<Item = Result<Record>> + use<> {
        lines::docs(self.path.clone()).and_then(|doc| async move { Record::try_from(doc) })
    }

    pub async fn invoices(&self) -> Result<Vec<Invoice>> {
        self.records()
            .try_filter_map(|record| async move {
                Ok(match record {
                    Record::Invoice(invoice) => Some(invoice),
                    Record::Receipt(_) => None,
                })
            })
            .try_collect()
            .await
    }

    pub async fn raw_receipts(&self) -> Result<Vec<receipt::raw::Receipt>> {
        self.records()
            .try_filter_map(|record| async move {
                Ok(match record {
                    Record::Receipt(receipt) => Some(receipt),
                    Record::Invoice(_) => None,
                })
            })
            .try_collect()
            .await
    }

    /// The invoice with that number, or that display number (`A/7`).
    pub async fn invoice(&self, number: &str) -> Result<Invoice> {
        let settings = &self.settings;
        self.invoices()
            .await?
            .into_iter()
            .find(|invoice| {
                invoice.number.as_deref() == Some(number)
                    || invoice.clone().into_data(settings).invoice.display_number("") == number
            })
            .with_context(|| format!("No invoice {}", number))
    }

    pub async fn invoice_data(&self, number: &str) -> Result<InvoiceData> {
        Ok(self.invoice(number).await?.into_data(&self.settings))
    }

    /// The receipt with that number. A payment receipt recorded without an
    /// amount is owed the grand totals of the invoices it references.
    pub async fn receipt(&self, number: &str) -> Result<Receipt> {
        let raw = self
            .raw_receipts()
            .await?
            .into_iter()
            .find(|receipt| receipt.number.as_deref() == Some(number))
            .with_context(|| format!("No receipt {}", number))?;
        let has_amount = raw.has_amount();
        let mut receipt = raw.into_receipt(&self.settings)?;
        if let (false, ReceiptDetails::Payment { references }) = (has_amount, &receipt.details) {
            let mut amount = Money::default();
            for reference in references {
                let data = self.invoice_data(reference).await?;
                amount += aggregate(&data.items).grand_total;
            }
            debug!("Receipt {} settles {} for {} invoices", number, amount, references.len());
            receipt.amount = amount;
        }
        Ok(receipt)
    }

    /// Subscriptions documented by the subscription invoice-receipts.
    pub async fn subscriptions(&self) -> Result<Vec<Subscription>> {
        let mut subscriptions = Vec::new();
        for raw in self.raw_receipts().await? {
            let receipt = raw.into_receipt(&self.settings)?;
            subscriptions.extend(Subscription::from_receipt(&receipt));
        }
        Ok(subscriptions)
    }

    /// Numbers of every invoice and receipt on record.
    pub async fn numbers(&self) -> Result<Vec<String>> {
        self.records()
            .try_filter_map(|record| async move {
                Ok(match record {
                    Record::Invoice(invoice) => invoice.number,
                    Record::Receipt(receipt) => receipt.number,
                })
            })
            .try_collect()
            .await
    }
}

impl NumberSource for Records {
    async fn largest_number(&self, prefix: &str, year: i32) -> Result<Option<String>> {
        self.numbers().await?.largest_number(prefix, year).await
    }
}

#[cfg(test)]
mod record_tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn tells_receipts_from_invoices() -> Result<()> {
        let invoice: Record = "{number: INV-2024-0001, items: []}".parse()?;
        assert!(matches!(invoice, Record::Invoice(_)));

        let receipt: Record = indoc! {"
            number: REC-2024-0001
            date: 2024-03-20
            invoices: [INV-2024-0001]
        "}
        .parse()?;
        assert!(matches!(receipt, Record::Receipt(_)));

        let tagged: Record = "{type: Receipt, number: REC-2024-0002}".parse()?;
        assert!(matches!(tagged, Record::Receipt(_)));
        Ok(())
    }

    #[test]
    fn inline_documents_of_one_file() -> Result<()> {
        let records = lines::split_docs("--- # march\nnumber: INV-1\n--- {number: REC-1, invoices: [INV-1]}\n...\n")?
            .into_iter()
            .map(Record::try_from)
            .collect::<Result<Vec<_>>>()?;
        assert!(matches!(&records[..], [Record::Invoice(_), Record::Receipt(_)]));
        Ok(())
    }
}
