pub mod draw;
pub mod raw;

use crate::document::Party;
use crate::money::{Currency, Money};
use crate::totals::InvoiceTotals;
use chrono::NaiveDate;
use draw::{Align, Canvas, DrawOp, LIGHT_TEXT, PAGE_WIDTH, PANEL, PRIMARY, TEXT, WHITE, wrap};

pub const FOOTER: &str = "Generated by WALAKA";
pub const SUBSCRIPTION_NOTE: &str =
    "Subscription to WALAKA Invoicing plan. This document serves as both invoice and receipt.";

/// What the receipt acknowledges, which decides its details table.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiptDetails {
    /// Payment of one or more invoices.
    Payment { references: Vec<String> },
    /// A paid subscription period, the document doubles as an invoice.
    Subscription {
        plan: String,
        /// Advertised price, `MZN 250/mo`. The amount is printed when empty.
        price: String,
        start: NaiveDate,
        end: NaiveDate,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub number: String,
    pub issuer: Party,
    pub recipient: Party,
    pub date: NaiveDate,
    pub method: String,
    pub status: String,
    pub amount: Money,
    pub currency: Currency,
    pub notes: String,
    pub details: ReceiptDetails,
}

impl Receipt {
    pub fn payment(number: &str, issuer: Party, recipient: Party, date: NaiveDate, method: &str) -> Self {
        Receipt {
            number: number.to_owned(),
            issuer,
            recipient,
            date,
            method: method.to_owned(),
            status: "Paid".into(),
            amount: Money::default(),
            currency: Currency::default(),
            notes: String::new(),
            details: ReceiptDetails::Payment {
                references: Vec::new(),
            },
        }
    }

    /// Adds a settled invoice: its reference joins the list and its grand
    /// total joins the amount.
    pub fn with_invoice(mut self, reference: &str, totals: &InvoiceTotals) -> Self {
        if let ReceiptDetails::Payment { references } = &mut self.details {
            references.push(reference.to_owned());
        }
        self.amount += totals.grand_total;
        self
    }

    pub fn title(&self) -> &'static str {
        match self.details {
            ReceiptDetails::Payment { .. } => "RECEIPT",
            ReceiptDetails::Subscription { .. } => "INVOICE-RECEIPT",
        }
    }

    fn number_label(&self) -> &'static str {
        match self.details {
            ReceiptDetails::Payment { .. } => "Receipt #",
            ReceiptDetails::Subscription { .. } => "Invoice-Receipt #",
        }
    }

    /// Label and value rows of the details table.
    pub fn detail_rows(&self) -> Vec<(&'static str, String)> {
        match &self.details {
            ReceiptDetails::Payment { references } => vec![
                ("Date:", self.date.to_string()),
                ("Payment Method:", or_dash(&self.method)),
                ("Invoice(s):", references_display(references)),
                ("Status:", or_dash(&self.status)),
            ],
            ReceiptDetails::Subscription {
                plan,
                price,
                start,
                end,
            } => vec![
                ("Plan:", or_dash(plan)),
                (
                    "Price:",
                    if price.trim().is_empty() {
                        self.currency.format(self.amount)
                    } else {
                        price.trim().to_owned()
                    },
                ),
                ("Payment Method:", or_dash(&self.method)),
                ("Start Date:", start.to_string()),
                ("End Date:", end.to_string()),
                ("Status:", or_dash(&self.status)),
            ],
        }
    }

    fn notes(&self) -> &str {
        match (&self.details, self.notes.trim()) {
            (ReceiptDetails::Subscription { .. }, "") => SUBSCRIPTION_NOTE,
            (_, notes) => notes,
        }
    }

    /// The single page layout: header band, both parties, details table, a
    /// boxed amount, notes and footer.
    pub fn layout(&self) -> Vec<DrawOp> {
        let mut canvas = Canvas::new();

        canvas.rect(0.0, 0.0, PAGE_WIDTH, 22.0, Some(PRIMARY), None);
        canvas
            .font(20.0, true)
            .color(WHITE)
            .text(&or_dash(&self.issuer.name), 14.0, 15.0);
        canvas
            .font(14.0, true)
            .text_aligned(self.title(), 180.0, 15.0, Align::Right);

        canvas
            .font(11.0, false)
            .color(TEXT)
            .text(&format!("{}: {}", self.number_label(), self.number), 14.0, 30.0);

        party_block(&mut canvas, "From:", &self.issuer, 14.0);
        party_block(&mut canvas, "To:", &self.recipient, 120.0);

        let mut y = 70.0;
        let heading = match self.details {
            ReceiptDetails::Payment { .. } => "Receipt Details",
            ReceiptDetails::Subscription { .. } => "Subscription Details",
        };
        canvas.font(12.0, true).text(heading, 14.0, y);
        canvas.font(10.0, false);
        y += 1.0;
        for (label, value) in self.detail_rows() {
            y += 6.0;
            canvas.text(label, 14.0, y).text(&value, 50.0, y);
        }

        canvas.rect(120.0, 65.0, 70.0, 25.0, Some(PANEL), Some(PRIMARY));
        canvas
            .font(13.0, true)
            .color(PRIMARY)
            .text_aligned("Amount Paid", 155.0, 75.0, Align::Center);
        canvas
            .font(16.0, true)
            .text_aligned(&self.currency.format(self.amount), 155.0, 88.0, Align::Center);

        y += 35.0;
        let notes = self.notes();
        if !notes.is_empty() {
            canvas.font(12.0, true).color(TEXT).text("Notes", 14.0, y);
            canvas.font(10.0, false).color(LIGHT_TEXT);
            for line in wrap(notes, 95) {
                y += 6.0;
                canvas.text(&line, 14.0, y);
            }
        }

        canvas
            .font(9.0, false)
            .color(LIGHT_TEXT)
            .text_aligned(FOOTER, PAGE_WIDTH / 2.0, 287.0, Align::Center);
        canvas.finish()
    }
}

fn party_block(canvas: &mut Canvas, heading: &str, party: &Party, x: f32) {
    canvas.font(11.0, true).color(TEXT).text(heading, x, 40.0);
    canvas.font(10.0, false);
    let lines = [
        or_dash(&party.name),
        or_dash(&party.address),
        or_dash(&party.email),
        format!("NUIT: {}", or_dash(&party.tax_id)),
    ];
    for (line, y) in lines.iter().zip([45.0, 50.0, 55.0, 60.0]) {
        canvas.text(line, x, y);
    }
}

fn or_dash(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() { "-".into() } else { value.to_owned() }
}

/// Several related invoice numbers as one display string.
pub fn references_display(references: &[String]) -> String {
    let joined = references
        .iter()
        .map(|reference| reference.trim())
        .filter(|reference| !reference.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    or_dash(&joined)
}
