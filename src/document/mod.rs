pub mod paginate;
pub mod raw;

pub use paginate::{PAGE_BREAK, PAGE_SIZE, paginate};

use crate::labels::{Labels, Language};
use crate::line_item::{DiscountType, LineItem, compute_line};
use crate::money::Currency;
use crate::template::{TemplateDescriptor, fill};
use crate::totals::{InvoiceTotals, aggregate};
use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write;
use tracing::debug;

/// Identity block of either side of a document. Empty fields print as nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Party {
    pub name: String,
    pub address: String,
    pub email: String,
    pub phone: String,
    pub tax_id: String,
    pub contact: String,
}

impl Party {
    pub fn new(name: &str) -> Self {
        Party {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    /// Contact line, falling back to the phone number.
    pub fn contact(&self) -> &str {
        if self.contact.trim().is_empty() {
            &self.phone
        } else {
            &self.contact
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceHeader {
    pub number: Option<String>,
    pub serie: Option<String>,
    /// Overrides the serie/number rule when already resolved upstream.
    pub display_number: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub currency: Currency,
}

impl InvoiceHeader {
    pub fn display_number(&self, draft: &str) -> String {
        match self.display_number.as_deref().map(str::trim) {
            Some(number) if !number.is_empty() => number.to_owned(),
            _ => display_number(self.serie.as_deref(), self.number.as_deref(), draft),
        }
    }
}

/// `serie/number` unless the number already carries its serie. Falls back to
/// whichever is present, then to the draft marker.
pub fn display_number(serie: Option<&str>, number: Option<&str>, draft: &str) -> String {
    let serie = serie.map(str::trim).filter(|s| !s.is_empty());
    let number = number.map(str::trim).filter(|n| !n.is_empty());
    match (serie, number) {
        (Some(serie), Some(number)) if !number.starts_with(&format!("{}/", serie)) => {
            format!("{}/{}", serie, number)
        }
        (_, Some(number)) => number.to_owned(),
        (Some(serie), None) => serie.to_owned(),
        (None, None) => draft.to_owned(),
    }
}

/// Everything an invoice document is rendered from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceData {
    pub company: Party,
    pub client: Party,
    pub invoice: InvoiceHeader,
    pub items: Vec<LineItem>,
    pub notes: String,
    pub language: Language,
}

/// An invoice laid out for print: the billable rows split into pages and the
/// totals computed over them.
#[derive(Debug)]
pub struct InvoiceDocument<'a> {
    data: &'a InvoiceData,
    labels: &'static Labels,
    rows: Vec<&'a LineItem>,
    pub totals: InvoiceTotals,
}

impl<'a> InvoiceDocument<'a> {
    pub fn new(data: &'a InvoiceData) -> Self {
        let rows = data.items.iter().filter(|item| item.is_billable()).collect_vec();
        InvoiceDocument {
            data,
            labels: data.language.labels(),
            rows,
            totals: aggregate(&data.items),
        }
    }

    pub fn pages(&self) -> Vec<&[&'a LineItem]> {
        paginate(&self.rows, PAGE_SIZE)
    }

    pub fn number(&self) -> String {
        self.data.invoice.display_number(self.labels.draft)
    }

    fn currency(&self) -> &Currency {
        &self.data.invoice.currency
    }

    pub fn has_exempt_rows(&self) -> bool {
        self.totals.has_exempt_items
    }

    pub fn render(&self, template: &TemplateDescriptor) -> String {
        debug!(
            "Rendering invoice {} with {} template, {} rows",
            self.number(),
            template.name,
            self.rows.len()
        );
        let body = fill(template.layout_skeleton, &self.bindings());
        let mut html = String::with_capacity(template.style_sheet.len() + body.len() + 512);
        html.push_str("<!DOCTYPE html>\n");
        let _ = write!(
            html,
            "<html lang=\"{}\">\n<head>\n<meta charset=\"UTF-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
             <title>{} {}</title>\n<style>\n{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
            match self.data.language {
                Language::En => "en",
                Language::Pt => "pt",
            },
            escape_html(self.labels.invoice_title),
            escape_html(&self.number()),
            template.style_sheet,
            body
        );
        html
    }

    fn bindings(&self) -> HashMap<&'static str, String> {
        let labels = self.labels;
        let company = &self.data.company;
        let client = &self.data.client;
        let invoice = &self.data.invoice;
        let date = |date: Option<NaiveDate>| {
            date.map(|d| self.data.language.format_date(d))
                .unwrap_or_default()
        };
        [
            ("label_invoice_title", labels.invoice_title),
            ("label_invoice_number", labels.invoice_number),
            ("label_issue_date", labels.issue_date),
            ("label_due_date", labels.due_date),
            ("label_currency", labels.currency),
            ("label_email", labels.email),
            ("label_phone", labels.phone),
            ("label_tax_id", labels.tax_id),
            ("label_client", labels.client),
            ("label_contact", labels.contact),
            ("label_notes", labels.notes),
        ]
        .into_iter()
        .map(|(name, label)| (name, escape_html(label)))
        .chain(
            [
                ("company_name", company.name.as_str()),
                ("company_address", company.address.as_str()),
                ("company_email", company.email.as_str()),
                ("company_phone", company.phone.as_str()),
                ("company_tax_id", company.tax_id.as_str()),
                ("client_name", client.name.as_str()),
                ("client_address", client.address.as_str()),
                ("client_tax_id", client.tax_id.as_str()),
                ("client_email", client.email.as_str()),
                ("client_contact", client.contact()),
                ("currency", invoice.currency.code()),
                ("notes", self.data.notes.as_str()),
            ]
            .into_iter()
            .map(|(name, value)| (name, escape_html(value))),
        )
        .chain([
            ("invoice_number", escape_html(&self.number())),
            ("issue_date", escape_html(&date(invoice.issue_date))),
            ("due_date", escape_html(&date(invoice.due_date))),
            ("items", self.items_html()),
            ("totals", self.totals_html()),
        ])
        .collect()
    }

    /// One table per page with a page break between pages, then the exemption
    /// footnote when any row is exempt.
    pub fn items_html(&self) -> String {
        let pages = self.pages();
        let page_count = pages.len();
        let mut html = String::new();
        for (index, page) in pages.into_iter().enumerate() {
            html.push_str(&self.table_html(page));
            if index + 1 < page_count {
                html.push_str(PAGE_BREAK);
                html.push('\n');
            }
        }
        if self.has_exempt_rows() {
            let _ = writeln!(
                html,
                "<div class=\"vat-exemption-note\">{}</div>",
                escape_html(self.labels.exempt_footnote)
            );
        }
        html
    }

    fn table_html(&self, page: &[&LineItem]) -> String {
        let labels = self.labels;
        let mut html = String::from("<table class=\"invoice-items\">\n<thead>\n<tr>");
        for header in [
            labels.description,
            labels.quantity,
            labels.unit_price,
            labels.discount,
            labels.subtotal,
            labels.vat,
            labels.total,
        ] {
            let _ = write!(html, "<th>{}</th>", escape_html(header));
        }
        html.push_str("</tr>\n</thead>\n<tbody>\n");
        for item in page {
            html.push_str(&self.row_html(item));
        }
        html.push_str("</tbody>\n</table>\n");
        html
    }

    fn row_html(&self, item: &LineItem) -> String {
        let currency = self.currency();
        let amounts = compute_line(item);
        let mut description = item.description.trim().to_owned();
        if item.is_exempt() && !description.is_empty() && !description.ends_with('*') {
            description.push_str(" *");
        }
        let cells = [
            escape_html(&description),
            item.quantity.normalize().to_string(),
            currency.format(item.unit_price),
            escape_html(&discount_display(item, currency)),
            currency.format(amounts.discounted_subtotal),
            currency.format(amounts.vat_amount),
            currency.format(amounts.line_total),
        ];
        let mut html = String::from("<tr>");
        for cell in cells {
            let _ = write!(html, "<td>{}</td>", cell);
        }
        html.push_str("</tr>\n");
        html
    }

    pub fn totals_html(&self) -> String {
        let labels = self.labels;
        let currency = self.currency();
        let totals = &self.totals;
        let mut html = String::new();
        let mut row = |class: &str, label: &str, value: String| {
            let _ = writeln!(
                html,
                "<div class=\"{}\"><span>{}:</span> <span>{}</span></div>",
                class,
                escape_html(label),
                escape_html(&value)
            );
        };
        row("total-row", labels.subtotal, currency.format(totals.subtotal));
        if totals.discount.is_shown() {
            row(
                "total-row discount-row",
                &totals.discount.label(labels.discount, currency),
                format!("- {}", currency.format(totals.total_discount)),
            );
            row(
                "total-row",
                labels.subtotal_after_discount,
                currency.format(totals.subtotal_after_discount),
            );
        }
        row("total-row", labels.vat, currency.format(totals.total_vat));
        row("grand-total", labels.total, currency.format(totals.grand_total));
        html
    }
}

/// `"10 %"`, `"60 MT"`, or an em dash when the row has no discount.
pub fn discount_display(item: &LineItem, currency: &Currency) -> String {
    if !item.has_discount() {
        return "—".to_owned();
    }
    let value = item.discount_value.normalize();
    match item.discount_type {
        DiscountType::Percent => format!("{} %", value),
        DiscountType::Fixed => format!("{} {}", value, currency.symbol()),
        DiscountType::None => "—".to_owned(),
    }
}

/// Renders a complete, self contained HTML invoice.
pub fn populate(template: &TemplateDescriptor, data: &InvoiceData) -> String {
    InvoiceDocument::new(data).render(template)
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod document_tests {
    use super::*;
    use crate::template::{select_template, select_template_with_accent};
    use anyhow::Result;

    fn item(description: &str, qty: &str, price: &str, vat: &str) -> LineItem {
        LineItem::new(description, qty.parse().unwrap(), price.parse().unwrap())
            .with_vat(vat.parse().unwrap())
    }

    fn sample() -> InvoiceData {
        InvoiceData {
            company: Party {
                name: "Walaka Software, Lda".into(),
                address: "Av. Julius Nyerere, Maputo".into(),
                email: "info@walaka.co.mz".into(),
                phone: "+258 84 000 0000".into(),
                tax_id: "401883155".into(),
                ..Default::default()
            },
            client: Party {
                name: "Sample Client".into(),
                tax_id: "987654321".into(),
                phone: "+258 82 111 1111".into(),
                ..Default::default()
            },
            invoice: InvoiceHeader {
                number: Some("INV-2024-0001".into()),
                serie: Some("A".into()),
                issue_date: NaiveDate::from_ymd_opt(2024, 3, 20),
                due_date: NaiveDate::from_ymd_opt(2024, 4, 20),
                ..Default::default()
            },
            items: vec![
                item("Sample Product 1", "2", "500", "0.16"),
                item("Bread", "3", "10", "0"),
            ],
            notes: "Thank you for your business!".into(),
            language: Language::En,
        }
    }

    #[test]
    fn display_number_rules() {
        assert_eq!(display_number(Some("A"), Some("12"), "Draft"), "A/12");
        assert_eq!(display_number(Some("A"), Some("A/12"), "Draft"), "A/12");
        assert_eq!(display_number(None, Some("12"), "Draft"), "12");
        assert_eq!(display_number(Some("A"), None, "Draft"), "A");
        assert_eq!(display_number(Some(" "), Some(""), "Draft"), "Draft");
        assert_eq!(display_number(None, None, "Draft Invoice"), "Draft Invoice");
    }

    #[test]
    fn renders_a_complete_document() -> Result<()> {
        let data = sample();
        let html = populate(&select_template("classic"), &data);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.trim_end().ends_with("</html>"));
        assert!(html.contains("<style>\n.invoice-container"));
        assert!(html.contains("<title>INVOICE A/INV-2024-0001</title>"));
        assert!(html.contains("<span id=\"invoice-number\">A/INV-2024-0001</span>"));
        assert!(html.contains("<span id=\"issue-date\">20-March-2024</span>"));
        assert!(html.contains("<p id=\"currency-field\">Currency: MZN</p>"));
        assert!(html.contains("<span id=\"client-contact\">+258 82 111 1111</span>"));
        assert!(html.contains("<p id=\"client-address\"></p>"));
        assert!(!html.contains("{{"));
        assert!(!html.contains("undefined"));
        Ok(())
    }

    #[test]
    fn marks_exempt_rows_and_adds_one_footnote() -> Result<()> {
        let mut data = sample();
        data.items.push(item("Already marked *", "1", "5", "0"));
        let html = populate(&select_template("classic"), &data);
        dbg!(&html);
        assert!(html.contains("<td>Bread *</td>"));
        assert!(html.contains("<td>Already marked *</td>"));
        assert!(html.contains("<td>Sample Product 1</td>"));
        assert_eq!(html.matches("Items marked with * are VAT-exempt").count(), 1);
        Ok(())
    }

    #[test]
    fn no_footnote_without_exempt_rows() {
        let mut data = sample();
        data.items.truncate(1);
        let html = populate(&select_template("classic"), &data);
        assert!(!html.contains("vat-exemption-note\">"));
    }

    #[test]
    fn row_cells_are_formatted() -> Result<()> {
        let mut data = sample();
        data.items = vec![
            item("Consulting", "1", "100", "0.16")
                .with_discount(DiscountType::Percent, "10".parse()?),
        ];
        let html = populate(&select_template("classic"), &data);
        assert!(html.contains(
            "<tr><td>Consulting</td><td>1</td><td>100,00 MT</td><td>10 %</td>\
             <td>90,00 MT</td><td>14,40 MT</td><td>104,40 MT</td></tr>"
        ));
        assert!(html.contains("<span>Discount (10%):</span> <span>- 10,00 MT</span>"));
        assert!(html.contains("<span>Subtotal after Discount:</span> <span>90,00 MT</span>"));
        assert!(html.contains("<div class=\"grand-total\"><span>Total:</span> <span>104,40 MT</span>"));
        Ok(())
    }

    #[test]
    fn discount_cells() -> Result<()> {
        let currency = Currency::default();
        let fixed = item("A", "1", "100", "0.16").with_discount(DiscountType::Fixed, "60".parse()?);
        assert_eq!(discount_display(&fixed, &currency), "60 MT");
        let zero = item("A", "1", "100", "0.16").with_discount(DiscountType::Percent, "0".parse()?);
        assert_eq!(discount_display(&zero, &currency), "—");
        assert_eq!(discount_display(&item("A", "1", "1", "0"), &currency), "—");
        Ok(())
    }

    #[test]
    fn no_discount_lines_without_discounts() {
        let html = populate(&select_template("classic"), &sample());
        assert!(!html.contains("class=\"total-row discount-row\""));
        assert!(!html.contains("Subtotal after Discount"));
    }

    #[test]
    fn paginates_rows_with_breaks_between_pages() {
        let mut data = sample();
        data.items = (1..=23)
            .map(|n| item(&format!("Row {}", n), "1", "10", "0.16"))
            .collect();
        data.items.push(item("", "1", "10", "0.16"));
        let document = InvoiceDocument::new(&data);
        let sizes: Vec<usize> = document.pages().iter().map(|page| page.len()).collect();
        assert_eq!(sizes, vec![10, 10, 3]);
        let html = document.render(&select_template("classic"));
        assert_eq!(html.matches("<table class=\"invoice-items\">").count(), 3);
        assert_eq!(html.matches(PAGE_BREAK).count(), 2);
        assert!(!html.contains("<td></td><td>1</td>"));
    }

    #[test]
    fn empty_invoice_still_renders_a_table_and_totals() {
        let mut data = sample();
        data.items.clear();
        data.invoice = InvoiceHeader::default();
        let html = populate(&select_template("modern"), &data);
        assert_eq!(html.matches("<table class=\"invoice-items\">").count(), 1);
        assert!(!html.contains(PAGE_BREAK));
        assert!(html.contains("<span id=\"invoice-number\">Draft Invoice</span>"));
        assert!(html.contains("<span>Total:</span> <span>0,00 MT</span>"));
    }

    #[test]
    fn escapes_user_text() {
        let mut data = sample();
        data.client.name = "<script>alert('x')</script> & Co".into();
        let html = populate(&select_template("classic"), &data);
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; Co"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn modern_document_uses_accent() {
        let html = populate(
            &select_template_with_accent("modern", Some("#123456")),
            &sample(),
        );
        assert!(html.contains("border-bottom: 3px solid #123456;"));
        assert!(!html.contains("{{accentColor}}"));
    }

    #[test]
    fn portuguese_labels() {
        let mut data = sample();
        data.language = Language::Pt;
        data.invoice.serie = None;
        data.invoice.number = None;
        let html = populate(&select_template("classic"), &data);
        assert!(html.contains("<h2>FACTURA</h2>"));
        assert!(html.contains("Factura Rascunho"));
        assert!(html.contains("<span id=\"issue-date\">20-Março-2024</span>"));
        assert!(html.contains("<p id=\"currency-field\">Moeda: MZN</p>"));
        assert!(html.contains("<th>Descrição</th><th>Qtd.</th><th>Preço Unit.</th>"));
        assert!(html.contains("isentos de IVA nos termos da legislação Moçambicana."));
    }

    #[test]
    fn populate_is_deterministic() {
        let data = sample();
        let template = select_template("modern");
        assert_eq!(populate(&template, &data), populate(&template, &data));
    }
}
