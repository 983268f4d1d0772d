use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Pt,
}

impl From<&str> for Language {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pt" | "pt-pt" | "pt-mz" | "portuguese" => Language::Pt,
            _ => Language::En,
        }
    }
}

/// Fixed document wording in one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Labels {
    pub invoice_title: &'static str,
    pub invoice_number: &'static str,
    pub issue_date: &'static str,
    pub due_date: &'static str,
    pub currency: &'static str,
    pub draft: &'static str,
    pub email: &'static str,
    pub phone: &'static str,
    pub tax_id: &'static str,
    pub client: &'static str,
    pub contact: &'static str,
    pub description: &'static str,
    pub quantity: &'static str,
    pub unit_price: &'static str,
    pub discount: &'static str,
    pub subtotal: &'static str,
    pub vat: &'static str,
    pub total: &'static str,
    pub subtotal_after_discount: &'static str,
    pub notes: &'static str,
    pub exempt_footnote: &'static str,
    pub months: [&'static str; 12],
}

const EN: Labels = Labels {
    invoice_title: "INVOICE",
    invoice_number: "Invoice No.",
    issue_date: "Issue Date",
    due_date: "Due Date",
    currency: "Currency",
    draft: "Draft Invoice",
    email: "Email",
    phone: "Phone",
    tax_id: "NUIT",
    client: "Client",
    contact: "Contact",
    description: "Description",
    quantity: "Qty",
    unit_price: "Unit Price",
    discount: "Discount",
    subtotal: "Subtotal",
    vat: "VAT",
    total: "Total",
    subtotal_after_discount: "Subtotal after Discount",
    notes: "Notes",
    exempt_footnote: "Items marked with * are VAT-exempt under local tax law.",
    months: [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ],
};

const PT: Labels = Labels {
    invoice_title: "FACTURA",
    invoice_number: "Nº Fatura",
    issue_date: "Data de Emissão",
    due_date: "Data de Vencimento",
    currency: "Moeda",
    draft: "Factura Rascunho",
    email: "Email",
    phone: "Telefone",
    tax_id: "NUIT",
    client: "Cliente",
    contact: "Contacto",
    description: "Descrição",
    quantity: "Qtd.",
    unit_price: "Preço Unit.",
    discount: "Desconto",
    subtotal: "Subtotal",
    vat: "IVA",
    total: "Total",
    subtotal_after_discount: "Subtotal após Desconto",
    notes: "Observações",
    exempt_footnote: "Os itens marcados com * estão isentos de IVA nos termos da legislação Moçambicana.",
    months: [
        "Janeiro",
        "Fevereiro",
        "Março",
        "Abril",
        "Maio",
        "Junho",
        "Julho",
        "Agosto",
        "Setembro",
        "Outubro",
        "Novembro",
        "Dezembro",
    ],
};

impl Language {
    pub fn labels(&self) -> &'static Labels {
        match self {
            Language::En => &EN,
            Language::Pt => &PT,
        }
    }

    /// `20-March-2024`, `20-Março-2024`
    pub fn format_date(&self, date: NaiveDate) -> String {
        let month = self.labels().months[date.month0() as usize];
        format!("{:02}-{}-{}", date.day(), month, date.year())
    }
}

/// Accepts `2024-03-20` or a timestamp starting with one.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let day = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
