use crate::document::raw::Invoice;
use crate::labels::parse_date;
use crate::money::Money;
use crate::totals::aggregate;
use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

pub const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Pending,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

impl From<&str> for InvoiceStatus {
    /// Missing or unknown statuses read as draft.
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pending" => InvoiceStatus::Pending,
            "sent" => InvoiceStatus::Sent,
            "paid" => InvoiceStatus::Paid,
            "overdue" => InvoiceStatus::Overdue,
            "cancelled" | "canceled" => InvoiceStatus::Cancelled,
            _ => InvoiceStatus::Draft,
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

/// What the dashboard needs of an invoice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceSummary {
    pub number: String,
    pub status: InvoiceStatus,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub total: Money,
}

impl InvoiceSummary {
    /// The grand total comes from the rows; a record without billable rows
    /// falls back to its stored total.
    pub fn from_raw(invoice: &Invoice, default_vat_rate: Decimal) -> Self {
        let totals = aggregate(&invoice.line_items(default_vat_rate));
        let total = if totals.is_empty() {
            invoice.total.map(|total| Money(total.0)).unwrap_or_default()
        } else {
            totals.grand_total
        };
        InvoiceSummary {
            number: invoice
                .number
                .clone()
                .or_else(|| invoice.id.clone())
                .unwrap_or_default(),
            status: invoice.status.as_deref().map(InvoiceStatus::from).unwrap_or(InvoiceStatus::Draft),
            issue_date: invoice.issue_date.as_deref().and_then(parse_date),
            due_date: invoice.due_date.as_deref().and_then(parse_date),
            total,
        }
    }

    /// Pending past its due date counts as overdue. The due date itself is
    /// still on time.
    pub fn effective_status(&self, today: NaiveDate) -> InvoiceStatus {
        match (self.status, self.due_date) {
            (InvoiceStatus::Pending, Some(due)) if due < today => InvoiceStatus::Overdue,
            (status, _) => status,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub paid: usize,
    pub pending: usize,
    pub overdue: usize,
}

impl StatusCounts {
    /// Share of all invoices to one decimal, `"0.0"` when there are none.
    pub fn percentage(&self, count: usize) -> String {
        if self.total == 0 {
            return "0.0".into();
        }
        format!("{:.1}", count as f64 / self.total as f64 * 100.0)
    }
}

/// Paid, pending and overdue counts. Drafts and other statuses only count
/// towards the total.
pub fn status_counts(invoices: &[InvoiceSummary], today: NaiveDate) -> StatusCounts {
    invoices.iter().fold(
        StatusCounts {
            total: invoices.len(),
            ..Default::default()
        },
        |mut counts, invoice| {
            match invoice.effective_status(today) {
                InvoiceStatus::Paid => counts.paid += 1,
                InvoiceStatus::Pending => counts.pending += 1,
                InvoiceStatus::Overdue => counts.overdue += 1,
                _ => (),
            }
            counts
        },
    )
}

/// Monday of the week holding `day`, and the Sunday closing it.
pub fn week_of(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = day - Duration::days(day.weekday().num_days_from_monday() as i64);
    (monday, monday + Duration::days(6))
}

/// Invoices issued per weekday, Monday first. Undated invoices are skipped.
pub fn weekly_distribution<'a, I>(invoices: I) -> [usize; 7]
where
    I: IntoIterator<Item = &'a InvoiceSummary>,
{
    let mut counts = [0; 7];
    for date in invoices.into_iter().filter_map(|invoice| invoice.issue_date) {
        counts[date.weekday().num_days_from_monday() as usize] += 1;
    }
    counts
}

pub fn revenue_by_status(invoices: &[InvoiceSummary], today: NaiveDate) -> BTreeMap<InvoiceStatus, Money> {
    let mut revenue = BTreeMap::new();
    for invoice in invoices {
        *revenue
            .entry(invoice.effective_status(today))
            .or_insert_with(Money::default) += invoice.total;
    }
    revenue
}

/// Pending invoices whose stored status must move to overdue.
pub fn overdue_sweep(invoices: &[InvoiceSummary], today: NaiveDate) -> Vec<&InvoiceSummary> {
    let overdue: Vec<_> = invoices
        .iter()
        .filter(|invoice| invoice.status == InvoiceStatus::Pending)
        .filter(|invoice| invoice.effective_status(today) == InvoiceStatus::Overdue)
        .collect();
    debug!("{} of {} invoices are past due", overdue.len(), invoices.len());
    overdue
}

/// Everything the dashboard cards and charts show, as of `today`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub counts: StatusCounts,
    pub paid_percentage: String,
    pub pending_percentage: String,
    pub overdue_percentage: String,
    /// Invoices issued this week, Monday first.
    pub this_week: [usize; 7],
    pub revenue: BTreeMap<InvoiceStatus, String>,
    pub to_mark_overdue: Vec<String>,
}

impl Dashboard {
    pub fn new(invoices: &[InvoiceSummary], today: NaiveDate) -> Self {
        let counts = status_counts(invoices, today);
        let (monday, sunday) = week_of(today);
        let this_week = weekly_distribution(invoices.iter().filter(|invoice| {
            invoice
                .issue_date
                .is_some_and(|date| monday <= date && date <= sunday)
        }));
        Dashboard {
            paid_percentage: counts.percentage(counts.paid),
            pending_percentage: counts.percentage(counts.pending),
            overdue_percentage: counts.percentage(counts.overdue),
            this_week,
            revenue: revenue_by_status(invoices, today)
                .into_iter()
                .map(|(status, total)| (status, total.to_string()))
                .collect(),
            to_mark_overdue: overdue_sweep(invoices, today)
                .into_iter()
                .map(|invoice| invoice.number.clone())
                .collect(),
            counts,
        }
    }
}
