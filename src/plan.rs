use crate::document::Party;
use crate::labels::Language;
use crate::money::{Currency, Money};
use crate::numbering::SequenceNumber;
use crate::receipt::{Receipt, ReceiptDetails};
use anyhow::{Context, Error, Result, bail};
use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub const TRIAL_DAYS: i64 = 14;
pub const TRIAL_INVOICES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanKey {
    Trial,
    Basic,
    Standard,
}

impl FromStr for PlanKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "trial" => Ok(PlanKey::Trial),
            "basic" => Ok(PlanKey::Basic),
            "standard" => Ok(PlanKey::Standard),
            other => bail!("Unknown plan '{}'", other),
        }
    }
}

impl fmt::Display for PlanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", plan(*self).name_en)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub key: PlanKey,
    pub name_en: &'static str,
    pub name_pt: &'static str,
    /// Advertised price, `MZN 250/mo`.
    pub price: &'static str,
    /// Monthly price in meticais.
    pub price_value: i64,
    pub max_users: u32,
    pub features: &'static [&'static str],
    pub recommended: bool,
}

impl Plan {
    pub fn name(&self, language: Language) -> &'static str {
        match language {
            Language::En => self.name_en,
            Language::Pt => self.name_pt,
        }
    }

    pub fn amount(&self) -> Money {
        Money(Decimal::from(self.price_value))
    }
}

pub const PLANS: [Plan; 3] = [
    Plan {
        key: PlanKey::Trial,
        name_en: "Trial",
        name_pt: "Teste",
        price: "Free",
        price_value: 0,
        max_users: 1,
        features: &["Limited invoices", "14 days", "1 user"],
        recommended: false,
    },
    Plan {
        key: PlanKey::Basic,
        name_en: "Basic",
        name_pt: "Básico",
        price: "MZN 250/mo",
        price_value: 250,
        max_users: 2,
        features: &["2 users", "Unlimited invoices"],
        recommended: false,
    },
    Plan {
        key: PlanKey::Standard,
        name_en: "Standard",
        name_pt: "Padrão",
        price: "MZN 500/mo",
        price_value: 500,
        max_users: 5,
        features: &["5 users", "Unlimited invoices"],
        recommended: true,
    },
];

/// The business selling the plans, issuer of every subscription
/// invoice-receipt.
pub fn vendor() -> Party {
    Party {
        name: "Walaka Software, Lda".into(),
        address: "Av. Julius Nyerere, Maputo, Mozambique".into(),
        email: "info@walaka.co.mz".into(),
        tax_id: "401883155".into(),
        ..Default::default()
    }
}

pub fn plan(key: PlanKey) -> &'static Plan {
    match key {
        PlanKey::Trial => &PLANS[0],
        PlanKey::Basic => &PLANS[1],
        PlanKey::Standard => &PLANS[2],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Transfer,
    Mpesa,
    Emola,
}

impl PaymentMethod {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Transfer => "Transfer (Bank)",
            PaymentMethod::Mpesa => "M-pesa",
            PaymentMethod::Emola => "E-mola",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match key.as_str() {
            "transfer" | "bank" | "banktransfer" | "transferbank" => Ok(PaymentMethod::Transfer),
            "mpesa" => Ok(PaymentMethod::Mpesa),
            "emola" => Ok(PaymentMethod::Emola),
            _ => bail!("Unknown payment method '{}'", s),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
}

/// A paid plan period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subscription {
    pub number: String,
    pub plan: PlanKey,
    pub status: SubscriptionStatus,
    pub method: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Subscription {
    /// Active, running past `today` and on a paid plan.
    pub fn is_valid(&self, today: NaiveDate) -> bool {
        self.status == SubscriptionStatus::Active && self.end > today && self.plan != PlanKey::Trial
    }

    /// Reads the subscription an invoice-receipt documents. Payment receipts
    /// and unknown plans give `None`.
    pub fn from_receipt(receipt: &Receipt) -> Option<Self> {
        match &receipt.details {
            ReceiptDetails::Subscription { plan, start, end, .. } => Some(Subscription {
                number: receipt.number.clone(),
                plan: plan.parse().ok()?,
                status: match receipt.status.trim().to_lowercase().as_str() {
                    "paid" | "active" => SubscriptionStatus::Active,
                    _ => SubscriptionStatus::Cancelled,
                },
                method: receipt.method.clone(),
                start: *start,
                end: *end,
            }),
            ReceiptDetails::Payment { .. } => None,
        }
    }

    /// The invoice-receipt for this period, amount and price from the plan.
    pub fn receipt(&self, issuer: Party, recipient: Party) -> Receipt {
        let plan = plan(self.plan);
        Receipt {
            number: self.number.clone(),
            issuer,
            recipient,
            date: self.start,
            method: self.method.clone(),
            status: "Paid".into(),
            amount: plan.amount(),
            currency: Currency::new("MZN"),
            notes: String::new(),
            details: ReceiptDetails::Subscription {
                plan: plan.name_en.into(),
                price: plan.price.into(),
                start: self.start,
                end: self.end,
            },
        }
    }

    pub fn notice(&self) -> String {
        let plan = plan(self.plan);
        format!(
            "Payment of {} for {} plan has been received via {}. Your subscription is now active.",
            plan.price, plan.name_en, self.method
        )
    }
}

/// Starts a one month subscription to a paid plan.
pub fn subscribe(
    key: PlanKey,
    method: PaymentMethod,
    start: NaiveDate,
    number: &SequenceNumber,
) -> Result<Subscription> {
    if key == PlanKey::Trial {
        bail!("The trial plan cannot be bought");
    }
    let end = start
        .checked_add_months(Months::new(1))
        .with_context(|| format!("No date one month after {}", start))?;
    debug!("Subscribing to {} from {} to {}", key, start, end);
    Ok(Subscription {
        number: number.to_string(),
        plan: key,
        status: SubscriptionStatus::Active,
        method: method.label().into(),
        start,
        end,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialStatus {
    /// Plan badge: the latest subscription's plan, `Trial` without one.
    pub plan: String,
    pub subscribed: bool,
    pub days_remaining: i64,
    pub invoices_remaining: usize,
    /// Share of the trial period used, 0 to 100.
    pub progress: f64,
    pub restricted: bool,
    pub warning: bool,
}

/// Where an account stands on `today`. The latest subscription (by end date)
/// decides the plan, a valid one lifts every restriction.
pub fn trial_status(
    started: NaiveDate,
    today: NaiveDate,
    invoice_count: usize,
    subscriptions: &[Subscription],
) -> TrialStatus {
    let latest = subscriptions.iter().max_by_key(|subscription| subscription.end);
    let plan = latest
        .map(|subscription| subscription.plan.to_string())
        .unwrap_or_else(|| PlanKey::Trial.to_string());
    if latest.is_some_and(|subscription| subscription.is_valid(today)) {
        return TrialStatus {
            plan,
            subscribed: true,
            days_remaining: 0,
            invoices_remaining: 0,
            progress: 0.0,
            restricted: false,
            warning: false,
        };
    }

    let elapsed = (today - started).num_days().max(0);
    let days_remaining = (TRIAL_DAYS - elapsed).max(0);
    let invoices_remaining = TRIAL_INVOICES.saturating_sub(invoice_count);
    let progress = (elapsed as f64 / TRIAL_DAYS as f64 * 100.0).clamp(0.0, 100.0);
    TrialStatus {
        plan,
        subscribed: false,
        days_remaining,
        invoices_remaining,
        progress,
        restricted: days_remaining == 0 || invoices_remaining == 0,
        warning: days_remaining <= 3 || invoices_remaining <= 1,
    }
}
