use anyhow::{Context, Error, Result, bail};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use tracing::{debug, warn};

pub const RECEIPT_PREFIX: &str = "REC";
pub const SUBSCRIPTION_PREFIX: &str = "SUB";

/// A year scoped document number, `REC-2024-0010`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceNumber {
    pub prefix: String,
    pub year: i32,
    pub sequence: u32,
}

impl SequenceNumber {
    pub fn new(prefix: &str, year: i32, sequence: u32) -> Self {
        SequenceNumber {
            prefix: prefix.to_owned(),
            year,
            sequence,
        }
    }

    /// `PREFIX-YYYY-`, what every number of that prefix and year starts with.
    pub fn scope(prefix: &str, year: i32) -> String {
        format!("{}-{}-", prefix, year)
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{:04}", self.prefix, self.year, self.sequence)
    }
}

impl FromStr for SequenceNumber {
    type Err = Error;

    /// The prefix may itself contain dashes, the year and sequence are the
    /// last two parts.
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().rsplitn(3, '-');
        let sequence = parts
            .next()
            .context(format!("No sequence in '{}'", s))?
            .parse()
            .with_context(|| format!("Bad sequence in '{}'", s))?;
        let year = parts
            .next()
            .context(format!("No year in '{}'", s))?
            .parse()
            .with_context(|| format!("Bad year in '{}'", s))?;
        let prefix = parts.next().context(format!("No prefix in '{}'", s))?;
        if prefix.is_empty() {
            bail!("Empty prefix in '{}'", s)
        }
        Ok(SequenceNumber::new(prefix, year, sequence))
    }
}

/// Next number for `prefix` in `year`: one past the largest existing
/// sequence, starting at 1. Numbers of other prefixes or years, anything
/// unparsable, and a sequence with no successor are ignored.
pub fn next_number<I, S>(prefix: &str, year: i32, existing: I) -> SequenceNumber
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let last = existing
        .into_iter()
        .filter_map(|number| number.as_ref().parse::<SequenceNumber>().ok())
        .filter(|number| number.prefix == prefix && number.year == year)
        .filter(|number| {
            let exhausted = number.sequence == u32::MAX;
            if exhausted {
                warn!("Ignoring {}, it has no next number", number);
            }
            !exhausted
        })
        .map(|number| number.sequence)
        .max()
        .unwrap_or(0);
    SequenceNumber::new(prefix, year, last.saturating_add(1))
}

/// Storage that can answer "largest existing number starting with
/// `PREFIX-YYYY-`".
pub trait NumberSource {
    fn largest_number(
        &self,
        prefix: &str,
        year: i32,
    ) -> impl Future<Output = Result<Option<String>>>;
}

impl NumberSource for [String] {
    async fn largest_number(&self, prefix: &str, year: i32) -> Result<Option<String>> {
        let next = next_number(prefix, year, self);
        Ok((next.sequence > 1).then(|| {
            SequenceNumber::new(prefix, year, next.sequence - 1).to_string()
        }))
    }
}

impl NumberSource for Vec<String> {
    async fn largest_number(&self, prefix: &str, year: i32) -> Result<Option<String>> {
        self.as_slice().largest_number(prefix, year).await
    }
}

/// Next number from storage. A failed or unusable lookup starts the year at 1
/// rather than blocking the document.
pub async fn next_number_from<S>(source: &S, prefix: &str, year: i32) -> SequenceNumber
where
    S: NumberSource + ?Sized,
{
    let largest = match source.largest_number(prefix, year).await {
        Ok(largest) => largest,
        Err(err) => {
            warn!("Number lookup for {} failed, starting at 1: {:#}", SequenceNumber::scope(prefix, year), err);
            None
        }
    };
    let next = next_number(prefix, year, largest);
    debug!("Next number {}", next);
    next
}
