use anyhow::{Context, Error, Result};
use num_traits::Zero;
use rust_decimal::RoundingStrategy;
use rust_decimal::prelude::*;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::TryFrom;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};

/// Holds a full precision Decimal. Nothing is rounded until it is displayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(pub Decimal);

impl Money {
    /// Rounded to cents, midpoint away from zero.
    pub fn rounded(&self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Rounded and scaled out to exactly 2 dp, with negative zero folded into zero.
    pub fn cents(&self) -> Decimal {
        let mut d = self.rounded().0;
        if d.is_zero() {
            return Decimal::new(0, 2);
        }
        d.rescale(2);
        d
    }

    pub fn to_row_string(&self, pad: usize) -> String {
        format!("{:>pad$}", self.to_string())
    }
}

impl TryFrom<f64> for Money {
    type Error = Error;

    fn try_from(f: f64) -> Result<Self> {
        let d = Decimal::from_f64(f).context(format!("Failed to convert {} to Money", f))?;
        Ok(Self(d))
    }
}

impl FromStr for Money {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let d = Decimal::from_str(s.trim())
            .or_else(|_| Decimal::from_scientific(s.trim()))
            .with_context(|| format!("Failed to parse '{}' as Money", s))?;
        Ok(Self(d))
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cents())
    }
}

impl Zero for Money {
    fn zero() -> Self {
        Self(Decimal::zero())
    }

    fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl<'a, 'b> Add<&'b Money> for &'a Money {
    type Output = Money;

    fn add(self, other: &Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl Add<Money> for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl Sub<Money> for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Money {
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 += other.0
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), Add::add)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Amount::deserialize(deserializer).map(|amount| Money(amount.0))
    }
}

/// A numeric field from a form or a stored record. Anything that is not a
/// number reads as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Amount(pub Decimal);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Int(i64),
    Float(f64),
    Text(String),
    Other(IgnoredAny),
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = match RawAmount::deserialize(deserializer)? {
            RawAmount::Int(i) => Decimal::from(i),
            RawAmount::Float(f) => parse_amount(&f.to_string()),
            RawAmount::Text(text) => parse_amount(&text),
            RawAmount::Other(_) => Decimal::zero(),
        };
        Ok(Amount(amount))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Decimal {
        amount.0
    }
}

/// Lenient numeric parse used for every user entered amount.
///
/// Whitespace is dropped and the last comma is taken as the decimal point
/// ("1 234,5" is 1234.5). With a decimal comma, dots before it are grouping
/// ("1.234,56" is 1234.56). A comma followed by a dot is grouping ("1,234.5").
/// Anything unparsable is zero.
pub fn parse_amount(text: &str) -> Decimal {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let normalized = match compact.rfind(',') {
        Some(idx) => {
            let (int, frac) = compact.split_at(idx);
            let frac = &frac[1..];
            if frac.contains('.') {
                // "1,234.56": the comma was grouping
                compact.replace(',', "")
            } else {
                format!("{}.{}", int.replace([',', '.'], ""), frac)
            }
        }
        None => compact,
    };
    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .unwrap_or_default()
}

enum Layout {
    /// 1 160,00 MT
    Suffix,
    /// $1,160.00
    Prefix,
    /// R 1 160,00
    PrefixSpaced,
}

/// Document currency. Formats amounts the way the business locale prints them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Currency {
    code: String,
    symbol: Option<String>,
}

impl Currency {
    pub fn new(code: &str) -> Self {
        let code = code.trim().to_uppercase();
        Currency {
            code: if code.is_empty() { "MZN".into() } else { code },
            symbol: None,
        }
    }

    /// Overrides the printed symbol, e.g. a symbol stored with the business profile.
    pub fn with_symbol(mut self, symbol: &str) -> Self {
        let symbol = symbol.trim();
        self.symbol = (!symbol.is_empty()).then(|| normalize_symbol(symbol).to_owned());
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn symbol(&self) -> &str {
        if let Some(symbol) = &self.symbol {
            return symbol;
        }
        match self.code.as_str() {
            "MZN" => "MT",
            "USD" => "$",
            "EUR" => "€",
            "GBP" => "£",
            "ZAR" => "R",
            code => code,
        }
    }

    fn layout(&self) -> Layout {
        match self.code.as_str() {
            "USD" | "GBP" => Layout::Prefix,
            "ZAR" => Layout::PrefixSpaced,
            _ => Layout::Suffix,
        }
    }

    pub fn format(&self, amount: Money) -> String {
        let cents = amount.cents();
        let sign = if cents.is_sign_negative() { "-" } else { "" };
        let text = cents.abs().to_string();
        let (int, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));
        match self.layout() {
            Layout::Suffix => format!(
                "{}{},{} {}",
                sign,
                group_digits(int, ' '),
                frac,
                self.symbol()
            ),
            Layout::Prefix => format!(
                "{}{}{}.{}",
                sign,
                self.symbol(),
                group_digits(int, ','),
                frac
            ),
            Layout::PrefixSpaced => format!(
                "{}{} {},{}",
                sign,
                self.symbol(),
                group_digits(int, ' '),
                frac
            ),
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::new("MZN")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

/// Browsers print the metical as "MTn"; documents use "MT".
pub fn normalize_symbol(symbol: &str) -> &str {
    if symbol == "MTn" { "MT" } else { symbol }
}

fn group_digits(int: &str, sep: char) -> String {
    let digits: Vec<char> = int.chars().collect();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(*ch);
    }
    out
}

#[cfg(test)]
mod money_tests {
    use super::*;
    use std::convert::TryInto;

    #[test]
    fn money_display_rounds_to_cents() -> Result<()> {
        let m: Money = 1f64.try_into()?;
        assert_eq!(m.to_string(), "1.00");
        let m: Money = 1.1.try_into()?;
        assert_eq!(m.to_string(), "1.10");
        let m: Money = "1.115".parse()?;
        assert_eq!(m.to_string(), "1.12");
        let m: Money = "-1.115".parse()?;
        assert_eq!(m.to_string(), "-1.12");
        let m: Money = "-0.001".parse()?;
        assert_eq!(m.to_string(), "0.00");
        Ok(())
    }

    #[test]
    fn money_keeps_precision_until_display() -> Result<()> {
        let third: Money = "0.333".parse()?;
        let sum: Money = vec![third, third, third].into_iter().sum();
        assert_eq!(sum.0, "0.999".parse::<Decimal>()?);
        assert_eq!(sum.to_string(), "1.00");
        Ok(())
    }

    #[test]
    fn test_add() -> Result<()> {
        let add = Money::try_from(100.00)? + Money::try_from(100.00)?;
        assert_eq!(add.to_string(), "200.00");
        Ok(())
    }

    #[test]
    fn parse_amount_is_lenient() -> Result<()> {
        assert_eq!(parse_amount("1 234,50"), "1234.50".parse::<Decimal>()?);
        assert_eq!(parse_amount("1.234,56"), "1234.56".parse::<Decimal>()?);
        assert_eq!(parse_amount("1,234,567"), "1234.567".parse::<Decimal>()?);
        assert_eq!(parse_amount("1,234.5"), "1234.5".parse::<Decimal>()?);
        assert_eq!(parse_amount(" 16 "), Decimal::from(16));
        assert_eq!(parse_amount("abc"), Decimal::zero());
        assert_eq!(parse_amount(""), Decimal::zero());
        Ok(())
    }

    #[test]
    fn amount_deserializes_anything() -> Result<()> {
        let amounts: Vec<Amount> = serde_yaml::from_str("[2, 0.16, '1,5', abc, ~, true]")?;
        let amounts: Vec<Decimal> = amounts.into_iter().map(Decimal::from).collect();
        assert_eq!(
            amounts,
            vec![
                Decimal::from(2),
                "0.16".parse()?,
                "1.5".parse()?,
                Decimal::zero(),
                Decimal::zero(),
                Decimal::zero(),
            ]
        );
        Ok(())
    }

    #[test]
    fn currency_formats() -> Result<()> {
        let amount: Money = "1160".parse()?;
        assert_eq!(Currency::new("MZN").format(amount), "1 160,00 MT");
        assert_eq!(Currency::new("usd").format(amount), "$1,160.00");
        assert_eq!(Currency::new("EUR").format(amount), "1 160,00 €");
        assert_eq!(Currency::new("ZAR").format(amount), "R 1 160,00");
        assert_eq!(Currency::new("AOA").format(amount), "1 160,00 AOA");
        assert_eq!(Currency::new("").code(), "MZN");

        let negative: Money = "-10".parse()?;
        assert_eq!(Currency::new("MZN").format(negative), "-10,00 MT");
        assert_eq!(Currency::new("USD").format(negative), "-$10.00");

        let big: Money = "1234567.891".parse()?;
        assert_eq!(Currency::default().format(big), "1 234 567,89 MT");
        Ok(())
    }

    #[test]
    fn currency_symbol_is_normalized() {
        let currency = Currency::new("MZN").with_symbol("MTn");
        assert_eq!(currency.symbol(), "MT");
        assert_eq!(Currency::new("MZN").with_symbol("  ").symbol(), "MT");
    }
}
