//! Amount type for handling monetary values with optional currency symbols.
//!
//! Cost cells come back from the sheet formatted for display (`$1,234.56`),
//! while the LLM hands us plain numbers. `Amount` wraps `Decimal` and parses
//! both shapes.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A monetary amount.
///
/// Wraps `Decimal` so that tolerance arithmetic during duplicate detection is
/// exact. Parsing accepts a leading `$` and thousands separators.
///
/// ```
/// # use spendsheet::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("$1,234.56").unwrap();
/// assert_eq!(amount.to_string(), "$1,234.56");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    /// Creates a new Amount from a Decimal value.
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Parses a sheet cell into an Amount, defaulting to zero on anything
    /// unparseable. The transaction reader must tolerate hand-edited cells,
    /// so this never fails.
    pub fn parse_lenient(s: &str) -> Self {
        Amount::from_str(s).unwrap_or_default()
    }

    /// Creates an Amount from an `f64`, e.g. a JSON number from the LLM.
    /// Non-finite values become zero.
    pub fn from_f64_lossy(value: f64) -> Self {
        Decimal::from_f64(value).map(Amount::new).unwrap_or_default()
    }

    /// The plain numeric string written to the sheet (`1234.56`, no symbol or
    /// separators) so that user-entered value interpretation types the cell
    /// as a number and the column's currency format applies.
    pub fn to_sheet_value(&self) -> String {
        self.0.round_dp(2).to_string()
    }

    /// `|self - other| <= max(self * ratio, floor)`: the duplicate-detection
    /// tolerance comparison.
    pub fn within_tolerance_of(&self, other: Amount, ratio: Decimal, floor: Decimal) -> bool {
        let allowed = (self.0 * ratio).max(floor);
        (self.0 - other.0).abs() <= allowed
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Amount::default());
        }

        // Strip a currency symbol, which may follow a minus sign.
        let without_dollar = if let Some(after_minus) = trimmed.strip_prefix('-') {
            if let Some(after_dollar) = after_minus.strip_prefix('$') {
                format!("-{after_dollar}")
            } else {
                trimmed.to_string()
            }
        } else if let Some(after_dollar) = trimmed.strip_prefix('$') {
            after_dollar.to_string()
        } else {
            trimmed.to_string()
        };

        // Strip thousands separators.
        let without_commas = without_dollar.replace(',', "");
        Ok(Amount(Decimal::from_str(&without_commas)?))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (sign, num) = if self.0.is_sign_negative() && !self.0.is_zero() {
            ("-", self.0.abs())
        } else {
            ("", self.0)
        };
        write!(
            f,
            "{sign}${}",
            format_num::format_num!(",.2", num.to_f64().unwrap_or_default())
        )
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Serialize as a plain number so API consumers get a numeric cost.
        serializer.serialize_f64(self.0.to_f64().unwrap_or_default())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::Number(n) => {
                Ok(Amount::from_f64_lossy(n.as_f64().unwrap_or_default()))
            }
            serde_json::Value::String(s) => {
                Amount::from_str(&s).map_err(serde::de::Error::custom)
            }
            other => Err(serde::de::Error::custom(format!(
                "expected a number or string for an amount, got {other}"
            ))),
        }
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_with_dollar_sign() {
        let amount = Amount::from_str("$50.00").unwrap();
        assert_eq!(amount.value(), dec("50.00"));
    }

    #[test]
    fn test_parse_without_dollar_sign() {
        let amount = Amount::from_str("50.00").unwrap();
        assert_eq!(amount.value(), dec("50.00"));
    }

    #[test]
    fn test_parse_negative_with_dollar_sign() {
        let amount = Amount::from_str("-$50.00").unwrap();
        assert_eq!(amount.value(), dec("-50.00"));
    }

    #[test]
    fn test_parse_with_commas() {
        let amount = Amount::from_str("$1,234.56").unwrap();
        assert_eq!(amount.value(), dec("1234.56"));
    }

    #[test]
    fn test_parse_multiple_commas() {
        let amount = Amount::from_str("$1,234,567.89").unwrap();
        assert_eq!(amount.value(), dec("1234567.89"));
    }

    #[test]
    fn test_parse_empty_string_is_zero() {
        let amount = Amount::from_str("").unwrap();
        assert!(amount.is_zero());
    }

    #[test]
    fn test_parse_lenient_garbage_is_zero() {
        assert!(Amount::parse_lenient("n/a").is_zero());
        assert!(Amount::parse_lenient("$").is_zero());
    }

    #[test]
    fn test_parse_lenient_currency_string() {
        let amount = Amount::parse_lenient("$1,234.56");
        assert_eq!(amount.value(), dec("1234.56"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Amount::new(dec("1234.5")).to_string(), "$1,234.50");
        assert_eq!(Amount::new(dec("-50")).to_string(), "-$50.00");
        assert_eq!(Amount::new(Decimal::ZERO).to_string(), "$0.00");
    }

    #[test]
    fn test_sheet_value_is_plain() {
        let amount = Amount::from_str("$1,234.56").unwrap();
        assert_eq!(amount.to_sheet_value(), "1234.56");
    }

    #[test]
    fn test_deserialize_number() {
        let amount: Amount = serde_json::from_str("12.5").unwrap();
        assert_eq!(amount.value(), dec("12.5"));
    }

    #[test]
    fn test_deserialize_string() {
        let amount: Amount = serde_json::from_str("\"$12.50\"").unwrap();
        assert_eq!(amount.value(), dec("12.50"));
    }

    #[test]
    fn test_serialize_number() {
        let json = serde_json::to_string(&Amount::new(dec("12.5"))).unwrap();
        assert_eq!(json, "12.5");
    }

    #[test]
    fn test_tolerance_ratio_side() {
        let existing = Amount::new(dec("100.00"));
        let five_pct = Decimal::new(5, 2);
        let floor = Decimal::ONE;
        assert!(Amount::new(dec("105.00")).within_tolerance_of(existing, five_pct, floor));
        assert!(!Amount::new(dec("106.00")).within_tolerance_of(existing, five_pct, floor));
    }

    #[test]
    fn test_tolerance_floor_side() {
        let existing = Amount::new(dec("10.00"));
        let five_pct = Decimal::new(5, 2);
        let floor = Decimal::ONE;
        assert!(Amount::new(dec("10.99")).within_tolerance_of(existing, five_pct, floor));
        assert!(!Amount::new(dec("11.01")).within_tolerance_of(existing, five_pct, floor));
    }
}
