//! Money Value Object
//!
//! Amounts are South African rand held as integer cents. Gateways speak
//! decimal rands (`"99.00"`), so both directions live here.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cents(pub i64);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid rand amount: {0:?}")]
pub struct InvalidAmount(pub String);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i64 {
        self.0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Parse a decimal rand amount such as `"99"`, `"99.5"` or `"1,299.00"`.
    pub fn parse_rands(raw: &str) -> Result<Self, InvalidAmount> {
        let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
        let invalid = || InvalidAmount(raw.to_string());

        let (negative, digits) = match cleaned.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, cleaned.as_str()),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));

        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if fraction.len() > 2 || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let fraction: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };

        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(fraction))
            .ok_or_else(invalid)?;
        Ok(Self(if negative { -cents } else { cents }))
    }

    /// Decimal rands with two places, as the gateways expect.
    pub fn to_rands(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.to_rands())
    }
}

impl std::ops::Add for Cents {
    type Output = Cents;

    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0 + rhs.0)
    }
}

impl std::iter::Sum for Cents {
    fn sum<I: Iterator<Item = Cents>>(iter: I) -> Cents {
        iter.fold(Cents::ZERO, |acc, c| acc + c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gateway_amounts() {
        assert_eq!(Cents::parse_rands("99.00"), Ok(Cents(9900)));
        assert_eq!(Cents::parse_rands("999"), Ok(Cents(99900)));
        assert_eq!(Cents::parse_rands("12.5"), Ok(Cents(1250)));
        assert_eq!(Cents::parse_rands("1,299.99"), Ok(Cents(129999)));
        assert_eq!(Cents::parse_rands("-5.00"), Ok(Cents(-500)));
    }

    #[test]
    fn rejects_garbage() {
        assert!(Cents::parse_rands("").is_err());
        assert!(Cents::parse_rands("R99").is_err());
        assert!(Cents::parse_rands("9.999").is_err());
        assert!(Cents::parse_rands(".50").is_err());
    }

    #[test]
    fn formats_rands() {
        assert_eq!(Cents(9900).to_rands(), "99.00");
        assert_eq!(Cents(5).to_rands(), "0.05");
        assert_eq!(Cents(99900).to_string(), "R999.00");
    }
}
