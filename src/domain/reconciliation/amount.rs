//! Monetary amount value object.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::ValidationError;

/// A monetary amount in minor units with its ISO 4217 currency code.
///
/// Minor units assume a two-decimal currency; the legacy wire format
/// carries decimal strings and the conversion lives here so no caller
/// does its own division.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    minor: i64,
    currency: String,
}

impl Amount {
    /// Creates an amount, rejecting non-positive values and malformed
    /// currency codes.
    pub fn new(minor: i64, currency: impl Into<String>) -> Result<Self, ValidationError> {
        if minor <= 0 {
            return Err(ValidationError::NonPositiveAmount { actual: minor });
        }
        let currency = currency.into().to_ascii_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::invalid_format(
                "currency",
                "expected ISO 4217 code",
            ));
        }
        Ok(Self { minor, currency })
    }

    /// Returns the amount in minor units.
    pub fn minor(&self) -> i64 {
        self.minor
    }

    /// Returns the currency code.
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Renders the decimal string used by the legacy wire format.
    pub fn to_decimal_string(&self) -> String {
        format!("{}.{:02}", self.minor / 100, self.minor % 100)
    }

    /// Parses a legacy decimal string back into minor units.
    pub fn from_decimal_str(value: &str, currency: &str) -> Result<Self, ValidationError> {
        let minor = match value.split_once('.') {
            Some((whole, frac)) => {
                if frac.len() > 2 || frac.is_empty() {
                    return Err(ValidationError::invalid_format(
                        "amount",
                        format!("unexpected fraction in '{}'", value),
                    ));
                }
                let whole: i64 = whole.parse().map_err(|_| {
                    ValidationError::invalid_format("amount", format!("not a number: '{}'", value))
                })?;
                let frac: i64 = frac.parse().map_err(|_| {
                    ValidationError::invalid_format("amount", format!("not a number: '{}'", value))
                })?;
                let frac = if value.split_once('.').map(|(_, f)| f.len()) == Some(1) {
                    frac * 10
                } else {
                    frac
                };
                whole * 100 + frac
            }
            None => {
                let whole: i64 = value.parse().map_err(|_| {
                    ValidationError::invalid_format("amount", format!("not a number: '{}'", value))
                })?;
                whole * 100
            }
        };
        Self::new(minor, currency)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.to_decimal_string(), self.currency)
    }
}
