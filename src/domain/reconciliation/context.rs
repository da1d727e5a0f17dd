//! The API variant gate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Which provider protocol an order's reference was created under.
///
/// Resolved once from the merchant account at reference creation and
/// persisted with the order; a merchant migrating afterwards does not
/// change the variant of references that already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiVariant {
    /// Form-encoded wire format of the pre-migration API.
    Legacy,
    /// JSON wire format of the current API.
    Current,
}

impl ApiVariant {
    /// The rendering persisted in order metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVariant::Legacy => "legacy",
            ApiVariant::Current => "current",
        }
    }
}

impl fmt::Display for ApiVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ApiVariant {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy" => Ok(ApiVariant::Legacy),
            "current" => Ok(ApiVariant::Current),
            other => Err(ValidationError::invalid_format(
                "api_variant",
                format!("unknown variant '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_roundtrips_through_metadata_rendering() {
        for v in [ApiVariant::Legacy, ApiVariant::Current] {
            assert_eq!(v.as_str().parse::<ApiVariant>().unwrap(), v);
        }
    }

    #[test]
    fn unknown_variant_is_rejected() {
        assert!("v3".parse::<ApiVariant>().is_err());
    }
}
