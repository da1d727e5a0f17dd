//! Gateway configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Payment gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the provider API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Merchant account identifier.
    #[serde(default)]
    pub merchant_id: String,

    /// API access key.
    #[serde(default)]
    pub access_key: String,

    /// Shared secret for notification signature verification.
    #[serde(default)]
    pub notification_secret: String,

    /// Transport timeout for provider calls, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Whether this merchant account has migrated to the current
    /// provider API. Read once per order at reference creation.
    #[serde(default = "default_use_current_api")]
    pub use_current_api: bool,
}

impl GatewayConfig {
    /// Transport timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check if pointed at the provider's sandbox.
    pub fn is_sandbox(&self) -> bool {
        self.api_base_url.contains("sandbox")
    }

    /// Validate gateway configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.merchant_id.is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY__MERCHANT_ID"));
        }
        if self.access_key.is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY__ACCESS_KEY"));
        }
        if self.notification_secret.is_empty() {
            return Err(ValidationError::MissingRequired(
                "GATEWAY__NOTIFICATION_SECRET",
            ));
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(ValidationError::InvalidGatewayUrl);
        }
        if self.timeout_secs == 0 || self.timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            merchant_id: String::new(),
            access_key: String::new(),
            notification_secret: String::new(),
            timeout_secs: default_timeout_secs(),
            use_current_api: default_use_current_api(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://pay-api.example.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_use_current_api() -> bool {
    true
}
