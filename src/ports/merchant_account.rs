//! Merchant account port for the onboarding/credential store.
//!
//! Owned by the merchant-onboarding subsystem; the reconciliation engine
//! reads two things from it: current API credentials and the migration
//! flag. The flag is consulted exactly once per order, at reference
//! creation.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::domain::foundation::DomainError;

/// Port for merchant account data.
#[async_trait]
pub trait MerchantAccountStore: Send + Sync {
    /// Current API credentials for outbound provider calls.
    async fn credentials(&self) -> Result<MerchantCredentials, DomainError>;

    /// Whether the merchant account has migrated to the current provider
    /// API. Orders record the answer at reference creation and never ask
    /// again.
    async fn using_current_api(&self) -> Result<bool, DomainError>;
}

/// Provider credentials for one merchant account.
#[derive(Clone)]
pub struct MerchantCredentials {
    pub merchant_id: String,
    pub access_key: SecretString,
    /// Shared secret for verifying inbound notification signatures.
    pub notification_secret: SecretString,
}

impl std::fmt::Debug for MerchantCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MerchantCredentials")
            .field("merchant_id", &self.merchant_id)
            .field("access_key", &"[REDACTED]")
            .field("notification_secret", &"[REDACTED]")
            .finish()
    }
}
