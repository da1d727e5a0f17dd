//! In-memory merchant account store.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::domain::foundation::DomainError;
use crate::ports::{MerchantAccountStore, MerchantCredentials};

/// Fixed merchant account for tests and local development.
pub struct StaticMerchantAccount {
    credentials: MerchantCredentials,
    current_api: bool,
}

impl StaticMerchantAccount {
    pub fn new(credentials: MerchantCredentials, current_api: bool) -> Self {
        Self { credentials, current_api }
    }

    /// A migrated test merchant with throwaway credentials.
    pub fn migrated() -> Self {
        Self::new(test_credentials(), true)
    }

    /// A not-yet-migrated test merchant with throwaway credentials.
    pub fn legacy() -> Self {
        Self::new(test_credentials(), false)
    }
}

fn test_credentials() -> MerchantCredentials {
    MerchantCredentials {
        merchant_id: "M-TEST".to_string(),
        access_key: SecretString::new("test-access-key".to_string()),
        notification_secret: SecretString::new("test-notification-secret".to_string()),
    }
}

#[async_trait]
impl MerchantAccountStore for StaticMerchantAccount {
    async fn credentials(&self) -> Result<MerchantCredentials, DomainError> {
        Ok(self.credentials.clone())
    }

    async fn using_current_api(&self) -> Result<bool, DomainError> {
        Ok(self.current_api)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_migration_flag() {
        assert!(StaticMerchantAccount::migrated().using_current_api().await.unwrap());
        assert!(!StaticMerchantAccount::legacy().using_current_api().await.unwrap());
    }
}
