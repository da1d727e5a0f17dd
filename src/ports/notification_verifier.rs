//! Notification verifier port.
//!
//! Verifies an inbound push message's authenticity and decodes it into
//! canonical form. Verification fails closed: an unverifiable message
//! causes no state change, no dedup entry, and no acknowledgment, so the
//! provider retries a message that may merely have been corrupted in
//! transit. A message that verifies but cannot be decoded is the
//! opposite case: retrying will never help, so it is surfaced separately
//! and acknowledged.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::reconciliation::Notification;

/// Port for authenticating and decoding inbound push notifications.
#[async_trait]
pub trait NotificationVerifier: Send + Sync {
    /// Verifies a raw payload against its signature header, then decodes
    /// it. Only an authentic, timely, well-formed message comes back as
    /// `Ok`.
    async fn verify_and_parse(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<Notification, NotificationRejection>;
}

/// Why a notification was rejected before reaching the store.
#[derive(Debug, Error)]
pub enum NotificationRejection {
    /// Authenticity could not be established. Not acknowledged; the
    /// provider retries.
    #[error("verification failed: {0}")]
    Unverified(#[from] VerificationError),

    /// Authentic but undecodable. Acknowledged after logging; a retry
    /// would carry the same bytes.
    #[error("verified payload is unparsable: {0}")]
    Unparsable(String),
}

/// Why a signature check failed.
#[derive(Debug, Clone, Error)]
pub enum VerificationError {
    #[error("malformed signature header: {0}")]
    MalformedHeader(String),

    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("message timestamp too old ({age_secs} seconds)")]
    Expired { age_secs: i64 },

    #[error("message timestamp in the future")]
    FutureTimestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_verifier_is_object_safe() {
        fn _accepts_dyn(_verifier: &dyn NotificationVerifier) {}
    }

    #[test]
    fn errors_render_a_reason() {
        let err = VerificationError::Expired { age_secs: 600 };
        assert!(err.to_string().contains("600"));

        let rejection: NotificationRejection = err.into();
        assert!(matches!(rejection, NotificationRejection::Unverified(_)));
    }
}
