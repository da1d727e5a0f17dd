//! HMAC-SHA256 notification verification.
//!
//! The provider signs every push message with the merchant's shared
//! notification secret. Verification fails closed: a message that cannot
//! be authenticated causes no state change and is not acknowledged.
//!
//! # Security
//!
//! - Constant-time signature comparison
//! - Timestamp window validation for replay protection

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::reconciliation::Notification;
use crate::ports::{NotificationRejection, NotificationVerifier, VerificationError};

use super::parser;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age for notification signatures (15 minutes). Provider
/// redelivery re-signs with a fresh timestamp, so a generous window does
/// not fight the retry behavior.
const MAX_TIMESTAMP_AGE_SECS: i64 = 900;

/// Clock skew tolerance for future timestamps (60 seconds).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

/// Parsed components of the signature header `t=<unix>,v1=<hex>`.
#[derive(Debug, Clone)]
struct SignatureHeader {
    timestamp: i64,
    signature: Vec<u8>,
}

impl SignatureHeader {
    fn parse(header: &str) -> Result<Self, VerificationError> {
        if header.is_empty() {
            return Err(VerificationError::MalformedHeader("empty header".into()));
        }

        let mut timestamp: Option<i64> = None;
        let mut signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                return Err(VerificationError::MalformedHeader(format!(
                    "component without '=': '{}'",
                    part
                )));
            };
            match key.trim() {
                "t" => {
                    timestamp = Some(value.trim().parse().map_err(|_| {
                        VerificationError::MalformedHeader("non-numeric timestamp".into())
                    })?);
                }
                "v1" => {
                    signature = Some(hex_decode(value.trim()).ok_or_else(|| {
                        VerificationError::MalformedHeader("signature is not hex".into())
                    })?);
                }
                // Unknown components are ignored for forward compatibility.
                _ => {}
            }
        }

        Ok(Self {
            timestamp: timestamp
                .ok_or_else(|| VerificationError::MalformedHeader("missing t=".into()))?,
            signature: signature
                .ok_or_else(|| VerificationError::MalformedHeader("missing v1=".into()))?,
        })
    }
}

/// Verifies notification signatures with the merchant's shared secret.
pub struct HmacNotificationVerifier {
    secret: SecretString,
}

impl HmacNotificationVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    fn check(&self, payload: &[u8], header: &SignatureHeader) -> Result<(), VerificationError> {
        let now = chrono::Utc::now().timestamp();
        let age = now - header.timestamp;

        if age > MAX_TIMESTAMP_AGE_SECS {
            tracing::warn!(
                signature_timestamp = header.timestamp,
                age_secs = age,
                "Notification signature too old"
            );
            return Err(VerificationError::Expired { age_secs: age });
        }
        if age < -MAX_FUTURE_TOLERANCE_SECS {
            tracing::warn!(
                signature_timestamp = header.timestamp,
                "Notification signature from the future"
            );
            return Err(VerificationError::FutureTimestamp);
        }

        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(header.timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        if expected.as_slice().ct_eq(&header.signature).unwrap_u8() != 1 {
            tracing::warn!("Notification signature mismatch");
            return Err(VerificationError::SignatureMismatch);
        }

        Ok(())
    }
}

impl HmacNotificationVerifier {
    /// Signature check alone, used by tests and the port implementation.
    fn verify(&self, payload: &[u8], signature: &str) -> Result<(), VerificationError> {
        let header = SignatureHeader::parse(signature)?;
        self.check(payload, &header)
    }
}

#[async_trait]
impl NotificationVerifier for HmacNotificationVerifier {
    async fn verify_and_parse(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<Notification, NotificationRejection> {
        self.verify(payload, signature)?;
        parser::parse(payload).map_err(|e| NotificationRejection::Unparsable(e.to_string()))
    }
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if !s.is_ascii() || s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

/// Encodes bytes as lowercase hex, used by tests to build signatures.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
