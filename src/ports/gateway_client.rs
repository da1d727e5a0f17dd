//! Gateway client port for the provider API.
//!
//! One contract, two wire implementations (legacy and current) selected
//! by the Migration Gate. Every mutating call carries an idempotency
//! token so a retry after a timeout has at most one effect on the
//! provider side.

use async_trait::async_trait;
use std::fmt;
use uuid::Uuid;

use crate::domain::foundation::{
    AuthorizationId, CaptureId, OrderId, ReferenceId, RefundId, Timestamp,
};
use crate::domain::reconciliation::{
    Amount, ApiVariant, AuthorizationState, CaptureState, ReferenceState, RefundState,
};

/// Port for provider API calls.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Establishes a provider session for a checkout attempt.
    async fn create_reference(
        &self,
        cart: &CartContext,
    ) -> Result<ReferenceCreated, GatewayError>;

    /// Places a hold of funds against an open reference.
    async fn authorize(
        &self,
        reference_id: &ReferenceId,
        amount: &Amount,
        token: &IdempotencyToken,
    ) -> Result<AuthorizationOutcome, GatewayError>;

    /// Transfers previously authorized funds.
    async fn capture(
        &self,
        authorization_id: &AuthorizationId,
        amount: &Amount,
        token: &IdempotencyToken,
    ) -> Result<CaptureOutcome, GatewayError>;

    /// Reverses a captured amount, in part or in full.
    async fn refund(
        &self,
        capture_id: &CaptureId,
        amount: &Amount,
        token: &IdempotencyToken,
    ) -> Result<RefundOutcome, GatewayError>;

    /// Fetches the provider's current view of a reference.
    async fn get_reference_details(
        &self,
        reference_id: &ReferenceId,
    ) -> Result<ReferenceDetails, GatewayError>;
}

/// Hands out the client for an order's recorded API variant.
///
/// Both variants are constructed at startup; per order the variant never
/// changes after reference creation, so the returned client is stable for
/// that order's remaining lifecycle.
pub trait GatewayClientFactory: Send + Sync {
    fn client_for(&self, variant: ApiVariant) -> std::sync::Arc<dyn GatewayClient>;
}

/// Checkout fields forwarded to `create_reference`.
#[derive(Debug, Clone)]
pub struct CartContext {
    pub order_id: OrderId,
    pub total: Amount,
    pub customer_email: Option<String>,
    /// Free-text note shown in the provider's seller console. Redacted in
    /// every log line.
    pub seller_note: Option<String>,
}

/// Caller-generated value ensuring a retried mutating call has at most
/// one effect.
///
/// Derived deterministically from (order, operation, attempt nonce): the
/// same attempt retried after a timeout sends the same token, while a
/// deliberate second attempt mints a new nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyToken(String);

impl IdempotencyToken {
    pub fn derive(order_id: OrderId, operation: &str, attempt_nonce: Uuid) -> Self {
        Self(format!("{}:{}:{}", order_id, operation, attempt_nonce.simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of `create_reference`.
#[derive(Debug, Clone)]
pub struct ReferenceCreated {
    pub reference_id: ReferenceId,
    pub state: ReferenceState,
    pub observed_at: Timestamp,
}

/// Result of `authorize`.
#[derive(Debug, Clone)]
pub struct AuthorizationOutcome {
    pub authorization_id: AuthorizationId,
    pub state: AuthorizationState,
    pub amount: Amount,
    pub observed_at: Timestamp,
}

/// Result of `capture`.
#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub capture_id: CaptureId,
    pub state: CaptureState,
    pub amount: Amount,
    pub observed_at: Timestamp,
}

/// Result of `refund`.
#[derive(Debug, Clone)]
pub struct RefundOutcome {
    pub refund_id: RefundId,
    pub state: RefundState,
    pub amount: Amount,
    pub observed_at: Timestamp,
}

/// The provider's current view of a reference and its children, returned
/// by `get_reference_details` and applied through the store like any
/// other report.
#[derive(Debug, Clone)]
pub struct ReferenceDetails {
    pub reference_id: ReferenceId,
    pub reference_state: ReferenceState,
    pub authorization: Option<(AuthorizationId, AuthorizationState)>,
    pub capture: Option<(CaptureId, CaptureState)>,
    pub refunds: Vec<(RefundId, RefundState)>,
    pub observed_at: Timestamp,
}

/// Errors from provider API calls.
#[derive(Debug, Clone)]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,

    /// Provider's own error code, when the response carried one.
    pub provider_code: Option<String>,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            provider_code: None,
        }
    }

    /// Network failure, timeout, or provider 5xx. Retryable with the same
    /// idempotency token.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Transient, message)
    }

    /// Business rejection. Terminal; never retried.
    pub fn declined(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Declined, message)
    }

    /// Malformed request; a bug on our side. Never retried.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Invalid, message)
    }

    /// Credential fault, surfaced to the merchant. Not retried
    /// automatically.
    pub fn auth_expired(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::AuthExpired, message)
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Checks if the caller may retry with the same idempotency token.
    pub fn is_retryable(&self) -> bool {
        self.kind == GatewayErrorKind::Transient
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for GatewayError {}

/// Failure taxonomy for provider calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    Transient,
    Declined,
    Invalid,
    AuthExpired,
}

impl fmt::Display for GatewayErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GatewayErrorKind::Transient => "transient",
            GatewayErrorKind::Declined => "declined",
            GatewayErrorKind::Invalid => "invalid",
            GatewayErrorKind::AuthExpired => "auth_expired",
        };
        write!(f, "{}", s)
    }
}
