//! Error surfacing for synchronous reconciling operations.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{GatewayError, GatewayErrorKind};

/// Converts a lost reconciling task into an internal fault.
///
/// Only reachable if the detached call-and-apply task panicked or the
/// runtime is shutting down.
pub(crate) fn join_fault(err: tokio::task::JoinError) -> DomainError {
    DomainError::new(
        ErrorCode::InternalError,
        format!("reconciling task failed: {}", err),
    )
}

/// How a synchronous operation failed, sorted by who should hear about
/// it: `Retryable` goes back to the checkout flow to retry or queue,
/// `Declined` to the buyer, `Invalid` to the developer log, and
/// `Credentials` to the merchant's admin surface.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("retryable provider failure: {0}")]
    Retryable(GatewayError),

    #[error("payment declined: {0}")]
    Declined(GatewayError),

    #[error("invalid provider request: {0}")]
    Invalid(GatewayError),

    #[error("merchant credentials rejected: {0}")]
    Credentials(GatewayError),

    #[error("order is not ready for this operation: {0}")]
    NotReady(String),

    #[error("identifier conflict: {0}")]
    IdentityConflict(String),

    #[error(transparent)]
    Store(#[from] DomainError),
}

impl ReconcileError {
    pub fn not_ready(reason: impl Into<String>) -> Self {
        ReconcileError::NotReady(reason.into())
    }

    /// Checks if the caller may retry the whole operation with the same
    /// idempotency token.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReconcileError::Retryable(_))
    }
}

impl From<GatewayError> for ReconcileError {
    fn from(err: GatewayError) -> Self {
        match err.kind {
            GatewayErrorKind::Transient => ReconcileError::Retryable(err),
            GatewayErrorKind::Declined => ReconcileError::Declined(err),
            GatewayErrorKind::Invalid => {
                tracing::error!(error = %err, "Provider call was malformed");
                ReconcileError::Invalid(err)
            }
            GatewayErrorKind::AuthExpired => ReconcileError::Credentials(err),
        }
    }
}
