//! HandleNotificationHandler - applies provider push messages to the
//! reference state store.
//!
//! The asynchronous half of the reconciliation engine. Ordering of the
//! steps is load-bearing:
//!
//! 1. verify authenticity - fails closed, nothing else runs
//! 2. decode to canonical form
//! 3. deduplicate by uniqueness token - duplicates are silent no-ops
//! 4. take the per-order lock shared with the synchronous reconciler
//! 5. apply through the conflict policy
//! 6. side effects only for accepted transitions; mark the token seen
//!    only after the outcome is final, so an internal fault lets the
//!    provider's retry do real work
//!
//! A stale or duplicate message is acknowledged as success - the provider
//! will not retry smarter, so an error would only produce an endless
//! redelivery loop. Only verification failures and internal faults are
//! surfaced, because those are the cases where a retry can help.

use std::sync::Arc;

use thiserror::Error;

use crate::adapters::logging::AuditLogger;
use crate::domain::foundation::DomainError;
use crate::domain::reconciliation::{
    ObserverSet, OrderLockRegistry, ReferenceStateStore, RejectReason, TransitionOutcome,
};
use crate::ports::{
    NotificationRejection, NotificationVerifier, SeenMessageStore, VerificationError,
};

/// Command carrying one raw inbound push message.
#[derive(Debug, Clone)]
pub struct HandleNotificationCommand {
    pub payload: Vec<u8>,
    pub signature: String,
}

/// How a notification was disposed of. Every variant is acknowledged to
/// the provider as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationDisposition {
    /// State was updated and side effects ran.
    Applied,
    /// The uniqueness token was handled before; nothing happened.
    AlreadySeen,
    /// The report lost to the conflict policy; nothing happened.
    StaleOrDuplicate,
    /// Authentic but semantically unusable (undecodable, or an entity ID
    /// clash). Logged loudly; retrying the same bytes cannot help.
    Unprocessable,
}

/// Failures surfaced to the provider so it retries.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification failed verification: {0}")]
    Unverified(#[from] VerificationError),

    #[error(transparent)]
    Internal(#[from] DomainError),
}

/// Handler for inbound provider notifications.
pub struct HandleNotificationHandler {
    verifier: Arc<dyn NotificationVerifier>,
    seen: Arc<dyn SeenMessageStore>,
    store: Arc<ReferenceStateStore>,
    locks: Arc<OrderLockRegistry>,
    observers: ObserverSet,
    audit: AuditLogger,
}

impl HandleNotificationHandler {
    pub fn new(
        verifier: Arc<dyn NotificationVerifier>,
        seen: Arc<dyn SeenMessageStore>,
        store: Arc<ReferenceStateStore>,
        locks: Arc<OrderLockRegistry>,
        observers: ObserverSet,
        audit: AuditLogger,
    ) -> Self {
        Self { verifier, seen, store, locks, observers, audit }
    }

    pub async fn handle(
        &self,
        cmd: HandleNotificationCommand,
    ) -> Result<NotificationDisposition, NotificationError> {
        let notification = match self
            .verifier
            .verify_and_parse(&cmd.payload, &cmd.signature)
            .await
        {
            Ok(notification) => {
                self.audit
                    .response("notification", &String::from_utf8_lossy(&cmd.payload));
                notification
            }
            Err(NotificationRejection::Unverified(err)) => {
                tracing::warn!(error = %err, "Rejecting unverifiable notification");
                return Err(err.into());
            }
            Err(NotificationRejection::Unparsable(reason)) => {
                self.audit
                    .response("notification", &String::from_utf8_lossy(&cmd.payload));
                tracing::error!(
                    reason = %reason,
                    "Verified notification is undecodable; acknowledging to stop redelivery"
                );
                return Ok(NotificationDisposition::Unprocessable);
            }
        };

        if self.seen.contains(&notification.message_id).await? {
            tracing::debug!(
                message_id = %notification.message_id,
                order_id = %notification.order_id,
                "Duplicate notification delivery"
            );
            return Ok(NotificationDisposition::AlreadySeen);
        }

        let _guard = self.locks.acquire(notification.order_id).await;
        let result = self
            .store
            .apply(
                notification.order_id,
                notification.update.clone(),
                notification.event_at,
            )
            .await?;

        let disposition = match &result.outcome {
            TransitionOutcome::Accepted { .. } => {
                for event in &result.events {
                    self.observers.notify(event).await;
                }
                tracing::info!(
                    message_id = %notification.message_id,
                    order_id = %notification.order_id,
                    entity = %notification.update.kind(),
                    state = %notification.update.state(),
                    "Notification applied"
                );
                NotificationDisposition::Applied
            }
            TransitionOutcome::Rejected(RejectReason::IdMismatch { stored_id, reported_id }) => {
                tracing::error!(
                    message_id = %notification.message_id,
                    order_id = %notification.order_id,
                    entity = %notification.update.kind(),
                    stored_id = %stored_id,
                    reported_id = %reported_id,
                    "Notification names a different entity ID than the stored one"
                );
                NotificationDisposition::Unprocessable
            }
            TransitionOutcome::Rejected(reason) => {
                tracing::debug!(
                    message_id = %notification.message_id,
                    order_id = %notification.order_id,
                    ?reason,
                    "Stale or duplicate notification; state untouched"
                );
                NotificationDisposition::StaleOrDuplicate
            }
        };

        self.seen.mark_seen(&notification.message_id).await?;
        Ok(disposition)
    }
}
