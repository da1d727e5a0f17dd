//! Seen-message store port for notification deduplication.
//!
//! Providers deliver at-least-once; duplicate deliveries are expected and
//! must be silent no-ops. Implementations are short-lived caches bounded
//! by the provider's retry window, not durable records.
//!
//! Marking happens AFTER successful handling, so a message that failed on
//! an internal fault is not remembered and the provider's retry gets a
//! real second attempt. The window where two concurrent duplicates both
//! pass `contains` is closed by the state store's conflict policy, which
//! rejects the second apply as a duplicate.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, MessageId};

/// Port for tracking which notification uniqueness tokens were handled.
#[async_trait]
pub trait SeenMessageStore: Send + Sync {
    /// Checks whether the token was already handled.
    async fn contains(&self, message_id: &MessageId) -> Result<bool, DomainError>;

    /// Records the token once handling finished (applied or rejected as
    /// stale; both are terminal for this delivery).
    async fn mark_seen(&self, message_id: &MessageId) -> Result<(), DomainError>;
}
