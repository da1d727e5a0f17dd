//! Subscriptions feed port.
//!
//! Subscription billing and its scheduling live in another subsystem;
//! this crate only feeds it the reference-state transitions it needs to
//! drive renewals (payment collected, payment refused).

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::reconciliation::ReconciliationEvent;

/// Port for forwarding reference-state transitions to the subscriptions
/// subsystem.
#[async_trait]
pub trait SubscriptionsFeed: Send + Sync {
    /// Called for each accepted transition the feed subscribes to.
    async fn reference_transitioned(
        &self,
        event: &ReconciliationEvent,
    ) -> Result<(), DomainError>;
}
