//! State observer port for side effects of accepted transitions.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::reconciliation::ReconciliationEvent;

/// Port for reacting to accepted state transitions.
///
/// Observers run synchronously after a transition is stored, inside the
/// order's lock. An observer failure is logged by the caller and never
/// rolls the transition back; implementations should therefore be
/// idempotent, since a transition may be re-reported with a newer
/// observation timestamp.
#[async_trait]
pub trait StateObserver: Send + Sync {
    /// Short stable name used in log lines.
    fn name(&self) -> &'static str;

    /// Called once per accepted transition.
    async fn on_transition(&self, event: &ReconciliationEvent) -> Result<(), DomainError>;
}
