//! Accepted-transition events and the observer list that consumes them.

use std::sync::Arc;

use crate::domain::foundation::{OrderId, Timestamp};
use crate::ports::StateObserver;

use super::transition::EntityUpdate;

/// An accepted state transition, as seen by observers.
#[derive(Debug, Clone)]
pub struct ReconciliationEvent {
    pub order_id: OrderId,
    pub update: EntityUpdate,
    pub observed_at: Timestamp,
    /// False when only the observation timestamp advanced.
    pub state_changed: bool,
}

/// Observer list invoked synchronously after each accepted transition.
///
/// Each observer is independently fallible: a failing observer is logged
/// and the remaining observers still run. Nothing here rolls back the
/// transition itself.
#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn StateObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an observer to the end of the list.
    pub fn with(mut self, observer: Arc<dyn StateObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Notifies every observer of an accepted transition.
    ///
    /// Observers are independent of each other, so they run
    /// concurrently; the call still completes before the order lock is
    /// released.
    pub async fn notify(&self, event: &ReconciliationEvent) {
        let results = futures::future::join_all(
            self.observers.iter().map(|observer| observer.on_transition(event)),
        )
        .await;
        for (observer, result) in self.observers.iter().zip(results) {
            if let Err(err) = result {
                tracing::warn!(
                    observer = observer.name(),
                    order_id = %event.order_id,
                    entity = %event.update.kind(),
                    error = %err,
                    "State observer failed; transition stands"
                );
            }
        }
    }
}
