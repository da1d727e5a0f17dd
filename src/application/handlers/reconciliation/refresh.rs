//! RefreshReferenceHandler - pulls the provider's view of a reference
//! and reconciles it into the store.
//!
//! Used after a buyer returns from checkout when no notification has
//! arrived yet, and by admin screens that want a definitive answer now.
//! Everything the provider returns goes through the same conflict policy
//! as any other report, so a refresh can never regress state.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, OrderId, ReferenceId};
use crate::domain::reconciliation::{
    EntityKind, EntityUpdate, ObserverSet, OrderLockRegistry, ReconciliationEvent,
    ReferenceSnapshot, ReferenceStateStore, TransitionOutcome,
};
use crate::ports::GatewayClientFactory;

use super::errors::ReconcileError;

/// Handler for on-demand reconciliation against the provider.
pub struct RefreshReferenceHandler {
    clients: Arc<dyn GatewayClientFactory>,
    store: Arc<ReferenceStateStore>,
    locks: Arc<OrderLockRegistry>,
    observers: ObserverSet,
}

impl RefreshReferenceHandler {
    pub fn new(
        clients: Arc<dyn GatewayClientFactory>,
        store: Arc<ReferenceStateStore>,
        locks: Arc<OrderLockRegistry>,
        observers: ObserverSet,
    ) -> Self {
        Self { clients, store, locks, observers }
    }

    pub async fn handle(&self, order_id: OrderId) -> Result<ReferenceSnapshot, ReconcileError> {
        let variant = self
            .store
            .variant(order_id)
            .await?
            .ok_or_else(|| ReconcileError::not_ready("no reference created for this order"))?;
        let reference = self
            .store
            .get_state(order_id, EntityKind::Reference)
            .await?
            .ok_or_else(|| ReconcileError::not_ready("no reference created for this order"))?;
        let reference_id = ReferenceId::new(reference.id).map_err(DomainError::from)?;

        let details = self
            .clients
            .client_for(variant)
            .get_reference_details(&reference_id)
            .await?;

        let mut updates = vec![EntityUpdate::Reference {
            id: details.reference_id,
            state: details.reference_state,
        }];
        if let Some((id, state)) = details.authorization {
            updates.push(EntityUpdate::Authorization { id, state });
        }
        if let Some((id, state)) = details.capture {
            updates.push(EntityUpdate::Capture { id, state });
        }
        for (id, state) in details.refunds {
            updates.push(EntityUpdate::Refund { id, state });
        }

        let _guard = self.locks.acquire(order_id).await;
        let mut accepted: Vec<ReconciliationEvent> = Vec::new();
        for update in updates {
            let result = self.store.apply(order_id, update, details.observed_at).await?;
            match result.outcome {
                TransitionOutcome::Accepted { .. } => accepted.extend(result.events),
                TransitionOutcome::Rejected(reason) => {
                    // A refresh losing to fresher stored state is routine.
                    tracing::debug!(order_id = %order_id, ?reason, "Refresh report superseded");
                }
            }
        }
        for event in &accepted {
            self.observers.notify(event).await;
        }

        Ok(self.store.snapshot(order_id).await?)
    }
}
