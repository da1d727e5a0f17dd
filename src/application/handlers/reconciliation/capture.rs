//! CaptureHandler - transfers previously authorized funds.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::foundation::{AuthorizationId, CaptureId, DomainError, OrderId};
use crate::domain::reconciliation::{
    Amount, AuthorizationState, CaptureState, EntityKind, EntityState, EntityUpdate,
    ObserverSet, OrderLockRegistry, ReferenceStateStore, RejectReason, TransitionOutcome,
};
use crate::ports::{GatewayClientFactory, IdempotencyToken, OrderStore};

use super::errors::{join_fault, ReconcileError};

/// Command to capture authorized funds for an order.
#[derive(Debug, Clone)]
pub struct CaptureCommand {
    pub order_id: OrderId,
    /// Amount to capture; defaults to the order total.
    pub amount: Option<Amount>,
}

/// Result of a capture operation.
#[derive(Debug, Clone)]
pub struct CaptureResult {
    pub capture_id: CaptureId,
    pub state: CaptureState,
    /// True when a notification confirmed the terminal state before this
    /// call's own result was processed; the capture still succeeded.
    pub already_settled: bool,
}

/// Handler for the synchronous capture path.
pub struct CaptureHandler {
    orders: Arc<dyn OrderStore>,
    clients: Arc<dyn GatewayClientFactory>,
    store: Arc<ReferenceStateStore>,
    locks: Arc<OrderLockRegistry>,
    observers: ObserverSet,
}

impl CaptureHandler {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        clients: Arc<dyn GatewayClientFactory>,
        store: Arc<ReferenceStateStore>,
        locks: Arc<OrderLockRegistry>,
        observers: ObserverSet,
    ) -> Self {
        Self { orders, clients, store, locks, observers }
    }

    pub async fn handle(&self, cmd: CaptureCommand) -> Result<CaptureResult, ReconcileError> {
        let variant = self
            .store
            .variant(cmd.order_id)
            .await?
            .ok_or_else(|| ReconcileError::not_ready("no reference created for this order"))?;
        let authorization = self
            .store
            .get_state(cmd.order_id, EntityKind::Authorization)
            .await?
            .ok_or_else(|| ReconcileError::not_ready("order has no authorization to capture"))?;

        // A closed authorization may already carry a capture confirmed by
        // notification; only a declined one is a dead end.
        if authorization.state == EntityState::Authorization(AuthorizationState::Declined) {
            return Err(ReconcileError::not_ready("authorization was declined"));
        }
        let authorization_id =
            AuthorizationId::new(authorization.id).map_err(DomainError::from)?;

        let amount = match cmd.amount {
            Some(amount) => amount,
            None => {
                let context = self.orders.order_context(cmd.order_id).await?;
                Amount::new(context.total_minor, &context.currency).map_err(DomainError::from)?
            }
        };

        let token = IdempotencyToken::derive(cmd.order_id, "capture", Uuid::new_v4());
        let client = self.clients.client_for(variant);
        let store = Arc::clone(&self.store);
        let locks = Arc::clone(&self.locks);
        let observers = self.observers.clone();
        let order_id = cmd.order_id;

        // Detached: the provider call and its stored result survive an
        // abandoned caller. Lock only around the read-modify-write.
        let settled = tokio::spawn(async move {
            let outcome = client.capture(&authorization_id, &amount, &token).await?;
            let _guard = locks.acquire(order_id).await;
            let result = store
                .apply(
                    order_id,
                    EntityUpdate::Capture {
                        id: outcome.capture_id.clone(),
                        state: outcome.state,
                    },
                    outcome.observed_at,
                )
                .await?;
            if result.outcome.is_accepted() {
                for event in &result.events {
                    observers.notify(event).await;
                }
            }
            Ok::<_, ReconcileError>((outcome, result.outcome))
        });
        let (outcome, transition) = settled.await.map_err(join_fault)??;

        match transition {
            TransitionOutcome::Accepted { .. } => Ok(CaptureResult {
                capture_id: outcome.capture_id,
                state: outcome.state,
                already_settled: false,
            }),
            TransitionOutcome::Rejected(reason) => {
                if let RejectReason::IdMismatch { stored_id, reported_id } = &reason {
                    return Err(ReconcileError::IdentityConflict(format!(
                        "order {} already holds capture {}, provider answered with {}",
                        order_id, stored_id, reported_id
                    )));
                }
                if reason.stored_covers(&outcome.state.into()) {
                    tracing::debug!(
                        order_id = %order_id,
                        ?reason,
                        "Synchronous capture result was already covered by a notification"
                    );
                    return Ok(CaptureResult {
                        capture_id: outcome.capture_id,
                        state: outcome.state,
                        already_settled: true,
                    });
                }
                Err(ReconcileError::IdentityConflict(format!(
                    "unreconcilable capture outcome for order {}: {:?}",
                    order_id, reason
                )))
            }
        }
    }
}
