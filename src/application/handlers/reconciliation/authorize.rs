//! AuthorizeHandler - places a hold of funds against an order's
//! reference.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::foundation::{AuthorizationId, DomainError, OrderId, ReferenceId};
use crate::domain::reconciliation::{
    Amount, AuthorizationState, EntityKind, EntityUpdate, ObserverSet, OrderLockRegistry,
    ReferenceStateStore, RejectReason, TransitionOutcome,
};
use crate::ports::{GatewayClientFactory, IdempotencyToken, OrderStore};

use super::errors::{join_fault, ReconcileError};

/// Command to authorize funds for an order.
#[derive(Debug, Clone)]
pub struct AuthorizeCommand {
    pub order_id: OrderId,
    /// Amount to hold; defaults to the order total.
    pub amount: Option<Amount>,
}

/// Result of an authorize operation.
#[derive(Debug, Clone)]
pub struct AuthorizeResult {
    pub authorization_id: AuthorizationId,
    pub state: AuthorizationState,
    /// True when the stored state already covered this result because a
    /// notification landed first; the operation still succeeded.
    pub already_settled: bool,
}

/// Handler for the synchronous authorize path.
pub struct AuthorizeHandler {
    orders: Arc<dyn OrderStore>,
    clients: Arc<dyn GatewayClientFactory>,
    store: Arc<ReferenceStateStore>,
    locks: Arc<OrderLockRegistry>,
    observers: ObserverSet,
}

impl AuthorizeHandler {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        clients: Arc<dyn GatewayClientFactory>,
        store: Arc<ReferenceStateStore>,
        locks: Arc<OrderLockRegistry>,
        observers: ObserverSet,
    ) -> Self {
        Self { orders, clients, store, locks, observers }
    }

    pub async fn handle(&self, cmd: AuthorizeCommand) -> Result<AuthorizeResult, ReconcileError> {
        let variant = self
            .store
            .variant(cmd.order_id)
            .await?
            .ok_or_else(|| ReconcileError::not_ready("no reference created for this order"))?;
        let reference = self
            .store
            .get_state(cmd.order_id, EntityKind::Reference)
            .await?
            .ok_or_else(|| ReconcileError::not_ready("no reference created for this order"))?;
        if reference.state.is_terminal() {
            return Err(ReconcileError::not_ready(format!(
                "reference is {}",
                reference.state
            )));
        }
        let reference_id = ReferenceId::new(reference.id).map_err(DomainError::from)?;

        let amount = match cmd.amount {
            Some(amount) => amount,
            None => {
                let context = self.orders.order_context(cmd.order_id).await?;
                Amount::new(context.total_minor, &context.currency).map_err(DomainError::from)?
            }
        };

        let token = IdempotencyToken::derive(cmd.order_id, "authorize", Uuid::new_v4());
        let client = self.clients.client_for(variant);
        let store = Arc::clone(&self.store);
        let locks = Arc::clone(&self.locks);
        let observers = self.observers.clone();
        let order_id = cmd.order_id;

        // Detached: an abandoned checkout request must not cancel a
        // provider call that may already have moved money. The provider
        // call runs before the lock; the lock only covers the
        // read-modify-write.
        let settled = tokio::spawn(async move {
            let outcome = client.authorize(&reference_id, &amount, &token).await?;
            let _guard = locks.acquire(order_id).await;
            let result = store
                .apply(
                    order_id,
                    EntityUpdate::Authorization {
                        id: outcome.authorization_id.clone(),
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
            TransitionOutcome::Accepted { .. } => Ok(AuthorizeResult {
                authorization_id: outcome.authorization_id,
                state: outcome.state,
                already_settled: false,
            }),
            TransitionOutcome::Rejected(reason) => {
                self.settle_rejection(order_id, reason, outcome.state, outcome.authorization_id)
            }
        }
    }

    fn settle_rejection(
        &self,
        order_id: OrderId,
        reason: RejectReason,
        state: AuthorizationState,
        authorization_id: AuthorizationId,
    ) -> Result<AuthorizeResult, ReconcileError> {
        if let RejectReason::IdMismatch { stored_id, reported_id } = &reason {
            return Err(ReconcileError::IdentityConflict(format!(
                "order {} already holds authorization {}, provider answered with {}",
                order_id, stored_id, reported_id
            )));
        }
        if reason.stored_covers(&state.into()) {
            tracing::debug!(
                order_id = %order_id,
                ?reason,
                "Synchronous authorize result was already covered by a notification"
            );
            return Ok(AuthorizeResult { authorization_id, state, already_settled: true });
        }
        // Same entity, same or earlier stage, but not covered: cannot
        // happen under the conflict policy; treat as a conflict if it does.
        Err(ReconcileError::IdentityConflict(format!(
            "unreconcilable authorize outcome for order {}: {:?}",
            order_id, reason
        )))
    }
}
