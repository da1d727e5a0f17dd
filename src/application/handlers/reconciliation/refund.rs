//! RefundHandler - reverses part or all of a captured amount.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::foundation::{CaptureId, DomainError, OrderId, RefundId};
use crate::domain::reconciliation::{
    Amount, CaptureState, EntityKind, EntityState, EntityUpdate, ObserverSet,
    OrderLockRegistry, ReferenceStateStore, RefundState, TransitionOutcome,
};
use crate::ports::{GatewayClientFactory, IdempotencyToken};

use super::errors::{join_fault, ReconcileError};

/// Command to refund captured funds.
#[derive(Debug, Clone)]
pub struct RefundCommand {
    pub order_id: OrderId,
    /// Amount to reverse. Partial refunds are routine, so the caller
    /// always states the amount.
    pub amount: Amount,
}

/// Result of a refund operation.
#[derive(Debug, Clone)]
pub struct RefundResult {
    pub refund_id: RefundId,
    pub state: RefundState,
}

/// Handler for the synchronous refund path.
pub struct RefundHandler {
    clients: Arc<dyn GatewayClientFactory>,
    store: Arc<ReferenceStateStore>,
    locks: Arc<OrderLockRegistry>,
    observers: ObserverSet,
}

impl RefundHandler {
    pub fn new(
        clients: Arc<dyn GatewayClientFactory>,
        store: Arc<ReferenceStateStore>,
        locks: Arc<OrderLockRegistry>,
        observers: ObserverSet,
    ) -> Self {
        Self { clients, store, locks, observers }
    }

    pub async fn handle(&self, cmd: RefundCommand) -> Result<RefundResult, ReconcileError> {
        let variant = self
            .store
            .variant(cmd.order_id)
            .await?
            .ok_or_else(|| ReconcileError::not_ready("no reference created for this order"))?;
        let capture = self
            .store
            .get_state(cmd.order_id, EntityKind::Capture)
            .await?
            .ok_or_else(|| ReconcileError::not_ready("order has no capture to refund"))?;
        if capture.state != EntityState::Capture(CaptureState::Completed) {
            return Err(ReconcileError::not_ready(format!(
                "capture is {}, only completed captures can be refunded",
                capture.state
            )));
        }
        let capture_id = CaptureId::new(capture.id).map_err(DomainError::from)?;

        let token = IdempotencyToken::derive(cmd.order_id, "refund", Uuid::new_v4());
        let client = self.clients.client_for(variant);
        let store = Arc::clone(&self.store);
        let locks = Arc::clone(&self.locks);
        let observers = self.observers.clone();
        let order_id = cmd.order_id;
        let amount = cmd.amount;

        // Detached: the provider call and its stored result survive an
        // abandoned caller.
        let settled = tokio::spawn(async move {
            let outcome = client.refund(&capture_id, &amount, &token).await?;
            let _guard = locks.acquire(order_id).await;
            let result = store
                .apply(
                    order_id,
                    EntityUpdate::Refund {
                        id: outcome.refund_id.clone(),
                        state: outcome.state,
                    },
                    outcome.observed_at,
                )
                .await?;
            match &result.outcome {
                TransitionOutcome::Accepted { .. } => {
                    for event in &result.events {
                        observers.notify(event).await;
                    }
                }
                TransitionOutcome::Rejected(reason) => {
                    // Refund slots are keyed by refund ID, so a rejection
                    // can only be a replay of this same refund.
                    tracing::debug!(
                        order_id = %order_id,
                        refund_id = %outcome.refund_id,
                        ?reason,
                        "Refund result was already recorded"
                    );
                }
            }
            Ok::<_, ReconcileError>(outcome)
        });
        let outcome = settled.await.map_err(join_fault)??;

        Ok(RefundResult { refund_id: outcome.refund_id, state: outcome.state })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::reconciliation::testing::{
        default_refund, seeded_order, test_rig, TestRig,
    };
    use crate::domain::foundation::Timestamp;
    use crate::domain::reconciliation::ApiVariant;
    use crate::ports::{GatewayError, RefundOutcome};

    async fn with_completed_capture(rig: &TestRig) -> OrderId {
        let order_id = seeded_order(&rig.orders).await;
        rig.store.record_variant(order_id, ApiVariant::Current).await.unwrap();
        rig.store
            .apply(
                order_id,
                EntityUpdate::Capture {
                    id: CaptureId::new("CAP1").unwrap(),
                    state: CaptureState::Completed,
                },
                Timestamp::from_unix(2_000),
            )
            .await
            .unwrap();
        order_id
    }

    fn handler(rig: &TestRig) -> RefundHandler {
        RefundHandler::new(
            Arc::clone(&rig.handler_deps.clients),
            Arc::clone(&rig.store),
            Arc::clone(&rig.handler_deps.locks),
            rig.handler_deps.observers.clone(),
        )
    }

    fn amount(minor: i64) -> Amount {
        Amount::new(minor, "USD").unwrap()
    }

    #[tokio::test]
    async fn refund_appends_to_the_set() {
        let rig = test_rig().await;
        let order_id = with_completed_capture(&rig).await;
        let handler = handler(&rig);

        for id in ["R1", "R2", "R3"] {
            rig.gateway
                .push_refund(Ok(RefundOutcome {
                    refund_id: RefundId::new(id).unwrap(),
                    ..default_refund()
                }))
                .await;
            handler
                .handle(RefundCommand { order_id, amount: amount(500) })
                .await
                .unwrap();
        }

        let refunds = rig.store.refunds(order_id).await.unwrap();
        let ids: Vec<_> = refunds.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["R1", "R2", "R3"]);
    }

    #[tokio::test]
    async fn refund_without_capture_is_not_ready() {
        let rig = test_rig().await;
        let order_id = seeded_order(&rig.orders).await;
        rig.store.record_variant(order_id, ApiVariant::Current).await.unwrap();

        let err = handler(&rig)
            .handle(RefundCommand { order_id, amount: amount(500) })
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::NotReady(_)));
    }

    #[tokio::test]
    async fn refund_of_pending_capture_is_not_ready() {
        let rig = test_rig().await;
        let order_id = seeded_order(&rig.orders).await;
        rig.store.record_variant(order_id, ApiVariant::Current).await.unwrap();
        rig.store
            .apply(
                order_id,
                EntityUpdate::Capture {
                    id: CaptureId::new("CAP1").unwrap(),
                    state: CaptureState::Pending,
                },
                Timestamp::from_unix(2_000),
            )
            .await
            .unwrap();

        let err = handler(&rig)
            .handle(RefundCommand { order_id, amount: amount(500) })
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::NotReady(_)));
    }

    #[tokio::test]
    async fn declined_refund_surfaces_as_declined() {
        let rig = test_rig().await;
        let order_id = with_completed_capture(&rig).await;
        rig.gateway
            .push_refund(Err(GatewayError::declined("refund window elapsed")))
            .await;

        let err = handler(&rig)
            .handle(RefundCommand { order_id, amount: amount(500) })
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Declined(_)));
    }
}
