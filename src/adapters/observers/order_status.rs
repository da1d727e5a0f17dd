//! Order-status side effects of accepted transitions.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::DomainError;
use crate::domain::reconciliation::{
    AuthorizationState, CaptureState, EntityUpdate, ReconciliationEvent, ReferenceState,
    RefundState,
};
use crate::ports::{OrderStatus, OrderStore, StateObserver};

/// Moves the order along its fulfillment flow as the provider confirms
/// lifecycle steps.
///
/// Status writes are idempotent on the order side, so a transition that
/// re-reports the same state is harmless.
pub struct OrderStatusObserver {
    orders: Arc<dyn OrderStore>,
}

impl OrderStatusObserver {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }

    fn status_for(update: &EntityUpdate) -> Option<OrderStatus> {
        match update {
            EntityUpdate::Reference { state, .. } => match state {
                ReferenceState::Suspended => Some(OrderStatus::OnHold),
                ReferenceState::Canceled => Some(OrderStatus::Failed),
                _ => None,
            },
            EntityUpdate::Authorization { state, .. } => match state {
                AuthorizationState::Open => Some(OrderStatus::Processing),
                AuthorizationState::Declined => Some(OrderStatus::Failed),
                _ => None,
            },
            EntityUpdate::Capture { state, .. } => match state {
                CaptureState::Completed => Some(OrderStatus::Completed),
                CaptureState::Declined => Some(OrderStatus::OnHold),
                _ => None,
            },
            EntityUpdate::Refund { state, .. } => match state {
                RefundState::Completed => Some(OrderStatus::Refunded),
                _ => None,
            },
        }
    }
}

#[async_trait]
impl StateObserver for OrderStatusObserver {
    fn name(&self) -> &'static str {
        "order_status"
    }

    async fn on_transition(&self, event: &ReconciliationEvent) -> Result<(), DomainError> {
        if !event.state_changed {
            return Ok(());
        }
        let Some(status) = Self::status_for(&event.update) else {
            return Ok(());
        };

        tracing::info!(
            order_id = %event.order_id,
            entity = %event.update.kind(),
            state = %event.update.state(),
            order_status = %status,
            "Order status follows reference transition"
        );
        self.orders.set_status(event.order_id, status).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryOrderStore;
    use crate::domain::foundation::{AuthorizationId, CaptureId, OrderId, Timestamp};

    fn event(order_id: OrderId, update: EntityUpdate, state_changed: bool) -> ReconciliationEvent {
        ReconciliationEvent {
            order_id,
            update,
            observed_at: Timestamp::from_unix(100),
            state_changed,
        }
    }

    #[tokio::test]
    async fn open_authorization_moves_order_to_processing() {
        let orders = Arc::new(InMemoryOrderStore::new());
        let observer = OrderStatusObserver::new(Arc::clone(&orders) as Arc<dyn OrderStore>);
        let order_id = OrderId::new();

        observer
            .on_transition(&event(
                order_id,
                EntityUpdate::Authorization {
                    id: AuthorizationId::new("A1").unwrap(),
                    state: AuthorizationState::Open,
                },
                true,
            ))
            .await
            .unwrap();

        assert_eq!(orders.status(order_id).await, Some(OrderStatus::Processing));
    }

    #[tokio::test]
    async fn completed_capture_moves_order_to_completed() {
        let orders = Arc::new(InMemoryOrderStore::new());
        let observer = OrderStatusObserver::new(Arc::clone(&orders) as Arc<dyn OrderStore>);
        let order_id = OrderId::new();

        observer
            .on_transition(&event(
                order_id,
                EntityUpdate::Capture {
                    id: CaptureId::new("C1").unwrap(),
                    state: CaptureState::Completed,
                },
                true,
            ))
            .await
            .unwrap();

        assert_eq!(orders.status(order_id).await, Some(OrderStatus::Completed));
    }

    #[tokio::test]
    async fn timestamp_refresh_does_not_touch_the_order() {
        let orders = Arc::new(InMemoryOrderStore::new());
        let observer = OrderStatusObserver::new(Arc::clone(&orders) as Arc<dyn OrderStore>);
        let order_id = OrderId::new();

        observer
            .on_transition(&event(
                order_id,
                EntityUpdate::Capture {
                    id: CaptureId::new("C1").unwrap(),
                    state: CaptureState::Completed,
                },
                false,
            ))
            .await
            .unwrap();

        assert_eq!(orders.status(order_id).await, None);
    }

    #[tokio::test]
    async fn pending_states_have_no_order_effect() {
        let orders = Arc::new(InMemoryOrderStore::new());
        let observer = OrderStatusObserver::new(Arc::clone(&orders) as Arc<dyn OrderStore>);
        let order_id = OrderId::new();

        observer
            .on_transition(&event(
                order_id,
                EntityUpdate::Capture {
                    id: CaptureId::new("C1").unwrap(),
                    state: CaptureState::Pending,
                },
                true,
            ))
            .await
            .unwrap();

        assert_eq!(orders.status(order_id).await, None);
    }
}
