//! Subscriptions side effects of accepted transitions.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::DomainError;
use crate::domain::reconciliation::{
    AuthorizationState, CaptureState, EntityUpdate, ReconciliationEvent,
};
use crate::ports::{StateObserver, SubscriptionsFeed};

/// Forwards renewal-relevant transitions to the subscriptions subsystem.
///
/// Only funds movement matters to billing: a completed capture confirms a
/// renewal payment, a declined authorization or capture fails one.
/// Everything else stays inside the reconciliation engine.
pub struct SubscriptionsObserver {
    feed: Arc<dyn SubscriptionsFeed>,
}

impl SubscriptionsObserver {
    pub fn new(feed: Arc<dyn SubscriptionsFeed>) -> Self {
        Self { feed }
    }

    fn relevant(update: &EntityUpdate) -> bool {
        matches!(
            update,
            EntityUpdate::Capture {
                state: CaptureState::Completed | CaptureState::Declined,
                ..
            } | EntityUpdate::Authorization {
                state: AuthorizationState::Declined,
                ..
            }
        )
    }
}

#[async_trait]
impl StateObserver for SubscriptionsObserver {
    fn name(&self) -> &'static str {
        "subscriptions"
    }

    async fn on_transition(&self, event: &ReconciliationEvent) -> Result<(), DomainError> {
        if !event.state_changed || !Self::relevant(&event.update) {
            return Ok(());
        }
        self.feed.reference_transitioned(event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{AuthorizationId, CaptureId, OrderId, Timestamp};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingFeed {
        calls: AtomicU32,
    }

    #[async_trait]
    impl SubscriptionsFeed for CountingFeed {
        async fn reference_transitioned(
            &self,
            _event: &ReconciliationEvent,
        ) -> Result<(), DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn event(update: EntityUpdate, state_changed: bool) -> ReconciliationEvent {
        ReconciliationEvent {
            order_id: OrderId::new(),
            update,
            observed_at: Timestamp::from_unix(1),
            state_changed,
        }
    }

    #[tokio::test]
    async fn forwards_completed_captures() {
        let feed = Arc::new(CountingFeed { calls: AtomicU32::new(0) });
        let observer = SubscriptionsObserver::new(Arc::clone(&feed) as Arc<dyn SubscriptionsFeed>);

        observer
            .on_transition(&event(
                EntityUpdate::Capture {
                    id: CaptureId::new("C1").unwrap(),
                    state: CaptureState::Completed,
                },
                true,
            ))
            .await
            .unwrap();

        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ignores_open_authorizations_and_refreshes() {
        let feed = Arc::new(CountingFeed { calls: AtomicU32::new(0) });
        let observer = SubscriptionsObserver::new(Arc::clone(&feed) as Arc<dyn SubscriptionsFeed>);

        observer
            .on_transition(&event(
                EntityUpdate::Authorization {
                    id: AuthorizationId::new("A1").unwrap(),
                    state: AuthorizationState::Open,
                },
                true,
            ))
            .await
            .unwrap();
        observer
            .on_transition(&event(
                EntityUpdate::Capture {
                    id: CaptureId::new("C1").unwrap(),
                    state: CaptureState::Completed,
                },
                false,
            ))
            .await
            .unwrap();

        assert_eq!(feed.calls.load(Ordering::SeqCst), 0);
    }
}
