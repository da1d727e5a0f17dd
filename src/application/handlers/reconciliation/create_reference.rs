//! CreateReferenceHandler - establishes the provider session for a
//! checkout attempt.
//!
//! This is the only place the Migration Gate is consulted: the merchant's
//! migration flag is read once, the chosen variant is recorded on the
//! order, and every later operation on this order follows the recorded
//! value.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, OrderId, ReferenceId};
use crate::domain::reconciliation::{
    Amount, ApiVariant, EntityUpdate, ObserverSet, OrderLockRegistry, ReferenceState,
    ReferenceStateStore,
};
use crate::ports::{CartContext, GatewayClientFactory, MerchantAccountStore, OrderStore};

use super::errors::{join_fault, ReconcileError};

/// Command to create a provider reference for an order.
#[derive(Debug, Clone)]
pub struct CreateReferenceCommand {
    pub order_id: OrderId,
    /// Free-text note shown in the provider's seller console.
    pub seller_note: Option<String>,
}

/// Result of reference creation.
#[derive(Debug, Clone)]
pub struct CreateReferenceResult {
    pub reference_id: ReferenceId,
    pub state: ReferenceState,
    pub variant: ApiVariant,
}

/// Handler for establishing a provider reference.
pub struct CreateReferenceHandler {
    orders: Arc<dyn OrderStore>,
    merchant: Arc<dyn MerchantAccountStore>,
    clients: Arc<dyn GatewayClientFactory>,
    store: Arc<ReferenceStateStore>,
    locks: Arc<OrderLockRegistry>,
    observers: ObserverSet,
}

impl CreateReferenceHandler {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        merchant: Arc<dyn MerchantAccountStore>,
        clients: Arc<dyn GatewayClientFactory>,
        store: Arc<ReferenceStateStore>,
        locks: Arc<OrderLockRegistry>,
        observers: ObserverSet,
    ) -> Self {
        Self { orders, merchant, clients, store, locks, observers }
    }

    pub async fn handle(
        &self,
        cmd: CreateReferenceCommand,
    ) -> Result<CreateReferenceResult, ReconcileError> {
        let context = self.orders.order_context(cmd.order_id).await?;
        let total =
            Amount::new(context.total_minor, &context.currency).map_err(DomainError::from)?;

        // The one and only migration-gate read for this order.
        let variant = if self.merchant.using_current_api().await? {
            ApiVariant::Current
        } else {
            ApiVariant::Legacy
        };

        let cart = CartContext {
            order_id: cmd.order_id,
            total,
            customer_email: context.customer_email,
            seller_note: cmd.seller_note,
        };

        let client = self.clients.client_for(variant);
        let store = Arc::clone(&self.store);
        let locks = Arc::clone(&self.locks);
        let observers = self.observers.clone();
        let order_id = cmd.order_id;

        // Detached, and the provider call runs outside the order lock; a
        // slow provider must not block notifications for this order, and
        // an abandoned checkout must not orphan a created reference.
        let settled = tokio::spawn(async move {
            let created = client.create_reference(&cart).await?;
            let _guard = locks.acquire(order_id).await;
            store.record_variant(order_id, variant).await?;
            let result = store
                .apply(
                    order_id,
                    EntityUpdate::Reference {
                        id: created.reference_id.clone(),
                        state: created.state,
                    },
                    created.observed_at,
                )
                .await?;
            for event in &result.events {
                observers.notify(event).await;
            }
            Ok::<_, ReconcileError>(created)
        });
        let created = settled.await.map_err(join_fault)??;

        tracing::info!(
            order_id = %order_id,
            reference_id = %created.reference_id,
            variant = %variant,
            "Provider reference created"
        );

        Ok(CreateReferenceResult {
            reference_id: created.reference_id,
            state: created.state,
            variant,
        })
    }
}
