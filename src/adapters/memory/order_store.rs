//! In-memory order store.
//!
//! Stands in for the external order subsystem in tests and local
//! development. Orders are seeded explicitly; unknown orders error the
//! way a missing row would.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, OrderId};
use crate::ports::{OrderContext, OrderStatus, OrderStore};

#[derive(Debug, Clone)]
struct OrderRecord {
    context: OrderContext,
    status: OrderStatus,
    meta: HashMap<String, String>,
}

/// In-memory implementation of [`OrderStore`].
#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<OrderId, OrderRecord>>,
    /// When true, metadata keys may be created for orders never seeded.
    /// Store-level tests use this so they need no checkout fixture.
    implicit_orders: bool,
}

impl InMemoryOrderStore {
    /// Creates a store that accepts metadata for any order ID.
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
            implicit_orders: true,
        }
    }

    /// Creates a store that only knows seeded orders.
    pub fn strict() -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
            implicit_orders: false,
        }
    }

    /// Registers an order with its checkout fields.
    pub async fn seed_order(&self, context: OrderContext) {
        let mut orders = self.orders.write().await;
        orders.insert(
            context.order_id,
            OrderRecord {
                context,
                status: OrderStatus::PendingPayment,
                meta: HashMap::new(),
            },
        );
    }

    /// Reads the current status, for assertions.
    pub async fn status(&self, order_id: OrderId) -> Option<OrderStatus> {
        self.orders.read().await.get(&order_id).map(|r| r.status)
    }

    fn blank_record(order_id: OrderId) -> OrderRecord {
        OrderRecord {
            context: OrderContext {
                order_id,
                total_minor: 0,
                currency: "USD".to_string(),
                customer_email: None,
            },
            status: OrderStatus::PendingPayment,
            meta: HashMap::new(),
        }
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn get_meta(
        &self,
        order_id: OrderId,
        key: &str,
    ) -> Result<Option<String>, DomainError> {
        let orders = self.orders.read().await;
        Ok(orders
            .get(&order_id)
            .and_then(|record| record.meta.get(key).cloned()))
    }

    async fn set_meta(
        &self,
        order_id: OrderId,
        key: &str,
        value: &str,
    ) -> Result<(), DomainError> {
        let mut orders = self.orders.write().await;
        if !orders.contains_key(&order_id) {
            if !self.implicit_orders {
                return Err(DomainError::order_not_found(order_id));
            }
            orders.insert(order_id, Self::blank_record(order_id));
        }
        if let Some(record) = orders.get_mut(&order_id) {
            record.meta.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    async fn order_context(&self, order_id: OrderId) -> Result<OrderContext, DomainError> {
        let orders = self.orders.read().await;
        orders
            .get(&order_id)
            .map(|record| record.context.clone())
            .ok_or_else(|| DomainError::order_not_found(order_id))
    }

    async fn set_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<(), DomainError> {
        let mut orders = self.orders.write().await;
        if !orders.contains_key(&order_id) {
            if !self.implicit_orders {
                return Err(DomainError::order_not_found(order_id));
            }
            orders.insert(order_id, Self::blank_record(order_id));
        }
        if let Some(record) = orders.get_mut(&order_id) {
            record.status = status;
        }
        Ok(())
    }
}
