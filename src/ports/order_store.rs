//! Order store port for the external order/cart subsystem.
//!
//! The order subsystem is not this crate's concern; the reconciliation
//! engine sees it only as an opaque record with named metadata and a
//! coarse status field. All reference lifecycle state is persisted through
//! this port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{DomainError, OrderId};

/// Port for reading and writing order records.
///
/// Implementations must treat `set_meta` as last-writer-wins at the level
/// of a single key; the reconciliation engine serializes its own writers
/// per order, so the store does not need cross-key transactions.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Reads one named metadata value.
    async fn get_meta(&self, order_id: OrderId, key: &str) -> Result<Option<String>, DomainError>;

    /// Writes one named metadata value.
    async fn set_meta(
        &self,
        order_id: OrderId,
        key: &str,
        value: &str,
    ) -> Result<(), DomainError>;

    /// Reads the checkout fields the provider calls need.
    async fn order_context(&self, order_id: OrderId) -> Result<OrderContext, DomainError>;

    /// Moves the order to a new status (side effect of accepted
    /// transitions; the order subsystem owns what each status means).
    async fn set_status(&self, order_id: OrderId, status: OrderStatus)
        -> Result<(), DomainError>;
}

/// Checkout fields of an order, read-only from this crate's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderContext {
    pub order_id: OrderId,

    /// Order total in minor units.
    pub total_minor: i64,

    /// ISO 4217 currency code.
    pub currency: String,

    /// Buyer email, when the order has one.
    pub customer_email: Option<String>,
}

/// Order statuses the reconciliation engine drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    PendingPayment,
    OnHold,
    Processing,
    Completed,
    Refunded,
    Failed,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::PendingPayment => "pending-payment",
            OrderStatus::OnHold => "on-hold",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}
