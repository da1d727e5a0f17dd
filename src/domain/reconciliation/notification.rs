//! Canonical form of an inbound push notification.
//!
//! Wire parsing lives in the IPN adapter; everything past the parser
//! works with this shape only.

use crate::domain::foundation::{MessageId, OrderId, Timestamp};

use super::amount::Amount;
use super::transition::EntityUpdate;

/// One provider push message, normalized.
#[derive(Debug, Clone)]
pub struct Notification {
    /// Provider-assigned uniqueness token, the deduplication key.
    pub message_id: MessageId,

    /// The order whose reference this message concerns.
    pub order_id: OrderId,

    /// Entity, ID, and new state being reported.
    pub update: EntityUpdate,

    /// Provider-assigned event time; becomes `observed_at` in the store.
    pub event_at: Timestamp,

    /// Amount carried by authorization/capture/refund messages.
    pub amount: Option<Amount>,
}
