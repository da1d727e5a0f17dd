//! Per-order mutual exclusion for reconciling writers.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::foundation::OrderId;

/// Sweep the registry once it grows past this many entries.
const GC_THRESHOLD: usize = 1024;

/// Hands out one async mutex per order ID.
///
/// Both the synchronous reconciler and the notification handler acquire
/// the order's lock immediately before the read-modify-write of a
/// transition; operations on different orders proceed in parallel. The
/// lock is never held across an outbound provider call.
#[derive(Default)]
pub struct OrderLockRegistry {
    locks: Mutex<HashMap<OrderId, Arc<Mutex<()>>>>,
}

impl OrderLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for an order, waiting if another reconciling
    /// operation holds it. The guard releases on drop, including on every
    /// error path of the caller.
    pub async fn acquire(&self, order_id: OrderId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            if locks.len() > GC_THRESHOLD {
                // Uncontended entries can be recreated on demand.
                locks.retain(|_, l| Arc::strong_count(l) > 1);
            }
            Arc::clone(locks.entry(order_id).or_default())
        };
        lock.lock_owned().await
    }
}
