//! Bounded in-memory cache of seen notification tokens.
//!
//! Deduplication only has to cover the provider's redelivery window, so
//! entries expire after a fixed horizon and the cache is capped to a
//! maximum size. Losing an entry past the horizon merely means a very
//! late duplicate reaches the store, where the conflict policy rejects
//! it anyway.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::foundation::{DomainError, MessageId};
use crate::ports::SeenMessageStore;

/// Default eviction horizon: one day, comfortably past the longest
/// redelivery backoff the provider documents.
const DEFAULT_HORIZON: Duration = Duration::from_secs(24 * 60 * 60);

/// Hard cap on retained tokens.
const DEFAULT_CAPACITY: usize = 100_000;

struct SeenState {
    entries: HashMap<String, Instant>,
    insertion_order: VecDeque<(String, Instant)>,
}

/// In-memory implementation of [`SeenMessageStore`].
pub struct InMemorySeenMessages {
    state: Mutex<SeenState>,
    horizon: Duration,
    capacity: usize,
}

impl Default for InMemorySeenMessages {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySeenMessages {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_HORIZON, DEFAULT_CAPACITY)
    }

    pub fn with_limits(horizon: Duration, capacity: usize) -> Self {
        Self {
            state: Mutex::new(SeenState {
                entries: HashMap::new(),
                insertion_order: VecDeque::new(),
            }),
            horizon,
            capacity,
        }
    }

    fn evict(&self, state: &mut SeenState, now: Instant, inserting: bool) {
        while let Some((token, inserted_at)) = state.insertion_order.front() {
            let expired = now.duration_since(*inserted_at) > self.horizon;
            let over_capacity = inserting && state.insertion_order.len() >= self.capacity;
            if !expired && !over_capacity {
                break;
            }
            // Only drop the map entry if it still points at this insertion.
            if state.entries.get(token) == Some(inserted_at) {
                state.entries.remove(token);
            }
            state.insertion_order.pop_front();
        }
    }

    /// Number of live entries, for tests.
    #[cfg(test)]
    async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }
}

#[async_trait]
impl SeenMessageStore for InMemorySeenMessages {
    async fn contains(&self, message_id: &MessageId) -> Result<bool, DomainError> {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        self.evict(&mut state, now, false);
        Ok(state.entries.contains_key(message_id.as_str()))
    }

    async fn mark_seen(&self, message_id: &MessageId) -> Result<(), DomainError> {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        self.evict(&mut state, now, true);

        if state.entries.contains_key(message_id.as_str()) {
            return Ok(());
        }
        state.entries.insert(message_id.as_str().to_string(), now);
        state
            .insertion_order
            .push_back((message_id.as_str().to_string(), now));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(s: &str) -> MessageId {
        MessageId::new(s).unwrap()
    }

    #[tokio::test]
    async fn contains_reflects_marking() {
        let cache = InMemorySeenMessages::new();
        assert!(!cache.contains(&token("m1")).await.unwrap());
        cache.mark_seen(&token("m1")).await.unwrap();
        assert!(cache.contains(&token("m1")).await.unwrap());
        assert!(!cache.contains(&token("m2")).await.unwrap());
    }

    #[tokio::test]
    async fn marking_is_idempotent() {
        let cache = InMemorySeenMessages::new();
        cache.mark_seen(&token("m1")).await.unwrap();
        cache.mark_seen(&token("m1")).await.unwrap();
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn capacity_evicts_oldest_first() {
        let cache = InMemorySeenMessages::with_limits(DEFAULT_HORIZON, 3);
        for i in 0..5 {
            cache.mark_seen(&token(&format!("m{}", i))).await.unwrap();
        }
        // m0 and m1 were pushed out; m4 is still present.
        assert!(!cache.contains(&token("m0")).await.unwrap());
        assert!(cache.contains(&token("m4")).await.unwrap());
    }

    #[tokio::test]
    async fn horizon_expires_entries() {
        let cache = InMemorySeenMessages::with_limits(Duration::from_millis(10), 100);
        cache.mark_seen(&token("m1")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!cache.contains(&token("m1")).await.unwrap());
        assert_eq!(cache.len().await, 0);
    }
}
