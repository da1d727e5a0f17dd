//! Reference state store - single point of truth for reference,
//! authorization, capture, and refund state.
//!
//! Built over the order's named metadata. Two racing writers (the
//! synchronous reconciler and the notification handler) funnel every
//! state report through [`ReferenceStateStore::apply`]; the conflict
//! policy in [`decide`] makes the store idempotent under replays and
//! immune to out-of-order delivery.
//!
//! Conflict policy:
//! - no prior state: accept
//! - strictly more terminal than stored: accept, regardless of timestamp
//!   (a terminal confirmation always beats a stale non-terminal report)
//! - same lifecycle stage: accept only if not observed earlier than the
//!   stored report; an identical state at an identical time is a
//!   duplicate no-op
//! - less terminal than stored: reject; never regress, and never touch a
//!   terminal state with a non-terminal report
//! - a different entity ID for an already-filled slot: reject, protocol
//!   error on the reporting side

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    AuthorizationId, DomainError, ErrorCode, OrderId, Timestamp,
};
use crate::ports::OrderStore;

use super::context::ApiVariant;
use super::events::ReconciliationEvent;
use super::states::{AuthorizationState, CaptureState, EntityKind, EntityState};
use super::transition::{EntityUpdate, RejectReason, TransitionOutcome};

const META_API_VARIANT: &str = "gateway_api_variant";
const META_REFUND_IDS: &str = "gateway_refund_ids";
const META_REFUND_STATES: &str = "gateway_refund_states";

/// What one single-slot entity currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntity {
    pub id: String,
    pub state: EntityState,
    pub observed_at: Timestamp,
}

/// One stored refund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundEntry {
    pub id: String,
    pub state: EntityState,
    pub observed_at: Timestamp,
}

/// Read-side record exposed to the external REST layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceSnapshot {
    pub reference_id: Option<String>,
    pub reference_state: Option<String>,
    pub authorization_id: Option<String>,
    pub authorization_state: Option<String>,
    pub capture_id: Option<String>,
    pub capture_state: Option<String>,
    pub refund_ids: Vec<String>,
}

/// Result of applying one reported transition, cascades included.
#[derive(Debug, Clone)]
pub struct ApplyResult {
    /// Outcome for the reported update itself.
    pub outcome: TransitionOutcome,
    /// Accepted transitions in apply order, cascade last. Empty when the
    /// report was rejected.
    pub events: Vec<ReconciliationEvent>,
}

/// Persisted shape of one refund in the `gateway_refund_states` map.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RefundRecord {
    state: String,
    observed_at: String,
}

/// Decision of the pure conflict policy.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Decision {
    Accept { state_changed: bool },
    Reject(RejectReason),
}

/// The conflict policy, free of I/O so it can be tested exhaustively.
fn decide(current: Option<(EntityState, Timestamp)>, reported: (EntityState, Timestamp)) -> Decision {
    let (new_state, new_at) = reported;
    let Some((cur_state, cur_at)) = current else {
        return Decision::Accept { state_changed: true };
    };

    use std::cmp::Ordering;
    match new_state.stage().cmp(&cur_state.stage()) {
        Ordering::Greater => Decision::Accept {
            state_changed: new_state != cur_state,
        },
        Ordering::Equal => {
            if new_state == cur_state && new_at == cur_at {
                Decision::Reject(RejectReason::Duplicate)
            } else if new_at < cur_at {
                Decision::Reject(RejectReason::Stale {
                    stored: cur_state,
                    stored_observed_at: cur_at,
                })
            } else {
                Decision::Accept {
                    state_changed: new_state != cur_state,
                }
            }
        }
        Ordering::Less => {
            if cur_state.is_terminal() {
                Decision::Reject(RejectReason::TerminalRegression { stored: cur_state })
            } else {
                Decision::Reject(RejectReason::Stale {
                    stored: cur_state,
                    stored_observed_at: cur_at,
                })
            }
        }
    }
}

/// Single point of truth for an order's provider-side lifecycle state.
///
/// Callers serialize access per order with [`super::OrderLockRegistry`];
/// the store itself performs plain read-modify-write.
pub struct ReferenceStateStore {
    orders: Arc<dyn OrderStore>,
}

impl ReferenceStateStore {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }

    fn meta_keys(kind: EntityKind) -> (&'static str, &'static str, &'static str) {
        match kind {
            EntityKind::Reference => (
                "gateway_reference_id",
                "gateway_reference_state",
                "gateway_reference_observed_at",
            ),
            EntityKind::Authorization => (
                "gateway_authorization_id",
                "gateway_authorization_state",
                "gateway_authorization_observed_at",
            ),
            EntityKind::Capture => (
                "gateway_capture_id",
                "gateway_capture_state",
                "gateway_capture_observed_at",
            ),
            EntityKind::Refund => unreachable!("refunds are stored as a set"),
        }
    }

    /// Reads the stored state of a single-slot entity.
    ///
    /// Refunds are a set, not a slot; use [`Self::refunds`] for them.
    pub async fn get_state(
        &self,
        order_id: OrderId,
        kind: EntityKind,
    ) -> Result<Option<StoredEntity>, DomainError> {
        if kind == EntityKind::Refund {
            return Ok(None);
        }
        let (id_key, state_key, at_key) = Self::meta_keys(kind);

        let Some(id) = self.orders.get_meta(order_id, id_key).await? else {
            return Ok(None);
        };
        let state = self
            .orders
            .get_meta(order_id, state_key)
            .await?
            .ok_or_else(|| corrupt_slot(order_id, state_key))?;
        let observed_at = self
            .orders
            .get_meta(order_id, at_key)
            .await?
            .ok_or_else(|| corrupt_slot(order_id, at_key))?;

        Ok(Some(StoredEntity {
            id,
            state: EntityState::parse(kind, &state)?,
            observed_at: Timestamp::parse_rfc3339(&observed_at)
                .map_err(|_| corrupt_slot(order_id, at_key))?,
        }))
    }

    /// Reads the stored refund set, insertion-ordered by refund ID.
    pub async fn refunds(&self, order_id: OrderId) -> Result<Vec<RefundEntry>, DomainError> {
        let ids = self.refund_ids(order_id).await?;
        let states = self.refund_states(order_id).await?;

        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            let record = states
                .get(&id)
                .ok_or_else(|| corrupt_slot(order_id, META_REFUND_STATES))?;
            entries.push(RefundEntry {
                state: EntityState::parse(EntityKind::Refund, &record.state)?,
                observed_at: Timestamp::parse_rfc3339(&record.observed_at)
                    .map_err(|_| corrupt_slot(order_id, META_REFUND_STATES))?,
                id,
            });
        }
        Ok(entries)
    }

    /// Applies one reported transition under the conflict policy.
    ///
    /// Business-state conflicts come back as `Rejected`, never as `Err`;
    /// `Err` means the order store itself is unavailable or corrupt.
    pub async fn apply(
        &self,
        order_id: OrderId,
        update: EntityUpdate,
        observed_at: Timestamp,
    ) -> Result<ApplyResult, DomainError> {
        let result = match &update {
            EntityUpdate::Refund { .. } => self.apply_refund(order_id, &update, observed_at).await?,
            _ => self.apply_slot(order_id, &update, observed_at).await?,
        };

        let mut events = Vec::new();
        if let TransitionOutcome::Accepted { state_changed, .. } = &result {
            events.push(ReconciliationEvent {
                order_id,
                update: update.clone(),
                observed_at,
                state_changed: *state_changed,
            });

            // A completed capture settles its parent authorization; the
            // provider does not always send the closing notification.
            if let EntityUpdate::Capture { state: CaptureState::Completed, .. } = &update {
                if let Some(cascade) = self.close_authorization(order_id, observed_at).await? {
                    events.push(cascade);
                }
            }
        }

        Ok(ApplyResult { outcome: result, events })
    }

    /// Assembles the read-side snapshot record.
    pub async fn snapshot(&self, order_id: OrderId) -> Result<ReferenceSnapshot, DomainError> {
        let reference = self.get_state(order_id, EntityKind::Reference).await?;
        let authorization = self.get_state(order_id, EntityKind::Authorization).await?;
        let capture = self.get_state(order_id, EntityKind::Capture).await?;
        let refund_ids = self.refund_ids(order_id).await?;

        Ok(ReferenceSnapshot {
            reference_id: reference.as_ref().map(|e| e.id.clone()),
            reference_state: reference.map(|e| e.state.as_str().to_string()),
            authorization_id: authorization.as_ref().map(|e| e.id.clone()),
            authorization_state: authorization.map(|e| e.state.as_str().to_string()),
            capture_id: capture.as_ref().map(|e| e.id.clone()),
            capture_state: capture.map(|e| e.state.as_str().to_string()),
            refund_ids,
        })
    }

    /// Records the API variant chosen at reference creation.
    ///
    /// Immutable once set: re-recording the same value is a no-op,
    /// recording a different one is an error.
    pub async fn record_variant(
        &self,
        order_id: OrderId,
        variant: ApiVariant,
    ) -> Result<(), DomainError> {
        match self.variant(order_id).await? {
            None => {
                self.orders
                    .set_meta(order_id, META_API_VARIANT, variant.as_str())
                    .await
            }
            Some(stored) if stored == variant => Ok(()),
            Some(stored) => Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Order {} was created under the {} API and cannot move to {}",
                    order_id, stored, variant
                ),
            )),
        }
    }

    /// Reads the recorded API variant, if the order has a reference.
    pub async fn variant(&self, order_id: OrderId) -> Result<Option<ApiVariant>, DomainError> {
        match self.orders.get_meta(order_id, META_API_VARIANT).await? {
            Some(raw) => Ok(Some(raw.parse().map_err(DomainError::from)?)),
            None => Ok(None),
        }
    }

    async fn apply_slot(
        &self,
        order_id: OrderId,
        update: &EntityUpdate,
        observed_at: Timestamp,
    ) -> Result<TransitionOutcome, DomainError> {
        let kind = update.kind();
        let current = self.get_state(order_id, kind).await?;

        if let Some(stored) = &current {
            if stored.id != update.id_str() {
                return Ok(TransitionOutcome::Rejected(RejectReason::IdMismatch {
                    stored_id: stored.id.clone(),
                    reported_id: update.id_str().to_string(),
                }));
            }
        }

        let decision = decide(
            current.as_ref().map(|s| (s.state, s.observed_at)),
            (update.state(), observed_at),
        );

        match decision {
            Decision::Accept { state_changed } => {
                let (id_key, state_key, at_key) = Self::meta_keys(kind);
                self.orders
                    .set_meta(order_id, id_key, update.id_str())
                    .await?;
                self.orders
                    .set_meta(order_id, state_key, update.state().as_str())
                    .await?;
                self.orders
                    .set_meta(order_id, at_key, &observed_at.to_rfc3339())
                    .await?;
                Ok(TransitionOutcome::Accepted {
                    previous: current.map(|s| s.state),
                    state_changed,
                })
            }
            Decision::Reject(reason) => Ok(TransitionOutcome::Rejected(reason)),
        }
    }

    async fn apply_refund(
        &self,
        order_id: OrderId,
        update: &EntityUpdate,
        observed_at: Timestamp,
    ) -> Result<TransitionOutcome, DomainError> {
        let refund_id = update.id_str().to_string();
        let mut ids = self.refund_ids(order_id).await?;
        let mut states = self.refund_states(order_id).await?;

        let current = match states.get(&refund_id) {
            Some(record) => Some((
                EntityState::parse(EntityKind::Refund, &record.state)?,
                Timestamp::parse_rfc3339(&record.observed_at)
                    .map_err(|_| corrupt_slot(order_id, META_REFUND_STATES))?,
            )),
            None => None,
        };

        match decide(current, (update.state(), observed_at)) {
            Decision::Accept { state_changed } => {
                let previous = current.map(|(state, _)| state);
                if !ids.contains(&refund_id) {
                    ids.push(refund_id.clone());
                    self.orders
                        .set_meta(
                            order_id,
                            META_REFUND_IDS,
                            &serde_json::to_string(&ids).map_err(internal)?,
                        )
                        .await?;
                }
                states.insert(
                    refund_id,
                    RefundRecord {
                        state: update.state().as_str().to_string(),
                        observed_at: observed_at.to_rfc3339(),
                    },
                );
                self.orders
                    .set_meta(
                        order_id,
                        META_REFUND_STATES,
                        &serde_json::to_string(&states).map_err(internal)?,
                    )
                    .await?;
                Ok(TransitionOutcome::Accepted { previous, state_changed })
            }
            Decision::Reject(reason) => Ok(TransitionOutcome::Rejected(reason)),
        }
    }

    /// Closes the stored authorization after a completed capture. Returns
    /// the cascade event when the authorization actually moved.
    async fn close_authorization(
        &self,
        order_id: OrderId,
        observed_at: Timestamp,
    ) -> Result<Option<ReconciliationEvent>, DomainError> {
        let Some(stored) = self.get_state(order_id, EntityKind::Authorization).await? else {
            return Ok(None);
        };
        if stored.state.is_terminal() {
            return Ok(None);
        }

        let update = EntityUpdate::Authorization {
            id: AuthorizationId::new(stored.id)?,
            state: AuthorizationState::Closed,
        };
        match self.apply_slot(order_id, &update, observed_at).await? {
            TransitionOutcome::Accepted { state_changed, .. } => Ok(Some(ReconciliationEvent {
                order_id,
                update,
                observed_at,
                state_changed,
            })),
            TransitionOutcome::Rejected(_) => Ok(None),
        }
    }

    async fn refund_ids(&self, order_id: OrderId) -> Result<Vec<String>, DomainError> {
        match self.orders.get_meta(order_id, META_REFUND_IDS).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(internal),
            None => Ok(Vec::new()),
        }
    }

    async fn refund_states(
        &self,
        order_id: OrderId,
    ) -> Result<BTreeMap<String, RefundRecord>, DomainError> {
        match self.orders.get_meta(order_id, META_REFUND_STATES).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(internal),
            None => Ok(BTreeMap::new()),
        }
    }
}

fn corrupt_slot(order_id: OrderId, key: &str) -> DomainError {
    DomainError::new(
        ErrorCode::InternalError,
        format!("Order {} has a corrupt reference slot near '{}'", order_id, key),
    )
}

fn internal(err: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::InternalError, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryOrderStore;
    use crate::domain::foundation::{CaptureId, ReferenceId, RefundId};
    use crate::domain::reconciliation::states::{ReferenceState, RefundState};

    fn store() -> ReferenceStateStore {
        ReferenceStateStore::new(Arc::new(InMemoryOrderStore::new()))
    }

    fn reference(id: &str, state: ReferenceState) -> EntityUpdate {
        EntityUpdate::Reference { id: ReferenceId::new(id).unwrap(), state }
    }

    fn authorization(id: &str, state: AuthorizationState) -> EntityUpdate {
        EntityUpdate::Authorization { id: AuthorizationId::new(id).unwrap(), state }
    }

    fn capture(id: &str, state: CaptureState) -> EntityUpdate {
        EntityUpdate::Capture { id: CaptureId::new(id).unwrap(), state }
    }

    fn refund(id: &str, state: RefundState) -> EntityUpdate {
        EntityUpdate::Refund { id: RefundId::new(id).unwrap(), state }
    }

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_unix(secs)
    }

    // ── decide: the pure policy ─────────────────────────────────────────

    #[test]
    fn decide_accepts_first_report() {
        let d = decide(None, (ReferenceState::Pending.into(), at(10)));
        assert_eq!(d, Decision::Accept { state_changed: true });
    }

    #[test]
    fn decide_accepts_more_terminal_even_if_earlier() {
        // Terminal-wins-over-late: a capture completion timestamped before
        // the stored pending report still lands.
        let d = decide(
            Some((CaptureState::Pending.into(), at(100))),
            (CaptureState::Completed.into(), at(50)),
        );
        assert_eq!(d, Decision::Accept { state_changed: true });
    }

    #[test]
    fn decide_rejects_equal_stage_earlier_observation() {
        let d = decide(
            Some((ReferenceState::Open.into(), at(100))),
            (ReferenceState::Suspended.into(), at(50)),
        );
        assert!(matches!(d, Decision::Reject(RejectReason::Stale { .. })));
    }

    #[test]
    fn decide_accepts_equal_stage_later_observation() {
        let d = decide(
            Some((ReferenceState::Open.into(), at(100))),
            (ReferenceState::Suspended.into(), at(150)),
        );
        assert_eq!(d, Decision::Accept { state_changed: true });
    }

    #[test]
    fn decide_flags_pure_timestamp_refresh() {
        let d = decide(
            Some((ReferenceState::Open.into(), at(100))),
            (ReferenceState::Open.into(), at(150)),
        );
        assert_eq!(d, Decision::Accept { state_changed: false });
    }

    #[test]
    fn decide_treats_identical_replay_as_duplicate() {
        let d = decide(
            Some((AuthorizationState::Open.into(), at(100))),
            (AuthorizationState::Open.into(), at(100)),
        );
        assert_eq!(d, Decision::Reject(RejectReason::Duplicate));
    }

    #[test]
    fn decide_never_regresses_a_terminal_state() {
        let d = decide(
            Some((AuthorizationState::Closed.into(), at(100))),
            (AuthorizationState::Open.into(), at(200)),
        );
        assert!(matches!(
            d,
            Decision::Reject(RejectReason::TerminalRegression { .. })
        ));
    }

    #[test]
    fn decide_rejects_nonterminal_regression_as_stale() {
        let d = decide(
            Some((ReferenceState::Open.into(), at(100))),
            (ReferenceState::Pending.into(), at(200)),
        );
        assert!(matches!(d, Decision::Reject(RejectReason::Stale { .. })));
    }

    // ── apply: persistence, identity, cascades ──────────────────────────

    #[tokio::test]
    async fn apply_persists_and_reads_back() {
        let store = store();
        let order_id = OrderId::new();

        let result = store
            .apply(order_id, reference("REF1", ReferenceState::Pending), at(10))
            .await
            .unwrap();
        assert!(result.outcome.is_accepted());
        assert_eq!(result.events.len(), 1);

        let stored = store
            .get_state(order_id, EntityKind::Reference)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, "REF1");
        assert_eq!(stored.state, EntityState::Reference(ReferenceState::Pending));
        assert_eq!(stored.observed_at, at(10));
    }

    #[tokio::test]
    async fn apply_is_idempotent_under_replay() {
        let store = store();
        let order_id = OrderId::new();
        let update = authorization("AUTH1", AuthorizationState::Open);

        let first = store.apply(order_id, update.clone(), at(100)).await.unwrap();
        assert!(first.outcome.is_accepted());

        for _ in 0..3 {
            let replay = store.apply(order_id, update.clone(), at(100)).await.unwrap();
            assert_eq!(
                replay.outcome,
                TransitionOutcome::Rejected(RejectReason::Duplicate)
            );
            assert!(replay.events.is_empty());
        }

        let stored = store
            .get_state(order_id, EntityKind::Authorization)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.state, EntityState::Authorization(AuthorizationState::Open));
        assert_eq!(stored.observed_at, at(100));
    }

    #[tokio::test]
    async fn apply_rejects_mismatched_entity_id_without_mutating() {
        let store = store();
        let order_id = OrderId::new();

        store
            .apply(order_id, authorization("A1", AuthorizationState::Open), at(10))
            .await
            .unwrap();

        let result = store
            .apply(order_id, authorization("A2", AuthorizationState::Closed), at(20))
            .await
            .unwrap();
        assert!(matches!(
            result.outcome,
            TransitionOutcome::Rejected(RejectReason::IdMismatch { ref stored_id, ref reported_id })
                if stored_id == "A1" && reported_id == "A2"
        ));

        let stored = store
            .get_state(order_id, EntityKind::Authorization)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, "A1");
        assert_eq!(stored.state, EntityState::Authorization(AuthorizationState::Open));
    }

    #[tokio::test]
    async fn terminal_state_survives_late_nonterminal_report() {
        let store = store();
        let order_id = OrderId::new();

        store
            .apply(order_id, capture("CAP1", CaptureState::Completed), at(100))
            .await
            .unwrap();

        let late = store
            .apply(order_id, capture("CAP1", CaptureState::Pending), at(500))
            .await
            .unwrap();
        assert!(matches!(
            late.outcome,
            TransitionOutcome::Rejected(RejectReason::TerminalRegression { .. })
        ));

        let stored = store
            .get_state(order_id, EntityKind::Capture)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.state, EntityState::Capture(CaptureState::Completed));
    }

    #[tokio::test]
    async fn completed_capture_closes_open_authorization() {
        let store = store();
        let order_id = OrderId::new();

        store
            .apply(order_id, authorization("AUTH1", AuthorizationState::Open), at(100))
            .await
            .unwrap();

        let result = store
            .apply(order_id, capture("CAP1", CaptureState::Completed), at(200))
            .await
            .unwrap();
        assert!(result.outcome.is_accepted());
        assert_eq!(result.events.len(), 2);
        assert_eq!(result.events[1].update.kind(), EntityKind::Authorization);

        let auth = store
            .get_state(order_id, EntityKind::Authorization)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(auth.state, EntityState::Authorization(AuthorizationState::Closed));
    }

    #[tokio::test]
    async fn declined_capture_leaves_authorization_open() {
        let store = store();
        let order_id = OrderId::new();

        store
            .apply(order_id, authorization("AUTH1", AuthorizationState::Open), at(100))
            .await
            .unwrap();
        let result = store
            .apply(order_id, capture("CAP1", CaptureState::Declined), at(200))
            .await
            .unwrap();
        assert!(result.outcome.is_accepted());
        assert_eq!(result.events.len(), 1);

        let auth = store
            .get_state(order_id, EntityKind::Authorization)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(auth.state, EntityState::Authorization(AuthorizationState::Open));
    }

    #[tokio::test]
    async fn refund_ids_accumulate_never_overwrite() {
        let store = store();
        let order_id = OrderId::new();

        for id in ["R1", "R2", "R3"] {
            let result = store
                .apply(order_id, refund(id, RefundState::Pending), at(10))
                .await
                .unwrap();
            assert!(result.outcome.is_accepted());
        }

        let refunds = store.refunds(order_id).await.unwrap();
        let ids: Vec<_> = refunds.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["R1", "R2", "R3"]);
    }

    #[tokio::test]
    async fn refund_state_advances_per_refund() {
        let store = store();
        let order_id = OrderId::new();

        store
            .apply(order_id, refund("R1", RefundState::Pending), at(10))
            .await
            .unwrap();
        store
            .apply(order_id, refund("R2", RefundState::Pending), at(11))
            .await
            .unwrap();
        store
            .apply(order_id, refund("R1", RefundState::Completed), at(20))
            .await
            .unwrap();

        let refunds = store.refunds(order_id).await.unwrap();
        assert_eq!(refunds[0].state, EntityState::Refund(RefundState::Completed));
        assert_eq!(refunds[1].state, EntityState::Refund(RefundState::Pending));
        // The set did not grow from the state update.
        assert_eq!(refunds.len(), 2);
    }

    #[tokio::test]
    async fn variant_is_immutable_once_recorded() {
        let store = store();
        let order_id = OrderId::new();

        store.record_variant(order_id, ApiVariant::Current).await.unwrap();
        assert_eq!(
            store.variant(order_id).await.unwrap(),
            Some(ApiVariant::Current)
        );

        // Same value is a no-op.
        store.record_variant(order_id, ApiVariant::Current).await.unwrap();
        // A different value is refused.
        assert!(store.record_variant(order_id, ApiVariant::Legacy).await.is_err());
    }

    #[tokio::test]
    async fn snapshot_reflects_all_slots() {
        let store = store();
        let order_id = OrderId::new();

        store
            .apply(order_id, reference("REF1", ReferenceState::Open), at(10))
            .await
            .unwrap();
        store
            .apply(order_id, authorization("AUTH1", AuthorizationState::Open), at(20))
            .await
            .unwrap();
        store
            .apply(order_id, capture("CAP1", CaptureState::Completed), at(30))
            .await
            .unwrap();
        store
            .apply(order_id, refund("R1", RefundState::Completed), at(40))
            .await
            .unwrap();

        let snap = store.snapshot(order_id).await.unwrap();
        assert_eq!(snap.reference_id.as_deref(), Some("REF1"));
        assert_eq!(snap.reference_state.as_deref(), Some("Open"));
        assert_eq!(snap.authorization_id.as_deref(), Some("AUTH1"));
        // Closed by the capture cascade.
        assert_eq!(snap.authorization_state.as_deref(), Some("Closed"));
        assert_eq!(snap.capture_id.as_deref(), Some("CAP1"));
        assert_eq!(snap.capture_state.as_deref(), Some("Completed"));
        assert_eq!(snap.refund_ids, vec!["R1".to_string()]);
    }

    #[tokio::test]
    async fn snapshot_of_untouched_order_is_empty() {
        let snap = store().snapshot(OrderId::new()).await.unwrap();
        assert!(snap.reference_id.is_none());
        assert!(snap.refund_ids.is_empty());
    }

    // ── conflict policy properties ──────────────────────────────────────

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn any_state_of_kind(kind: EntityKind) -> impl Strategy<Value = EntityState> {
            let states: Vec<EntityState> = match kind {
                EntityKind::Reference => [
                    "Pending", "Open", "Suspended", "Closed", "Canceled",
                ]
                .iter()
                .map(|s| EntityState::parse(kind, s).unwrap())
                .collect(),
                EntityKind::Authorization => ["Pending", "Open", "Closed", "Declined"]
                    .iter()
                    .map(|s| EntityState::parse(kind, s).unwrap())
                    .collect(),
                EntityKind::Capture => ["Pending", "Completed", "Closed", "Declined"]
                    .iter()
                    .map(|s| EntityState::parse(kind, s).unwrap())
                    .collect(),
                EntityKind::Refund => ["Pending", "Completed", "Declined"]
                    .iter()
                    .map(|s| EntityState::parse(kind, s).unwrap())
                    .collect(),
            };
            proptest::sample::select(states)
        }

        fn any_kind() -> impl Strategy<Value = EntityKind> {
            proptest::sample::select(vec![
                EntityKind::Reference,
                EntityKind::Authorization,
                EntityKind::Capture,
                EntityKind::Refund,
            ])
        }

        proptest! {
            #[test]
            fn terminal_states_are_never_regressed(
                (cur, new) in any_kind().prop_flat_map(|k| {
                    (any_state_of_kind(k), any_state_of_kind(k))
                }),
                cur_at in 0i64..10_000,
                new_at in 0i64..10_000,
            ) {
                let decision = decide(
                    Some((cur, at(cur_at))),
                    (new, at(new_at)),
                );
                if cur.is_terminal() && new.stage() < cur.stage() {
                    prop_assert!(matches!(decision, Decision::Reject(_)));
                }
            }

            #[test]
            fn accepted_reports_replay_as_duplicates(
                states in any_kind().prop_flat_map(|k| {
                    (proptest::option::of(any_state_of_kind(k)), any_state_of_kind(k))
                }),
                cur_at in 0i64..10_000,
                new_at in 0i64..10_000,
            ) {
                let (cur, new) = states;
                let current = cur.map(|state| (state, at(cur_at)));
                if let Decision::Accept { .. } = decide(current, (new, at(new_at))) {
                    // Replaying exactly what was just accepted is a no-op.
                    prop_assert_eq!(
                        decide(Some((new, at(new_at))), (new, at(new_at))),
                        Decision::Reject(RejectReason::Duplicate)
                    );
                }
            }

            #[test]
            fn strictly_more_terminal_reports_always_land(
                states in any_kind().prop_flat_map(|k| {
                    (any_state_of_kind(k), any_state_of_kind(k))
                }),
                cur_at in 0i64..10_000,
                new_at in 0i64..10_000,
            ) {
                let (cur, new) = states;
                if new.stage() > cur.stage() {
                    let decision = decide(
                        Some((cur, at(cur_at))),
                        (new, at(new_at)),
                    );
                    prop_assert!(matches!(decision, Decision::Accept { .. }), "expected Accept decision");
                }
            }
        }
    }

    // ── the full dual-path scenario ─────────────────────────────────────

    #[tokio::test]
    async fn dual_path_scenario_reconciles() {
        let store = store();
        let order_id = OrderId::new();

        // Reference created.
        store
            .apply(order_id, reference("REF1", ReferenceState::Pending), at(100))
            .await
            .unwrap();

        // Synchronous authorize succeeds at T1.
        let auth = store
            .apply(order_id, authorization("AUTH1", AuthorizationState::Open), at(1000))
            .await
            .unwrap();
        assert!(auth.outcome.is_accepted());

        // Duplicate authorization notification replays T1: no-op.
        let dup = store
            .apply(order_id, authorization("AUTH1", AuthorizationState::Open), at(1000))
            .await
            .unwrap();
        assert_eq!(dup.outcome, TransitionOutcome::Rejected(RejectReason::Duplicate));

        // Capture notification lands at T2 before the synchronous capture
        // call comes back: capture stored, authorization closed.
        let cap = store
            .apply(order_id, capture("CAP1", CaptureState::Completed), at(2000))
            .await
            .unwrap();
        assert!(cap.outcome.is_accepted());
        assert_eq!(cap.events.len(), 2);

        // The synchronous capture result arrives late with T1.5: stale,
        // but the stored state already covers it.
        let late = store
            .apply(order_id, capture("CAP1", CaptureState::Completed), at(1500))
            .await
            .unwrap();
        let TransitionOutcome::Rejected(reason) = &late.outcome else {
            panic!("expected rejection, got {:?}", late.outcome);
        };
        assert!(reason.stored_covers(&CaptureState::Completed.into()));

        let auth = store
            .get_state(order_id, EntityKind::Authorization)
            .await
            .unwrap()
            .unwrap();
        let cap = store
            .get_state(order_id, EntityKind::Capture)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(auth.state, EntityState::Authorization(AuthorizationState::Closed));
        assert_eq!(cap.state, EntityState::Capture(CaptureState::Completed));
    }
}
