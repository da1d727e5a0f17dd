//! Transition reports and outcomes for the reference state store.

use crate::domain::foundation::{
    AuthorizationId, CaptureId, ReferenceId, RefundId, Timestamp,
};

use super::states::{
    AuthorizationState, CaptureState, EntityKind, EntityState, ReferenceState, RefundState,
};

/// A reported state change for one provider entity, with its ID and new
/// state paired by construction so a mismatched kind is unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityUpdate {
    Reference { id: ReferenceId, state: ReferenceState },
    Authorization { id: AuthorizationId, state: AuthorizationState },
    Capture { id: CaptureId, state: CaptureState },
    Refund { id: RefundId, state: RefundState },
}

impl EntityUpdate {
    /// Returns the entity kind of this update.
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityUpdate::Reference { .. } => EntityKind::Reference,
            EntityUpdate::Authorization { .. } => EntityKind::Authorization,
            EntityUpdate::Capture { .. } => EntityKind::Capture,
            EntityUpdate::Refund { .. } => EntityKind::Refund,
        }
    }

    /// Returns the reported entity ID as a string slice.
    pub fn id_str(&self) -> &str {
        match self {
            EntityUpdate::Reference { id, .. } => id.as_str(),
            EntityUpdate::Authorization { id, .. } => id.as_str(),
            EntityUpdate::Capture { id, .. } => id.as_str(),
            EntityUpdate::Refund { id, .. } => id.as_str(),
        }
    }

    /// Returns the reported state in kind-erased form.
    pub fn state(&self) -> EntityState {
        match self {
            EntityUpdate::Reference { state, .. } => (*state).into(),
            EntityUpdate::Authorization { state, .. } => (*state).into(),
            EntityUpdate::Capture { state, .. } => (*state).into(),
            EntityUpdate::Refund { state, .. } => (*state).into(),
        }
    }
}

/// What the store did with a reported transition.
///
/// Rejection is a normal, expected outcome of racing update paths, never
/// an error: duplicate and stale reports are acknowledged successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The report was newer or more terminal than what was stored; the
    /// store was updated.
    Accepted {
        /// What the slot held before, if anything.
        previous: Option<EntityState>,
        /// False when only the observation timestamp moved forward and
        /// the state value itself is unchanged. Side effects key on this.
        state_changed: bool,
    },
    /// The report was not applied; stored state is untouched.
    Rejected(RejectReason),
}

impl TransitionOutcome {
    /// Checks whether the report was applied.
    pub fn is_accepted(&self) -> bool {
        matches!(self, TransitionOutcome::Accepted { .. })
    }
}

/// Why a reported transition was not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Same lifecycle stage as stored but observed earlier.
    Stale {
        stored: EntityState,
        stored_observed_at: Timestamp,
    },
    /// Identical to the stored state and observation time; a replay.
    Duplicate,
    /// Would move an absorbing state back to an earlier stage.
    TerminalRegression { stored: EntityState },
    /// The slot already holds a different entity ID; a protocol fault on
    /// the reporting side.
    IdMismatch {
        stored_id: String,
        reported_id: String,
    },
}

impl RejectReason {
    /// Checks if the stored state already sits at or past the stage the
    /// rejected report carried. Synchronous callers use this to report
    /// success when the provider-confirmed state arrived first by the
    /// asynchronous path.
    pub fn stored_covers(&self, reported: &EntityState) -> bool {
        match self {
            RejectReason::Duplicate => true,
            RejectReason::Stale { stored, .. }
            | RejectReason::TerminalRegression { stored } => stored.stage() >= reported.stage(),
            RejectReason::IdMismatch { .. } => false,
        }
    }
}
