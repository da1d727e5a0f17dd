//! Reconciliation domain - the reference lifecycle engine.

mod amount;
mod context;
mod events;
mod lock;
mod notification;
mod states;
mod store;
mod transition;

pub use amount::Amount;
pub use context::ApiVariant;
pub use events::{ObserverSet, ReconciliationEvent};
pub use lock::OrderLockRegistry;
pub use notification::Notification;
pub use states::{
    AuthorizationState, CaptureState, EntityKind, EntityState, ReferenceState, RefundState,
};
pub use store::{
    ApplyResult, ReferenceSnapshot, ReferenceStateStore, RefundEntry, StoredEntity,
};
pub use transition::{EntityUpdate, RejectReason, TransitionOutcome};
