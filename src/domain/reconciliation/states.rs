//! Canonical state vocabulary for provider entities.
//!
//! These are the states the provider reports for each entity, normalized
//! from both the legacy and current wire formats. The store never sees a
//! provider-specific spelling.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{Lifecycle, LifecycleStage, ValidationError};

/// State of an order reference (the provider-side payment-instrument handle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceState {
    Pending,
    Open,
    Suspended,
    Closed,
    Canceled,
}

impl Lifecycle for ReferenceState {
    fn stage(&self) -> LifecycleStage {
        match self {
            ReferenceState::Pending => LifecycleStage::Pending,
            ReferenceState::Open | ReferenceState::Suspended => LifecycleStage::Open,
            ReferenceState::Closed | ReferenceState::Canceled => LifecycleStage::Terminal,
        }
    }
}

/// State of a hold of funds against a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorizationState {
    Pending,
    Open,
    Closed,
    Declined,
}

impl Lifecycle for AuthorizationState {
    fn stage(&self) -> LifecycleStage {
        match self {
            AuthorizationState::Pending => LifecycleStage::Pending,
            AuthorizationState::Open => LifecycleStage::Open,
            AuthorizationState::Closed | AuthorizationState::Declined => LifecycleStage::Terminal,
        }
    }
}

/// State of a transfer of previously authorized funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureState {
    Pending,
    Completed,
    Closed,
    Declined,
}

impl Lifecycle for CaptureState {
    fn stage(&self) -> LifecycleStage {
        match self {
            CaptureState::Pending => LifecycleStage::Pending,
            CaptureState::Completed | CaptureState::Closed | CaptureState::Declined => {
                LifecycleStage::Terminal
            }
        }
    }
}

/// State of a reversal of a captured amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefundState {
    Pending,
    Completed,
    Declined,
}

impl Lifecycle for RefundState {
    fn stage(&self) -> LifecycleStage {
        match self {
            RefundState::Pending => LifecycleStage::Pending,
            RefundState::Completed | RefundState::Declined => LifecycleStage::Terminal,
        }
    }
}

/// The kind of provider entity a state or update refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Reference,
    Authorization,
    Capture,
    Refund,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Reference => "reference",
            EntityKind::Authorization => "authorization",
            EntityKind::Capture => "capture",
            EntityKind::Refund => "refund",
        };
        write!(f, "{}", s)
    }
}

/// A state of any entity kind, used where the store works generically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityState {
    Reference(ReferenceState),
    Authorization(AuthorizationState),
    Capture(CaptureState),
    Refund(RefundState),
}

impl EntityState {
    /// Returns the entity kind this state belongs to.
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityState::Reference(_) => EntityKind::Reference,
            EntityState::Authorization(_) => EntityKind::Authorization,
            EntityState::Capture(_) => EntityKind::Capture,
            EntityState::Refund(_) => EntityKind::Refund,
        }
    }

    /// Returns the lifecycle stage, regardless of kind.
    pub fn stage(&self) -> LifecycleStage {
        match self {
            EntityState::Reference(s) => s.stage(),
            EntityState::Authorization(s) => s.stage(),
            EntityState::Capture(s) => s.stage(),
            EntityState::Refund(s) => s.stage(),
        }
    }

    /// Checks if the state is absorbing.
    pub fn is_terminal(&self) -> bool {
        self.stage() == LifecycleStage::Terminal
    }

    /// Canonical string rendering, the form persisted in order metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityState::Reference(ReferenceState::Pending) => "Pending",
            EntityState::Reference(ReferenceState::Open) => "Open",
            EntityState::Reference(ReferenceState::Suspended) => "Suspended",
            EntityState::Reference(ReferenceState::Closed) => "Closed",
            EntityState::Reference(ReferenceState::Canceled) => "Canceled",
            EntityState::Authorization(AuthorizationState::Pending) => "Pending",
            EntityState::Authorization(AuthorizationState::Open) => "Open",
            EntityState::Authorization(AuthorizationState::Closed) => "Closed",
            EntityState::Authorization(AuthorizationState::Declined) => "Declined",
            EntityState::Capture(CaptureState::Pending) => "Pending",
            EntityState::Capture(CaptureState::Completed) => "Completed",
            EntityState::Capture(CaptureState::Closed) => "Closed",
            EntityState::Capture(CaptureState::Declined) => "Declined",
            EntityState::Refund(RefundState::Pending) => "Pending",
            EntityState::Refund(RefundState::Completed) => "Completed",
            EntityState::Refund(RefundState::Declined) => "Declined",
        }
    }

    /// Parses the canonical rendering back for a given entity kind.
    pub fn parse(kind: EntityKind, s: &str) -> Result<Self, ValidationError> {
        let unknown = || {
            ValidationError::invalid_format(
                "entity_state",
                format!("unknown {} state '{}'", kind, s),
            )
        };
        Ok(match kind {
            EntityKind::Reference => EntityState::Reference(match s {
                "Pending" => ReferenceState::Pending,
                "Open" => ReferenceState::Open,
                "Suspended" => ReferenceState::Suspended,
                "Closed" => ReferenceState::Closed,
                "Canceled" => ReferenceState::Canceled,
                _ => return Err(unknown()),
            }),
            EntityKind::Authorization => EntityState::Authorization(match s {
                "Pending" => AuthorizationState::Pending,
                "Open" => AuthorizationState::Open,
                "Closed" => AuthorizationState::Closed,
                "Declined" => AuthorizationState::Declined,
                _ => return Err(unknown()),
            }),
            EntityKind::Capture => EntityState::Capture(match s {
                "Pending" => CaptureState::Pending,
                "Completed" => CaptureState::Completed,
                "Closed" => CaptureState::Closed,
                "Declined" => CaptureState::Declined,
                _ => return Err(unknown()),
            }),
            EntityKind::Refund => EntityState::Refund(match s {
                "Pending" => RefundState::Pending,
                "Completed" => RefundState::Completed,
                "Declined" => RefundState::Declined,
                _ => return Err(unknown()),
            }),
        })
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ReferenceState> for EntityState {
    fn from(s: ReferenceState) -> Self {
        EntityState::Reference(s)
    }
}

impl From<AuthorizationState> for EntityState {
    fn from(s: AuthorizationState) -> Self {
        EntityState::Authorization(s)
    }
}

impl From<CaptureState> for EntityState {
    fn from(s: CaptureState) -> Self {
        EntityState::Capture(s)
    }
}

impl From<RefundState> for EntityState {
    fn from(s: RefundState) -> Self {
        EntityState::Refund(s)
    }
}

/// Parses a provider state spelling shared by both wire formats.
impl FromStr for ReferenceState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match EntityState::parse(EntityKind::Reference, s)? {
            EntityState::Reference(state) => Ok(state),
            _ => unreachable!("parse returns the requested kind"),
        }
    }
}

impl FromStr for AuthorizationState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match EntityState::parse(EntityKind::Authorization, s)? {
            EntityState::Authorization(state) => Ok(state),
            _ => unreachable!("parse returns the requested kind"),
        }
    }
}

impl FromStr for CaptureState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match EntityState::parse(EntityKind::Capture, s)? {
            EntityState::Capture(state) => Ok(state),
            _ => unreachable!("parse returns the requested kind"),
        }
    }
}

impl FromStr for RefundState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match EntityState::parse(EntityKind::Refund, s)? {
            EntityState::Refund(state) => Ok(state),
            _ => unreachable!("parse returns the requested kind"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_per_entity() {
        assert!(EntityState::from(ReferenceState::Closed).is_terminal());
        assert!(EntityState::from(AuthorizationState::Declined).is_terminal());
        assert!(EntityState::from(CaptureState::Completed).is_terminal());
        assert!(EntityState::from(RefundState::Completed).is_terminal());

        assert!(!EntityState::from(ReferenceState::Open).is_terminal());
        assert!(!EntityState::from(AuthorizationState::Open).is_terminal());
        assert!(!EntityState::from(CaptureState::Pending).is_terminal());
    }

    #[test]
    fn suspended_shares_the_open_stage() {
        assert_eq!(
            ReferenceState::Suspended.stage(),
            ReferenceState::Open.stage()
        );
    }

    #[test]
    fn canonical_rendering_roundtrips() {
        for (kind, s) in [
            (EntityKind::Reference, "Suspended"),
            (EntityKind::Authorization, "Declined"),
            (EntityKind::Capture, "Completed"),
            (EntityKind::Refund, "Pending"),
        ] {
            let state = EntityState::parse(kind, s).unwrap();
            assert_eq!(state.as_str(), s);
            assert_eq!(state.kind(), kind);
        }
    }

    #[test]
    fn parse_rejects_state_from_wrong_vocabulary() {
        // "Completed" is a capture state, not a reference state.
        assert!(EntityState::parse(EntityKind::Reference, "Completed").is_err());
        assert!(EntityState::parse(EntityKind::Refund, "Open").is_err());
    }

    #[test]
    fn from_str_matches_entity_state_parse() {
        let s: CaptureState = "Closed".parse().unwrap();
        assert_eq!(s, CaptureState::Closed);
        assert!("Sideways".parse::<AuthorizationState>().is_err());
    }
}
