//! Lifecycle trait for provider entity states.
//!
//! Every provider-side entity (reference, authorization, capture, refund)
//! moves along the same coarse progression: pending, then open/in-flight,
//! then a terminal settled or failed state. The conflict policy in the
//! reference state store compares states by that progression rather than by
//! enumerating pairwise transitions, because notifications may legitimately
//! skip stages (a capture confirmation can arrive before the authorization
//! one).

/// Coarse position of a state along an entity's lifecycle.
///
/// Ordered: `Pending < Open < Terminal`. A state with a higher stage is
/// "more terminal" and wins conflicts against lower-stage reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleStage {
    /// Entity created, provider has not settled it either way.
    Pending,
    /// Entity is live (funds held, reference open).
    Open,
    /// Entity reached an absorbing state (settled, closed, or declined).
    Terminal,
}

/// Trait for status enums that represent points in an entity lifecycle.
///
/// Implementors map each state to its [`LifecycleStage`]; ordering and
/// terminality checks come for free.
pub trait Lifecycle: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns the lifecycle stage of this state.
    fn stage(&self) -> LifecycleStage;

    /// Checks if this state is absorbing: once stored, no lower-stage
    /// report may overwrite it.
    fn is_terminal(&self) -> bool {
        self.stage() == LifecycleStage::Terminal
    }

    /// Checks if this state is at least as far along as `prior`.
    ///
    /// Equal stages count as following; the store breaks equal-stage ties
    /// with observation timestamps.
    fn is_at_least(&self, prior: &Self) -> bool {
        self.stage() >= prior.stage()
    }

    /// Checks if this state is strictly further along than `prior`.
    fn is_beyond(&self, prior: &Self) -> bool {
        self.stage() > prior.stage()
    }
}
