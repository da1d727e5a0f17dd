//! Foundation value objects shared across the domain.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{AuthorizationId, CaptureId, MessageId, OrderId, ReferenceId, RefundId};
pub use state_machine::{Lifecycle, LifecycleStage};
pub use timestamp::Timestamp;
