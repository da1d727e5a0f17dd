//! Reconciliation command handlers.
//!
//! The synchronous reconciler (create/authorize/capture/refund/refresh)
//! and the asynchronous notification handler. Both funnel every state
//! report through the reference state store under the per-order lock.

mod authorize;
mod capture;
mod create_reference;
mod errors;
mod handle_notification;
mod refresh;
mod refund;

#[cfg(test)]
pub(crate) mod testing;

pub use authorize::{AuthorizeCommand, AuthorizeHandler, AuthorizeResult};
pub use capture::{CaptureCommand, CaptureHandler, CaptureResult};
pub use create_reference::{
    CreateReferenceCommand, CreateReferenceHandler, CreateReferenceResult,
};
pub use errors::ReconcileError;
pub use handle_notification::{
    HandleNotificationCommand, HandleNotificationHandler, NotificationDisposition,
    NotificationError,
};
pub use refresh::RefreshReferenceHandler;
pub use refund::{RefundCommand, RefundHandler, RefundResult};
