//! HTTP adapters - Axum routes for the notification sink and the
//! read-side snapshot.

mod dto;
mod routes;

pub use dto::{ErrorResponse, NotificationAckResponse, ReferenceSnapshotResponse};
pub use routes::{router, ReconcilerAppState, SIGNATURE_HEADER};
