//! HTTP response DTOs for the reconciler endpoints.

use serde::Serialize;

use crate::domain::reconciliation::ReferenceSnapshot;

/// Acknowledgment body for the notification endpoint.
#[derive(Debug, Serialize)]
pub struct NotificationAckResponse {
    /// What happened to the message: "applied", "already_seen",
    /// "stale_or_duplicate", or "unprocessable". Informational only; the
    /// provider keys off the status code.
    pub disposition: &'static str,
}

/// Read-side reference record for one order.
#[derive(Debug, Serialize)]
pub struct ReferenceSnapshotResponse {
    pub reference_id: Option<String>,
    pub reference_state: Option<String>,
    pub authorization_id: Option<String>,
    pub authorization_state: Option<String>,
    pub capture_id: Option<String>,
    pub capture_state: Option<String>,
    pub refund_ids: Vec<String>,
}

impl From<ReferenceSnapshot> for ReferenceSnapshotResponse {
    fn from(snapshot: ReferenceSnapshot) -> Self {
        Self {
            reference_id: snapshot.reference_id,
            reference_state: snapshot.reference_state,
            authorization_id: snapshot.authorization_id,
            authorization_state: snapshot.authorization_state,
            capture_id: snapshot.capture_id,
            capture_state: snapshot.capture_state,
            refund_ids: snapshot.refund_ids,
        }
    }
}

/// Error body returned for rejected requests.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
