//! HTTP routes for the reconciler.
//!
//! Two endpoints: the provider-facing notification sink and the
//! read-side reference snapshot. Status codes on the notification
//! endpoint are part of the protocol: 200 tells the provider to stop
//! redelivering (including stale and duplicate messages), anything else
//! invites a retry.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::application::handlers::reconciliation::{
    HandleNotificationCommand, HandleNotificationHandler, NotificationDisposition,
    NotificationError,
};
use crate::domain::foundation::OrderId;
use crate::domain::reconciliation::ReferenceStateStore;

use super::dto::{ErrorResponse, NotificationAckResponse, ReferenceSnapshotResponse};

/// Signature header the provider sends with each notification.
pub const SIGNATURE_HEADER: &str = "x-gateway-signature";

/// Shared state for the reconciler routes.
#[derive(Clone)]
pub struct ReconcilerAppState {
    pub notification_handler: Arc<HandleNotificationHandler>,
    pub store: Arc<ReferenceStateStore>,
}

/// Builds the reconciler router.
pub fn router(state: ReconcilerAppState) -> Router {
    Router::new()
        .route("/gateway/notifications", post(handle_notification))
        .route(
            "/orders/:order_id/gateway-reference",
            get(get_reference_snapshot),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// POST /gateway/notifications - provider push endpoint.
async fn handle_notification(
    State(state): State<ReconcilerAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let command = HandleNotificationCommand { payload: body.to_vec(), signature };
    match state.notification_handler.handle(command).await {
        Ok(disposition) => {
            let disposition = match disposition {
                NotificationDisposition::Applied => "applied",
                NotificationDisposition::AlreadySeen => "already_seen",
                NotificationDisposition::StaleOrDuplicate => "stale_or_duplicate",
                NotificationDisposition::Unprocessable => "unprocessable",
            };
            (StatusCode::OK, Json(NotificationAckResponse { disposition })).into_response()
        }
        Err(NotificationError::Unverified(err)) => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse { error: err.to_string() }),
        )
            .into_response(),
        Err(NotificationError::Internal(err)) => {
            tracing::error!(error = %err, "Notification handling hit an internal fault");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse { error: "internal error".to_string() }),
            )
                .into_response()
        }
    }
}

/// GET /orders/{order_id}/gateway-reference - read-side snapshot.
async fn get_reference_snapshot(
    State(state): State<ReconcilerAppState>,
    Path(order_id): Path<String>,
) -> Response {
    let order_id: OrderId = match order_id.parse() {
        Ok(id) => id,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse { error: "malformed order id".to_string() }),
            )
                .into_response()
        }
    };

    match state.store.snapshot(order_id).await {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(ReferenceSnapshotResponse::from(snapshot)),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(order_id = %order_id, error = %err, "Snapshot read failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse { error: "internal error".to_string() }),
            )
                .into_response()
        }
    }
}
