//! Push-notification parsing for both wire formats.
//!
//! The current API pushes JSON; the legacy API pushes form-encoded
//! PascalCase pairs. The payload is sniffed rather than trusting the
//! content type header, and both formats normalize into the same
//! [`Notification`].

use serde::Deserialize;
use thiserror::Error;

use crate::domain::foundation::{
    AuthorizationId, CaptureId, MessageId, OrderId, ReferenceId, RefundId, Timestamp,
};
use crate::domain::reconciliation::{Amount, EntityUpdate, Notification};

/// Why a payload could not be turned into a [`Notification`].
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("payload is not valid {format}: {reason}")]
    Syntax { format: &'static str, reason: String },

    #[error("unknown object type '{0}'")]
    UnknownObjectType(String),

    #[error("field '{field}' is invalid: {reason}")]
    BadField { field: &'static str, reason: String },
}

fn bad_field(field: &'static str, reason: impl ToString) -> ParseError {
    ParseError::BadField { field, reason: reason.to_string() }
}

/// Current-wire JSON shape.
#[derive(Debug, Deserialize)]
struct CurrentWire {
    message_id: String,
    order_id: String,
    object_type: String,
    object_id: String,
    state: String,
    event_time: i64,
    amount: Option<CurrentAmount>,
}

#[derive(Debug, Deserialize)]
struct CurrentAmount {
    value: i64,
    currency: String,
}

/// Legacy-wire form-encoded shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LegacyWire {
    notification_id: String,
    order_id: String,
    notification_type: String,
    object_id: String,
    state: String,
    event_time: i64,
    amount: Option<String>,
    currency: Option<String>,
}

/// Parses a raw, already-verified payload into canonical form.
pub fn parse(payload: &[u8]) -> Result<Notification, ParseError> {
    let looks_like_json = payload
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .map(|b| *b == b'{')
        .unwrap_or(false);

    if looks_like_json {
        parse_current(payload)
    } else {
        parse_legacy(payload)
    }
}

fn parse_current(payload: &[u8]) -> Result<Notification, ParseError> {
    let wire: CurrentWire = serde_json::from_slice(payload).map_err(|e| ParseError::Syntax {
        format: "JSON",
        reason: e.to_string(),
    })?;

    let amount = match wire.amount {
        Some(a) => Some(
            Amount::new(a.value, a.currency).map_err(|e| bad_field("amount", e))?,
        ),
        None => None,
    };

    build(
        &wire.message_id,
        &wire.order_id,
        &wire.object_type,
        &wire.object_id,
        &wire.state,
        wire.event_time,
        amount,
    )
}

fn parse_legacy(payload: &[u8]) -> Result<Notification, ParseError> {
    let wire: LegacyWire =
        serde_urlencoded::from_bytes(payload).map_err(|e| ParseError::Syntax {
            format: "form encoding",
            reason: e.to_string(),
        })?;

    let amount = match (&wire.amount, &wire.currency) {
        (Some(value), Some(currency)) => Some(
            Amount::from_decimal_str(value, currency).map_err(|e| bad_field("Amount", e))?,
        ),
        _ => None,
    };

    // Legacy spells the reference object out in full.
    let object_type = match wire.notification_type.as_str() {
        "OrderReference" => "reference",
        "Authorization" => "authorization",
        "Capture" => "capture",
        "Refund" => "refund",
        other => return Err(ParseError::UnknownObjectType(other.to_string())),
    };

    build(
        &wire.notification_id,
        &wire.order_id,
        object_type,
        &wire.object_id,
        &wire.state,
        wire.event_time,
        amount,
    )
}

fn build(
    message_id: &str,
    order_id: &str,
    object_type: &str,
    object_id: &str,
    state: &str,
    event_time: i64,
    amount: Option<Amount>,
) -> Result<Notification, ParseError> {
    let message_id = MessageId::new(message_id).map_err(|e| bad_field("message_id", e))?;
    let order_id: OrderId = order_id.parse().map_err(|e| bad_field("order_id", e))?;

    let update = match object_type {
        "reference" => EntityUpdate::Reference {
            id: ReferenceId::new(object_id).map_err(|e| bad_field("object_id", e))?,
            state: state.parse().map_err(|e| bad_field("state", e))?,
        },
        "authorization" => EntityUpdate::Authorization {
            id: AuthorizationId::new(object_id).map_err(|e| bad_field("object_id", e))?,
            state: state.parse().map_err(|e| bad_field("state", e))?,
        },
        "capture" => EntityUpdate::Capture {
            id: CaptureId::new(object_id).map_err(|e| bad_field("object_id", e))?,
            state: state.parse().map_err(|e| bad_field("state", e))?,
        },
        "refund" => EntityUpdate::Refund {
            id: RefundId::new(object_id).map_err(|e| bad_field("object_id", e))?,
            state: state.parse().map_err(|e| bad_field("state", e))?,
        },
        other => return Err(ParseError::UnknownObjectType(other.to_string())),
    };

    Ok(Notification {
        message_id,
        order_id,
        update,
        event_at: Timestamp::from_unix(event_time),
        amount,
    })
}
