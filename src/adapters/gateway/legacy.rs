//! Legacy-API wire codec: form-encoded, PascalCase keys, one action
//! endpoint.
//!
//! Responses come back in the same key=value encoding as requests.
//! Multi-valued fields (refunds) use `|`-separated lists.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    AuthorizationId, CaptureId, ReferenceId, RefundId, Timestamp,
};
use crate::ports::{
    AuthorizationOutcome, CaptureOutcome, CartContext, GatewayError, IdempotencyToken,
    ReferenceCreated, ReferenceDetails, RefundOutcome,
};
use crate::domain::reconciliation::Amount;

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateReferenceRequest<'a> {
    action: &'static str,
    merchant_order_id: String,
    amount: String,
    currency: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    buyer_email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seller_note: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct MoneyActionRequest<'a> {
    action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    authorization_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    capture_id: Option<&'a str>,
    amount: String,
    currency: &'a str,
    idempotency_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ReferenceResponse {
    reference_id: String,
    state: String,
    event_time: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthorizationResponse {
    authorization_id: String,
    state: String,
    amount: String,
    currency: String,
    event_time: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CaptureResponse {
    capture_id: String,
    state: String,
    amount: String,
    currency: String,
    event_time: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RefundResponse {
    refund_id: String,
    state: String,
    amount: String,
    currency: String,
    event_time: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetailsResponse {
    reference_id: String,
    state: String,
    event_time: i64,
    authorization_id: Option<String>,
    authorization_state: Option<String>,
    capture_id: Option<String>,
    capture_state: Option<String>,
    refund_ids: Option<String>,
    refund_states: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorResponse {
    error_code: String,
    error_message: String,
}

pub(super) fn create_reference_body(cart: &CartContext) -> Result<String, GatewayError> {
    encode(&CreateReferenceRequest {
        action: "CreateOrderReference",
        merchant_order_id: cart.order_id.to_string(),
        amount: cart.total.to_decimal_string(),
        currency: cart.total.currency(),
        buyer_email: cart.customer_email.as_deref(),
        seller_note: cart.seller_note.as_deref(),
    })
}

pub(super) fn authorize_body(
    reference_id: &ReferenceId,
    amount: &Amount,
    token: &IdempotencyToken,
) -> Result<String, GatewayError> {
    encode(&MoneyActionRequest {
        action: "Authorize",
        reference_id: Some(reference_id.as_str()),
        authorization_id: None,
        capture_id: None,
        amount: amount.to_decimal_string(),
        currency: amount.currency(),
        idempotency_token: token.as_str(),
    })
}

pub(super) fn capture_body(
    authorization_id: &AuthorizationId,
    amount: &Amount,
    token: &IdempotencyToken,
) -> Result<String, GatewayError> {
    encode(&MoneyActionRequest {
        action: "Capture",
        reference_id: None,
        authorization_id: Some(authorization_id.as_str()),
        capture_id: None,
        amount: amount.to_decimal_string(),
        currency: amount.currency(),
        idempotency_token: token.as_str(),
    })
}

pub(super) fn refund_body(
    capture_id: &CaptureId,
    amount: &Amount,
    token: &IdempotencyToken,
) -> Result<String, GatewayError> {
    encode(&MoneyActionRequest {
        action: "Refund",
        reference_id: None,
        authorization_id: None,
        capture_id: Some(capture_id.as_str()),
        amount: amount.to_decimal_string(),
        currency: amount.currency(),
        idempotency_token: token.as_str(),
    })
}

pub(super) fn details_body(reference_id: &ReferenceId) -> Result<String, GatewayError> {
    #[derive(Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct DetailsRequest<'a> {
        action: &'static str,
        reference_id: &'a str,
    }
    encode(&DetailsRequest {
        action: "GetOrderReferenceDetails",
        reference_id: reference_id.as_str(),
    })
}

pub(super) fn parse_reference_created(body: &str) -> Result<ReferenceCreated, GatewayError> {
    let wire: ReferenceResponse = decode(body)?;
    Ok(ReferenceCreated {
        reference_id: ReferenceId::new(wire.reference_id).map_err(bad_payload)?,
        state: wire.state.parse().map_err(bad_payload)?,
        observed_at: Timestamp::from_unix(wire.event_time),
    })
}

pub(super) fn parse_authorization(body: &str) -> Result<AuthorizationOutcome, GatewayError> {
    let wire: AuthorizationResponse = decode(body)?;
    Ok(AuthorizationOutcome {
        authorization_id: AuthorizationId::new(wire.authorization_id).map_err(bad_payload)?,
        state: wire.state.parse().map_err(bad_payload)?,
        amount: Amount::from_decimal_str(&wire.amount, &wire.currency).map_err(bad_payload)?,
        observed_at: Timestamp::from_unix(wire.event_time),
    })
}

pub(super) fn parse_capture(body: &str) -> Result<CaptureOutcome, GatewayError> {
    let wire: CaptureResponse = decode(body)?;
    Ok(CaptureOutcome {
        capture_id: CaptureId::new(wire.capture_id).map_err(bad_payload)?,
        state: wire.state.parse().map_err(bad_payload)?,
        amount: Amount::from_decimal_str(&wire.amount, &wire.currency).map_err(bad_payload)?,
        observed_at: Timestamp::from_unix(wire.event_time),
    })
}

pub(super) fn parse_refund(body: &str) -> Result<RefundOutcome, GatewayError> {
    let wire: RefundResponse = decode(body)?;
    Ok(RefundOutcome {
        refund_id: RefundId::new(wire.refund_id).map_err(bad_payload)?,
        state: wire.state.parse().map_err(bad_payload)?,
        amount: Amount::from_decimal_str(&wire.amount, &wire.currency).map_err(bad_payload)?,
        observed_at: Timestamp::from_unix(wire.event_time),
    })
}

pub(super) fn parse_details(body: &str) -> Result<ReferenceDetails, GatewayError> {
    let wire: DetailsResponse = decode(body)?;

    let authorization = match (wire.authorization_id, wire.authorization_state) {
        (Some(id), Some(state)) => Some((
            AuthorizationId::new(id).map_err(bad_payload)?,
            state.parse().map_err(bad_payload)?,
        )),
        _ => None,
    };
    let capture = match (wire.capture_id, wire.capture_state) {
        (Some(id), Some(state)) => Some((
            CaptureId::new(id).map_err(bad_payload)?,
            state.parse().map_err(bad_payload)?,
        )),
        _ => None,
    };

    let refunds = match (wire.refund_ids, wire.refund_states) {
        (Some(ids), Some(states)) => {
            let ids: Vec<&str> = ids.split('|').filter(|s| !s.is_empty()).collect();
            let states: Vec<&str> = states.split('|').filter(|s| !s.is_empty()).collect();
            if ids.len() != states.len() {
                return Err(GatewayError::invalid(
                    "RefundIds and RefundStates lists do not line up",
                ));
            }
            ids.into_iter()
                .zip(states)
                .map(|(id, state)| -> Result<_, GatewayError> {
                    Ok((
                        RefundId::new(id).map_err(bad_payload)?,
                        state.parse().map_err(bad_payload)?,
                    ))
                })
                .collect::<Result<Vec<_>, _>>()?
        }
        _ => Vec::new(),
    };

    Ok(ReferenceDetails {
        reference_id: ReferenceId::new(wire.reference_id).map_err(bad_payload)?,
        reference_state: wire.state.parse().map_err(bad_payload)?,
        authorization,
        capture,
        refunds,
        observed_at: Timestamp::from_unix(wire.event_time),
    })
}

/// Pulls the provider error code out of an error response body.
pub(super) fn parse_error(body: &str) -> Option<(String, String)> {
    serde_urlencoded::from_str::<ErrorResponse>(body)
        .ok()
        .map(|e| (e.error_code, e.error_message))
}

fn encode<T: Serialize>(request: &T) -> Result<String, GatewayError> {
    serde_urlencoded::to_string(request)
        .map_err(|e| GatewayError::invalid(format!("request encoding failed: {}", e)))
}

fn decode<'a, T: Deserialize<'a>>(body: &'a str) -> Result<T, GatewayError> {
    serde_urlencoded::from_str(body)
        .map_err(|e| GatewayError::invalid(format!("unparsable provider response: {}", e)))
}

fn bad_payload(err: impl std::fmt::Display) -> GatewayError {
    GatewayError::invalid(format!("provider response failed validation: {}", err))
}
