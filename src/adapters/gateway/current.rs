//! Current-API wire codec: JSON, snake_case keys.

use serde::Deserialize;
use serde_json::json;

use crate::domain::foundation::{
    AuthorizationId, CaptureId, ReferenceId, RefundId, Timestamp,
};
use crate::ports::{
    AuthorizationOutcome, CaptureOutcome, CartContext, GatewayError, ReferenceCreated,
    ReferenceDetails, RefundOutcome,
};
use crate::domain::reconciliation::Amount;

#[derive(Debug, Deserialize)]
struct WireAmount {
    value: i64,
    currency: String,
}

impl WireAmount {
    fn into_amount(self) -> Result<Amount, GatewayError> {
        Amount::new(self.value, self.currency)
            .map_err(|e| GatewayError::invalid(format!("provider sent bad amount: {}", e)))
    }
}

#[derive(Debug, Deserialize)]
struct WireReference {
    reference_id: String,
    state: String,
    event_time: i64,
}

#[derive(Debug, Deserialize)]
struct WireAuthorization {
    authorization_id: String,
    state: String,
    amount: WireAmount,
    event_time: i64,
}

#[derive(Debug, Deserialize)]
struct WireCapture {
    capture_id: String,
    state: String,
    amount: WireAmount,
    event_time: i64,
}

#[derive(Debug, Deserialize)]
struct WireRefund {
    refund_id: String,
    state: String,
    amount: WireAmount,
    event_time: i64,
}

#[derive(Debug, Deserialize)]
struct WireChild {
    id: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct WireDetails {
    reference_id: String,
    state: String,
    event_time: i64,
    #[serde(default)]
    authorization: Option<WireChild>,
    #[serde(default)]
    capture: Option<WireChild>,
    #[serde(default)]
    refunds: Vec<WireChild>,
}

#[derive(Debug, Deserialize)]
struct WireErrorEnvelope {
    error: WireError,
}

#[derive(Debug, Deserialize)]
struct WireError {
    code: String,
    message: String,
}

pub(super) fn create_reference_body(cart: &CartContext) -> String {
    json!({
        "merchant_order_id": cart.order_id.to_string(),
        "amount": { "value": cart.total.minor(), "currency": cart.total.currency() },
        "buyer": cart.customer_email,
        "seller_note": cart.seller_note,
    })
    .to_string()
}

pub(super) fn authorize_body(reference_id: &ReferenceId, amount: &Amount) -> String {
    json!({
        "reference_id": reference_id.as_str(),
        "amount": { "value": amount.minor(), "currency": amount.currency() },
    })
    .to_string()
}

pub(super) fn capture_body(authorization_id: &AuthorizationId, amount: &Amount) -> String {
    json!({
        "authorization_id": authorization_id.as_str(),
        "amount": { "value": amount.minor(), "currency": amount.currency() },
    })
    .to_string()
}

pub(super) fn refund_body(capture_id: &CaptureId, amount: &Amount) -> String {
    json!({
        "capture_id": capture_id.as_str(),
        "amount": { "value": amount.minor(), "currency": amount.currency() },
    })
    .to_string()
}

pub(super) fn parse_reference_created(body: &str) -> Result<ReferenceCreated, GatewayError> {
    let wire: WireReference = parse_json(body)?;
    Ok(ReferenceCreated {
        reference_id: ReferenceId::new(wire.reference_id).map_err(bad_payload)?,
        state: wire.state.parse().map_err(bad_payload)?,
        observed_at: Timestamp::from_unix(wire.event_time),
    })
}

pub(super) fn parse_authorization(body: &str) -> Result<AuthorizationOutcome, GatewayError> {
    let wire: WireAuthorization = parse_json(body)?;
    Ok(AuthorizationOutcome {
        authorization_id: AuthorizationId::new(wire.authorization_id).map_err(bad_payload)?,
        state: wire.state.parse().map_err(bad_payload)?,
        amount: wire.amount.into_amount()?,
        observed_at: Timestamp::from_unix(wire.event_time),
    })
}

pub(super) fn parse_capture(body: &str) -> Result<CaptureOutcome, GatewayError> {
    let wire: WireCapture = parse_json(body)?;
    Ok(CaptureOutcome {
        capture_id: CaptureId::new(wire.capture_id).map_err(bad_payload)?,
        state: wire.state.parse().map_err(bad_payload)?,
        amount: wire.amount.into_amount()?,
        observed_at: Timestamp::from_unix(wire.event_time),
    })
}

pub(super) fn parse_refund(body: &str) -> Result<RefundOutcome, GatewayError> {
    let wire: WireRefund = parse_json(body)?;
    Ok(RefundOutcome {
        refund_id: RefundId::new(wire.refund_id).map_err(bad_payload)?,
        state: wire.state.parse().map_err(bad_payload)?,
        amount: wire.amount.into_amount()?,
        observed_at: Timestamp::from_unix(wire.event_time),
    })
}

pub(super) fn parse_details(body: &str) -> Result<ReferenceDetails, GatewayError> {
    let wire: WireDetails = parse_json(body)?;

    let authorization = wire
        .authorization
        .map(|child| -> Result<_, GatewayError> {
            Ok((
                AuthorizationId::new(child.id).map_err(bad_payload)?,
                child.state.parse().map_err(bad_payload)?,
            ))
        })
        .transpose()?;
    let capture = wire
        .capture
        .map(|child| -> Result<_, GatewayError> {
            Ok((
                CaptureId::new(child.id).map_err(bad_payload)?,
                child.state.parse().map_err(bad_payload)?,
            ))
        })
        .transpose()?;
    let refunds = wire
        .refunds
        .into_iter()
        .map(|child| -> Result<_, GatewayError> {
            Ok((
                RefundId::new(child.id).map_err(bad_payload)?,
                child.state.parse().map_err(bad_payload)?,
            ))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ReferenceDetails {
        reference_id: ReferenceId::new(wire.reference_id).map_err(bad_payload)?,
        reference_state: wire.state.parse().map_err(bad_payload)?,
        authorization,
        capture,
        refunds,
        observed_at: Timestamp::from_unix(wire.event_time),
    })
}

/// Pulls the provider error code out of an error response body, if the
/// body follows the documented envelope.
pub(super) fn parse_error(body: &str) -> Option<(String, String)> {
    serde_json::from_str::<WireErrorEnvelope>(body)
        .ok()
        .map(|e| (e.error.code, e.error.message))
}

fn parse_json<'a, T: Deserialize<'a>>(body: &'a str) -> Result<T, GatewayError> {
    serde_json::from_str(body)
        .map_err(|e| GatewayError::invalid(format!("unparsable provider response: {}", e)))
}

fn bad_payload(err: impl std::fmt::Display) -> GatewayError {
    GatewayError::invalid(format!("provider response failed validation: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::OrderId;
    use crate::domain::reconciliation::{AuthorizationState, CaptureState, ReferenceState};

    #[test]
    fn create_reference_body_carries_note_and_buyer() {
        let cart = CartContext {
            order_id: OrderId::new(),
            total: Amount::new(1999, "USD").unwrap(),
            customer_email: Some("buyer@example.com".to_string()),
            seller_note: Some("gift wrap".to_string()),
        };
        let body = create_reference_body(&cart);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["amount"]["value"], 1999);
        assert_eq!(value["seller_note"], "gift wrap");
        assert_eq!(value["buyer"], "buyer@example.com");
    }

    #[test]
    fn parses_reference_created() {
        let body = r#"{"reference_id":"REF1","state":"Pending","event_time":1700000000}"#;
        let created = parse_reference_created(body).unwrap();
        assert_eq!(created.reference_id.as_str(), "REF1");
        assert_eq!(created.state, ReferenceState::Pending);
    }

    #[test]
    fn parses_authorization_with_amount() {
        let body = r#"{"authorization_id":"AUTH1","state":"Open","amount":{"value":1999,"currency":"USD"},"event_time":1700000001}"#;
        let auth = parse_authorization(body).unwrap();
        assert_eq!(auth.state, AuthorizationState::Open);
        assert_eq!(auth.amount.minor(), 1999);
    }

    #[test]
    fn parses_details_with_children() {
        let body = r#"{
            "reference_id": "REF1",
            "state": "Open",
            "event_time": 1700000002,
            "authorization": {"id": "AUTH1", "state": "Closed"},
            "capture": {"id": "CAP1", "state": "Completed"},
            "refunds": [{"id": "R1", "state": "Pending"}]
        }"#;
        let details = parse_details(body).unwrap();
        assert_eq!(details.capture.unwrap().1, CaptureState::Completed);
        assert_eq!(details.refunds.len(), 1);
    }

    #[test]
    fn parses_details_without_children() {
        let body = r#"{"reference_id":"REF1","state":"Pending","event_time":1}"#;
        let details = parse_details(body).unwrap();
        assert!(details.authorization.is_none());
        assert!(details.refunds.is_empty());
    }

    #[test]
    fn malformed_response_is_an_invalid_error() {
        let err = parse_capture("{").unwrap_err();
        assert_eq!(err.kind, crate::ports::GatewayErrorKind::Invalid);
    }

    #[test]
    fn extracts_error_envelope() {
        let body = r#"{"error":{"code":"InvalidPaymentMethod","message":"declined by issuer"}}"#;
        let (code, message) = parse_error(body).unwrap();
        assert_eq!(code, "InvalidPaymentMethod");
        assert!(message.contains("issuer"));
        assert!(parse_error("not json").is_none());
    }
}
