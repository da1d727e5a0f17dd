//! HTTP gateway client.
//!
//! One client per API variant; the variant decides endpoint shape,
//! authentication style, and which codec builds and parses bodies. Every
//! body passes through the redacting audit logger before and after the
//! wire.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::adapters::logging::AuditLogger;
use crate::domain::foundation::{AuthorizationId, CaptureId, ReferenceId};
use crate::domain::reconciliation::{Amount, ApiVariant};
use crate::ports::{
    AuthorizationOutcome, CaptureOutcome, CartContext, GatewayClient, GatewayClientFactory,
    GatewayError, IdempotencyToken, ReferenceCreated, ReferenceDetails, RefundOutcome,
};

use super::{current, legacy};

/// Provider error codes that mean a business rejection rather than a
/// malformed request.
const DECLINE_CODES: [&str; 4] = [
    "InvalidPaymentMethod",
    "ProviderRejected",
    "TransactionAmountExceeded",
    "InsufficientFunds",
];

/// Connection settings shared by both variants.
#[derive(Clone)]
pub struct GatewayHttpConfig {
    pub api_base_url: String,
    pub merchant_id: String,
    pub access_key: SecretString,
    pub timeout: Duration,
}

/// HTTP implementation of [`GatewayClient`] for one API variant.
pub struct HttpGatewayClient {
    variant: ApiVariant,
    config: GatewayHttpConfig,
    http: reqwest::Client,
    audit: AuditLogger,
}

impl HttpGatewayClient {
    pub fn new(variant: ApiVariant, config: GatewayHttpConfig, audit: AuditLogger) -> Self {
        Self {
            variant,
            config,
            http: reqwest::Client::new(),
            audit,
        }
    }

    fn url(&self, current_path: &str) -> String {
        match self.variant {
            ApiVariant::Current => format!("{}{}", self.config.api_base_url, current_path),
            ApiVariant::Legacy => format!("{}/legacy", self.config.api_base_url),
        }
    }

    async fn post(
        &self,
        context: &str,
        current_path: &str,
        body: String,
        token: Option<&IdempotencyToken>,
    ) -> Result<String, GatewayError> {
        self.audit.request(context, &body);

        let mut request = self.http.post(self.url(current_path));
        request = match self.variant {
            ApiVariant::Current => {
                let mut r = request
                    .bearer_auth(self.config.access_key.expose_secret())
                    .header(reqwest::header::CONTENT_TYPE, "application/json");
                // The legacy wire carries the token in the body instead.
                if let Some(token) = token {
                    r = r.header("Idempotency-Key", token.as_str());
                }
                r
            }
            ApiVariant::Legacy => request
                .basic_auth(
                    &self.config.merchant_id,
                    Some(self.config.access_key.expose_secret()),
                )
                .header(
                    reqwest::header::CONTENT_TYPE,
                    "application/x-www-form-urlencoded",
                ),
        };

        let response = request
            .timeout(self.config.timeout)
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;

        self.read(context, response).await
    }

    async fn get(&self, context: &str, current_path: &str) -> Result<String, GatewayError> {
        self.audit.request(context, "");
        let response = self
            .http
            .get(self.url(current_path))
            .bearer_auth(self.config.access_key.expose_secret())
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(transport_error)?;
        self.read(context, response).await
    }

    async fn read(
        &self,
        context: &str,
        response: reqwest::Response,
    ) -> Result<String, GatewayError> {
        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        self.audit.response(context, &text);

        if status.is_success() {
            Ok(text)
        } else {
            Err(self.map_failure(status, &text))
        }
    }

    fn map_failure(&self, status: reqwest::StatusCode, body: &str) -> GatewayError {
        let parsed = match self.variant {
            ApiVariant::Current => current::parse_error(body),
            ApiVariant::Legacy => legacy::parse_error(body),
        };
        let (code, message) = parsed.unwrap_or_else(|| {
            (
                status.as_u16().to_string(),
                format!("provider returned HTTP {}", status),
            )
        });

        let error = if status.is_server_error() || status.as_u16() == 429 {
            GatewayError::transient(message)
        } else if status.as_u16() == 401 || status.as_u16() == 403 {
            GatewayError::auth_expired(message)
        } else if status.as_u16() == 402 || DECLINE_CODES.contains(&code.as_str()) {
            GatewayError::declined(message)
        } else {
            tracing::error!(
                status = status.as_u16(),
                provider_code = %code,
                variant = %self.variant,
                "Provider rejected a request as malformed"
            );
            GatewayError::invalid(message)
        };
        error.with_provider_code(code)
    }
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::transient("provider call timed out")
    } else {
        GatewayError::transient(format!("provider call failed: {}", err))
    }
}

#[async_trait]
impl GatewayClient for HttpGatewayClient {
    async fn create_reference(
        &self,
        cart: &CartContext,
    ) -> Result<ReferenceCreated, GatewayError> {
        let body = match self.variant {
            ApiVariant::Current => current::create_reference_body(cart),
            ApiVariant::Legacy => legacy::create_reference_body(cart)?,
        };
        let text = self
            .post("create_reference", "/v2/references", body, None)
            .await?;
        match self.variant {
            ApiVariant::Current => current::parse_reference_created(&text),
            ApiVariant::Legacy => legacy::parse_reference_created(&text),
        }
    }

    async fn authorize(
        &self,
        reference_id: &ReferenceId,
        amount: &Amount,
        token: &IdempotencyToken,
    ) -> Result<AuthorizationOutcome, GatewayError> {
        let body = match self.variant {
            ApiVariant::Current => current::authorize_body(reference_id, amount),
            ApiVariant::Legacy => legacy::authorize_body(reference_id, amount, token)?,
        };
        let text = self
            .post("authorize", "/v2/authorizations", body, Some(token))
            .await?;
        match self.variant {
            ApiVariant::Current => current::parse_authorization(&text),
            ApiVariant::Legacy => legacy::parse_authorization(&text),
        }
    }

    async fn capture(
        &self,
        authorization_id: &AuthorizationId,
        amount: &Amount,
        token: &IdempotencyToken,
    ) -> Result<CaptureOutcome, GatewayError> {
        let body = match self.variant {
            ApiVariant::Current => current::capture_body(authorization_id, amount),
            ApiVariant::Legacy => legacy::capture_body(authorization_id, amount, token)?,
        };
        let text = self.post("capture", "/v2/captures", body, Some(token)).await?;
        match self.variant {
            ApiVariant::Current => current::parse_capture(&text),
            ApiVariant::Legacy => legacy::parse_capture(&text),
        }
    }

    async fn refund(
        &self,
        capture_id: &CaptureId,
        amount: &Amount,
        token: &IdempotencyToken,
    ) -> Result<RefundOutcome, GatewayError> {
        let body = match self.variant {
            ApiVariant::Current => current::refund_body(capture_id, amount),
            ApiVariant::Legacy => legacy::refund_body(capture_id, amount, token)?,
        };
        let text = self.post("refund", "/v2/refunds", body, Some(token)).await?;
        match self.variant {
            ApiVariant::Current => current::parse_refund(&text),
            ApiVariant::Legacy => legacy::parse_refund(&text),
        }
    }

    async fn get_reference_details(
        &self,
        reference_id: &ReferenceId,
    ) -> Result<ReferenceDetails, GatewayError> {
        let text = match self.variant {
            ApiVariant::Current => {
                let path = format!("/v2/references/{}", reference_id);
                self.get("get_reference_details", &path).await?
            }
            ApiVariant::Legacy => {
                let body = legacy::details_body(reference_id)?;
                self.post("get_reference_details", "", body, None).await?
            }
        };
        match self.variant {
            ApiVariant::Current => current::parse_details(&text),
            ApiVariant::Legacy => legacy::parse_details(&text),
        }
    }
}

/// Owns one constructed client per variant.
pub struct HttpGatewayClientFactory {
    legacy: Arc<HttpGatewayClient>,
    current: Arc<HttpGatewayClient>,
}

impl HttpGatewayClientFactory {
    pub fn new(config: GatewayHttpConfig, audit: AuditLogger) -> Self {
        Self {
            legacy: Arc::new(HttpGatewayClient::new(
                ApiVariant::Legacy,
                config.clone(),
                audit.clone(),
            )),
            current: Arc::new(HttpGatewayClient::new(ApiVariant::Current, config, audit)),
        }
    }
}

impl GatewayClientFactory for HttpGatewayClientFactory {
    fn client_for(&self, variant: ApiVariant) -> Arc<dyn GatewayClient> {
        match variant {
            ApiVariant::Legacy => Arc::clone(&self.legacy) as Arc<dyn GatewayClient>,
            ApiVariant::Current => Arc::clone(&self.current) as Arc<dyn GatewayClient>,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::GatewayErrorKind;

    fn client(variant: ApiVariant) -> HttpGatewayClient {
        HttpGatewayClient::new(
            variant,
            GatewayHttpConfig {
                api_base_url: "http://localhost:1".to_string(),
                merchant_id: "M-TEST".to_string(),
                access_key: SecretString::new("key".to_string()),
                timeout: Duration::from_secs(5),
            },
            AuditLogger::disabled(),
        )
    }

    #[test]
    fn server_errors_map_to_transient() {
        let err = client(ApiVariant::Current)
            .map_failure(reqwest::StatusCode::BAD_GATEWAY, "");
        assert_eq!(err.kind, GatewayErrorKind::Transient);

        let err = client(ApiVariant::Current)
            .map_failure(reqwest::StatusCode::TOO_MANY_REQUESTS, "");
        assert_eq!(err.kind, GatewayErrorKind::Transient);
    }

    #[test]
    fn auth_failures_map_to_auth_expired() {
        for status in [reqwest::StatusCode::UNAUTHORIZED, reqwest::StatusCode::FORBIDDEN] {
            let err = client(ApiVariant::Current).map_failure(status, "");
            assert_eq!(err.kind, GatewayErrorKind::AuthExpired);
        }
    }

    #[test]
    fn decline_codes_map_to_declined() {
        let body = r#"{"error":{"code":"InvalidPaymentMethod","message":"card refused"}}"#;
        let err = client(ApiVariant::Current).map_failure(reqwest::StatusCode::BAD_REQUEST, body);
        assert_eq!(err.kind, GatewayErrorKind::Declined);
        assert_eq!(err.provider_code.as_deref(), Some("InvalidPaymentMethod"));
    }

    #[test]
    fn legacy_decline_codes_map_to_declined() {
        let body = "ErrorCode=InsufficientFunds&ErrorMessage=no+funds";
        let err = client(ApiVariant::Legacy).map_failure(reqwest::StatusCode::CONFLICT, body);
        assert_eq!(err.kind, GatewayErrorKind::Declined);
    }

    #[test]
    fn other_client_errors_map_to_invalid() {
        let body = r#"{"error":{"code":"MissingParameter","message":"Amount not set"}}"#;
        let err = client(ApiVariant::Current).map_failure(reqwest::StatusCode::BAD_REQUEST, body);
        assert_eq!(err.kind, GatewayErrorKind::Invalid);
    }

    #[test]
    fn unparsable_error_bodies_fall_back_to_status() {
        let err = client(ApiVariant::Current)
            .map_failure(reqwest::StatusCode::BAD_REQUEST, "<html>oops</html>");
        assert_eq!(err.kind, GatewayErrorKind::Invalid);
        assert_eq!(err.provider_code.as_deref(), Some("400"));
    }
}
