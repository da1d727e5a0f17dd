//! Redaction for provider request/response bodies.
//!
//! Every provider interaction is logged through here when the debug flag
//! is on. Redaction removes the *contents* of buyer-identifying blocks
//! and free-text note fields, keeping the surrounding tags and keys so a
//! log line still shows which fields were present.

use once_cell::sync::Lazy;
use regex::Regex;

/// Replacement for redacted contents.
const PLACEHOLDER: &str = "REMOVED";

/// Tagged blocks whose entire contents are personal data.
const TAGGED_BLOCKS: [&str; 4] = [
    "Buyer",
    "PhysicalDestination",
    "BillingAddress",
    "AuthorizationBillingAddress",
];

/// Free-text note fields, redacted in tagged and key=value encodings.
const NOTE_FIELDS: [&str; 4] = [
    "SellerNote",
    "SellerAuthorizationNote",
    "SellerCaptureNote",
    "SellerRefundNote",
];

/// JSON keys matching the blocks and notes above, current-wire spelling.
const JSON_KEYS: [&str; 8] = [
    "buyer",
    "physical_destination",
    "billing_address",
    "authorization_billing_address",
    "seller_note",
    "seller_authorization_note",
    "seller_capture_note",
    "seller_refund_note",
];

static TAGGED_PATTERNS: Lazy<Vec<(Regex, String)>> = Lazy::new(|| {
    TAGGED_BLOCKS
        .iter()
        .chain(NOTE_FIELDS.iter())
        .map(|tag| {
            let pattern = Regex::new(&format!(r"(?s)(<{tag}>)(.+?)(</{tag}>)"))
                .expect("tag patterns are static");
            (pattern, format!("$1 {PLACEHOLDER} $3"))
        })
        .collect()
});

static QUERY_PATTERNS: Lazy<Vec<(Regex, String)>> = Lazy::new(|| {
    NOTE_FIELDS
        .iter()
        .map(|field| {
            let pattern = Regex::new(&format!(r"({field}=)([^&]*)"))
                .expect("query patterns are static");
            (pattern, format!("${{1}}{PLACEHOLDER}"))
        })
        .collect()
});

/// Redacts a provider message body of either wire format.
///
/// JSON bodies are walked structurally; anything else gets the tagged and
/// key=value patterns.
pub fn redact(body: &str) -> String {
    let trimmed = body.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(mut value) = serde_json::from_str::<serde_json::Value>(body) {
            redact_json(&mut value);
            if let Ok(out) = serde_json::to_string(&value) {
                return out;
            }
        }
    }

    let mut out = body.to_string();
    for (pattern, replacement) in TAGGED_PATTERNS.iter() {
        out = pattern.replace_all(&out, replacement.as_str()).into_owned();
    }
    for (pattern, replacement) in QUERY_PATTERNS.iter() {
        out = pattern.replace_all(&out, replacement.as_str()).into_owned();
    }
    out
}

fn redact_json(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                if JSON_KEYS.contains(&key.as_str()) {
                    *entry = serde_json::Value::String(PLACEHOLDER.to_string());
                } else {
                    redact_json(entry);
                }
            }
        }
        serde_json::Value::Array(items) => {
            for item in items.iter_mut() {
                redact_json(item);
            }
        }
        _ => {}
    }
}

/// Debug-gated audit logger for provider interactions.
///
/// One line per request or response, always redacted, each carrying the
/// caller's context string and a per-transaction correlation prefix so
/// the two sides of one interaction can be paired in the log.
#[derive(Clone)]
pub struct AuditLogger {
    enabled: bool,
    prefix: String,
}

impl AuditLogger {
    /// Creates a logger with a fresh correlation prefix.
    pub fn new(enabled: bool) -> Self {
        let prefix = uuid::Uuid::new_v4().simple().to_string()[..6].to_string();
        Self { enabled, prefix }
    }

    /// Creates a disabled logger; every call is a no-op.
    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Logs an outbound request body.
    pub fn request(&self, context: &str, body: &str) {
        if !self.enabled {
            return;
        }
        tracing::debug!(
            target: "gateway_audit",
            prefix = %self.prefix,
            context = context,
            direction = "request",
            body = %redact(body),
            "Provider interaction"
        );
    }

    /// Logs an inbound response or notification body.
    pub fn response(&self, context: &str, body: &str) {
        if !self.enabled {
            return;
        }
        tracing::debug!(
            target: "gateway_audit",
            prefix = %self.prefix,
            context = context,
            direction = "response",
            body = %redact(body),
            "Provider interaction"
        );
    }
}
