//! Logging adapters - redaction and the provider audit log.

mod redactor;

pub use redactor::{redact, AuditLogger};
