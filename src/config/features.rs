//! Feature flags

use serde::Deserialize;

/// Runtime feature flags.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureFlags {
    /// Emit redacted provider request/response bodies to the audit log.
    #[serde(default)]
    pub debug_logging: bool,
}
