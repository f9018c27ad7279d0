// ── Core error types ──
//
// Errors raised by the registries, factories and domain collaborators.
// Registry lookups never fail (a miss is `None`), so everything here
// describes construction, discovery or routing problems.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Discovery errors ─────────────────────────────────────────────
    #[error("Could not build {kind} entity: {reason}")]
    Construction { kind: String, reason: String },

    #[error("Discovery failed for factory {factory}: {reason}")]
    Discovery { factory: String, reason: String },

    // ── Lookup errors ────────────────────────────────────────────────
    #[error("Could not find providers named {names}")]
    ProviderNotFound { names: String },

    #[error("Entity not found: {entity_type} with key {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Collaborator errors ──────────────────────────────────────────
    #[error("Provider {provider}: {message}")]
    Provider { provider: String, message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the error only affects a single item of a discovery
    /// sequence. A scan logs and skips isolated errors; any other error
    /// ends the scan.
    pub fn is_isolated(&self) -> bool {
        matches!(self, Self::Construction { .. })
    }

    pub(crate) fn construction(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Construction {
            kind: kind.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_construction_errors_are_isolated() {
        assert!(CoreError::construction("kodi", "missing port").is_isolated());
        assert!(
            !CoreError::Discovery {
                factory: "chromecast".into(),
                reason: "socket closed".into(),
            }
            .is_isolated()
        );
        assert!(!CoreError::Internal("boom".into()).is_isolated());
    }

    #[test]
    fn provider_not_found_lists_names() {
        let err = CoreError::ProviderNotFound {
            names: "opensubtitles, addic7ed".into(),
        };
        assert_eq!(
            err.to_string(),
            "Could not find providers named opensubtitles, addic7ed"
        );
    }
}
