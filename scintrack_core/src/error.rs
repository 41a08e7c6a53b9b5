//! Error types for scintrack configuration.

use thiserror::Error;

/// Errors raised while loading or validating configuration.
///
/// The tracking state machine itself is infallible; only the ambient
/// configuration layer reports errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A parameter is outside its allowed range
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: String,
    },

    /// The configuration file could not be read
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for the expected shape
    #[error("Malformed config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates an invalid-parameter error.
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
