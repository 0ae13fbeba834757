//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or reloading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A rules file was named but does not exist.
    #[error("rules file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Failed to read a file.
    #[error("failed to read {path}")]
    ReadError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON parsing error.
    #[error("failed to parse rules file: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A parsed rule set failed validation.
    #[error("invalid rules: {0}")]
    InvalidRules(#[from] gatehouse_proxy::RuleError),

    /// An environment variable held a value that could not be parsed.
    #[error("failed to parse environment variable {var}: {reason}")]
    EnvParseError {
        /// The environment variable name.
        var: String,
        /// Explanation of the parsing error.
        reason: String,
    },

    /// A required setting was absent.
    #[error("missing required setting: {var}")]
    MissingSetting {
        /// The environment variable name.
        var: String,
    },

    /// The file watcher could not be set up.
    #[error("file watcher error: {0}")]
    Watcher(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Creates an environment parse error.
    pub fn env_parse(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// Creates a missing-setting error.
    pub fn missing(var: impl Into<String>) -> Self {
        Self::MissingSetting { var: var.into() }
    }
}
