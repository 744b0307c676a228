//! Unified error types for the roster workspace.
//!
//! The query and registry errors (`InvalidFilter`, `NameConflict`,
//! `Cancelled`) are always returned to the immediate caller; nothing in the
//! workspace retries them or downgrades them to a log line.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::ContainerId;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum RosterError {
    /// A filter key is not recognised, or a recognised key carries a value
    /// that cannot be evaluated.
    #[error("{}", invalid_filter_message(.key, .value))]
    InvalidFilter {
        /// Offending filter key.
        key: String,
        /// Offending value, when the key itself was valid.
        value: Option<String>,
    },

    /// A name is already reserved by a different container.
    #[error("the container name \"{name}\" is already in use by container \"{holder}\"")]
    NameConflict {
        /// Canonical name that was requested.
        name: String,
        /// Container currently holding the name.
        holder: ContainerId,
    },

    /// A container name is empty or otherwise unusable.
    #[error("invalid container name: \"{name}\"")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// A container reference could not be resolved.
    #[error("no such container: {reference}")]
    NoSuchContainer {
        /// Identifier, prefix, or name that was looked up.
        reference: String,
    },

    /// The caller cancelled the operation before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl RosterError {
    /// Builds an error for an unrecognised filter key.
    pub fn invalid_filter_key(key: impl Into<String>) -> Self {
        Self::InvalidFilter {
            key: key.into(),
            value: None,
        }
    }

    /// Builds an error for a recognised key with an unusable value.
    pub fn invalid_filter_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidFilter {
            key: key.into(),
            value: Some(value.into()),
        }
    }
}

/// Renders `invalid filter 'key'` or `invalid filter 'key=value'`.
#[allow(clippy::ref_option)]
fn invalid_filter_message(key: &str, value: &Option<String>) -> String {
    match value {
        Some(value) => format!("invalid filter '{key}={value}'"),
        None => format!("invalid filter '{key}'"),
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, RosterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_filter_key_names_the_key() {
        let err = RosterError::invalid_filter_key("bogus");
        assert_eq!(err.to_string(), "invalid filter 'bogus'");
    }

    #[test]
    fn invalid_filter_value_names_key_and_value() {
        let err = RosterError::invalid_filter_value("status", "sleeping");
        assert_eq!(err.to_string(), "invalid filter 'status=sleeping'");
    }

    #[test]
    fn name_conflict_names_the_holder() {
        let err = RosterError::NameConflict {
            name: "/web".into(),
            holder: ContainerId::new("abc123"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/web"), "got: {msg}");
        assert!(msg.contains("abc123"), "got: {msg}");
    }
}
