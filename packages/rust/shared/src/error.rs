//! Error types for the entsoe workspace.
//!
//! Library crates use [`EntsoeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Only structural failures are errors. Unresolvable identifiers, oversized
//! time ranges and remote rejections travel as data (sentinels and failure
//! records) and never show up here.

use std::path::PathBuf;

/// Top-level error type for all entsoe operations.
#[derive(Debug, thiserror::Error)]
pub enum EntsoeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to the remote service.
    #[error("network error: {0}")]
    Network(String),

    /// Markup that cannot be structurally interpreted at all.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A packed response bundle that cannot be unpacked.
    #[error("archive error: {0}")]
    Archive(String),

    /// Data validation error (bad timestamp, empty interval, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A query precondition failed before any request was issued.
    #[error("precondition failed: {message}")]
    Precondition { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, EntsoeError>;

impl EntsoeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a precondition error from any displayable message.
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = EntsoeError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = EntsoeError::parse("unexpected end of document");
        assert!(err.to_string().starts_with("parse error:"));

        let err = EntsoeError::precondition("no dataset matches 'foo'");
        assert!(err.to_string().contains("no dataset matches"));
    }
}
