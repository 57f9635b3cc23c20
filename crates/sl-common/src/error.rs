//! Error types for syslens.
//!
//! This module provides structured error handling with:
//! - Category classification for error grouping
//! - A stable taxonomy matching the probe/analyzer/engine layering
//!
//! Probe-layer failures (`CommandFailed`, `CommandTimeout`, `FileMissing`,
//! `ParseError`) never cross an analyzer boundary; they degrade to
//! `<probe>_error` sentinel fields in the analyzer's output map. Only the
//! engine façade surfaces `InvalidDiagnostic` / `InvalidArgument`, and only
//! inside a success-flagged envelope.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for syslens operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// External command execution errors.
    Command,
    /// Filesystem read errors.
    Io,
    /// Raw-text parsing errors.
    Parse,
    /// Engine façade input validation errors.
    Validation,
    /// Request interrupted before completion.
    Cancelled,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Command => write!(f, "command"),
            ErrorCategory::Io => write!(f, "io"),
            ErrorCategory::Parse => write!(f, "parse"),
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Unified error type for syslens.
#[derive(Error, Debug)]
pub enum Error {
    /// A subprocess exited nonzero or failed to spawn.
    #[error("command failed: {argv:?}: {reason}")]
    CommandFailed { argv: Vec<String>, reason: String },

    /// A subprocess exceeded the per-probe deadline.
    #[error("command timed out: {argv:?}")]
    CommandTimeout { argv: Vec<String> },

    /// A file read failed (missing, unreadable, or not UTF-8).
    #[error("file missing or unreadable: {path}")]
    FileMissing { path: String },

    /// Raw text did not contain a required field.
    #[error("parse error: missing {field} in {raw:?}")]
    ParseError { field: String, raw: String },

    /// The engine entry point received an unusable diagnostic.
    #[error("invalid diagnostic: {0}")]
    InvalidDiagnostic(String),

    /// Options validation failed at the façade boundary.
    #[error("invalid argument {name}: {value}")]
    InvalidArgument { name: String, value: String },

    /// The request was cancelled mid-run; partial results were returned.
    #[error("request cancelled; partial results returned")]
    Partial,
}

impl Error {
    /// Construct a parse error for a required field missing from raw text.
    pub fn missing_field(field: impl Into<String>, raw: impl Into<String>) -> Self {
        let mut raw = raw.into();
        // Keep the evidence short enough to embed in a sentinel string.
        if raw.len() > 200 {
            let mut end = 200;
            while !raw.is_char_boundary(end) {
                end -= 1;
            }
            raw.truncate(end);
        }
        Error::ParseError {
            field: field.into(),
            raw,
        }
    }

    /// The category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::CommandFailed { .. } | Error::CommandTimeout { .. } => ErrorCategory::Command,
            Error::FileMissing { .. } => ErrorCategory::Io,
            Error::ParseError { .. } => ErrorCategory::Parse,
            Error::InvalidDiagnostic(_) | Error::InvalidArgument { .. } => {
                ErrorCategory::Validation
            }
            Error::Partial => ErrorCategory::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let err = Error::CommandTimeout {
            argv: vec!["lspci".into()],
        };
        assert_eq!(err.category(), ErrorCategory::Command);
        assert_eq!(
            Error::FileMissing {
                path: "/proc/cpuinfo".into()
            }
            .category(),
            ErrorCategory::Io
        );
        assert_eq!(
            Error::InvalidArgument {
                name: "components".into(),
                value: "[]".into()
            }
            .category(),
            ErrorCategory::Validation
        );
    }

    #[test]
    fn test_missing_field_truncates_raw() {
        let raw = "x".repeat(500);
        let err = Error::missing_field("model name", raw);
        match err {
            Error::ParseError { raw, .. } => assert_eq!(raw.len(), 200),
            _ => panic!("expected ParseError"),
        }
    }
}
