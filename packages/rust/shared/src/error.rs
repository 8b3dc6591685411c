//! Error types for LeadSync.
//!
//! Library crates use [`LeadSyncError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all LeadSync operations.
#[derive(Debug, thiserror::Error)]
pub enum LeadSyncError {
    /// Configuration loading error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A required header label is absent from the destination sheet.
    #[error("column {header:?} not found in header row")]
    MissingColumn { header: String },

    /// Transport-level HTTP failure.
    #[error("network error: {0}")]
    Network(String),

    /// A lead feed answered, but not with usable data.
    #[error("feed error ({source_name}): {message}")]
    Feed {
        source_name: String,
        message: String,
    },

    /// Response body could not be decoded.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Spreadsheet API error.
    #[error("sheet error: {0}")]
    Sheet(String),

    /// Credential loading or token exchange error.
    #[error("auth error: {0}")]
    Auth(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LeadSyncError>;

impl LeadSyncError {
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

    /// Create a feed error tagged with the feed's display name.
    pub fn feed(source_name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Feed {
            source_name: source_name.into(),
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
