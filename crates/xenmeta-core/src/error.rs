//! Error types for the xenmeta core library.

use std::path::PathBuf;

/// The main error type for xenmeta operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error with optional path context.
    #[error("I/O error{}: {source}", path.as_ref().map(|p| format!(" at '{}'", p.display())).unwrap_or_default())]
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },

    /// Invalid configuration supplied by the caller.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// An external inventory query failed.
    ///
    /// Covers launch failures, non-zero exit codes, and unreadable output.
    /// Always fatal to the run: a partial export cannot be trusted.
    #[error("query error: {message}")]
    Query { message: String },

    /// Error rendering the export document.
    #[error("serialize error: {message}")]
    Serialize { message: String },
}

/// A specialized Result type for xenmeta operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an I/O error with path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: Some(path.into()),
        }
    }

    /// Create an I/O error without path context.
    pub fn io_simple(source: std::io::Error) -> Self {
        Self::Io { source, path: None }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an external-query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialize(message: impl Into<String>) -> Self {
        Self::Serialize {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::io_simple(source)
    }
}
