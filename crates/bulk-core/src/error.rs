//! Error types for bulk-core

use std::path::PathBuf;

/// Result type for bulk-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in bulk-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing checkout, malformed template, bad command input
    #[error("{message}")]
    Config { message: String },

    /// The remote answered with an error status
    #[error("remote returned HTTP {status} for {url}")]
    Remote { url: String, status: u16 },

    /// The request never produced a usable response
    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Filter expression failed to parse
    #[error("query parse error at offset {position}: {message}")]
    Query { position: usize, message: String },
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn http(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Http {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn query(position: usize, message: impl Into<String>) -> Self {
        Self::Query {
            position,
            message: message.into(),
        }
    }
}
