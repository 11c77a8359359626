use std::path::PathBuf;

use thiserror::Error;

use crate::model::ValidationResult;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum ZbrsError {
    /// Unreachable host, non-2xx status, timeout, oversized payload or an
    /// unparsable response body.
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Invalid manifest at {url}: {} error(s)", result.errors.len())]
    InvalidManifest { url: String, result: ValidationResult },

    #[error("Integrity check failed for {location}: expected {expected}, got {actual}")]
    Integrity {
        location: String,
        expected: String,
        actual: String,
    },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ZbrsError {
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the failure happened while talking to a remote source.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

pub type Result<T> = std::result::Result<T, ZbrsError>;
