//! Storage Error Types
//!
//! Error types for graph persistence: filesystem failures, serialization
//! failures and lookups of graphs that were never stored.

use std::path::PathBuf;
use thiserror::Error;

/// Graph persistence errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// No graph is stored under this ID
    #[error("Graph not found: {id}")]
    GraphNotFound { id: String },

    /// The graph ID cannot be used as a storage key
    #[error("Invalid graph ID: {id}")]
    InvalidGraphId { id: String },

    /// Filesystem failure
    #[error("Storage I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stored data could not be (de)serialized
    #[error("Failed to serialize graph {id}: {source}")]
    Serialization {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    /// Backend-specific failure
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Create a graph not found error
    pub fn graph_not_found(id: impl Into<String>) -> Self {
        Self::GraphNotFound { id: id.into() }
    }

    /// Create an invalid graph ID error
    pub fn invalid_graph_id(id: impl Into<String>) -> Self {
        Self::InvalidGraphId { id: id.into() }
    }

    /// Create an I/O error with the path it happened at
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error
    pub fn serialization(id: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            id: id.into(),
            source,
        }
    }

    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::GraphNotFound { .. })
    }
}
