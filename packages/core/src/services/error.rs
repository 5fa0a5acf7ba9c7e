//! Service Layer Error Types
//!
//! This module defines the error type returned by `NodeManager` and
//! `GraphManager`. Lower-layer errors (validation, storage, file reads) are
//! chained in with `#[from]`; graph primitive errors are mapped onto the
//! service kinds.

use crate::db::StorageError;
use crate::models::{GraphError, ValidationError};
use crate::source::FileReadError;
use thiserror::Error;

/// Service operation errors
#[derive(Error, Debug)]
pub enum TrailError {
    /// Bad input: empty name, over-long name, empty path, cycles
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Unknown node, parent or graph
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// An ID collided with an existing node
    #[error("Duplicate node ID: {id}")]
    DuplicateId { id: String },

    /// Persistence failure
    #[error("Storage operation failed: {0}")]
    Storage(#[from] StorageError),

    /// Malformed import content
    #[error("Parse error: {0}")]
    Parse(String),

    /// Source file could not be read where no fallback applies
    #[error("File read failed: {0}")]
    FileRead(#[from] FileReadError),
}

/// Coarse error category, for callers that branch on kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    DuplicateId,
    Storage,
    Parse,
    FileRead,
}

impl TrailError {
    /// Create a node not found error
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Node",
            id: id.into(),
        }
    }

    /// Create a "no current graph" error
    pub fn no_current_graph() -> Self {
        Self::NotFound {
            entity: "Current graph",
            id: "none".to_string(),
        }
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::DuplicateId { .. } => ErrorKind::DuplicateId,
            Self::Storage(e) if e.is_not_found() => ErrorKind::NotFound,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Parse(_) => ErrorKind::Parse,
            Self::FileRead(_) => ErrorKind::FileRead,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<GraphError> for TrailError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::DuplicateId(id) => Self::DuplicateId { id },
            GraphError::NodeNotFound(id) => Self::node_not_found(id),
            GraphError::WouldCreateCycle {
                parent_id,
                child_id,
            } => Self::Validation(ValidationError::CycleDetected {
                node_id: child_id,
                parent_id,
            }),
        }
    }
}

/// Result type for service operations
pub type Result<T> = std::result::Result<T, TrailError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_errors_map_to_service_kinds() {
        let err: TrailError = GraphError::NodeNotFound("n1".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Node not found: n1");

        let err: TrailError = GraphError::DuplicateId("n1".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::DuplicateId);

        let err: TrailError = GraphError::WouldCreateCycle {
            parent_id: "a".to_string(),
            child_id: "b".to_string(),
        }
        .into();
        assert!(matches!(
            err,
            TrailError::Validation(ValidationError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_missing_stored_graph_is_not_found() {
        let err: TrailError = StorageError::graph_not_found("g1").into();
        assert!(err.is_not_found());

        let err: TrailError = StorageError::backend("disk on fire").into();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}
