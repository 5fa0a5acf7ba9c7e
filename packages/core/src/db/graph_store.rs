//! GraphStore Trait - Persistence Abstraction Layer
//!
//! This module defines the `GraphStore` trait that abstracts how code trail
//! graphs are persisted. `GraphManager` only talks to this trait, so hosts
//! can plug in their own storage (workspace state, a database, a remote
//! service) without touching graph logic.
//!
//! # Design Decisions
//!
//! 1. **Whole-Graph Granularity**: A graph is saved and loaded as one unit,
//!    including every node with all its fields
//! 2. **Async-First**: Backends may do disk or network I/O
//! 3. **Typed Errors**: `StorageError::GraphNotFound` lets callers tell a
//!    missing graph from a broken backend
//!
//! # Examples
//!
//! ```rust,no_run
//! use codetrail_core::db::{GraphStore, JsonFileStore};
//! use codetrail_core::models::Graph;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store: Arc<dyn GraphStore> = Arc::new(JsonFileStore::new("./.codetrail/graphs"));
//!
//! let graph = Graph::new("Auth flow");
//! store.save(&graph).await?;
//!
//! let loaded = store.load(&graph.id).await?;
//! assert_eq!(loaded.name, "Auth flow");
//! # Ok(())
//! # }
//! ```

use crate::db::StorageError;
use crate::models::{Graph, GraphMetadata};
use async_trait::async_trait;

/// Abstraction layer for graph persistence
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow usage in async contexts where
/// futures may be moved between threads.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Persist the full graph, replacing any previous version with the same ID
    async fn save(&self, graph: &Graph) -> Result<(), StorageError>;

    /// Load a graph by ID
    ///
    /// # Errors
    ///
    /// - `GraphNotFound` if nothing is stored under `id`
    /// - `Serialization` if the stored data is corrupt
    async fn load(&self, id: &str) -> Result<Graph, StorageError>;

    /// Delete a stored graph
    ///
    /// Returns whether a graph existed. Deleting an unknown ID succeeds.
    async fn delete(&self, id: &str) -> Result<bool, StorageError>;

    /// Metadata of every stored graph, most recently updated first
    async fn list(&self) -> Result<Vec<GraphMetadata>, StorageError>;
}

/// Sort metadata most recently updated first, ties broken by name
pub(crate) fn sort_metadata(items: &mut [GraphMetadata]) {
    items.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.name.cmp(&b.name))
    });
}
