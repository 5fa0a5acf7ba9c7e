//! Storage Layer
//!
//! This module handles graph persistence:
//!
//! - `GraphStore` trait that `GraphManager` saves and loads through
//! - `JsonFileStore`: one JSON file per graph in a directory (default backend)
//! - `MemoryStore`: process-local map for tests and embedding hosts
//!
//! # Architecture
//!
//! Graphs are persisted whole. Backends never see partial updates, so a
//! stored graph is always one that passed through the graph primitives.

mod error;
mod graph_store;
mod json_file_store;
mod memory_store;

pub use error::StorageError;
pub use graph_store::GraphStore;
pub use json_file_store::JsonFileStore;
pub use memory_store::MemoryStore;
