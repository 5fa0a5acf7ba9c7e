//! Business Services
//!
//! This module contains the core business logic services:
//!
//! - `GraphManager` - Graph lifecycle, persistence and the write token
//! - `NodeManager` - Node CRUD, hierarchy edits, focus and relocation
//! - `LocationTracker` - Code hashing and drift detection
//! - `NodeMatcher` - Ranked node search
//! - `graph_export` - JSON and Markdown outline export/import
//!
//! Services coordinate between the storage layer, the file reader and the
//! in-memory graph, implementing the business rules on top of them.

pub mod error;
pub mod graph_export;
pub mod graph_manager;
pub mod location_tracker;
pub mod node_manager;
pub mod node_matcher;

pub use error::{ErrorKind, Result, TrailError};
pub use graph_export::{export_graph, import_graph, ExportFormat};
pub use graph_manager::{GraphManager, GraphValidationReport, GraphWriteGuard, NodeValidationResult};
pub use location_tracker::{LocationTracker, CODE_HASH_LENGTH};
pub use node_manager::NodeManager;
pub use node_matcher::{score_file_path, NodeMatcher};
