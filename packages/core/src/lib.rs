//! CodeTrail Core Business Logic Layer
//!
//! This crate provides the data model, persistence and services behind
//! CodeTrail: hierarchical graphs of bookmarked code locations that survive
//! edits to the files they point into.
//!
//! # Architecture
//!
//! - **Graph as a value**: every mutation edits a copy of the current graph
//!   and swaps it in, so readers never see a half-applied change
//! - **Single writer**: mutations are serialized through one write token
//! - **Content anchoring**: each node stores a snippet and a short hash of
//!   the normalized code, used to find the code again after it moves
//! - **Pluggable I/O**: storage sits behind [`db::GraphStore`], source reads
//!   behind [`source::FileReader`]
//!
//! # Modules
//!
//! - [`models`] - Data structures (Node, Graph, Location, MatchResult)
//! - [`services`] - Business services (GraphManager, NodeManager, etc.)
//! - [`db`] - Graph persistence (JSON files, in-memory)
//! - [`source`] - Source file access
//! - [`config`] - Runtime configuration
//! - [`utils`] - Text normalization and similarity

pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod source;
pub mod utils;

// Re-export commonly used types
pub use config::TrailConfig;
pub use models::*;
pub use services::*;
