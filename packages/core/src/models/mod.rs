//! Data Models
//!
//! This module contains the core data structures used throughout CodeTrail:
//!
//! - `Node` - A bookmarked code location with hierarchy links
//! - `Graph` - A full hierarchy of nodes plus the focused node
//! - `Location` / `LocationValidation` - Relocation results
//! - `MatchQuery` / `MatchResult` - Node search input and ranked output

mod graph;
mod location;
mod node;
mod search;

pub use graph::{Graph, GraphError, GraphInvariantViolation, GraphMetadata};
pub use location::{ConfidenceLevel, Location, LocationValidation, NavigationResult};
pub use node::{
    coerce_fractional_line_number, coerce_line_number, validate_file_path, validate_name, Node,
    NodeUpdate, ValidationError, MAX_NAME_LENGTH,
};
pub use search::{MatchQuery, MatchResult, MatchType};
