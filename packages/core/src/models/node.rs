//! Node Data Structures
//!
//! This module defines the `Node` struct: a single bookmark into source code
//! with its place in the trail hierarchy.
//!
//! # Architecture
//!
//! - **Location**: `file_path` + 1-based `line_number` where the bookmark points
//! - **Anchor**: `code_snippet` and its `code_hash`, used to re-find the code
//!   after the file has been edited
//! - **Hierarchy**: `parent_id` / `child_ids` links, kept consistent by
//!   [`Graph`](crate::models::Graph)
//!
//! # Examples
//!
//! ```rust
//! use codetrail_core::models::Node;
//!
//! let node = Node::new(
//!     "Request entry point".to_string(),
//!     "src/server.rs".to_string(),
//!     42,
//! );
//! assert!(node.is_root());
//! assert_eq!(node.location().line_number, 42);
//! ```

use crate::models::Location;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Longest accepted node or graph name, in characters
pub const MAX_NAME_LENGTH: usize = 200;

/// Validation errors for node input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Name is {length} characters long, the maximum is {max}")]
    NameTooLong { length: usize, max: usize },

    #[error("File path cannot be empty")]
    EmptyFilePath,

    #[error("Invalid line number: {0}")]
    InvalidLineNumber(String),

    #[error("Cannot place node {node_id} under {parent_id}: it would create a cycle")]
    CycleDetected { node_id: String, parent_id: String },
}

/// A bookmarked code location with hierarchy links.
///
/// # Fields
///
/// - `id`: Unique identifier (UUID v4), never changes after creation
/// - `name`: Display label, non-empty after trimming
/// - `file_path` / `line_number`: Recorded location (line is 1-based)
/// - `code_snippet`: Text of the line(s) at creation or last relocation
/// - `code_hash`: 16-character digest of the normalized snippet
/// - `parent_id`: Parent node in the same graph, `None` for roots
/// - `child_ids`: Ordered children, each pointing back through `parent_id`
/// - `validation_warning`: Set when the last location check failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique identifier
    pub id: String,

    /// Display label
    pub name: String,

    /// Recorded file path (as given by the host, usually workspace-relative)
    pub file_path: String,

    /// Recorded 1-based line number
    #[serde(deserialize_with = "deserialize_line_number")]
    pub line_number: u32,

    /// Cached text of the bookmarked line(s)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,

    /// Digest of the normalized snippet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_hash: Option<String>,

    /// Parent node ID (`None` for roots)
    #[serde(default)]
    pub parent_id: Option<String>,

    /// Ordered child node IDs
    #[serde(default)]
    pub child_ids: Vec<String>,

    /// Result of the last failed location check
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_warning: Option<String>,

    /// Creation timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Node {
    /// Create a new root node with an auto-generated UUID.
    ///
    /// Inputs are stored as given; use [`validate_name`],
    /// [`validate_file_path`] and [`coerce_line_number`] on untrusted input.
    pub fn new(name: String, file_path: String, line_number: u32) -> Self {
        Self::new_with_id(Uuid::new_v4().to_string(), name, file_path, line_number)
    }

    /// Create a new root node with a caller-chosen ID (used by import remapping).
    pub fn new_with_id(id: String, name: String, file_path: String, line_number: u32) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            file_path,
            line_number: line_number.max(1),
            code_snippet: None,
            code_hash: None,
            parent_id: None,
            child_ids: Vec::new(),
            validation_warning: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style snippet and hash assignment
    pub fn with_code(mut self, snippet: Option<String>, hash: Option<String>) -> Self {
        self.code_snippet = snippet;
        self.code_hash = hash;
        self
    }

    /// Whether this node has no parent
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// The recorded location
    pub fn location(&self) -> Location {
        Location::new(self.file_path.clone(), self.line_number)
    }

    /// Copy of this node under a fresh ID, with no parent and no children.
    ///
    /// Name, location, snippet and hash are carried over; timestamps are new.
    pub fn duplicate(&self) -> Self {
        Self::new(self.name.clone(), self.file_path.clone(), self.line_number)
            .with_code(self.code_snippet.clone(), self.code_hash.clone())
    }

    /// Replace the cached code anchor
    pub fn set_code(&mut self, snippet: Option<String>, hash: Option<String>) {
        self.code_snippet = snippet;
        self.code_hash = hash;
        self.touch();
    }

    /// Move the recorded location
    pub fn set_location(&mut self, file_path: String, line_number: u32) {
        self.file_path = file_path;
        self.line_number = line_number.max(1);
        self.touch();
    }

    /// Bump the modification timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Validate a display name: non-empty after trimming, at most `max` characters.
///
/// Returns the trimmed name. Over-long names are rejected, never truncated.
pub fn validate_name(name: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }

    let length = trimmed.chars().count();
    if length > max {
        return Err(ValidationError::NameTooLong { length, max });
    }

    Ok(trimmed.to_string())
}

/// Validate a file path: non-empty after trimming. Returns the trimmed path.
pub fn validate_file_path(file_path: &str) -> Result<String, ValidationError> {
    let trimmed = file_path.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyFilePath);
    }
    Ok(trimmed.to_string())
}

/// Coerce an integer line number: anything below 1 becomes 1.
///
/// # Examples
///
/// ```
/// use codetrail_core::models::coerce_line_number;
///
/// assert_eq!(coerce_line_number(12), 12);
/// assert_eq!(coerce_line_number(0), 1);
/// assert_eq!(coerce_line_number(-7), 1);
/// ```
pub fn coerce_line_number(raw: i64) -> u32 {
    u32::try_from(raw.max(1)).unwrap_or(u32::MAX)
}

/// Coerce a fractional line number: truncate toward zero, then floor at 1.
///
/// `NaN` becomes 1; values past `u32::MAX` saturate.
pub fn coerce_fractional_line_number(raw: f64) -> u32 {
    if raw.is_nan() || raw < 1.0 {
        return 1;
    }
    // `as` saturates for floats, which is what we want here
    (raw.trunc() as u32).max(1)
}

/// Lenient `lineNumber` deserializer: accepts integers and floats of any sign.
fn deserialize_line_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Number::deserialize(deserializer)?;
    if let Some(int) = value.as_i64() {
        return Ok(coerce_line_number(int));
    }
    if let Some(uint) = value.as_u64() {
        return Ok(u32::try_from(uint).unwrap_or(u32::MAX));
    }
    match value.as_f64() {
        Some(float) => Ok(coerce_fractional_line_number(float)),
        None => Err(serde::de::Error::custom(format!(
            "invalid line number: {}",
            value
        ))),
    }
}

/// Lenient optional `lineNumber` for updates: floats are truncated toward
/// zero and the sign is kept for [`coerce_line_number`] to floor later.
fn deserialize_optional_line_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(value) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Some(int) = value.as_i64() {
        return Ok(Some(int));
    }
    if let Some(uint) = value.as_u64() {
        return Ok(Some(i64::try_from(uint).unwrap_or(i64::MAX)));
    }
    match value.as_f64() {
        // `as` saturates and maps NaN to 0
        Some(float) => Ok(Some(float.trunc() as i64)),
        None => Err(serde::de::Error::custom(format!(
            "invalid line number: {}",
            value
        ))),
    }
}

/// Custom deserializer for optional fields that accepts both plain values and nulls
///
/// Maps the three input shapes to the double-Option pattern:
/// - Missing field → None (don't update)
/// - null → Some(None) (clear the field)
/// - "value" → Some(Some("value")) (set the field)
fn deserialize_optional_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    // Missing field is handled by #[serde(default)] on the struct field
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

/// Partial node update
///
/// Only the fields present are applied. `id`, `created_at`, `parent_id` and
/// `child_ids` are deliberately absent: identity is immutable and hierarchy
/// changes go through the relationship operations of
/// [`NodeManager`](crate::services::NodeManager).
///
/// # Double-Option Pattern
///
/// `code_snippet` and `validation_warning` distinguish three states:
///
/// - `None`: Don't change this field
/// - `Some(None)`: Clear the field
/// - `Some(Some(value))`: Set the field
///
/// # Examples
///
/// ```rust
/// # use codetrail_core::models::NodeUpdate;
/// // Rename only
/// let update = NodeUpdate::new().with_name("Parse request headers".to_string());
///
/// // Drop the cached snippet (the hash is cleared with it)
/// let update = NodeUpdate {
///     code_snippet: Some(None),
///     ..Default::default()
/// };
/// assert!(!update.is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdate {
    /// New display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// New file path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,

    /// New line number (coerced like creation input)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_line_number"
    )]
    pub line_number: Option<i64>,

    /// New snippet; the hash is recomputed from it
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub code_snippet: Option<Option<String>>,

    /// New validation warning
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub validation_warning: Option<Option<String>>,
}

impl NodeUpdate {
    /// Create a new empty NodeUpdate
    pub fn new() -> Self {
        Self::default()
    }

    /// Set name update
    pub fn with_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    /// Set location update
    pub fn with_location(mut self, file_path: String, line_number: i64) -> Self {
        self.file_path = Some(file_path);
        self.line_number = Some(line_number);
        self
    }

    /// Set snippet update (`None` clears the snippet and its hash)
    pub fn with_code_snippet(mut self, snippet: Option<String>) -> Self {
        self.code_snippet = Some(snippet);
        self
    }

    /// Check if update contains any changes
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.file_path.is_none()
            && self.line_number.is_none()
            && self.code_snippet.is_none()
            && self.validation_warning.is_none()
    }
}
