//! Search query and result types for node matching

use crate::models::Node;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Which matching strategy produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    ExactLocation,
    PartialName,
    FuzzyName,
    FilePath,
    Proximity,
    Related,
}

impl MatchType {
    /// Tie-break rank when scores are equal: lower sorts first.
    pub const fn priority(self) -> u8 {
        match self {
            MatchType::ExactLocation => 0,
            MatchType::PartialName => 1,
            MatchType::FuzzyName => 2,
            MatchType::FilePath => 3,
            MatchType::Proximity => 4,
            MatchType::Related => 5,
        }
    }
}

/// A scored candidate node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub node: Node,
    /// In `[0, 1]`
    pub score: f64,
    pub match_type: MatchType,
    pub details: String,
}

impl MatchResult {
    pub fn new(node: &Node, score: f64, match_type: MatchType, details: impl Into<String>) -> Self {
        Self {
            node: node.clone(),
            score: score.clamp(0.0, 1.0),
            match_type,
            details: details.into(),
        }
    }

    /// Ranking order: score descending, then match-type priority.
    pub fn ranking(a: &MatchResult, b: &MatchResult) -> Ordering {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.match_type.priority().cmp(&b.match_type.priority()))
    }
}

/// Input for intelligent search. Every strategy whose input is present runs.
///
/// # Examples
///
/// ```rust
/// use codetrail_core::models::MatchQuery;
///
/// let query = MatchQuery::new()
///     .with_text("handler")
///     .with_file_path("src/server.rs")
///     .with_line_number(40);
/// assert!(query.has_location());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchQuery {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub line_number: Option<u32>,
    /// Maximum number of results (all when unset)
    #[serde(default)]
    pub limit: Option<usize>,
}

impl MatchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_file_path(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }

    pub fn with_line_number(mut self, line_number: u32) -> Self {
        self.line_number = Some(line_number);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Non-empty trimmed query text, if any
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// Non-empty trimmed file path, if any
    pub fn file_path(&self) -> Option<&str> {
        self.file_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// Exact-location search needs both a path and a line
    pub fn has_location(&self) -> bool {
        self.file_path().is_some() && self.line_number.is_some()
    }
}
