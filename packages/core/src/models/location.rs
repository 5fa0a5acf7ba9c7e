//! Location and relocation result types

use serde::{Deserialize, Serialize};
use std::fmt;

/// A file path plus 1-based line number
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub file_path: String,
    pub line_number: u32,
}

impl Location {
    pub fn new(file_path: impl Into<String>, line_number: u32) -> Self {
        Self {
            file_path: file_path.into(),
            line_number: line_number.max(1),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_path, self.line_number)
    }
}

/// Qualitative certainty of a location check, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    /// The recorded line still holds the recorded code
    Exact,
    /// The code was found a few lines away
    High,
    /// The code was found further away, inside the search radius
    Medium,
    /// Only a similar (not identical) line was found
    Low,
    /// The code could not be found, or the file could not be read
    Failed,
}

impl ConfidenceLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            ConfidenceLevel::Exact => "exact",
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Failed => "failed",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of checking a node's recorded location against the file
///
/// Validation never mutates the node: when the code has drifted,
/// `suggested_location` says where it went and the caller decides whether
/// to commit the move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationValidation {
    pub is_valid: bool,
    pub confidence: ConfidenceLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_location: Option<Location>,
}

impl LocationValidation {
    pub fn exact() -> Self {
        Self {
            is_valid: true,
            confidence: ConfidenceLevel::Exact,
            reason: None,
            suggested_location: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            confidence: ConfidenceLevel::Failed,
            reason: Some(reason.into()),
            suggested_location: None,
        }
    }

    pub fn relocated(
        confidence: ConfidenceLevel,
        suggested: Location,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            is_valid: false,
            confidence,
            reason: Some(reason.into()),
            suggested_location: Some(suggested),
        }
    }
}

/// Where to navigate for a node, after validating its location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_location: Option<Location>,
    pub validation: LocationValidation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        assert_eq!(Location::new("src/a.rs", 12).to_string(), "src/a.rs:12");
    }

    #[test]
    fn test_location_floors_line_at_one() {
        assert_eq!(Location::new("a.rs", 0).line_number, 1);
    }

    #[test]
    fn test_confidence_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ConfidenceLevel::Medium).unwrap(),
            "\"medium\""
        );
        assert_eq!(ConfidenceLevel::Failed.to_string(), "failed");
    }
}
