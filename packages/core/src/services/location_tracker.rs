//! LocationTracker - Fuzzy Relocation of Bookmarked Code
//!
//! Checks whether a node's recorded location still holds the code that was
//! bookmarked and, when the file has been edited, finds where that code went.
//!
//! # Relocation Strategy
//!
//! 1. Read the file; a missing file or an out-of-range line fails outright
//! 2. Compare the recorded window (as many lines as the snippet has) with
//!    the snippet after whitespace normalization; equal means `exact`
//! 3. Search outward (`+1, -1, +2, -2, ...`) up to `search_radius` lines for a
//!    window whose normalized text equals the snippet or whose hash equals
//!    `code_hash`; `high` confidence within `high_confidence_distance`
//!    lines, `medium` beyond
//! 4. Otherwise suggest the most similar window if its Levenshtein
//!    similarity reaches `fuzzy_match_threshold` (`low`), or fail
//!
//! Validation never mutates: a relocated result carries a
//! `suggested_location` and reports `is_valid = false`.

use crate::config::RelocationConfig;
use crate::models::{ConfidenceLevel, Location, LocationValidation, NavigationResult, Node};
use crate::source::{FileReadError, FileReader};
use crate::utils::{normalize_code, normalized_similarity};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Length of the hex digest kept in `Node::code_hash`
pub const CODE_HASH_LENGTH: usize = 16;

/// Hashes code and validates node locations against current file content
#[derive(Clone)]
pub struct LocationTracker {
    reader: Arc<dyn FileReader>,
    config: RelocationConfig,
}

/// What a recorded node is anchored on
struct Anchor {
    snippet: Option<String>,
    hash: Option<String>,
    line_span: usize,
}

impl Anchor {
    fn from_node(node: &Node) -> Option<Self> {
        let snippet = node
            .code_snippet
            .as_deref()
            .map(normalize_code)
            .filter(|s| !s.is_empty());
        let hash = node.code_hash.clone().filter(|h| !h.is_empty());
        if snippet.is_none() && hash.is_none() {
            return None;
        }

        let line_span = node
            .code_snippet
            .as_deref()
            .map(|s| s.trim().lines().count())
            .unwrap_or(1)
            .max(1);

        Some(Self {
            snippet,
            hash,
            line_span,
        })
    }

    fn matches(&self, normalized_window: &str) -> bool {
        if let Some(snippet) = &self.snippet {
            if snippet == normalized_window {
                return true;
            }
        }
        match &self.hash {
            Some(hash) => LocationTracker::hash_normalized(normalized_window) == *hash,
            None => false,
        }
    }
}

impl LocationTracker {
    pub fn new(reader: Arc<dyn FileReader>, config: RelocationConfig) -> Self {
        Self { reader, config }
    }

    pub fn config(&self) -> &RelocationConfig {
        &self.config
    }

    /// Digest of the normalized text: the first 16 hex characters of its
    /// SHA-256. Whitespace-only text has no content to anchor on and hashes
    /// to the empty string.
    ///
    /// # Examples
    ///
    /// ```
    /// use codetrail_core::services::LocationTracker;
    ///
    /// let a = LocationTracker::generate_code_hash("let  x =\t1;");
    /// let b = LocationTracker::generate_code_hash("  let x = 1;  ");
    /// assert_eq!(a, b);
    /// assert_eq!(a.len(), 16);
    /// assert_eq!(LocationTracker::generate_code_hash("  \n "), "");
    /// ```
    pub fn generate_code_hash(text: &str) -> String {
        Self::hash_normalized(&normalize_code(text))
    }

    fn hash_normalized(normalized: &str) -> String {
        if normalized.is_empty() {
            return String::new();
        }
        let digest = format!("{:x}", Sha256::digest(normalized.as_bytes()));
        digest[..CODE_HASH_LENGTH].to_string()
    }

    /// `Some(hash)` for text with content, `None` for blank text
    pub fn code_hash_for(text: Option<&str>) -> Option<String> {
        text.map(Self::generate_code_hash).filter(|h| !h.is_empty())
    }

    /// Read the text at a single line
    pub async fn read_snippet(&self, file_path: &str, line: u32) -> Result<String, FileReadError> {
        self.reader.read_line(file_path, line).await
    }

    /// Check a node's recorded location against the file
    pub async fn validate_location(&self, node: &Node) -> LocationValidation {
        let lines = match self.reader.read_lines(&node.file_path).await {
            Ok(lines) => lines,
            Err(e) if e.is_not_found() => return LocationValidation::failed("File not found"),
            Err(e) => return LocationValidation::failed(format!("Failed to read file: {}", e)),
        };

        let recorded = node.line_number as usize;
        if recorded == 0 || recorded > lines.len() {
            return LocationValidation::failed(format!(
                "Line {} exceeds file length ({} lines)",
                node.line_number,
                lines.len()
            ));
        }

        let Some(anchor) = Anchor::from_node(node) else {
            return LocationValidation {
                is_valid: true,
                confidence: ConfidenceLevel::High,
                reason: Some("No code snippet recorded".to_string()),
                suggested_location: None,
            };
        };

        let window = |start: usize| normalize_code(&window_text(&lines, start, anchor.line_span));

        if anchor.matches(&window(recorded)) {
            return LocationValidation::exact();
        }

        let radius = self.config.search_radius as usize;
        for distance in 1..=radius {
            for candidate in outward_candidates(recorded, distance, lines.len()) {
                if anchor.matches(&window(candidate)) {
                    let confidence = if distance <= self.config.high_confidence_distance as usize {
                        ConfidenceLevel::High
                    } else {
                        ConfidenceLevel::Medium
                    };
                    tracing::debug!(
                        "Relocated {} from line {} to {} ({})",
                        node.id,
                        recorded,
                        candidate,
                        confidence
                    );
                    return LocationValidation::relocated(
                        confidence,
                        Location::new(node.file_path.clone(), candidate as u32),
                        format!("Code moved {} line(s) to line {}", distance, candidate),
                    );
                }
            }
        }

        if let Some(snippet) = &anchor.snippet {
            let mut best: Option<(usize, f64)> = None;
            let candidates = std::iter::once(recorded).chain(
                (1..=radius).flat_map(|d| outward_candidates(recorded, d, lines.len())),
            );
            for candidate in candidates {
                let similarity = normalized_similarity(snippet, &window(candidate));
                match best {
                    Some((_, score)) if score >= similarity => {}
                    _ => best = Some((candidate, similarity)),
                }
            }

            if let Some((line, similarity)) = best {
                if similarity >= self.config.fuzzy_match_threshold {
                    return LocationValidation::relocated(
                        ConfidenceLevel::Low,
                        Location::new(node.file_path.clone(), line as u32),
                        format!(
                            "Similar code found at line {} ({:.0}% similar)",
                            line,
                            similarity * 100.0
                        ),
                    );
                }
            }
        }

        LocationValidation::failed("Code not found near recorded location")
    }

    /// Validate and report where to go. Never mutates the node.
    ///
    /// A valid location navigates to the recorded line; a drifted one to the
    /// suggested line; a failed one does not navigate.
    pub async fn navigate_to_node(&self, node: &Node) -> NavigationResult {
        let validation = self.validate_location(node).await;

        let actual_location = if validation.is_valid {
            Some(node.location())
        } else {
            validation.suggested_location.clone()
        };

        NavigationResult {
            success: actual_location.is_some(),
            actual_location,
            validation,
        }
    }

    /// Point a node at a new location and re-anchor it on the code found there.
    ///
    /// Returns the updated node; persisting it is the caller's job. The new
    /// snippet spans as many lines as the old one. When the target cannot be
    /// read the location is still taken, the anchor is cleared and a
    /// validation warning is set.
    pub async fn update_node_location(&self, node: &Node, file_path: &str, line_number: u32) -> Node {
        let mut updated = node.clone();
        updated.set_location(file_path.to_string(), line_number);

        let span = node
            .code_snippet
            .as_deref()
            .map(|s| s.trim().lines().count())
            .unwrap_or(1)
            .max(1) as u32;
        let start = updated.line_number;
        let end = start.saturating_add(span - 1);

        match self.reader.read_range(file_path, start, end).await {
            Ok(text) => {
                let hash = Self::code_hash_for(Some(&text));
                updated.set_code(Some(text), hash);
                updated.validation_warning = None;
            }
            Err(e) => {
                tracing::warn!("Could not read new location for node {}: {}", node.id, e);
                updated.set_code(None, None);
                updated.validation_warning = Some(format!(
                    "Could not read {}:{}: {}",
                    file_path, start, e
                ));
            }
        }

        updated
    }
}

/// Text of `span` lines starting at 1-based `start`, clamped to the file
fn window_text(lines: &[String], start: usize, span: usize) -> String {
    let from = start - 1;
    let to = (from + span).min(lines.len());
    lines[from..to].join("\n")
}

/// Lines `distance` below then above `line`, when inside `1..=line_count`
fn outward_candidates(line: usize, distance: usize, line_count: usize) -> impl Iterator<Item = usize> {
    let below = Some(line + distance).filter(|l| *l <= line_count);
    let above = line.checked_sub(distance).filter(|l| *l >= 1);
    below.into_iter().chain(above)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryFileReader;

    const ORIGINAL: &str = "use std::io;\nfn main() {\n    run();\n}\n";

    async fn tracker_with(path: &str, content: &str) -> (LocationTracker, Arc<InMemoryFileReader>) {
        let reader = Arc::new(InMemoryFileReader::new());
        reader.insert_file(path, content).await;
        let tracker = LocationTracker::new(reader.clone(), RelocationConfig::default());
        (tracker, reader)
    }

    fn anchored(path: &str, line: u32, snippet: &str) -> Node {
        Node::new("n".to_string(), path.to_string(), line).with_code(
            Some(snippet.to_string()),
            LocationTracker::code_hash_for(Some(snippet)),
        )
    }

    #[test]
    fn test_hash_ignores_whitespace_runs() {
        let collapsed = LocationTracker::generate_code_hash("fn a() { b(); }");
        assert_eq!(collapsed, LocationTracker::generate_code_hash("fn a() {\n    b();\n}"));
        assert_eq!(collapsed, LocationTracker::generate_code_hash("  fn  a()  {  b();  }  "));
        assert_eq!(collapsed, LocationTracker::generate_code_hash("fn a() { b(); }"));
        assert_ne!(collapsed, LocationTracker::generate_code_hash("fn a() { c(); }"));
        assert_eq!(collapsed.len(), CODE_HASH_LENGTH);
        assert!(collapsed.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_blank_text_has_no_hash() {
        assert_eq!(LocationTracker::generate_code_hash(""), "");
        assert_eq!(LocationTracker::generate_code_hash(" \t\n"), "");
        assert_eq!(LocationTracker::code_hash_for(Some("   ")), None);
        assert_eq!(LocationTracker::code_hash_for(None), None);
    }

    #[tokio::test]
    async fn test_exact_match_at_recorded_line() {
        let (tracker, _) = tracker_with("main.rs", ORIGINAL).await;
        let node = anchored("main.rs", 2, "fn   main() {");

        let validation = tracker.validate_location(&node).await;
        assert!(validation.is_valid);
        assert_eq!(validation.confidence, ConfidenceLevel::Exact);
        assert!(validation.suggested_location.is_none());
    }

    #[tokio::test]
    async fn test_code_moved_down_two_lines() {
        let edited = "use std::io;\nuse std::fs;\n\nfn main() {\n    run();\n}\n";
        let (tracker, _) = tracker_with("main.rs", edited).await;
        let node = anchored("main.rs", 2, "fn main() {");

        let validation = tracker.validate_location(&node).await;
        assert!(!validation.is_valid);
        assert_eq!(validation.confidence, ConfidenceLevel::High);
        assert_eq!(validation.suggested_location.unwrap().line_number, 4);
    }

    #[tokio::test]
    async fn test_far_move_is_medium_confidence() {
        let mut content = String::from("fn target() {}\n");
        for i in 0..20 {
            content.push_str(&format!("// filler {}\n", i));
        }
        content.push_str("fn moved() {}\n");
        let (tracker, _) = tracker_with("lib.rs", &content).await;
        let node = anchored("lib.rs", 1, "fn moved() {}");

        let validation = tracker.validate_location(&node).await;
        assert_eq!(validation.confidence, ConfidenceLevel::Medium);
        assert_eq!(validation.suggested_location.unwrap().line_number, 22);
    }

    #[tokio::test]
    async fn test_nearest_match_wins_and_below_is_tried_first() {
        let content = "a\nmatch\nb\nmatch\n";
        let (tracker, _) = tracker_with("f.rs", content).await;
        let node = anchored("f.rs", 3, "match");

        let validation = tracker.validate_location(&node).await;
        assert_eq!(validation.suggested_location.unwrap().line_number, 4);
    }

    #[tokio::test]
    async fn test_hash_only_anchor_relocates() {
        let (tracker, _) = tracker_with("main.rs", ORIGINAL).await;
        let mut node = Node::new("n".to_string(), "main.rs".to_string(), 1);
        node.code_hash = LocationTracker::code_hash_for(Some("    run();"));

        let validation = tracker.validate_location(&node).await;
        assert_eq!(validation.confidence, ConfidenceLevel::High);
        assert_eq!(validation.suggested_location.unwrap().line_number, 3);
    }

    #[tokio::test]
    async fn test_multi_line_snippet_matches_window() {
        let edited = "// header\nuse std::io;\nfn main() {\n    run();\n}\n";
        let (tracker, _) = tracker_with("main.rs", edited).await;
        let node = anchored("main.rs", 2, "fn main() {\n    run();");

        let validation = tracker.validate_location(&node).await;
        assert_eq!(validation.suggested_location.unwrap().line_number, 3);
    }

    #[tokio::test]
    async fn test_slightly_edited_code_is_low_confidence() {
        let edited = "use std::io;\nfn main() {\n    run_all();\n}\n";
        let (tracker, _) = tracker_with("main.rs", edited).await;
        let node = anchored("main.rs", 3, "run_alll();");

        let validation = tracker.validate_location(&node).await;
        assert_eq!(validation.confidence, ConfidenceLevel::Low);
        assert_eq!(validation.suggested_location.unwrap().line_number, 3);
    }

    #[tokio::test]
    async fn test_vanished_code_fails() {
        let (tracker, _) = tracker_with("main.rs", ORIGINAL).await;
        let node = anchored("main.rs", 1, "struct Gone;");

        let validation = tracker.validate_location(&node).await;
        assert!(!validation.is_valid);
        assert_eq!(validation.confidence, ConfidenceLevel::Failed);
        assert_eq!(
            validation.reason.as_deref(),
            Some("Code not found near recorded location")
        );
    }

    #[tokio::test]
    async fn test_missing_file_and_line_past_end() {
        let (tracker, _) = tracker_with("main.rs", ORIGINAL).await;

        let validation = tracker
            .validate_location(&anchored("other.rs", 1, "x"))
            .await;
        assert_eq!(validation.confidence, ConfidenceLevel::Failed);
        assert_eq!(validation.reason.as_deref(), Some("File not found"));

        let validation = tracker
            .validate_location(&anchored("main.rs", 99, "x"))
            .await;
        assert_eq!(validation.confidence, ConfidenceLevel::Failed);
        assert!(validation.reason.unwrap().contains("exceeds file length"));
    }

    #[tokio::test]
    async fn test_node_without_anchor_is_valid() {
        let (tracker, _) = tracker_with("main.rs", ORIGINAL).await;
        let node = Node::new("n".to_string(), "main.rs".to_string(), 2);

        let validation = tracker.validate_location(&node).await;
        assert!(validation.is_valid);
        assert_eq!(validation.confidence, ConfidenceLevel::High);
    }

    #[tokio::test]
    async fn test_navigate_uses_suggestion_without_mutating() {
        let edited = "\n\nuse std::io;\nfn main() {\n";
        let (tracker, _) = tracker_with("main.rs", edited).await;
        let node = anchored("main.rs", 2, "fn main() {");
        let before = node.clone();

        let result = tracker.navigate_to_node(&node).await;
        assert!(result.success);
        assert_eq!(result.actual_location.unwrap(), Location::new("main.rs", 4));
        assert_eq!(node, before);

        let result = tracker
            .navigate_to_node(&anchored("main.rs", 1, "struct Gone;"))
            .await;
        assert!(!result.success);
        assert!(result.actual_location.is_none());
    }

    #[tokio::test]
    async fn test_update_node_location_reanchors() {
        let (tracker, _) = tracker_with("main.rs", ORIGINAL).await;
        let node = anchored("main.rs", 1, "use std::io;");

        let updated = tracker.update_node_location(&node, "main.rs", 3).await;
        assert_eq!(updated.id, node.id);
        assert_eq!(updated.line_number, 3);
        assert_eq!(updated.code_snippet.as_deref(), Some("    run();"));
        assert_eq!(
            updated.code_hash,
            LocationTracker::code_hash_for(Some("run();"))
        );
        assert!(updated.validation_warning.is_none());
        // Input untouched
        assert_eq!(node.line_number, 1);
    }

    #[tokio::test]
    async fn test_update_node_location_unreadable_target() {
        let (tracker, _) = tracker_with("main.rs", ORIGINAL).await;
        let node = anchored("main.rs", 1, "use std::io;");

        let updated = tracker.update_node_location(&node, "gone.rs", 0).await;
        assert_eq!(updated.file_path, "gone.rs");
        assert_eq!(updated.line_number, 1);
        assert!(updated.code_snippet.is_none());
        assert!(updated.code_hash.is_none());
        assert!(updated.validation_warning.is_some());
    }
}
