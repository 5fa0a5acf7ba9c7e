//! NodeMatcher - Multi-Strategy Node Search
//!
//! Resolves an ambiguous reference (free text, a file location, or both) to
//! the most relevant nodes of a graph.
//!
//! # Strategies
//!
//! | Strategy | Score | Match type |
//! |---|---|---|
//! | Exact location | `1.0` | `exact_location` |
//! | Name equal / prefix / whole word / substring | `1.0` / `0.9` / `0.8` / `0.7` | `partial_name` (>= 0.8) or `fuzzy_name` |
//! | Name Levenshtein similarity above threshold | `similarity * 0.6` | `fuzzy_name` |
//! | Same file | `0.9` | `file_path` |
//! | Shared trailing directories | `overlap * 0.7` | `file_path` |
//!
//! [`NodeMatcher::find_nodes_intelligent`] runs every strategy whose input is
//! present, keeps the best score per node and ranks by score, then by match
//! type.

use crate::config::MatcherConfig;
use crate::models::{Graph, MatchQuery, MatchResult, MatchType, Node};
use crate::utils::{contains_whole_word, normalized_similarity, split_words};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

const EXACT_NAME_SCORE: f64 = 1.0;
const PREFIX_NAME_SCORE: f64 = 0.9;
const WORD_NAME_SCORE: f64 = 0.8;
const SUBSTRING_NAME_SCORE: f64 = 0.7;
const FUZZY_NAME_SCALE: f64 = 0.6;

const SAME_FILE_SCORE: f64 = 0.9;
const PATH_OVERLAP_SCALE: f64 = 0.7;
const MIN_PATH_OVERLAP: f64 = 0.1;

const PROXIMITY_MAX_SCORE: f64 = 0.5;

const RELATED_SAME_FILE: f64 = 0.3;
const RELATED_SHARED_WORD: f64 = 0.2;
const RELATED_AFFIX: f64 = 0.2;
const RELATED_MAX_SCORE: f64 = 0.8;
const SIGNIFICANT_WORD_LENGTH: usize = 3;
const MIN_AFFIX_LENGTH: usize = 3;

/// Stateless scorer over a graph snapshot
#[derive(Debug, Clone, Default)]
pub struct NodeMatcher {
    config: MatcherConfig,
}

impl NodeMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    /// Run every applicable strategy, dedupe by node ID keeping the best
    /// score, and rank.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use codetrail_core::models::{Graph, MatchQuery, MatchType, Node};
    /// use codetrail_core::services::NodeMatcher;
    ///
    /// let mut graph = Graph::new("Trail");
    /// graph.add_node(Node::new("getUserData".into(), "src/user.rs".into(), 10)).unwrap();
    /// graph.add_node(Node::new("getUserProfile".into(), "src/user.rs".into(), 30)).unwrap();
    ///
    /// let results = NodeMatcher::default()
    ///     .find_nodes_intelligent(&graph, &MatchQuery::new().with_text("getUserData"));
    /// assert_eq!(results[0].node.name, "getUserData");
    /// assert_eq!(results[0].score, 1.0);
    /// assert_eq!(results[0].match_type, MatchType::PartialName);
    /// ```
    pub fn find_nodes_intelligent(&self, graph: &Graph, query: &MatchQuery) -> Vec<MatchResult> {
        let mut results = Vec::new();

        if let (Some(path), Some(line)) = (query.file_path(), query.line_number) {
            results.extend(self.find_by_exact_location(graph.nodes(), path, line));
        }
        if let Some(text) = query.text() {
            results.extend(self.find_by_name(graph.nodes(), text));
        }
        if let Some(path) = query.file_path() {
            results.extend(self.find_by_file_path(graph.nodes(), path));
        }

        let mut ranked = dedupe_best(results);
        if let Some(limit) = query.limit {
            ranked.truncate(limit);
        }

        tracing::debug!("Intelligent search returned {} result(s)", ranked.len());
        ranked
    }

    /// Every node recorded at exactly this location, all at full score
    pub fn find_by_exact_location<'a>(
        &self,
        nodes: impl IntoIterator<Item = &'a Node>,
        file_path: &str,
        line_number: u32,
    ) -> Vec<MatchResult> {
        let target = path_segments(file_path);
        nodes
            .into_iter()
            .filter(|node| node.line_number == line_number && path_segments(&node.file_path) == target)
            .map(|node| {
                MatchResult::new(
                    node,
                    1.0,
                    MatchType::ExactLocation,
                    format!("Exact location {}:{}", node.file_path, node.line_number),
                )
            })
            .collect()
    }

    pub fn find_by_name<'a>(&self, nodes: impl IntoIterator<Item = &'a Node>, query: &str) -> Vec<MatchResult> {
        nodes
            .into_iter()
            .filter_map(|node| {
                self.score_name(query, &node.name)
                    .map(|(score, details)| {
                        let match_type = if score >= WORD_NAME_SCORE {
                            MatchType::PartialName
                        } else {
                            MatchType::FuzzyName
                        };
                        MatchResult::new(node, score, match_type, details)
                    })
            })
            .collect()
    }

    pub fn find_by_file_path<'a>(
        &self,
        nodes: impl IntoIterator<Item = &'a Node>,
        file_path: &str,
    ) -> Vec<MatchResult> {
        nodes
            .into_iter()
            .filter_map(|node| {
                score_file_path(file_path, &node.file_path)
                    .map(|(score, details)| MatchResult::new(node, score, MatchType::FilePath, details))
            })
            .collect()
    }

    /// Case-insensitive name score, `None` when the name does not match
    pub fn score_name(&self, query: &str, name: &str) -> Option<(f64, &'static str)> {
        let query = query.trim().to_lowercase();
        let lower_name = name.to_lowercase();
        if query.is_empty() {
            return None;
        }

        if lower_name == query {
            return Some((EXACT_NAME_SCORE, "Exact name match"));
        }
        if lower_name.starts_with(&query) {
            return Some((PREFIX_NAME_SCORE, "Name starts with query"));
        }
        if contains_whole_word(name, &query) {
            return Some((WORD_NAME_SCORE, "Query matches a whole word"));
        }
        if lower_name.contains(&query) {
            return Some((SUBSTRING_NAME_SCORE, "Name contains query"));
        }

        let similarity = normalized_similarity(&query, &lower_name);
        if similarity > self.config.levenshtein_threshold {
            return Some((similarity * FUZZY_NAME_SCALE, "Similar name"));
        }

        None
    }

    /// Nodes in the same file within `proximity_window` lines.
    ///
    /// Score decays linearly from `0.5` at distance 0.
    pub fn find_nodes_by_proximity(&self, graph: &Graph, file_path: &str, line_number: u32) -> Vec<MatchResult> {
        let target = path_segments(file_path);
        let window = self.config.proximity_window;

        let results = graph
            .nodes()
            .filter(|node| path_segments(&node.file_path) == target)
            .filter_map(|node| {
                let distance = node.line_number.abs_diff(line_number);
                if distance > window {
                    return None;
                }
                let score = PROXIMITY_MAX_SCORE * (1.0 - distance as f64 / (window as f64 + 1.0));
                Some(MatchResult::new(
                    node,
                    score,
                    MatchType::Proximity,
                    format!("{} line(s) away", distance),
                ))
            })
            .collect();

        rank(results)
    }

    /// Nodes that look related to `node_id`: same file, shared name words,
    /// similar name prefix or suffix. The node itself is excluded; an unknown
    /// ID yields nothing.
    pub fn find_related_nodes(&self, graph: &Graph, node_id: &str) -> Vec<MatchResult> {
        let Some(target) = graph.get_node(node_id) else {
            return Vec::new();
        };
        let target_path = path_segments(&target.file_path);
        let target_words = significant_words(&target.name);
        let target_name = target.name.to_lowercase();

        let results = graph
            .nodes()
            .filter(|node| node.id != target.id)
            .filter_map(|node| {
                let mut score = 0.0;
                let mut reasons = Vec::new();

                if path_segments(&node.file_path) == target_path {
                    score += RELATED_SAME_FILE;
                    reasons.push("same file".to_string());
                }

                let shared = significant_words(&node.name)
                    .intersection(&target_words)
                    .count();
                if shared > 0 {
                    score += RELATED_SHARED_WORD * shared as f64;
                    reasons.push(format!("{} shared word(s)", shared));
                }

                if shares_affix(&node.name.to_lowercase(), &target_name) {
                    score += RELATED_AFFIX;
                    reasons.push("similar name".to_string());
                }

                (score > 0.0).then(|| {
                    MatchResult::new(
                        node,
                        score.min(RELATED_MAX_SCORE),
                        MatchType::Related,
                        reasons.join(", "),
                    )
                })
            })
            .collect();

        rank(results)
    }
}

/// Path score: `0.9` for the same file, otherwise the share of trailing
/// segments both paths have in common (over the longer path) scaled by
/// `0.7`. Overlaps of `0.1` or less do not count.
pub fn score_file_path(query: &str, candidate: &str) -> Option<(f64, String)> {
    let a = path_segments(query);
    let b = path_segments(candidate);
    if a.is_empty() || b.is_empty() {
        return None;
    }
    if a == b {
        return Some((SAME_FILE_SCORE, "Same file".to_string()));
    }

    let matched = a
        .iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let overlap = matched as f64 / a.len().max(b.len()) as f64;
    if overlap <= MIN_PATH_OVERLAP {
        return None;
    }

    Some((
        overlap * PATH_OVERLAP_SCALE,
        format!("{} trailing path segment(s) match", matched),
    ))
}

/// Path segments with `\` treated as `/`, empty and `.` segments dropped
fn path_segments(path: &str) -> Vec<String> {
    path.trim()
        .replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .map(str::to_string)
        .collect()
}

fn significant_words(name: &str) -> HashSet<String> {
    split_words(name)
        .into_iter()
        .filter(|word| word.chars().count() >= SIGNIFICANT_WORD_LENGTH)
        .collect()
}

fn shares_affix(a: &str, b: &str) -> bool {
    let prefix = a
        .chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .count();
    let suffix = a
        .chars()
        .rev()
        .zip(b.chars().rev())
        .take_while(|(x, y)| x == y)
        .count();
    prefix >= MIN_AFFIX_LENGTH || suffix >= MIN_AFFIX_LENGTH
}

/// Keep the best result per node, then rank
fn dedupe_best(results: Vec<MatchResult>) -> Vec<MatchResult> {
    let mut best: HashMap<String, MatchResult> = HashMap::new();
    for result in results {
        match best.get(&result.node.id) {
            Some(existing) if MatchResult::ranking(&result, existing) != Ordering::Less => {}
            _ => {
                best.insert(result.node.id.clone(), result);
            }
        }
    }
    rank(best.into_values().collect())
}

/// Ranking order, with name and ID as final tie-breaks so output is stable
fn rank(mut results: Vec<MatchResult>) -> Vec<MatchResult> {
    results.sort_by(|a, b| {
        MatchResult::ranking(a, b)
            .then_with(|| a.node.name.cmp(&b.node.name))
            .then_with(|| a.node.id.cmp(&b.node.id))
    });
    results
}
