//! Utility functions for CodeTrail Core
//!
//! This module provides common text utilities used by the location tracker
//! and the node matcher.

mod text;

pub use text::{
    contains_whole_word, levenshtein_distance, normalize_code, normalized_similarity, split_words,
};
