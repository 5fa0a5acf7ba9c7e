//! Text helpers shared by location tracking and node matching
//!
//! - Whitespace normalization for code comparison and hashing
//! - Levenshtein edit distance and its normalized similarity
//! - Identifier splitting (`getUserData` -> `get`, `user`, `data`)

use regex::Regex;
use std::sync::LazyLock;

/// Compiled regex for whitespace normalization
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Normalize code text for comparison: trim and collapse every whitespace run
/// (including newlines) into a single space.
///
/// # Examples
///
/// ```
/// use codetrail_core::utils::normalize_code;
///
/// assert_eq!(normalize_code("  let   x =\t1;  "), "let x = 1;");
/// assert_eq!(normalize_code("fn a() {\n    b();\n}"), "fn a() { b(); }");
/// assert_eq!(normalize_code("   "), "");
/// ```
pub fn normalize_code(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Levenshtein edit distance counted in characters, not bytes.
///
/// Uses two rolling rows, so memory is O(min row) rather than O(n * m).
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut prev_row: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr_row: Vec<usize> = vec![0; b_chars.len() + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        curr_row[0] = i + 1;

        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            curr_row[j + 1] = (curr_row[j] + 1)
                .min(prev_row[j + 1] + 1)
                .min(prev_row[j] + cost);
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_chars.len()]
}

/// `1 - distance / max(len)`, in `[0, 1]`. Two empty strings are identical.
pub fn normalized_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }

    1.0 - levenshtein_distance(a, b) as f64 / max_len as f64
}

/// Split an identifier or phrase into lowercase words.
///
/// Breaks on any non-alphanumeric character and on camelCase humps
/// (`parseHTTPRequest` -> `parse`, `http`, `request`).
pub fn split_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = text.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_numeric() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }

        current.extend(c.to_lowercase());
    }

    if !current.is_empty() {
        words.push(current);
    }

    words
}

/// Whether `needle` (already lowercase) occurs in `haystack` as a whole word.
///
/// A word boundary is the start/end of the string, a non-alphanumeric
/// neighbour, or a camelCase hump in the original casing of `haystack`
/// (so `user` matches `getUserData` but not `superuser`).
pub fn contains_whole_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }

    let original: Vec<char> = haystack.chars().collect();
    let lower: Vec<char> = haystack.chars().flat_map(char::to_lowercase).collect();
    let needle: Vec<char> = needle.chars().collect();

    // Lowercasing can change the length for a handful of characters; the
    // hump checks below need a 1:1 mapping, so fall back to plain separators.
    let aligned = original.len() == lower.len();

    if needle.len() > lower.len() {
        return false;
    }

    (0..=lower.len() - needle.len()).any(|start| {
        let end = start + needle.len();
        if lower[start..end] != needle[..] {
            return false;
        }

        let starts_word = start == 0
            || !lower[start - 1].is_alphanumeric()
            || (aligned && original[start].is_uppercase() && original[start - 1].is_lowercase());
        let ends_word = end == lower.len()
            || !lower[end].is_alphanumeric()
            || (aligned && original[end].is_uppercase() && !original[end - 1].is_uppercase());

        starts_word && ends_word
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_code("a  b\t\tc\n d"), "a b c d");
        assert_eq!(normalize_code("\n\n  x  \n"), "x");
        assert_eq!(normalize_code(""), "");
    }

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", ""), 3);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("flaw", "lawn"), 2);
        assert_eq!(levenshtein_distance("same", "same"), 0);
    }

    #[test]
    fn test_levenshtein_counts_chars_not_bytes() {
        assert_eq!(levenshtein_distance("héllo", "hello"), 1);
    }

    #[test]
    fn test_normalized_similarity() {
        assert_eq!(normalized_similarity("", ""), 1.0);
        assert_eq!(normalized_similarity("abcd", "abcd"), 1.0);
        assert!((normalized_similarity("abcd", "abce") - 0.75).abs() < 1e-9);
        assert_eq!(normalized_similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_split_words_camel_case() {
        assert_eq!(split_words("getUserData"), vec!["get", "user", "data"]);
        assert_eq!(
            split_words("parseHTTPRequest"),
            vec!["parse", "http", "request"]
        );
        assert_eq!(split_words("load_config-file"), vec!["load", "config", "file"]);
        assert_eq!(split_words("Auth flow: login"), vec!["auth", "flow", "login"]);
    }

    #[test]
    fn test_contains_whole_word() {
        assert!(contains_whole_word("get user data", "user"));
        assert!(contains_whole_word("getUserData", "user"));
        assert!(contains_whole_word("load_config", "config"));
        assert!(!contains_whole_word("superuser", "user"));
        assert!(!contains_whole_word("users", "user"));
        assert!(!contains_whole_word("abc", ""));
    }
}
