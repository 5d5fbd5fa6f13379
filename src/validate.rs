//! Input validation for CLI filters and arguments.
//!
//! Statuses resolve in three tiers: exact match, then synonym lookup, then
//! an error carrying the closest suggestion by edit distance.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::model::PostStatus;

pub static VALID_STATUSES: LazyLock<HashSet<&str>> =
    LazyLock::new(|| ["draft", "reviewed", "published"].into_iter().collect());

pub static STATUS_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("live", "published"),
        ("public", "published"),
        ("posted", "published"),
        ("publish", "published"),
        ("approved", "reviewed"),
        ("ready", "reviewed"),
        ("review", "reviewed"),
        ("checked", "reviewed"),
        ("new", "draft"),
        ("pending", "draft"),
        ("wip", "draft"),
        ("unpublished", "draft"),
    ]
    .into_iter()
    .collect()
});

/// Normalize a status string via exact match or synonym lookup.
///
/// # Errors
///
/// Returns `InvalidStatus` with the closest valid value as a suggestion.
pub fn normalize_status(input: &str) -> Result<PostStatus> {
    let lower = input.trim().to_lowercase();

    if VALID_STATUSES.contains(lower.as_str()) {
        return Ok(PostStatus::from_db(&lower));
    }

    if let Some(&canonical) = STATUS_SYNONYMS.get(lower.as_str()) {
        return Ok(PostStatus::from_db(canonical));
    }

    Err(Error::InvalidStatus {
        value: input.to_string(),
        suggestion: find_closest_match(&lower, &VALID_STATUSES, &STATUS_SYNONYMS),
    })
}

/// Find the closest matching value across valid set and synonyms.
fn find_closest_match(
    input: &str,
    valid: &HashSet<&str>,
    synonyms: &HashMap<&str, &str>,
) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;

    // Sorted so equal distances resolve the same way every time.
    let mut candidates: Vec<&str> = valid.iter().chain(synonyms.keys()).copied().collect();
    candidates.sort_unstable();

    for v in candidates {
        let dist = levenshtein_distance(input, v);
        if dist <= 3 && best.is_none_or(|(_, d)| dist < d) {
            // For synonyms, show what it maps to
            best = Some((synonyms.get(v).copied().unwrap_or(v), dist));
        }
    }

    best.map(|(v, _)| v.to_string())
}

/// Compute the Levenshtein edit distance between two strings.
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let a_len = a.len();
    let b_len = b.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    // Single-row optimization (O(min(m,n)) space)
    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for i in 1..=a_len {
        curr[0] = i;
        for j in 1..=b_len {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1) // deletion
                .min(curr[j - 1] + 1) // insertion
                .min(prev[j - 1] + cost); // substitution
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Find existing post IDs similar to the searched ID.
///
/// Returns up to `max` suggestions with edit distance ≤ 3,
/// sorted by distance then alphabetically.
#[must_use]
pub fn find_similar_ids(searched: &str, existing: &[String], max: usize) -> Vec<String> {
    let mut candidates: Vec<(usize, &str)> = existing
        .iter()
        .map(|id| (levenshtein_distance(searched, id), id.as_str()))
        .filter(|(dist, _)| *dist <= 3)
        .collect();

    candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    candidates
        .into_iter()
        .take(max)
        .map(|(_, id)| id.to_string())
        .collect()
}

/// Build the not-found error for a post id, with suggestions when any
/// existing id is close.
#[must_use]
pub fn post_not_found(id: &str, existing: &[String]) -> Error {
    let similar = find_similar_ids(id, existing, 3);
    if similar.is_empty() {
        Error::PostNotFound { id: id.to_string() }
    } else {
        Error::PostNotFoundSimilar {
            id: id.to_string(),
            similar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_status() {
        assert_eq!(normalize_status("draft").unwrap(), PostStatus::Draft);
        assert_eq!(normalize_status("PUBLISHED").unwrap(), PostStatus::Published);
        assert_eq!(normalize_status("live").unwrap(), PostStatus::Published);
        assert_eq!(normalize_status("approved").unwrap(), PostStatus::Reviewed);
        assert_eq!(normalize_status(" new ").unwrap(), PostStatus::Draft);
    }

    #[test]
    fn test_normalize_status_suggests() {
        match normalize_status("publshed") {
            Err(Error::InvalidStatus { value, suggestion }) => {
                assert_eq!(value, "publshed");
                assert_eq!(suggestion.as_deref(), Some("published"));
            }
            other => panic!("expected InvalidStatus, got {other:?}"),
        }
        assert!(matches!(
            normalize_status("nonsense"),
            Err(Error::InvalidStatus { suggestion: None, .. })
        ));
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", "abc"), 0);
        assert_eq!(levenshtein_distance("abc", "abd"), 1);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn test_find_similar_ids() {
        let ids = vec![
            "post_a1b2c3".to_string(),
            "post_a1b2c4".to_string(),
            "post_zzzzzz".to_string(),
        ];
        let result = find_similar_ids("post_a1b2c5", &ids, 3);
        assert_eq!(result, vec!["post_a1b2c3".to_string(), "post_a1b2c4".to_string()]);
    }

    #[test]
    fn test_post_not_found_variants() {
        let ids = vec!["post_a1b2c3".to_string()];
        assert!(matches!(
            post_not_found("post_a1b2c4", &ids),
            Error::PostNotFoundSimilar { .. }
        ));
        assert!(matches!(post_not_found("xyz", &ids), Error::PostNotFound { .. }));
    }
}
