//! Identity resolution between local records and remote posts.
//!
//! A record is paired by its stored `remote_id` when it has one. Records
//! without a link fall back to fuzzy title comparison over the whole
//! remote listing.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use similar::TextDiff;

use super::types::MatchResult;
use crate::model::{ContentRecord, RemotePost};

/// Minimum similarity for a fuzzy title match.
pub const FUZZY_MATCH_THRESHOLD: f64 = 0.85;

static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("TAG_REGEX is a valid regex pattern"));

static ENTITY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});")
        .expect("ENTITY_REGEX is a valid regex pattern")
});

/// Reduce markup-bearing text to a comparable form.
///
/// Strips tags, decodes character references, lowercases and collapses
/// runs of whitespace to single spaces.
#[must_use]
pub fn normalize(text: &str) -> String {
    let stripped = TAG_REGEX.replace_all(text, " ");
    let decoded = ENTITY_REGEX.replace_all(&stripped, |caps: &Captures| {
        decode_entity(&caps[0], &caps[1])
    });
    decoded
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entity(whole: &str, name: &str) -> String {
    let decoded = if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => num.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
    } else {
        match name {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some(' '),
            "ndash" => Some('\u{2013}'),
            "mdash" => Some('\u{2014}'),
            "hellip" => Some('\u{2026}'),
            "lsquo" => Some('\u{2018}'),
            "rsquo" => Some('\u{2019}'),
            "ldquo" => Some('\u{201C}'),
            "rdquo" => Some('\u{201D}'),
            _ => None,
        }
    };

    decoded.map_or_else(|| whole.to_string(), |c| c.to_string())
}

/// Similarity ratio in `[0, 1]` between two texts after normalization.
///
/// Computed as `2 * M / T` over a character diff, where `M` is the number
/// of matching characters and `T` the combined length. Empty input on
/// either side scores zero.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    f64::from(TextDiff::from_chars(a.as_str(), b.as_str()).ratio())
}

/// Pair a local record with a remote post.
///
/// A record with a `remote_id` is looked up in `remote_by_id` only. An
/// unlinked record is scored against `fuzzy_candidates`, which need not be
/// the whole listing: a full run passes only the posts not yet linked by id
/// or claimed by an earlier fuzzy match. Candidates must be in listing
/// order (live posts, then drafts). When several tie for the best score the
/// earliest one wins.
#[must_use]
pub fn resolve(
    record: &ContentRecord,
    remote_by_id: &HashMap<String, RemotePost>,
    fuzzy_candidates: &[RemotePost],
) -> MatchResult {
    if let Some(remote_id) = record.remote_id.as_deref().filter(|id| !id.is_empty()) {
        return match remote_by_id.get(remote_id) {
            Some(post) => MatchResult::IdMatch(post.clone()),
            None => MatchResult::DeletedRemotely,
        };
    }

    let mut best: Option<(&RemotePost, f64)> = None;
    for post in fuzzy_candidates {
        let score = similarity(&record.title, &post.title);
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((post, score));
        }
    }

    match best {
        Some((post, score)) if score >= FUZZY_MATCH_THRESHOLD => {
            tracing::debug!(record_id = %record.id, remote_id = %post.id, score, "Fuzzy title match");
            MatchResult::FuzzyTitleMatch {
                post: post.clone(),
                score,
            }
        }
        _ => MatchResult::Unmatched,
    }
}
