//! History-based category inference and autocomplete ranking.

use std::cmp::Reverse;

use crate::model::history::ItemHistoryEntry;

/// Default number of autocomplete suggestions.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 8;

/// Returns the learned category for a canonical name, if any.
pub fn infer_category_from_history<'a>(
    name_canonical: &str,
    history: &'a [ItemHistoryEntry],
) -> Option<&'a str> {
    history
        .iter()
        .find(|entry| entry.name_canonical == name_canonical)
        .and_then(|entry| entry.default_category_id.as_deref())
}

/// How closely a history entry matched the typed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchQuality {
    Prefix,
    Substring,
    Subsequence,
}

/// Ranks history entries for autocomplete.
///
/// An empty query returns the whole history. Otherwise entries whose
/// canonical name contains the query, or contains its characters in order,
/// are kept. Favorites rank first, then usage count, then recency, then match
/// quality.
pub fn build_history_suggestions<'a>(
    query: &str,
    history: &'a [ItemHistoryEntry],
    limit: usize,
) -> Vec<&'a ItemHistoryEntry> {
    let query = query.trim().to_lowercase();
    let mut matches: Vec<(&ItemHistoryEntry, MatchQuality)> = history
        .iter()
        .filter_map(|entry| {
            if query.is_empty() {
                return Some((entry, MatchQuality::Prefix));
            }
            match_quality(&query, &entry.name_canonical).map(|quality| (entry, quality))
        })
        .collect();

    matches.sort_by(|(a, quality_a), (b, quality_b)| {
        rank_key(a)
            .cmp(&rank_key(b))
            .then_with(|| quality_a.cmp(quality_b))
    });

    matches
        .into_iter()
        .take(limit)
        .map(|(entry, _)| entry)
        .collect()
}

fn rank_key(entry: &ItemHistoryEntry) -> (Reverse<bool>, Reverse<i64>, Reverse<i64>) {
    (
        Reverse(entry.is_favorite),
        Reverse(entry.times_used),
        Reverse(entry.last_used_at),
    )
}

fn match_quality(query: &str, target: &str) -> Option<MatchQuality> {
    if target.starts_with(query) {
        return Some(MatchQuality::Prefix);
    }
    if target.contains(query) {
        return Some(MatchQuality::Substring);
    }
    is_subsequence(query, target).then_some(MatchQuality::Subsequence)
}

fn is_subsequence(query: &str, target: &str) -> bool {
    let mut target_chars = target.chars();
    query
        .chars()
        .all(|wanted| target_chars.any(|candidate| candidate == wanted))
}
