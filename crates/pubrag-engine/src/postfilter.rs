use std::collections::HashSet;

use pubrag_core::{MetadataFilters, Result, SearchResult};
use pubrag_text::KeywordMatcher;

/// Similarity of two strings on a 0..=100 scale, case-insensitive. A needle
/// contained in the haystack scores 100.
pub fn fuzzy_score(needle: &str, haystack: &str) -> f64 {
    let needle = needle.trim().to_lowercase();
    let haystack = haystack.trim().to_lowercase();
    if needle.is_empty() {
        return 100.0;
    }
    if haystack.contains(&needle) {
        return 100.0;
    }
    strsim::normalized_levenshtein(&needle, &haystack) * 100.0
}

fn active(filter: Option<&String>) -> Option<&str> {
    filter.map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// Apply the filters the index cannot evaluate: fuzzy title, fuzzy authors
/// (any author may match) and a tantivy keyword query over chunk text.
/// Candidate order is preserved.
pub fn apply_post_filters(
    candidates: Vec<SearchResult>,
    filters: &MetadataFilters,
    fuzzy_threshold: f64,
) -> Result<Vec<SearchResult>> {
    let title = active(filters.title.as_ref());
    let authors = active(filters.authors.as_ref());
    let keyword = active(filters.keyword.as_ref());

    let keyword_hits: Option<HashSet<String>> = match keyword {
        Some(query) => {
            let matcher = KeywordMatcher::build(
                candidates.iter().map(|c| (c.chunk_id.as_str(), c.payload.chunk_text.as_str())),
            )?;
            Some(matcher.matching(query)?)
        }
        None => None,
    };

    let before = candidates.len();
    let kept: Vec<SearchResult> = candidates
        .into_iter()
        .filter(|c| title.is_none_or(|t| fuzzy_score(t, &c.payload.title) >= fuzzy_threshold))
        .filter(|c| {
            authors.is_none_or(|a| c.payload.authors.iter().any(|name| fuzzy_score(a, name) >= fuzzy_threshold))
        })
        .filter(|c| keyword_hits.as_ref().is_none_or(|ids| ids.contains(&c.chunk_id)))
        .collect();
    tracing::debug!(before, after = kept.len(), "post filters applied");
    Ok(kept)
}
