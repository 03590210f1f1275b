//! L0: literal name match
//!
//! Backed by the `LOWER(name)` index, so no table scan. An exact name scores
//! 1.0, a prefix or suffix 0.9, and anything the contains phase surfaced
//! lands between 0.5 and 0.9 by how much of the name the query covers.

use crate::error::Result;
use crate::graph::KnowledgeGraph;
use crate::search::{SearchResult, SearchTier, TIER_LIMIT};

pub(crate) fn literal_search(graph: &KnowledgeGraph, query: &str) -> Result<Vec<SearchResult>> {
    let query_lower = query.to_lowercase();
    let mut results: Vec<SearchResult> = graph
        .literal_search_by_name(query)?
        .into_iter()
        .map(|node| {
            let score = literal_score(&query_lower, &node.name.to_lowercase());
            SearchResult {
                node,
                score,
                tier: SearchTier::Literal,
                matched_content: None,
            }
        })
        .collect();

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(TIER_LIMIT);
    Ok(results)
}

fn literal_score(query: &str, name: &str) -> f64 {
    if name == query {
        return 1.0;
    }
    if name.starts_with(query) || name.ends_with(query) {
        return 0.9;
    }
    let coverage = query.len() as f64 / name.len().max(1) as f64;
    (0.5 + coverage * 0.4).clamp(0.5, 0.9)
}
