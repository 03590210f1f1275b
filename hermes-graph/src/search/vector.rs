//! L2: semantic cosine search
//!
//! Embeds the query and every node's `name + summary + file_path` text, then
//! keeps cosine scores of at least 0.20. With the offline embedder this is a
//! cheap in-memory scan; with a provider the per-text cache keeps repeat
//! queries from re-calling it for unchanged nodes.

use crate::embedding::{cosine_similarity, VectorEngine};
use crate::error::Result;
use crate::graph::KnowledgeGraph;
use crate::node::Node;
use crate::search::{SearchResult, SearchTier, TIER_LIMIT};

const MIN_SCORE: f64 = 0.20;

pub(crate) fn vector_search(
    graph: &KnowledgeGraph,
    vectors: &VectorEngine,
    query: &str,
) -> Result<Vec<SearchResult>> {
    let query_vec = vectors.embed(query)?;
    if query_vec.iter().all(|v| *v == 0.0) {
        return Ok(Vec::new());
    }

    let mut results = Vec::new();
    for node in graph.get_all_nodes()? {
        let node_vec = vectors.embed(&node_text(&node))?;
        let score = cosine_similarity(&query_vec, &node_vec);
        if score < MIN_SCORE {
            continue;
        }
        results.push(SearchResult {
            node,
            score,
            tier: SearchTier::Vector,
            matched_content: None,
        });
    }

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(TIER_LIMIT);
    Ok(results)
}

fn node_text(node: &Node) -> String {
    let mut text = node.name.clone();
    if let Some(summary) = &node.summary {
        text.push(' ');
        text.push_str(summary);
    }
    if let Some(path) = &node.file_path {
        text.push(' ');
        text.push_str(path);
    }
    text
}
