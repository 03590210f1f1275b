//! Tiered hybrid search engine
//!
//! Three tiers run in fixed order — literal name match (L0), full text (L1),
//! semantic cosine (L2) — and a tier-bonus rank merge produces the final
//! top-k. High-confidence literal hits short-circuit the later tiers. A tier
//! that fails degrades to an empty contribution; search itself never errors
//! on tier trouble.

pub mod fts;
pub mod literal;
pub mod vector;

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::QueryCache;
use crate::embedding::VectorEngine;
use crate::error::Result;
use crate::graph::KnowledgeGraph;
use crate::node::Node;
use crate::pointer::{estimate_tokens, FetchResponse, Pointer, PointerResponse};

/// Per-tier result cap
pub(crate) const TIER_LIMIT: usize = 20;

/// L0 floor that suppresses both later tiers
const SKIP_ALL_THRESHOLD: f64 = 0.9;
/// L0 floor that suppresses only the vector tier
const SKIP_VECTOR_THRESHOLD: f64 = 0.8;

/// Which tier produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchTier {
    Literal,
    Fts,
    Vector,
}

impl SearchTier {
    /// Rank-merge bonus. Tuned constants; changing them changes observable
    /// ranking output.
    fn bonus(self) -> f64 {
        match self {
            Self::Literal => 0.3,
            Self::Fts => 0.1,
            Self::Vector => 0.0,
        }
    }
}

/// One scored hit from a single tier
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub node: Node,
    pub score: f64,
    pub tier: SearchTier,
    pub matched_content: Option<String>,
}

/// The search engine: tiers + fusion + the process-local caches
pub struct SearchEngine {
    graph: KnowledgeGraph,
    vectors: Arc<VectorEngine>,
    cache: Arc<QueryCache>,
}

impl SearchEngine {
    pub fn new(graph: KnowledgeGraph, vectors: Arc<VectorEngine>, cache: Arc<QueryCache>) -> Self {
        Self {
            graph,
            vectors,
            cache,
        }
    }

    /// Run a query and return the fused top-k as pointers.
    pub fn search(&self, query: &str, top_k: usize) -> Result<PointerResponse> {
        let cache_key = QueryCache::response_key(query, top_k);
        if let Some(cached) = self.cache.get_response(&cache_key) {
            return Ok(cached);
        }

        let l0 = self.run_tier("literal", || literal::literal_search(&self.graph, query));

        // Short-circuit: when L0 alone fills the top-k, its weakest score
        // decides whether the later tiers can add anything worth their cost.
        let mut skip_fts = false;
        let mut skip_vector = false;
        if l0.len() >= top_k {
            let floor = l0
                .iter()
                .take(top_k)
                .map(|r| r.score)
                .fold(f64::INFINITY, f64::min);
            skip_fts = floor >= SKIP_ALL_THRESHOLD;
            skip_vector = floor >= SKIP_VECTOR_THRESHOLD;
        }

        let mut gathered = l0;
        if !skip_fts {
            gathered.extend(self.run_tier("fts", || fts::fts_search(&self.graph, query)));
        }
        if !skip_vector {
            gathered.extend(
                self.run_tier("vector", || {
                    vector::vector_search(&self.graph, &self.vectors, query)
                }),
            );
        }

        let merged = fuse(gathered, top_k);
        let response = PointerResponse::build(to_pointers(&merged), 0);
        self.cache.put_response(cache_key, response.clone());
        Ok(response)
    }

    /// Fetch full content for a pointer. `None` when the node does not exist;
    /// a missing file yields placeholder content, not an error.
    pub fn fetch(&self, pointer_id: &str) -> Result<Option<FetchResponse>> {
        let Some(node) = self.graph.get_node(pointer_id)? else {
            return Ok(None);
        };
        let content = self.node_content(&node);
        let token_count = estimate_tokens(&content);
        Ok(Some(FetchResponse {
            pointer_id: node.id.clone(),
            content,
            file_path: node.file_path.unwrap_or_default(),
            start_line: node.start_line.unwrap_or(0),
            end_line: node.end_line.unwrap_or(0),
            token_count,
        }))
    }

    fn run_tier(
        &self,
        tier: &str,
        run: impl FnOnce() -> Result<Vec<SearchResult>>,
    ) -> Vec<SearchResult> {
        match run() {
            Ok(results) => results,
            Err(e) => {
                log::warn!("{tier} tier degraded to empty: {e}");
                Vec::new()
            }
        }
    }

    fn node_content(&self, node: &Node) -> String {
        let Some(path) = &node.file_path else {
            // Synthetic concepts have nothing to fetch
            return String::new();
        };
        let start = node.start_line.unwrap_or(1);
        let end = node.end_line.unwrap_or(0);
        let key = (path.clone(), start, end);
        if let Some(snippet) = self.cache.get_snippet(&key) {
            return snippet;
        }
        let content = read_line_range(path, start, end);
        self.cache.put_snippet(key, content.clone());
        content
    }
}

/// Slice `[start, end]` (1-based, inclusive) out of the file, clamping
/// out-of-range bounds. `end <= 0` means the whole file.
fn read_line_range(path: &str, start: i64, end: i64) -> String {
    let Ok(text) = std::fs::read_to_string(path) else {
        return format!("[File not found: {path}]");
    };
    if end <= 0 {
        return text;
    }
    let lines: Vec<&str> = text.lines().collect();
    let start_idx = (start.max(1) as usize - 1).min(lines.len());
    let end_idx = (end as usize).min(lines.len());
    if start_idx >= end_idx {
        return String::new();
    }
    lines[start_idx..end_idx].join("\n")
}

/// Tier-bonus rank merge. Within one node id the highest boosted score wins
/// and keeps its original tier and raw score; survivors rank by raw score.
fn fuse(results: Vec<SearchResult>, top_k: usize) -> Vec<SearchResult> {
    let mut best: HashMap<String, SearchResult> = HashMap::new();
    for result in results {
        match best.entry(result.node.id.clone()) {
            Entry::Occupied(mut held) => {
                let current = held.get();
                if result.score + result.tier.bonus() > current.score + current.tier.bonus() {
                    held.insert(result);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(result);
            }
        }
    }

    let mut ranked: Vec<SearchResult> = best.into_values().collect();
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(top_k);
    ranked
}

fn to_pointers(results: &[SearchResult]) -> Vec<Pointer> {
    results
        .iter()
        .map(|r| Pointer {
            id: r.node.id.clone(),
            source: r.node.file_path.clone().unwrap_or_default(),
            chunk: r.node.name.clone(),
            lines: format!(
                "{}-{}",
                r.node.start_line.unwrap_or(0),
                r.node.end_line.unwrap_or(0)
            ),
            relevance: r.score,
            summary: r.node.summary.clone().unwrap_or_default(),
            node_type: r.node.node_type.as_str().to_string(),
            last_modified: None,
        })
        .collect()
}
