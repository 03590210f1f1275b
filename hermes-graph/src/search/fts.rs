//! L1: full-text search over the FTS5 index
//!
//! The raw query is reduced to safe match tokens, then three strategies run
//! in order of precision — exact phrase, AND of prefix tokens, OR of tokens —
//! stopping at the first that returns enough hits. BM25 ranks (negative,
//! unbounded) are normalized into [0, 1].

use crate::error::Result;
use crate::graph::KnowledgeGraph;
use crate::node::Node;
use crate::search::{SearchResult, SearchTier, TIER_LIMIT};

const STRATEGY_MIN_HITS: usize = 3;
const MAX_QUERY_TOKENS: usize = 10;

pub(crate) fn fts_search(graph: &KnowledgeGraph, query: &str) -> Result<Vec<SearchResult>> {
    let tokens = extract_query_tokens(query);
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    if tokens.len() == 1 {
        let single = format!("\"{}\"", tokens[0]);
        return Ok(to_results(graph.fts_search(&single, TIER_LIMIT)?));
    }

    // Exact phrase: highest precision
    let phrase = format!("\"{}\"", tokens.join(" "));
    let hits = graph.fts_search(&phrase, TIER_LIMIT)?;
    if hits.len() >= STRATEGY_MIN_HITS {
        return Ok(to_results(hits));
    }

    // AND of prefix-matched tokens
    let and_prefix = tokens
        .iter()
        .map(|t| format!("\"{t}\"*"))
        .collect::<Vec<_>>()
        .join(" AND ");
    let hits = graph.fts_search(&and_prefix, TIER_LIMIT)?;
    if hits.len() >= STRATEGY_MIN_HITS {
        return Ok(to_results(hits));
    }

    // OR fallback: maximum recall
    let any = tokens
        .iter()
        .map(|t| format!("\"{t}\""))
        .collect::<Vec<_>>()
        .join(" OR ");
    Ok(to_results(graph.fts_search(&any, TIER_LIMIT)?))
}

/// Reduce a raw query to FTS-safe tokens: maximal runs of letters, digits,
/// and underscores. CJK characters come out one per token so the unicode61
/// tokenizer can match them. FTS operator words are discarded, and at most
/// ten tokens survive, in order.
pub(crate) fn extract_query_tokens(query: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in query.chars() {
        if is_cjk(ch) {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            tokens.push(ch.to_string());
        } else if ch.is_alphanumeric() || ch == '_' {
            current.push(ch);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens.retain(|t| !is_fts_operator(t));
    tokens.truncate(MAX_QUERY_TOKENS);
    tokens
}

fn is_cjk(ch: char) -> bool {
    matches!(ch as u32,
        0x3040..=0x309F         // Hiragana
        | 0x30A0..=0x30FF       // Katakana
        | 0x3400..=0x4DBF       // CJK Extension A
        | 0x4E00..=0x9FFF       // CJK Unified
        | 0xAC00..=0xD7AF       // Hangul syllables
        | 0xF900..=0xFAFF       // CJK Compatibility
    )
}

fn is_fts_operator(token: &str) -> bool {
    matches!(token.to_uppercase().as_str(), "AND" | "OR" | "NOT" | "NEAR")
}

fn to_results(hits: Vec<(Node, f64)>) -> Vec<SearchResult> {
    hits.into_iter()
        .map(|(node, rank)| SearchResult {
            node,
            score: normalize_bm25(rank),
            tier: SearchTier::Fts,
            matched_content: None,
        })
        .collect()
}

/// BM25 ranks are negative and unbounded; `1 - 1/(1+|rank|)` maps them into
/// [0, 1). Numerically tiny ranks get a flat 0.5 rather than a misleading 0.
fn normalize_bm25(rank: f64) -> f64 {
    let magnitude = rank.abs();
    if magnitude < 0.001 {
        return 0.5;
    }
    (1.0 - 1.0 / (1.0 + magnitude)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeType;
    use crate::{Hermes, Node};

    #[test]
    fn test_tokens_drop_fts_operators() {
        assert_eq!(
            extract_query_tokens("NOT main AND test OR foo"),
            vec!["main", "test", "foo"]
        );
    }

    #[test]
    fn test_operator_filter_is_case_insensitive() {
        assert_eq!(extract_query_tokens("not And near x1"), vec!["x1"]);
    }

    #[test]
    fn test_tokens_split_on_punctuation() {
        assert_eq!(
            extract_query_tokens("/api/alerts handler"),
            vec!["api", "alerts", "handler"]
        );
    }

    #[test]
    fn test_tokens_keep_underscores() {
        assert_eq!(extract_query_tokens("fetch_rates()"), vec!["fetch_rates"]);
    }

    #[test]
    fn test_at_most_ten_tokens_survive() {
        let tokens = extract_query_tokens("a b c d e f g h i j k l m n");
        assert_eq!(tokens.len(), 10);
        assert_eq!(tokens[0], "a");
        assert_eq!(tokens[9], "j");
    }

    #[test]
    fn test_cjk_characters_become_individual_tokens() {
        let tokens = extract_query_tokens("検索エンジン search");
        assert!(tokens.contains(&"検".to_string()));
        assert!(tokens.contains(&"索".to_string()));
        assert!(tokens.contains(&"search".to_string()));
    }

    #[test]
    fn test_hangul_is_tokenized_per_character() {
        let tokens = extract_query_tokens("검색");
        assert_eq!(tokens, vec!["검", "색"]);
    }

    #[test]
    fn test_bm25_normalization_bounds() {
        assert!(normalize_bm25(-5.0) > 0.5);
        assert!(normalize_bm25(-10.0) > normalize_bm25(-5.0));
        assert_eq!(normalize_bm25(0.0), 0.5);
        assert_eq!(normalize_bm25(0.0005), 0.5);
        assert!(normalize_bm25(-1000.0) < 1.0);
    }

    #[test]
    fn test_empty_and_operator_only_queries() {
        let hermes = Hermes::in_memory("fts-empty").unwrap();
        let graph = hermes.graph();
        assert!(fts_search(&graph, "").unwrap().is_empty());
        assert!(fts_search(&graph, "AND OR NOT").unwrap().is_empty());
        assert!(fts_search(&graph, "...!!!").unwrap().is_empty());
    }

    #[test]
    fn test_single_token_query_matches_indexed_content() {
        let hermes = Hermes::in_memory("fts-single").unwrap();
        let graph = hermes.graph();
        let node = Node::builder(graph.project_id())
            .name("alerts_handler")
            .node_type(NodeType::Function)
            .file_path("src/api.rs")
            .lines(1, 10)
            .build();
        graph.add_node(&node).unwrap();
        graph
            .index_fts(&node, "handles incoming alert notifications")
            .unwrap();

        let results = fts_search(&graph, "alert").unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].tier, SearchTier::Fts);
        assert!(results[0].score >= 0.0 && results[0].score <= 1.0);
    }

    #[test]
    fn test_multi_token_query_falls_back_to_or() {
        let hermes = Hermes::in_memory("fts-or").unwrap();
        let graph = hermes.graph();
        for (i, text) in ["currency conversion table", "alert routing logic"]
            .iter()
            .enumerate()
        {
            let node = Node::builder(graph.project_id())
                .name(format!("node_{i}"))
                .node_type(NodeType::Function)
                .file_path("src/lib.rs")
                .lines(1, 5)
                .build();
            graph.add_node(&node).unwrap();
            graph.index_fts(&node, text).unwrap();
        }

        // Neither phrase nor AND-prefix matches both words together, so the
        // OR strategy surfaces each document separately.
        let results = fts_search(&graph, "currency routing").unwrap();
        assert_eq!(results.len(), 2);
    }
}
