//! Pointers and token accounting
//!
//! A pointer is the compact reference returned instead of file content: path,
//! chunk name, line range, relevance, summary. The accounting block on every
//! response compares the tokens actually spent against a counterfactual
//! "ship the whole files" estimate (15x the pointer tokens).

use serde::{Deserialize, Serialize};

/// Compact reference to a graph node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pointer {
    pub id: String,
    pub source: String,
    pub chunk: String,
    pub lines: String,
    pub relevance: f64,
    pub summary: String,
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

/// Search response: pointers plus the accounting for this query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerResponse {
    pub pointers: Vec<Pointer>,
    pub accounting: QueryAccounting,
}

/// Token accounting for a single query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAccounting {
    pub pointer_tokens: u64,
    pub fetched_tokens: u64,
    pub total_tokens: u64,
    pub traditional_rag_estimate: u64,
    pub savings_pct: f64,
}

/// Full content for a single pointer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub pointer_id: String,
    pub content: String,
    pub file_path: String,
    pub start_line: i64,
    pub end_line: i64,
    pub token_count: u64,
}

/// Word-count token estimate: one token is roughly 3/4 of a word on mixed
/// code and prose, so tokens = ceil(words * 4 / 3).
pub fn estimate_tokens(text: &str) -> u64 {
    let words = text.split_whitespace().count() as u64;
    (words * 4).div_ceil(3)
}

impl Pointer {
    /// Estimated tokens to ship this pointer to a model context.
    pub fn token_estimate(&self) -> u64 {
        let text = format!(
            "{} {} {} {}",
            self.source, self.chunk, self.lines, self.summary
        );
        estimate_tokens(&text) + 2
    }
}

impl PointerResponse {
    /// Assemble a response and compute its accounting. `fetched_tokens` is 0
    /// at search time; fetch flows pass the fetched body's estimate.
    pub fn build(pointers: Vec<Pointer>, fetched_tokens: u64) -> Self {
        let pointer_tokens: u64 = pointers.iter().map(Pointer::token_estimate).sum();
        let traditional_rag_estimate = pointer_tokens * 15;
        let total_tokens = pointer_tokens + fetched_tokens;
        let savings_pct = if traditional_rag_estimate > 0 {
            ((1.0 - total_tokens as f64 / traditional_rag_estimate as f64) * 100.0).max(0.0)
        } else {
            0.0
        };

        Self {
            pointers,
            accounting: QueryAccounting {
                pointer_tokens,
                fetched_tokens,
                total_tokens,
                traditional_rag_estimate,
                savings_pct,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pointer() -> Pointer {
        Pointer {
            id: "abc".to_string(),
            source: "src/main.rs".to_string(),
            chunk: "fn main".to_string(),
            lines: "1-20".to_string(),
            relevance: 0.95,
            summary: "Application entry point".to_string(),
            node_type: "function".to_string(),
            last_modified: None,
        }
    }

    #[test]
    fn test_estimate_tokens_word_based() {
        // 4 words -> ceil(16 / 3) = 6
        assert_eq!(estimate_tokens("hello world foo bar"), 6);
    }

    #[test]
    fn test_estimate_tokens_empty() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("   \n\t "), 0);
    }

    #[test]
    fn test_pointer_estimate_is_small_but_positive() {
        let tokens = sample_pointer().token_estimate();
        assert!(tokens > 0 && tokens < 100);
    }

    #[test]
    fn test_response_computes_savings() {
        let response = PointerResponse::build(vec![sample_pointer()], 0);
        assert!(response.accounting.savings_pct > 0.0);
        assert!(
            response.accounting.traditional_rag_estimate > response.accounting.pointer_tokens
        );
    }

    #[test]
    fn test_empty_response_has_zero_savings() {
        let response = PointerResponse::build(vec![], 0);
        assert_eq!(response.accounting.pointer_tokens, 0);
        assert_eq!(response.accounting.total_tokens, 0);
        assert_eq!(response.accounting.savings_pct, 0.0);
    }

    #[test]
    fn test_fetched_tokens_reduce_savings() {
        let without = PointerResponse::build(vec![sample_pointer()], 0);
        let with = PointerResponse::build(vec![sample_pointer()], 5000);
        assert!(with.accounting.savings_pct <= without.accounting.savings_pct);
        assert_eq!(with.accounting.fetched_tokens, 5000);
    }

    #[test]
    fn test_savings_pct_never_negative() {
        // No pointers but plenty of fetched tokens: traditional estimate is 0
        let response = PointerResponse::build(vec![], 9999);
        assert!(response.accounting.savings_pct >= 0.0);
    }

    #[test]
    fn test_total_is_pointer_plus_fetched() {
        let response = PointerResponse::build(vec![sample_pointer()], 123);
        assert_eq!(
            response.accounting.total_tokens,
            response.accounting.pointer_tokens + 123
        );
    }
}
