//! Process-local caches for the search engine
//!
//! Two bounded maps: search responses (60 s TTL, 256 entries, expired-first
//! then oldest-insertion eviction) and fetched line-range snippets (FIFO,
//! capacity 50). The ingestion pipeline flushes both after every run so the
//! caches never outlive the graph state they were computed from.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::pointer::PointerResponse;

const RESPONSE_TTL: Duration = Duration::from_secs(60);
const RESPONSE_CAPACITY: usize = 256;
const SNIPPET_CAPACITY: usize = 50;

/// Key for a cached snippet: (file_path, start_line, end_line)
pub type SnippetKey = (String, i64, i64);

/// Shared cache for search responses and fetched snippets
pub struct QueryCache {
    responses: Mutex<HashMap<String, (PointerResponse, Instant)>>,
    snippets: Mutex<SnippetStore>,
}

struct SnippetStore {
    entries: HashMap<SnippetKey, String>,
    order: VecDeque<SnippetKey>,
}

/// Cache statistics
pub struct CacheStats {
    pub responses: usize,
    pub snippets: usize,
}

impl QueryCache {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            snippets: Mutex::new(SnippetStore {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Build the response-cache key for a query.
    pub fn response_key(query: &str, top_k: usize) -> String {
        format!("{}:{}", query.trim().to_lowercase(), top_k)
    }

    /// Get a cached response if present and within TTL. Expired entries are
    /// dropped on read.
    pub fn get_response(&self, key: &str) -> Option<PointerResponse> {
        let mut responses = self.responses.lock();
        if let Some((response, inserted)) = responses.get(key) {
            if inserted.elapsed() < RESPONSE_TTL {
                return Some(response.clone());
            }
            responses.remove(key);
        }
        None
    }

    /// Store a response. On overflow, expired entries go first; if the cache
    /// is still full, the oldest insertion goes.
    pub fn put_response(&self, key: String, response: PointerResponse) {
        let mut responses = self.responses.lock();
        if responses.len() >= RESPONSE_CAPACITY {
            responses.retain(|_, (_, inserted)| inserted.elapsed() < RESPONSE_TTL);
            if responses.len() >= RESPONSE_CAPACITY {
                let oldest = responses
                    .iter()
                    .min_by_key(|(_, (_, inserted))| *inserted)
                    .map(|(key, _)| key.clone());
                if let Some(oldest) = oldest {
                    responses.remove(&oldest);
                }
            }
        }
        responses.insert(key, (response, Instant::now()));
    }

    /// Get a cached snippet.
    pub fn get_snippet(&self, key: &SnippetKey) -> Option<String> {
        self.snippets.lock().entries.get(key).cloned()
    }

    /// Store a snippet, evicting the oldest entry once over capacity.
    pub fn put_snippet(&self, key: SnippetKey, content: String) {
        let mut snippets = self.snippets.lock();
        if snippets.entries.insert(key.clone(), content).is_none() {
            snippets.order.push_back(key);
        }
        while snippets.entries.len() > SNIPPET_CAPACITY {
            let Some(evicted) = snippets.order.pop_front() else {
                break;
            };
            snippets.entries.remove(&evicted);
        }
    }

    /// Flush everything. Called after each ingestion run.
    pub fn invalidate_all(&self) {
        self.responses.lock().clear();
        let mut snippets = self.snippets.lock();
        snippets.entries.clear();
        snippets.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            responses: self.responses.lock().len(),
            snippets: self.snippets.lock().entries.len(),
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_response() -> PointerResponse {
        PointerResponse::build(vec![], 0)
    }

    #[test]
    fn test_response_key_normalizes_query() {
        assert_eq!(QueryCache::response_key("  Fetch Rates ", 10), "fetch rates:10");
    }

    #[test]
    fn test_response_miss_then_hit() {
        let cache = QueryCache::new();
        assert!(cache.get_response("q:10").is_none());
        cache.put_response("q:10".to_string(), empty_response());
        assert!(cache.get_response("q:10").is_some());
    }

    #[test]
    fn test_response_capacity_is_bounded() {
        let cache = QueryCache::new();
        for i in 0..(RESPONSE_CAPACITY + 10) {
            cache.put_response(format!("q{i}:10"), empty_response());
        }
        assert!(cache.stats().responses <= RESPONSE_CAPACITY);
    }

    #[test]
    fn test_snippet_fifo_eviction() {
        let cache = QueryCache::new();
        for i in 0..(SNIPPET_CAPACITY + 1) {
            cache.put_snippet((format!("f{i}.rs"), 1, 10), format!("body {i}"));
        }
        // First insertion is the one evicted
        assert!(cache.get_snippet(&("f0.rs".to_string(), 1, 10)).is_none());
        let last = format!("f{SNIPPET_CAPACITY}.rs");
        assert!(cache.get_snippet(&(last, 1, 10)).is_some());
        assert_eq!(cache.stats().snippets, SNIPPET_CAPACITY);
    }

    #[test]
    fn test_snippet_overwrite_does_not_grow_order() {
        let cache = QueryCache::new();
        let key = ("same.rs".to_string(), 1, 5);
        cache.put_snippet(key.clone(), "one".to_string());
        cache.put_snippet(key.clone(), "two".to_string());
        assert_eq!(cache.get_snippet(&key).as_deref(), Some("two"));
        assert_eq!(cache.stats().snippets, 1);
    }

    #[test]
    fn test_invalidate_all_clears_both_maps() {
        let cache = QueryCache::new();
        cache.put_response("q:10".to_string(), empty_response());
        cache.put_snippet(("f.rs".to_string(), 1, 10), "body".to_string());

        cache.invalidate_all();

        let stats = cache.stats();
        assert_eq!(stats.responses, 0);
        assert_eq!(stats.snippets, 0);
    }

    #[test]
    fn test_concurrent_response_access() {
        use std::sync::Arc;
        use std::thread;

        let cache = Arc::new(QueryCache::new());
        let mut handles = vec![];
        for t in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for i in 0..50 {
                    cache.put_response(format!("t{t}-q{i}:10"), empty_response());
                    cache.get_response(&format!("t{t}-q{i}:10"));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.stats().responses <= RESPONSE_CAPACITY);
    }
}
