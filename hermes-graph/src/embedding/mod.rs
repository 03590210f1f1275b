//! Semantic embedding engine
//!
//! [`VectorEngine`] turns text into vectors for the cosine tier. The default
//! backend is an offline 256-dimension token-hash embedder that needs no
//! external service; when an embedding provider is configured through the
//! environment, its vectors are used instead and the scoring path is
//! unchanged. Embeddings are cached per text.

mod hashed;
mod remote;

pub use hashed::HASH_DIMENSION;
pub use remote::RemoteProvider;

use dashmap::DashMap;

use crate::error::Result;

/// Vector embedding engine with caching
pub struct VectorEngine {
    backend: Backend,
    cache: DashMap<String, Vec<f32>>,
}

enum Backend {
    Hashed(hashed::HashedEmbedder),
    Remote(remote::RemoteProvider),
}

impl VectorEngine {
    /// Offline token-hash embedder. Always available.
    pub fn hashed() -> Self {
        Self {
            backend: Backend::Hashed(hashed::HashedEmbedder),
            cache: DashMap::new(),
        }
    }

    /// Provider-backed engine when the endpoint and model are configured,
    /// otherwise the offline embedder.
    pub fn from_env() -> Self {
        match remote::RemoteProvider::from_env() {
            Some(provider) => {
                log::info!("embedding provider enabled (model {})", provider.model());
                Self {
                    backend: Backend::Remote(provider),
                    cache: DashMap::new(),
                }
            }
            None => Self::hashed(),
        }
    }

    /// Generate an embedding, hitting the cache first.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self.cache.get(text) {
            return Ok(cached.clone());
        }
        let vector = match &self.backend {
            Backend::Hashed(embedder) => embedder.embed(text),
            Backend::Remote(provider) => provider.embed(text)?,
        };
        self.cache.insert(text.to_string(), vector.clone());
        Ok(vector)
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }
}

/// Cosine similarity. Handles unnormalized vectors; zero or mismatched
/// vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical_vectors() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_orthogonal_vectors() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 0.001);
    }

    #[test]
    fn test_cosine_zero_vector_scores_zero() {
        let a = vec![0.0, 0.0, 0.0];
        let b = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_length_mismatch_scores_zero() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_engine_caches_embeddings() {
        let engine = VectorEngine::hashed();
        let first = engine.embed("fetch exchange rate").unwrap();
        let second = engine.embed("fetch exchange rate").unwrap();
        assert_eq!(first, second);
        assert_eq!(engine.cache_size(), 1);
    }

    #[test]
    fn test_similar_text_scores_higher_than_unrelated() {
        let engine = VectorEngine::hashed();
        let query = engine.embed("currency exchange rate").unwrap();
        let related = engine.embed("exchange rate service currency").unwrap();
        let unrelated = engine.embed("redis pubsub worker queue").unwrap();
        assert!(
            cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated)
        );
    }
}
