//! Offline token-hash embedder
//!
//! Each token lands in one of 256 accumulator bins via a stable hash; the
//! result is L2-normalized. Crude next to a trained model, but deterministic,
//! dependency-free, and good enough to rank name/summary/path text.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Dimension of hash-based embeddings
pub const HASH_DIMENSION: usize = 256;

pub(crate) struct HashedEmbedder;

impl HashedEmbedder {
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; HASH_DIMENSION];
        for token in tokenize(text) {
            vector[stable_hash(&token) % HASH_DIMENSION] += 1.0;
        }
        l2_normalize(&mut vector);
        vector
    }
}

/// Split on non-word characters, lowercase, drop single characters.
pub(crate) fn tokenize(input: &str) -> Vec<String> {
    input
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .map(|part| part.trim().to_lowercase())
        .filter(|part| part.len() > 1)
        .collect()
}

fn stable_hash(value: &str) -> usize {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish() as usize
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector
        .iter()
        .map(|v| f64::from(*v) * f64::from(*v))
        .sum::<f64>()
        .sqrt();
    if norm < f64::EPSILON {
        return;
    }
    for value in vector.iter_mut() {
        *value /= norm as f32;
    }
}
