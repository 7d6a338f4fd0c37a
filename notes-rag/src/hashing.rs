//! Local embedding provider based on feature hashing.
//!
//! [`HashEmbeddingProvider`] needs no model download and no network: it maps
//! lowercase word tokens and adjacent word pairs into a fixed number of signed
//! buckets and L2-normalises the result. Texts that share vocabulary end up
//! with a high cosine similarity, which is enough to rank study notes by
//! topic.

use async_trait::async_trait;
use tracing::debug;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// Default number of buckets.
pub const DEFAULT_HASH_DIMENSIONS: usize = 384;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Deterministic bag-of-words embedder.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dimensions: usize,
    model_name: String,
}

impl HashEmbeddingProvider {
    /// Create a provider producing vectors with `dimensions` components.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, model_name: format!("feature-hash-v1-{dimensions}") }
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIMENSIONS)
    }
}

fn fnv1a(bytes: impl IntoIterator<Item = u8>) -> u64 {
    bytes.into_iter().fold(FNV_OFFSET, |hash, b| (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME))
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

impl HashEmbeddingProvider {
    fn add_feature(&self, vector: &mut [f32], feature: u64, weight: f32) {
        let bucket = (feature % self.dimensions as u64) as usize;
        let sign = if (feature >> 63) == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.dimensions == 0 {
            return Err(RagError::ModelUnavailable {
                provider: "FeatureHash".into(),
                message: "dimensions must be greater than zero".into(),
            });
        }

        let words = tokens(text);
        debug!(provider = "FeatureHash", token_count = words.len(), "embedding text");

        let mut vector = vec![0.0f32; self.dimensions];
        for word in &words {
            self.add_feature(&mut vector, fnv1a(word.bytes()), 1.0);
        }
        for pair in words.windows(2) {
            let joined = pair[0].bytes().chain(std::iter::once(b' ')).chain(pair[1].bytes());
            self.add_feature(&mut vector, fnv1a(joined), 0.5);
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
