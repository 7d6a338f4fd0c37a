//! In-memory vector index using cosine similarity.
//!
//! This module provides [`InMemoryVectorIndex`], a brute-force index backed by
//! a `Vec` protected by a `tokio::sync::RwLock`. The notes are small enough
//! that scoring every entry per question is cheaper than maintaining an ANN
//! structure.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::document::{Chunk, IndexEntry, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorIndex;

#[derive(Debug, Default)]
struct Entries {
    dimensions: Option<usize>,
    items: Vec<IndexEntry>,
}

/// An in-memory vector index using cosine similarity for search.
///
/// Entries keep their insertion order, which is also the tie-break order
/// during search. All operations are async-safe via `tokio::sync::RwLock`;
/// searches only take the read lock.
///
/// # Example
///
/// ```rust,ignore
/// use notes_rag::{InMemoryVectorIndex, VectorIndex};
///
/// let index = InMemoryVectorIndex::new();
/// index.build(chunks, vectors).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorIndex {
    entries: RwLock<Entries>,
}

impl InMemoryVectorIndex {
    /// Create a new empty in-memory index.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn check_dimensions(expected: usize, vectors: &[Vec<f32>]) -> Result<()> {
    match vectors.iter().find(|v| v.len() != expected) {
        Some(v) => {
            error!(expected, actual = v.len(), "embedding dimension mismatch");
            Err(RagError::DimensionMismatch { expected, actual: v.len() })
        }
        None => Ok(()),
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn build(&self, chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<()> {
        if chunks.is_empty() {
            return Err(RagError::EmptyIndex);
        }
        if chunks.len() != vectors.len() {
            return Err(RagError::InvalidInput(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }
        let dimensions = vectors[0].len();
        if dimensions == 0 {
            return Err(RagError::InvalidInput("embedding vectors must not be empty".into()));
        }
        check_dimensions(dimensions, &vectors)?;

        let items: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, embedding)| IndexEntry { chunk, embedding })
            .collect();

        let mut entries = self.entries.write().await;
        entries.dimensions = Some(dimensions);
        entries.items = items;
        info!(entry_count = entries.items.len(), dimensions, "built vector index");
        Ok(())
    }

    async fn insert(&self, new_entries: Vec<IndexEntry>) -> Result<()> {
        if new_entries.is_empty() {
            return Ok(());
        }
        let mut entries = self.entries.write().await;
        let dimensions = match entries.dimensions {
            Some(d) => d,
            None => new_entries[0].embedding.len(),
        };
        if let Some(bad) = new_entries.iter().find(|e| e.embedding.len() != dimensions) {
            return Err(RagError::DimensionMismatch { expected: dimensions, actual: bad.embedding.len() });
        }
        entries.dimensions = Some(dimensions);
        entries.items.extend(new_entries);
        Ok(())
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        let entries = self.entries.read().await;
        let dimensions = match entries.dimensions {
            Some(d) if !entries.items.is_empty() => d,
            _ => return Err(RagError::EmptyIndex),
        };
        if embedding.len() != dimensions {
            return Err(RagError::DimensionMismatch { expected: dimensions, actual: embedding.len() });
        }

        let mut scored: Vec<SearchResult> = entries
            .items
            .iter()
            .map(|entry| SearchResult {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(&entry.embedding, embedding),
            })
            .collect();

        // Stable sort: equal scores keep insertion order.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        debug!(result_count = scored.len(), top_k, "vector search completed");
        Ok(scored)
    }

    async fn len(&self) -> usize {
        self.entries.read().await.items.len()
    }

    async fn dimensions(&self) -> Option<usize> {
        self.entries.read().await.dimensions
    }
}
