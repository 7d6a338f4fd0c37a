//! Vector index trait for storing and searching chunk embeddings.

use async_trait::async_trait;

use crate::document::{Chunk, IndexEntry, SearchResult};
use crate::error::Result;

/// A storage backend for chunk embeddings with similarity search.
///
/// The index is bulk-loaded once with [`build`](VectorIndex::build) and is
/// read-only afterwards; implementations must allow concurrent
/// [`search`](VectorIndex::search) calls.
///
/// # Example
///
/// ```rust,ignore
/// use notes_rag::{InMemoryVectorIndex, VectorIndex};
///
/// let index = InMemoryVectorIndex::new();
/// index.build(chunks, vectors).await?;
/// let results = index.search(&query_embedding, 3).await?;
/// ```
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Replace the index contents with `chunks` paired positionally with
    /// `vectors`. Duplicate chunk text is kept as-is.
    ///
    /// Fails with [`EmptyIndex`](crate::RagError::EmptyIndex) when `chunks` is
    /// empty and with [`DimensionMismatch`](crate::RagError::DimensionMismatch)
    /// when the vectors do not share one dimension.
    async fn build(&self, chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<()>;

    /// Append entries to an already built index.
    async fn insert(&self, entries: Vec<IndexEntry>) -> Result<()>;

    /// Search for the `top_k` entries most similar to `embedding`.
    ///
    /// Returns at most `top_k` results (fewer if the index is smaller),
    /// ordered by descending similarity score; equal scores keep the
    /// original chunk order.
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>>;

    /// Number of indexed entries.
    async fn len(&self) -> usize;

    /// Whether the index holds no entries.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Dimension of the indexed vectors, once built.
    async fn dimensions(&self) -> Option<usize>;
}
