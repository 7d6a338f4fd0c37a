//! Retrieval policy over a vector index.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::config::DEFAULT_TOP_K;
use crate::document::{Chunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::vectorstore::VectorIndex;

/// Finds the chunks relevant to a question.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return the most relevant chunks with their scores, most relevant first.
    async fn search(&self, question: &str) -> Result<Vec<SearchResult>>;

    /// Like [`search`](Retriever::search) without the scores.
    async fn retrieve(&self, question: &str) -> Result<Vec<Chunk>> {
        let results = self.search(question).await?;
        Ok(results.into_iter().map(|r| r.chunk).collect())
    }
}

/// Embeds the question and returns the `k` nearest chunks from the index.
///
/// Nothing is cached: every call re-embeds and re-searches.
pub struct TopKRetriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
}

impl TopKRetriever {
    /// Create a retriever returning [`DEFAULT_TOP_K`] chunks.
    pub fn new(embedding_provider: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedding_provider, index, top_k: DEFAULT_TOP_K }
    }

    /// Override the number of chunks returned.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Number of chunks returned per question.
    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

#[async_trait]
impl Retriever for TopKRetriever {
    /// # Errors
    ///
    /// Propagates [`RagError::ModelUnavailable`](crate::RagError::ModelUnavailable)
    /// from the embedder and [`RagError::EmptyIndex`](crate::RagError::EmptyIndex)
    /// from the index.
    async fn search(&self, question: &str) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embedding_provider.embed(question).await.inspect_err(|e| {
            error!(error = %e, "embedding failed during retrieval");
        })?;

        let results = self.index.search(&query_embedding, self.top_k).await.inspect_err(|e| {
            error!(error = %e, "vector index search failed");
        })?;

        debug!(
            result_count = results.len(),
            top_score = results.first().map(|r| r.score),
            "retrieved chunks"
        );
        Ok(results)
    }
}
