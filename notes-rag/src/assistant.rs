//! Question-answering facade over the notes.
//!
//! [`AssistantBuilder`] is the uninitialized state: it collects collaborators
//! and does no work. [`AssistantBuilder::initialize`] validates the
//! credential, loads and chunks the notes, embeds the chunks and builds the
//! index (or reloads a matching persisted one), and yields a ready
//! [`Assistant`]. Only a ready assistant can answer questions.
//!
//! # Example
//!
//! ```rust,ignore
//! use notes_rag::{Assistant, RagConfig};
//!
//! let assistant = Assistant::builder()
//!     .config(RagConfig::from_env()?)
//!     .initialize()
//!     .await?;
//!
//! let reply = assistant.ask("What is a stack?").await?;
//! println!("{}", reply.answer);
//! ```

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{Chunk, Document, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{AnswerGenerator, ChatCompletionGenerator};
use crate::hashing::HashEmbeddingProvider;
use crate::inmemory::InMemoryVectorIndex;
use crate::persist::{FingerprintInput, IndexSnapshot, IndexStore, fingerprint};
use crate::prompt::assemble_prompt;
use crate::retriever::{Retriever, TopKRetriever};
use crate::vectorstore::VectorIndex;

/// The answer to one question together with the chunks it was grounded on.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    /// Free-text answer produced by the generator.
    pub answer: String,
    /// Retrieved chunks in retrieval order.
    pub sources: Vec<Chunk>,
}

/// A ready assistant. Cheap to clone; clones share the index.
///
/// `ask` keeps no state between calls, so concurrent calls are fine.
#[derive(Clone)]
pub struct Assistant {
    config: RagConfig,
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn AnswerGenerator>,
    chunk_count: usize,
}

impl Assistant {
    /// Create a new [`AssistantBuilder`].
    pub fn builder() -> AssistantBuilder {
        AssistantBuilder::default()
    }

    /// Return a reference to the configuration the assistant was built with.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Number of chunks the notes were split into.
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Return a reference to the retriever.
    pub fn retriever(&self) -> &dyn Retriever {
        self.retriever.as_ref()
    }

    /// Retrieve the chunks for a question, with scores, without generating.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidInput`] for a blank question, otherwise
    /// propagates embedding and search failures.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchResult>> {
        validate_question(question)?;
        self.retriever.search(question).await
    }

    /// Answer a question from the notes.
    ///
    /// Retrieves the top chunks, assembles the grounded prompt and calls the
    /// generator once. A failure affects only this call; the assistant stays
    /// ready.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidInput`] for a blank question
    /// - [`RagError::ModelUnavailable`] if the question cannot be embedded
    /// - [`RagError::ServiceUnavailable`] if generation fails or times out
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        validate_question(question)?;

        let sources = self.retriever.retrieve(question).await?;
        let prompt = assemble_prompt(&sources, question);

        let answer = self.generator.generate(&prompt).await.inspect_err(|e| {
            error!(model = self.generator.name(), error = %e, "answer generation failed");
        })?;

        info!(source_count = sources.len(), answer_len = answer.len(), "question answered");
        Ok(Answer { answer, sources })
    }
}

fn validate_question(question: &str) -> Result<()> {
    if question.trim().is_empty() {
        return Err(RagError::InvalidInput("question must not be empty".to_string()));
    }
    Ok(())
}

/// Builder for an [`Assistant`]; the uninitialized state.
///
/// Every collaborator is optional. Defaults: configuration from
/// [`RagConfig::default`], a [`RecursiveChunker`] sized from the
/// configuration, the local [`HashEmbeddingProvider`], an
/// [`InMemoryVectorIndex`] searched by a [`TopKRetriever`], and a
/// [`ChatCompletionGenerator`] using the resolved credential.
///
/// An injected [`Retriever`] brings its own index: the chunks are then not
/// embedded and any injected [`VectorIndex`] is ignored.
///
/// # Example
///
/// ```rust,ignore
/// let assistant = Assistant::builder()
///     .config(config)
///     .embedding_provider(Arc::new(embedder))
///     .generator(Arc::new(generator))  // optional
///     .initialize()
///     .await?;
/// ```
#[derive(Default)]
pub struct AssistantBuilder {
    config: Option<RagConfig>,
    api_key: Option<String>,
    chunker: Option<Arc<dyn Chunker>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_index: Option<Arc<dyn VectorIndex>>,
    retriever: Option<Arc<dyn Retriever>>,
    generator: Option<Arc<dyn AnswerGenerator>>,
}

impl AssistantBuilder {
    /// Set the configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Supply the credential directly instead of reading
    /// [`RagConfig::credential_var`] from the environment.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the embedding provider used for both chunks and questions.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the index the chunks are built into.
    pub fn vector_index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.vector_index = Some(index);
        self
    }

    /// Replace the default top-k retriever.
    pub fn retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Set the answer generator.
    pub fn generator(mut self, generator: Arc<dyn AnswerGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Validate the credential, load and index the notes, and return a ready
    /// assistant.
    ///
    /// The credential is checked before any file is read or any text is
    /// chunked or embedded.
    ///
    /// # Errors
    ///
    /// - [`RagError::MissingCredential`] if no credential is available
    /// - [`RagError::NotesFileNotFound`] if the notes file is absent
    /// - [`RagError::EmptyIndex`] if the notes produce no chunks
    /// - [`RagError::ModelUnavailable`] if the chunks cannot be embedded
    /// - [`RagError::IndexStoreError`] if the index cannot be persisted
    pub async fn initialize(self) -> Result<Assistant> {
        let config = self.config.unwrap_or_default();

        let api_key = resolve_credential(self.api_key, &config.credential_var)?;

        let document = load_notes(&config).await?;

        let chunker: Arc<dyn Chunker> = self
            .chunker
            .unwrap_or_else(|| Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap)));
        let chunks = chunker.split(&document);
        if chunks.is_empty() {
            error!(source = %document.source, "notes produced no chunks");
            return Err(RagError::EmptyIndex);
        }
        info!(source = %document.source, chunk_count = chunks.len(), "split notes into chunks");

        let chunk_count = chunks.len();
        let retriever: Arc<dyn Retriever> = match self.retriever {
            Some(retriever) => {
                info!(chunk_count, "using injected retriever, skipping index build");
                retriever
            }
            None => {
                let embedding_provider: Arc<dyn EmbeddingProvider> = self
                    .embedding_provider
                    .unwrap_or_else(|| Arc::new(HashEmbeddingProvider::default()));
                let index: Arc<dyn VectorIndex> =
                    self.vector_index.unwrap_or_else(|| Arc::new(InMemoryVectorIndex::new()));
                load_or_build_index(&config, chunks, embedding_provider.as_ref(), index.as_ref()).await?;
                Arc::new(TopKRetriever::new(embedding_provider, index).with_top_k(config.top_k))
            }
        };

        let generator: Arc<dyn AnswerGenerator> = match self.generator {
            Some(generator) => generator,
            None => Arc::new(ChatCompletionGenerator::from_config(api_key, &config)?),
        };

        info!(
            chunk_count,
            top_k = config.top_k,
            model = generator.name(),
            "assistant ready"
        );
        Ok(Assistant { config, retriever, generator, chunk_count })
    }
}

fn resolve_credential(explicit: Option<String>, variable: &str) -> Result<String> {
    explicit
        .filter(|key| !key.trim().is_empty())
        .or_else(|| std::env::var(variable).ok().filter(|key| !key.trim().is_empty()))
        .ok_or_else(|| {
            error!(variable, "credential not set");
            RagError::MissingCredential { variable: variable.to_string() }
        })
}

async fn load_notes(config: &RagConfig) -> Result<Document> {
    let path = &config.notes_path;
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        error!(path = %path.display(), error = %e, "failed to load notes");
        if e.kind() == std::io::ErrorKind::NotFound {
            RagError::NotesFileNotFound { path: path.display().to_string() }
        } else {
            RagError::Io(e)
        }
    })?;
    info!(path = %path.display(), bytes = text.len(), "loaded notes");
    Ok(Document::new(path.display().to_string(), text))
}

/// Fill `index` from a matching snapshot, or embed the chunks and save one.
async fn load_or_build_index(
    config: &RagConfig,
    chunks: Vec<Chunk>,
    embedding_provider: &dyn EmbeddingProvider,
    index: &dyn VectorIndex,
) -> Result<()> {
    let store = config.index_dir.as_ref().map(|dir| IndexStore::open(dir.clone()));
    let fingerprint = fingerprint(FingerprintInput {
        chunks: &chunks,
        embedding_model: embedding_provider.model_name(),
        dimensions: embedding_provider.dimensions(),
    });

    if let Some(store) = &store {
        match store.load().await {
            Ok(Some(snapshot)) if snapshot.fingerprint == fingerprint => match snapshot.into_parts() {
                Ok((stored_chunks, vectors)) => {
                    index.build(stored_chunks, vectors).await?;
                    info!(path = %store.snapshot_path().display(), "reusing persisted index");
                    return Ok(());
                }
                Err(e) => warn!(error = %e, "persisted index is unusable, rebuilding"),
            },
            Ok(Some(_)) => info!("persisted index is stale, rebuilding"),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "persisted index could not be loaded, rebuilding"),
        }
    }

    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    let vectors = embedding_provider.embed_batch(&texts).await.inspect_err(|e| {
        error!(model = embedding_provider.model_name(), error = %e, "embedding failed during index build");
    })?;

    let snapshot = match &store {
        Some(_) => Some(IndexSnapshot::new(fingerprint, embedding_provider.model_name(), &chunks, &vectors)?),
        None => None,
    };

    index.build(chunks, vectors).await?;

    if let (Some(store), Some(snapshot)) = (&store, snapshot) {
        store.save(&snapshot).await?;
    }
    Ok(())
}
