//! # notes-rag
//!
//! Answer questions about a body of study notes with retrieval-augmented
//! generation.
//!
//! ## Overview
//!
//! The notes are split once into overlapping chunks, embedded, and loaded
//! into a vector index. Each question is embedded with the same model, the
//! three closest chunks are retrieved, and a grounded prompt built from them
//! is sent to a language model at temperature 0. The answer comes back
//! together with the chunks it was built from.
//!
//! - [`RecursiveChunker`]: splits on headings first, then smaller units
//! - [`EmbeddingProvider`]: [`HashEmbeddingProvider`] (local) or [`OpenAIEmbeddingProvider`]
//! - [`VectorIndex`]: [`InMemoryVectorIndex`], persisted via [`IndexStore`]
//! - [`Retriever`]: [`TopKRetriever`] with k = 3
//! - [`assemble_prompt`]: the grounding instructions plus context and question
//! - [`AnswerGenerator`]: [`ChatCompletionGenerator`] (Groq by default)
//! - [`Assistant`]: `initialize()` once, then `ask()` any number of times
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use notes_rag::{Assistant, RagConfig};
//!
//! let assistant = Assistant::builder()
//!     .config(RagConfig::builder().notes_path("dsa_notes.txt").build()?)
//!     .initialize()
//!     .await?;
//!
//! let reply = assistant.ask("How do I reverse a linked list?").await?;
//! println!("{}\n({} sections used)", reply.answer, reply.sources.len());
//! ```

mod api;
pub mod assistant;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod hashing;
pub mod inmemory;
pub mod openai;
pub mod persist;
pub mod prompt;
pub mod retriever;
pub mod vectorstore;

pub use assistant::{Answer, Assistant, AssistantBuilder};
pub use chunking::{Chunker, DEFAULT_SEPARATORS, RecursiveChunker};
pub use config::{DEFAULT_TOP_K, RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, IndexEntry, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::{AnswerGenerator, ChatCompletionGenerator};
pub use hashing::HashEmbeddingProvider;
pub use inmemory::InMemoryVectorIndex;
pub use openai::OpenAIEmbeddingProvider;
pub use persist::{IndexSnapshot, IndexStore};
pub use prompt::{REFUSAL_SENTENCE, assemble_prompt};
pub use retriever::{Retriever, TopKRetriever};
pub use vectorstore::VectorIndex;
