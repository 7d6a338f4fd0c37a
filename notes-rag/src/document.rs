//! Data types for the notes document, its chunks, and search results.

use serde::{Deserialize, Serialize};

/// The full notes text, loaded once from a named source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Where the text came from (usually the notes file path).
    pub source: String,
    /// The text content of the document.
    pub text: String,
}

impl Document {
    /// Create a document from a source name and its text.
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self { source: source.into(), text: text.into() }
    }
}

/// A contiguous excerpt of a [`Document`].
///
/// `offset` is a byte offset into the document text, so
/// `&document.text[chunk.offset..chunk.end()] == chunk.text` always holds.
/// Size limits are measured in characters, see [`Chunk::char_count`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Position of the chunk in the chunker's output, starting at 0.
    pub index: usize,
    /// The text content of the chunk.
    pub text: String,
    /// Byte offset of the chunk's first character in the document.
    pub offset: usize,
}

impl Chunk {
    /// Byte offset one past the chunk's last character.
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }

    /// Length of the chunk in characters.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// A [`Chunk`] paired with its embedding vector, as held by a vector index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    /// The indexed chunk.
    pub chunk: Chunk,
    /// The vector embedding for the chunk's text.
    pub embedding: Vec<f32>,
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}
