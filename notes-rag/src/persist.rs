//! On-disk persistence for the vector index.
//!
//! A snapshot is a single JSON file, `index.json`, inside the configured
//! index directory. It carries a fingerprint of everything that shaped the
//! index (the chunks themselves and the embedding model) so a stale snapshot
//! is detected and rebuilt instead of being served.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, error, info};

use crate::document::Chunk;
use crate::error::{RagError, Result};

/// Bumped whenever the snapshot layout changes.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

const SNAPSHOT_FILE: &str = "index.json";

/// One persisted chunk and its vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotEntry {
    /// Position of the chunk in the chunker's output.
    pub index: usize,
    /// The chunk text.
    pub text: String,
    /// Byte offset of the chunk in the notes.
    pub offset: usize,
    /// The chunk's embedding.
    pub embedding: Vec<f32>,
}

/// A serialisable copy of the chunks and vectors an index was built from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexSnapshot {
    /// Layout version, see [`SNAPSHOT_FORMAT_VERSION`].
    pub format_version: u32,
    /// Hex digest from [`fingerprint`]; a mismatch means the snapshot is stale.
    pub fingerprint: String,
    /// Embedding model the vectors came from.
    pub embedding_model: String,
    /// Length of every vector in `entries`.
    pub dimensions: usize,
    /// When the snapshot was taken.
    pub built_at: DateTime<Utc>,
    /// Chunks in chunker order.
    pub entries: Vec<SnapshotEntry>,
}

impl IndexSnapshot {
    /// Capture `chunks` paired positionally with `vectors`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyIndex`] when there are no chunks,
    /// [`RagError::InvalidInput`] when the counts differ and
    /// [`RagError::DimensionMismatch`] when the vectors disagree in length.
    pub fn new(
        fingerprint: impl Into<String>,
        embedding_model: impl Into<String>,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
    ) -> Result<Self> {
        let dimensions = vectors.first().map(Vec::len).ok_or(RagError::EmptyIndex)?;
        if chunks.len() != vectors.len() {
            return Err(RagError::InvalidInput(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }
        let entries = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, embedding)| {
                if embedding.len() != dimensions {
                    return Err(RagError::DimensionMismatch { expected: dimensions, actual: embedding.len() });
                }
                Ok(SnapshotEntry {
                    index: chunk.index,
                    text: chunk.text.clone(),
                    offset: chunk.offset,
                    embedding: embedding.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            fingerprint: fingerprint.into(),
            embedding_model: embedding_model.into(),
            dimensions,
            built_at: Utc::now(),
            entries,
        })
    }

    /// Split the snapshot back into chunks and their vectors, ready for
    /// [`VectorIndex::build`](crate::VectorIndex::build).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyIndex`] for a snapshot without entries and
    /// [`RagError::DimensionMismatch`] if an entry disagrees with
    /// `dimensions`.
    pub fn into_parts(self) -> Result<(Vec<Chunk>, Vec<Vec<f32>>)> {
        if self.entries.is_empty() {
            return Err(RagError::EmptyIndex);
        }
        let mut chunks = Vec::with_capacity(self.entries.len());
        let mut vectors = Vec::with_capacity(self.entries.len());
        for entry in self.entries {
            if entry.embedding.len() != self.dimensions {
                return Err(RagError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: entry.embedding.len(),
                });
            }
            chunks.push(Chunk { index: entry.index, text: entry.text, offset: entry.offset });
            vectors.push(entry.embedding);
        }
        Ok((chunks, vectors))
    }
}

/// Inputs that determine whether a persisted index can be reused.
#[derive(Debug, Clone, Copy)]
pub struct FingerprintInput<'a> {
    /// The chunks the current chunker produced for the notes.
    pub chunks: &'a [Chunk],
    /// Name of the embedding model.
    pub embedding_model: &'a str,
    /// Vector length of the embedding model.
    pub dimensions: usize,
}

/// SHA-256 hex digest over the snapshot format, embedding model and every
/// chunk's offset and text.
///
/// Hashing the chunks rather than the chunking parameters means any change in
/// how the notes are split, including a custom chunker, invalidates the
/// snapshot.
pub fn fingerprint(input: FingerprintInput<'_>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(SNAPSHOT_FORMAT_VERSION.to_le_bytes());
    hasher.update(input.embedding_model.as_bytes());
    hasher.update([0u8]);
    hasher.update((input.dimensions as u64).to_le_bytes());
    hasher.update((input.chunks.len() as u64).to_le_bytes());
    for chunk in input.chunks {
        hasher.update((chunk.offset as u64).to_le_bytes());
        hasher.update((chunk.text.len() as u64).to_le_bytes());
        hasher.update(chunk.text.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Reads and writes [`IndexSnapshot`]s under one directory.
#[derive(Debug, Clone)]
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    /// Open a store rooted at `root`. The directory is created on first save.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the snapshot.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of the snapshot file.
    pub fn snapshot_path(&self) -> PathBuf {
        self.root.join(SNAPSHOT_FILE)
    }

    fn store_error(path: &Path, message: impl Into<String>) -> RagError {
        RagError::IndexStoreError { path: path.display().to_string(), message: message.into() }
    }

    /// Load the snapshot, returning `None` when none has been written yet.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexStoreError`] if the file exists but cannot be
    /// read or parsed, or was written with another format version.
    pub async fn load(&self) -> Result<Option<IndexSnapshot>> {
        let path = self.snapshot_path();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no persisted index");
                return Ok(None);
            }
            Err(e) => return Err(Self::store_error(&path, format!("failed to read snapshot: {e}"))),
        };

        let snapshot: IndexSnapshot = serde_json::from_slice(&bytes)
            .map_err(|e| Self::store_error(&path, format!("failed to parse snapshot: {e}")))?;

        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(Self::store_error(
                &path,
                format!(
                    "unsupported snapshot format {} (expected {SNAPSHOT_FORMAT_VERSION})",
                    snapshot.format_version
                ),
            ));
        }
        Ok(Some(snapshot))
    }

    /// Write the snapshot atomically: a temporary file is written first and
    /// then renamed over `index.json`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexStoreError`] if the directory or file cannot
    /// be written.
    pub async fn save(&self, snapshot: &IndexSnapshot) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            error!(path = %self.root.display(), error = %e, "failed to create index directory");
            Self::store_error(&self.root, format!("failed to create directory: {e}"))
        })?;

        let path = self.snapshot_path();
        let tmp = self.root.join(format!("{SNAPSHOT_FILE}.tmp"));
        let bytes = serde_json::to_vec(snapshot)
            .map_err(|e| Self::store_error(&path, format!("failed to serialise snapshot: {e}")))?;

        tokio::fs::write(&tmp, &bytes).await.map_err(|e| {
            error!(path = %tmp.display(), error = %e, "failed to write snapshot");
            Self::store_error(&tmp, format!("failed to write snapshot: {e}"))
        })?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "failed to move snapshot into place");
            Self::store_error(&path, format!("failed to replace snapshot: {e}"))
        })?;

        info!(path = %path.display(), entry_count = snapshot.entries.len(), "saved index snapshot");
        Ok(())
    }
}
