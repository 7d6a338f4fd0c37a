//! Document chunking.
//!
//! [`RecursiveChunker`] cuts the notes on the largest structural boundary
//! that still yields pieces under the size limit: level-two headings, then
//! level-three headings, blank lines, newlines, spaces and finally single
//! characters. Pieces are then merged back into chunks of at most
//! `chunk_size` characters, each new chunk starting with up to
//! `chunk_overlap` characters of trailing context from the previous one.

use std::collections::VecDeque;
use std::ops::Range;

use crate::document::{Chunk, Document};

/// Separators tried in order, from the largest structural unit to the smallest.
///
/// The empty string splits into single characters and guarantees progress.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n## ", "\n### ", "\n\n", "\n", " ", ""];

/// A strategy for splitting a document into chunks.
///
/// Implementations must be deterministic: the same document and parameters
/// always yield the same chunk sequence.
pub trait Chunker: Send + Sync {
    /// Split a document into ordered chunks.
    ///
    /// Returns an empty `Vec` if the document contains only whitespace.
    fn split(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text recursively along an ordered list of separators.
///
/// Separators stay attached to the head of the piece that follows them, so
/// a heading marker always begins the chunk it introduces. Emitted chunks
/// are trimmed of surrounding whitespace; whitespace-only chunks are
/// skipped. A piece that is still too long once every separator has been
/// tried is emitted whole rather than dropped.
///
/// # Example
///
/// ```rust,ignore
/// use notes_rag::{Chunker, Document, RecursiveChunker};
///
/// let chunker = RecursiveChunker::new(1000, 200);
/// let chunks = chunker.split(&Document::new("dsa_notes.txt", notes));
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker` using [`DEFAULT_SEPARATORS`].
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: maximum number of characters shared by consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replace the separator list. Without a trailing `""` entry, a unit that
    /// contains none of the separators may produce an oversized chunk.
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    /// Maximum chunk size in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Maximum overlap in characters.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

impl Chunker for RecursiveChunker {
    fn split(&self, document: &Document) -> Vec<Chunk> {
        let text = document.text.as_str();
        if text.trim().is_empty() {
            return Vec::new();
        }

        let splitter = Splitter {
            text,
            chunk_size: self.chunk_size.max(1),
            chunk_overlap: self.chunk_overlap,
        };
        let mut spans = Vec::new();
        splitter.split_span(0..text.len(), &self.separators, &mut spans);

        spans
            .into_iter()
            .filter_map(|span| trim_span(text, span))
            .enumerate()
            .map(|(index, span)| Chunk { index, text: text[span.clone()].to_string(), offset: span.start })
            .collect()
    }
}

/// Byte ranges into a single text; every range lies on char boundaries.
struct Splitter<'a> {
    text: &'a str,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Splitter<'_> {
    fn char_len(&self, span: &Range<usize>) -> usize {
        self.text[span.clone()].chars().count()
    }

    fn split_span(&self, span: Range<usize>, separators: &[String], out: &mut Vec<Range<usize>>) {
        let segment = &self.text[span.clone()];

        let (pieces, remaining) =
            match separators.iter().position(|s| s.is_empty() || segment.contains(s.as_str())) {
                Some(i) => (self.pieces(&span, &separators[i]), &separators[i + 1..]),
                None => (vec![span], &separators[..0]),
            };

        let mut fitting = Vec::new();
        for piece in pieces {
            if self.char_len(&piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                self.merge(&fitting, out);
                fitting.clear();
            }
            if remaining.is_empty() {
                out.push(piece);
            } else {
                self.split_span(piece, remaining, out);
            }
        }
        if !fitting.is_empty() {
            self.merge(&fitting, out);
        }
    }

    /// Cut `span` before every occurrence of `separator`.
    fn pieces(&self, span: &Range<usize>, separator: &str) -> Vec<Range<usize>> {
        let segment = &self.text[span.clone()];
        let base = span.start;

        if separator.is_empty() {
            return segment
                .char_indices()
                .map(|(i, c)| base + i..base + i + c.len_utf8())
                .collect();
        }

        let mut pieces = Vec::new();
        let mut start = 0;
        for (pos, _) in segment.match_indices(separator) {
            if pos > start {
                pieces.push(base + start..base + pos);
            }
            start = pos;
        }
        if start < segment.len() {
            pieces.push(base + start..span.end);
        }
        pieces
    }

    /// Greedily join contiguous pieces into windows of at most `chunk_size`
    /// characters, carrying at most `chunk_overlap` characters forward.
    fn merge(&self, pieces: &[Range<usize>], out: &mut Vec<Range<usize>>) {
        let mut window: VecDeque<(Range<usize>, usize)> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            let len = self.char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                out.push(window_span(&window));
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some((_, popped)) => total -= popped,
                        None => break,
                    }
                }
            }
            window.push_back((piece.clone(), len));
            total += len;
        }

        if !window.is_empty() {
            out.push(window_span(&window));
        }
    }
}

fn window_span(window: &VecDeque<(Range<usize>, usize)>) -> Range<usize> {
    match (window.front(), window.back()) {
        (Some((first, _)), Some((last, _))) => first.start..last.end,
        _ => 0..0,
    }
}

fn trim_span(text: &str, span: Range<usize>) -> Option<Range<usize>> {
    let segment = &text[span.clone()];
    let leading = segment.len() - segment.trim_start().len();
    let trailing = segment.len() - segment.trim_end().len();
    if leading == segment.len() {
        return None;
    }
    Some(span.start + leading..span.end - trailing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(text: &str, size: usize, overlap: usize) -> Vec<Chunk> {
        RecursiveChunker::new(size, overlap).split(&Document::new("notes.txt", text))
    }

    #[test]
    fn short_document_is_one_chunk() {
        let chunks = split("A stack is a Last-In-First-Out structure.", 1000, 200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "A stack is a Last-In-First-Out structure.");
        assert_eq!(chunks[0].offset, 0);
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn whitespace_only_document_has_no_chunks() {
        assert!(split("", 100, 10).is_empty());
        assert!(split(" \n\n\t ", 100, 10).is_empty());
    }

    #[test]
    fn prefers_heading_boundaries() {
        let text = "## Stack\nPush and pop at the top.\n## Queue\nEnqueue at the back.";
        let chunks = split(text, 40, 0);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.starts_with("## Stack"));
        assert!(chunks[1].text.starts_with("## Queue"));
    }

    #[test]
    fn offsets_point_back_into_the_document() {
        let text = "Arrays store items in order.\n\nLinked lists chain nodes together.\n\nTrees branch.";
        let chunks = split(text, 30, 5);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert_eq!(&text[chunk.offset..chunk.end()], chunk.text);
        }
    }

    #[test]
    fn overlap_repeats_trailing_words() {
        let text = "one two three four five six seven eight nine ten";
        let chunks = split(text, 20, 10);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            assert!(pair[1].offset < pair[0].end(), "expected overlap between {pair:?}");
            let shared = pair[0].end() - pair[1].offset;
            assert!(shared <= 10);
        }
    }

    #[test]
    fn unsplittable_unit_is_emitted_oversized() {
        let long_line = "x".repeat(50);
        let text = format!("short line\n{long_line}\nanother");
        let chunker = RecursiveChunker::new(20, 0).with_separators(["\n"]);
        let chunks = chunker.split(&Document::new("notes.txt", text.clone()));

        assert!(chunks.iter().any(|c| c.text == long_line));
        assert!(chunks.iter().any(|c| c.text == "short line"));
        assert!(chunks.iter().any(|c| c.text == "another"));
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let text = "é".repeat(25);
        let chunks = split(&text, 10, 3);
        assert!(chunks.iter().all(|c| c.char_count() <= 10));
        for chunk in &chunks {
            assert_eq!(&text[chunk.offset..chunk.end()], chunk.text);
        }
    }
}
