//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`RecursiveChunker`], a
//! recursive character splitter: text is cut at the coarsest separator that
//! occurs in it (`"\n\n"`, then `"\n"`, then `" "`, then between characters),
//! and the resulting pieces are merged back greedily into windows of at most
//! `chunk_size` characters that share up to `chunk_overlap` characters with
//! their predecessor.

use std::collections::VecDeque;
use std::ops::Range;

use crate::config::RagConfig;
use crate::document::{Chunk, Document};

/// Separators tried from coarsest to finest. The empty separator splits
/// between characters and always applies.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has no non-whitespace text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;

    /// Split every document in order, concatenating the results.
    fn chunk_all(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().flat_map(|document| self.chunk(document)).collect()
    }
}

/// Recursive character splitter measuring lengths in Unicode scalar values.
///
/// Chunk IDs are generated as `{document_id}_{chunk_index}`. Each chunk
/// inherits the parent's page number and metadata, plus a `chunk_index`
/// entry, and records the byte offset where its text starts in the parent.
///
/// # Example
///
/// ```rust
/// use mcqgen_rag::{Chunker, Document, RecursiveChunker};
///
/// let chunker = RecursiveChunker::new(1000, 20);
/// let chunks = chunker.chunk(&Document::new("notes.txt", "Photosynthesis happens in chloroplasts."));
/// assert_eq!(chunks.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self::from_config(&RagConfig::default())
    }
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }

    /// Create a chunker from validated configuration.
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split raw text into chunk byte ranges, in document order.
    ///
    /// Every returned range is whitespace-trimmed and non-empty.
    pub fn split_ranges(&self, text: &str) -> Vec<Range<usize>> {
        self.split_recursive(text, 0..text.len(), &SEPARATORS)
    }

    /// Split raw text into chunk strings, in document order.
    pub fn split_text<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.split_ranges(text).into_iter().map(|range| &text[range]).collect()
    }

    fn split_recursive(
        &self,
        text: &str,
        range: Range<usize>,
        separators: &[&str],
    ) -> Vec<Range<usize>> {
        let slice = &text[range.clone()];
        let position = separators
            .iter()
            .position(|separator| separator.is_empty() || slice.contains(separator))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(position).copied().unwrap_or("");
        let finer = separators.get(position + 1..).unwrap_or(&[]);

        let mut chunks = Vec::new();
        let mut pending: Vec<Range<usize>> = Vec::new();

        for piece in split_keeping_separator(slice, separator) {
            let piece = (range.start + piece.start)..(range.start + piece.end);
            if char_len(&text[piece.clone()]) < self.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                self.merge_pieces(text, &pending, &mut chunks);
                pending.clear();
            }

            if finer.is_empty() {
                push_trimmed(text, piece, &mut chunks);
            } else {
                chunks.extend(self.split_recursive(text, piece, finer));
            }
        }

        if !pending.is_empty() {
            self.merge_pieces(text, &pending, &mut chunks);
        }

        chunks
    }

    /// Merge consecutive pieces into windows no longer than `chunk_size`,
    /// carrying trailing pieces worth at most `chunk_overlap` characters into
    /// the next window.
    fn merge_pieces(&self, text: &str, pieces: &[Range<usize>], out: &mut Vec<Range<usize>>) {
        let mut window: VecDeque<(Range<usize>, usize)> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(&text[piece.clone()]);

            if total + len > self.chunk_size {
                if let (Some(first), Some(last)) = (window.front(), window.back()) {
                    push_trimmed(text, first.0.start..last.0.end, out);
                }
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }

            window.push_back((piece.clone(), len));
            total += len;
        }

        if let (Some(first), Some(last)) = (window.front(), window.back()) {
            push_trimmed(text, first.0.start..last.0.end, out);
        }
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        self.split_ranges(&document.text)
            .into_iter()
            .enumerate()
            .map(|(i, range)| {
                let mut metadata = document.metadata.clone();
                metadata.insert("chunk_index".to_string(), i.to_string());
                Chunk {
                    id: format!("{}_{i}", document.id),
                    text: document.text[range.clone()].to_string(),
                    document_id: document.id.clone(),
                    page: document.page,
                    start_index: range.start,
                    metadata,
                }
            })
            .collect()
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split `text` at every occurrence of `separator`, keeping the separator at
/// the start of the piece that follows it. Empty pieces are dropped; an empty
/// separator yields one piece per character. Ranges are relative to `text`.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<Range<usize>> {
    if separator.is_empty() {
        return text.char_indices().map(|(i, c)| i..i + c.len_utf8()).collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            pieces.push(start..pos);
        }
        start = pos;
    }
    if start < text.len() {
        pieces.push(start..text.len());
    }
    pieces
}

/// Push `range` shrunk to exclude surrounding whitespace, unless nothing is left.
fn push_trimmed(text: &str, range: Range<usize>, out: &mut Vec<Range<usize>>) {
    let slice = &text[range.clone()];
    let start = range.start + (slice.len() - slice.trim_start().len());
    let end = range.start + slice.trim_end().len();
    if start < end {
        out.push(start..end);
    }
}
