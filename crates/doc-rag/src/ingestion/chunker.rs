//! Sentence-aware text chunking with position tracking
//!
//! Sizes are counted in characters rather than bytes so that Japanese text,
//! where most characters are three bytes in UTF-8, gets chunks of the size the
//! configuration asks for.

use std::collections::VecDeque;
use unicode_segmentation::UnicodeSegmentation;

use crate::types::{Node, SourceDocument};

/// A contiguous slice of the source text
#[derive(Debug, Clone, Copy)]
struct Span {
    byte_start: usize,
    byte_end: usize,
    char_start: usize,
    char_end: usize,
}

impl Span {
    fn chars(&self) -> usize {
        self.char_end - self.char_start
    }
}

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Characters carried over from the end of the previous chunk
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker
    ///
    /// `overlap` is clamped below `chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    /// Chunk every document, numbering chunks per document
    pub fn chunk_documents(&self, documents: &[SourceDocument]) -> Vec<Node> {
        documents
            .iter()
            .flat_map(|doc| self.chunk_document(doc))
            .collect()
    }

    /// Chunk a single document
    pub fn chunk_document(&self, doc: &SourceDocument) -> Vec<Node> {
        let text = doc.text.as_str();
        let mut nodes = Vec::new();
        let mut current: VecDeque<Span> = VecDeque::new();
        let mut current_len = 0usize;
        let mut chunk_index = 0u32;

        for span in self.split_spans(text) {
            let span_len = span.chars();

            if !current.is_empty() && current_len + span_len > self.chunk_size {
                if let Some(node) = Self::emit(doc, text, &current, chunk_index) {
                    nodes.push(node);
                    chunk_index += 1;
                }

                // Keep whole sentences from the tail as overlap, as long as the
                // next span still fits.
                while let Some(front) = current.front() {
                    if current_len > self.overlap || current_len + span_len > self.chunk_size {
                        current_len -= front.chars();
                        current.pop_front();
                    } else {
                        break;
                    }
                }
            }

            current.push_back(span);
            current_len += span_len;
        }

        if let Some(node) = Self::emit(doc, text, &current, chunk_index) {
            nodes.push(node);
        }

        nodes
    }

    /// Build a node from the spans of the current chunk, skipping blank chunks
    fn emit(doc: &SourceDocument, text: &str, spans: &VecDeque<Span>, index: u32) -> Option<Node> {
        let first = spans.front()?;
        let last = spans.back()?;
        let raw = &text[first.byte_start..last.byte_end];
        let content = raw.trim();
        if content.is_empty() {
            return None;
        }

        // Offsets point at the trimmed text
        let leading = raw[..raw.len() - raw.trim_start().len()].chars().count();
        let trailing = raw[raw.trim_end().len()..].chars().count();
        Some(Node::new(
            doc,
            content.to_string(),
            first.char_start + leading,
            last.char_end - trailing,
            index,
        ))
    }

    /// Split text into sentence spans, hard-splitting sentences longer than a chunk
    fn split_spans(&self, text: &str) -> Vec<Span> {
        let mut spans = Vec::new();
        let mut char_pos = 0usize;

        for (byte_start, sentence) in text.split_sentence_bound_indices() {
            let sentence_chars = sentence.chars().count();

            if sentence_chars <= self.chunk_size {
                spans.push(Span {
                    byte_start,
                    byte_end: byte_start + sentence.len(),
                    char_start: char_pos,
                    char_end: char_pos + sentence_chars,
                });
                char_pos += sentence_chars;
                continue;
            }

            let mut piece_start = 0usize;
            let mut piece_chars = 0usize;
            for (offset, _) in sentence.char_indices() {
                if piece_chars == self.chunk_size {
                    spans.push(Span {
                        byte_start: byte_start + piece_start,
                        byte_end: byte_start + offset,
                        char_start: char_pos,
                        char_end: char_pos + piece_chars,
                    });
                    char_pos += piece_chars;
                    piece_start = offset;
                    piece_chars = 0;
                }
                piece_chars += 1;
            }
            if piece_chars > 0 {
                spans.push(Span {
                    byte_start: byte_start + piece_start,
                    byte_end: byte_start + sentence.len(),
                    char_start: char_pos,
                    char_end: char_pos + piece_chars,
                });
                char_pos += piece_chars;
            }
        }

        spans
    }
}
