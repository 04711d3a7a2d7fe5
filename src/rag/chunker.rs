//! Text chunking for document ingestion.
//!
//! Documents are cut into overlapping character windows. Within the last
//! `overlap` characters of each window the chunker looks for the strongest
//! natural break (paragraph, line, sentence, word) and falls back to a hard
//! cut when none exists. Offsets are in characters, not bytes, and every
//! chunk text is an exact slice of the document.

use crate::types::ExtractedDocument;
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;
use via_index::Chunk;

/// Default window length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap between consecutive windows in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Errors produced while chunking.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChunkError {
    /// The document has no extractable characters.
    #[error("Document '{source_id}' has no extractable text")]
    EmptyInput {
        /// Document that produced no content.
        source_id: String,
    },

    /// Window parameters violate `0 <= overlap < size`.
    #[error("Invalid chunker configuration: {0}")]
    InvalidConfig(String),
}

/// Break strength at a cut position, strongest last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Boundary {
    None,
    Word,
    Sentence,
    Line,
    Paragraph,
}

/// Splits document text into overlapping chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl TextChunker {
    /// Create a chunker with window length `chunk_size` and `chunk_overlap`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkError> {
        if chunk_size == 0 {
            return Err(ChunkError::InvalidConfig(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(ChunkError::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Window length in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap in characters.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Chunk an extracted document, tagging chunks with page numbers.
    pub fn chunk(&self, document: &ExtractedDocument) -> Result<Vec<Chunk>, ChunkError> {
        self.chunk_text(&document.text, &document.source_id, &document.page_starts)
    }

    /// Chunk raw text.
    ///
    /// `page_starts` holds the character offset at which each page begins,
    /// in ascending order; pass an empty slice when pages are unknown.
    ///
    /// Chunk `i` starts at or after `i * (chunk_size - chunk_overlap)` and
    /// begins no later than where chunk `i - 1` ended, so the chunks cover
    /// the text without gaps.
    pub fn chunk_text(
        &self,
        text: &str,
        source_id: &str,
        page_starts: &[usize],
    ) -> Result<Vec<Chunk>, ChunkError> {
        if !text.chars().any(|c| !c.is_whitespace() && !c.is_control()) {
            return Err(ChunkError::EmptyInput {
                source_id: source_id.to_string(),
            });
        }

        let (byte_offsets, boundaries) = analyze(text);
        let n = byte_offsets.len() - 1;
        let step = self.chunk_size - self.chunk_overlap;

        let mut chunks = Vec::new();
        let mut start = 0usize;

        loop {
            let ordinal = chunks.len();
            let hard_end = (start + self.chunk_size).min(n);

            let end = if hard_end == n {
                n
            } else {
                let lo = (start + self.chunk_overlap + 1)
                    .max((ordinal + 1) * step)
                    .max(start + self.chunk_size / 2);
                best_break(&boundaries, lo, hard_end)
            };

            chunks.push(Chunk {
                id: format!("{}#{}", source_id, ordinal),
                source_document_id: source_id.to_string(),
                page_number: page_number(page_starts, start),
                char_start: start,
                char_end: end,
                text: text[byte_offsets[start]..byte_offsets[end]].to_string(),
                embedding: None,
            });

            if end == n {
                break;
            }
            start = end
                .saturating_sub(self.chunk_overlap)
                .max((ordinal + 1) * step);
        }

        Ok(chunks)
    }
}

/// Byte offset of every char position (plus the end) and the break strength
/// of cutting just before each position.
fn analyze(text: &str) -> (Vec<usize>, Vec<Boundary>) {
    let chars: Vec<char> = text.chars().collect();
    let mut byte_offsets: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
    byte_offsets.push(text.len());

    let mut boundaries = vec![Boundary::None; chars.len() + 1];

    for (byte, _) in text.split_sentence_bound_indices() {
        if let Ok(pos) = byte_offsets.binary_search(&byte) {
            boundaries[pos] = Boundary::Sentence;
        }
    }

    for pos in 1..=chars.len() {
        let prev = chars[pos - 1];
        let strength = if prev == '\n' && ends_blank_line(&chars, pos - 1) {
            Boundary::Paragraph
        } else if prev == '\n' {
            Boundary::Line
        } else if boundaries[pos] == Boundary::Sentence {
            Boundary::Sentence
        } else if prev.is_whitespace() {
            Boundary::Word
        } else {
            Boundary::None
        };
        boundaries[pos] = strength;
    }
    boundaries[0] = Boundary::None;

    (byte_offsets, boundaries)
}

/// Whether the newline at `newline` closes an empty (or `\r`-only) line.
fn ends_blank_line(chars: &[char], newline: usize) -> bool {
    let mut i = newline;
    while i > 0 {
        i -= 1;
        match chars[i] {
            '\r' => continue,
            '\n' => return true,
            _ => return false,
        }
    }
    false
}

/// Strongest break in `lo..=hi`, nearest to `hi` among equals; `hi` when
/// the window has no break at all.
fn best_break(boundaries: &[Boundary], lo: usize, hi: usize) -> usize {
    let mut best = (Boundary::None, hi);
    for pos in (lo..=hi).rev() {
        if boundaries[pos] > best.0 {
            best = (boundaries[pos], pos);
            if best.0 == Boundary::Paragraph {
                break;
            }
        }
    }
    best.1
}

fn page_number(page_starts: &[usize], offset: usize) -> Option<u32> {
    if page_starts.is_empty() {
        return None;
    }
    let page = page_starts.partition_point(|&p| p <= offset).max(1);
    u32::try_from(page).ok()
}
