//! Boundary-aware character splitter.
//!
//! Each chunk is an exact substring of its document. A window of at most
//! `chunk_size` characters is cut at the last paragraph, line, sentence or
//! word boundary in its second half, falling back to a hard cut, and the
//! next window starts `chunk_overlap` characters before the previous end.

use serde::{Deserialize, Serialize};

use super::documents::{Document, DocumentMetadata};
use super::RagError;
use crate::core::config::defaults::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};

/// Separator tiers, most preferred first.
const SEPARATOR_TIERS: [&[&str]; 4] = [&["\n\n"], &["\n"], &[". ", "! ", "? "], &[" "]];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl SplitterConfig {
    pub fn validate(&self) -> Result<(), RagError> {
        if self.chunk_size == 0 {
            return Err(RagError::InvalidConfig(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: DocumentMetadata,
    /// Character offset of the chunk in its document.
    pub start_offset: usize,
    /// Position of the chunk within its document.
    pub chunk_index: usize,
}

impl Chunk {
    pub fn source(&self) -> &str {
        &self.metadata.source
    }
}

#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    pub fn new(config: SplitterConfig) -> Result<Self, RagError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    pub fn split_documents(&self, docs: &[Document]) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = docs
            .iter()
            .flat_map(|doc| self.split_document(doc))
            .collect();
        tracing::info!(
            "Split {} docs into {} chunks (chunk_size={}, overlap={})",
            docs.len(),
            chunks.len(),
            self.config.chunk_size,
            self.config.chunk_overlap
        );
        chunks
    }

    pub fn split_document(&self, doc: &Document) -> Vec<Chunk> {
        let chars: Vec<char> = doc.text.chars().collect();
        self.split_spans(&chars)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, (start, end))| Chunk {
                text: chars[start..end].iter().collect(),
                metadata: DocumentMetadata {
                    source: doc.metadata.source.clone(),
                    extra: Default::default(),
                },
                start_offset: start,
                chunk_index,
            })
            .collect()
    }

    /// Half-open character ranges, in order.
    fn split_spans(&self, chars: &[char]) -> Vec<(usize, usize)> {
        let total = chars.len();
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut spans = Vec::new();
        if total == 0 {
            return spans;
        }

        let mut start = 0;
        loop {
            if total - start <= size {
                spans.push((start, total));
                break;
            }

            let limit = start + size;
            // Keeps every window past the overlap so the next start advances.
            let earliest = start + (overlap + 1).max(size / 2);
            let end = find_boundary(chars, start, earliest, limit).unwrap_or(limit);
            spans.push((start, end));
            start = end - overlap;
        }

        spans
    }
}

/// Latest cut position in `[earliest, limit]` that directly follows a
/// separator lying inside the window, trying tiers in order.
fn find_boundary(chars: &[char], start: usize, earliest: usize, limit: usize) -> Option<usize> {
    for tier in SEPARATOR_TIERS {
        let separators: Vec<Vec<char>> = tier.iter().map(|s| s.chars().collect()).collect();
        for cut in (earliest..=limit).rev() {
            let matched = separators.iter().any(|sep| {
                cut >= start + sep.len() && chars[cut - sep.len()..cut] == sep[..]
            });
            if matched {
                return Some(cut);
            }
        }
    }
    None
}
