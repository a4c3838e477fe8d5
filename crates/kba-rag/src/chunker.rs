//! Word-window chunking with overlap

use kba_core::{Chunk, ChunkMetadata, Error, IndexingConfig, Result};

/// Splits text into overlapping windows of whitespace-delimited words
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    /// Create a chunker; `chunk_overlap` must be smaller than `chunk_size`
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Configuration("chunk_size must be positive".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::Configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn from_config(config: &IndexingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Words between the starts of consecutive chunks
    pub fn stride(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }

    /// Chunk `text` into windows tagged with `source`. Chunk ids start at 0.
    pub fn chunk(&self, text: &str, source: &str) -> Vec<Chunk> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let stride = self.stride();

        (0..)
            .map(|chunk_id| (chunk_id, chunk_id * stride))
            .take_while(|&(_, start)| start < words.len())
            .map(|(chunk_id, start)| {
                let end = (start + self.chunk_size).min(words.len());
                Chunk {
                    text: words[start..end].join(" "),
                    metadata: ChunkMetadata {
                        source: source.to_string(),
                        chunk_id,
                        start_index: start,
                        end_index: end,
                    },
                }
            })
            .collect()
    }
}
