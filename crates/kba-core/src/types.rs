//! Common types used across the knowledge-base assistant

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for retry behavior of generation requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    /// Upper bound on total latency of one request, retries included
    pub deadline: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
            deadline: None,
        }
    }
}

/// Configuration for document chunking and embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Words per chunk
    pub chunk_size: usize,
    /// Words shared between consecutive chunks
    pub chunk_overlap: usize,
    /// Texts per embedding request during ingestion
    pub batch_size: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            batch_size: 32,
        }
    }
}

/// Positional metadata attached to every chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub chunk_id: usize,
    /// Word offset of the first word (inclusive)
    pub start_index: usize,
    /// Word offset past the last word (exclusive)
    pub end_index: usize,
}

/// A bounded, overlapping window of a source document's text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Index identifier, stable across re-ingestion of the same source
    pub fn id(&self) -> String {
        format!("{}_{}", self.metadata.source, self.metadata.chunk_id)
    }
}
