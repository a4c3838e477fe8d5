//! Embedding and vector index traits

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Chunk, ChunkMetadata, Result};

/// A nearest-neighbor match returned by an index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMatch {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Cosine distance in [0, 2]
    pub distance: f32,
}

/// Turns text into fixed-length vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Vector dimension, when known up front
    fn dimension(&self) -> Option<usize>;
}

/// Trait for embedding indexes (embedding model plus vector store)
///
/// Implementations must tolerate concurrent readers: queries share one handle.
#[async_trait]
pub trait EmbeddingIndex: Send + Sync {
    /// Embed a batch of texts with the index's embedding model
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Store chunks with their vectors under the given ids. An existing id is replaced.
    async fn add(&self, chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>, ids: Vec<String>) -> Result<()>;

    /// Nearest neighbors of `vector`, ascending by distance, at most `top_k`
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>>;

    /// Number of stored chunks
    async fn count(&self) -> Result<usize>;

    /// Remove every stored chunk
    async fn clear(&self) -> Result<()>;
}
