//! Local vector store implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

use kba_core::{Chunk, ChunkMetadata, Embedder, EmbeddingIndex, Error, IndexMatch, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredChunk {
    text: String,
    metadata: ChunkMetadata,
    embedding: Vec<f32>,
}

type ChunkMap = BTreeMap<String, StoredChunk>;

#[derive(Debug, Default, Deserialize)]
struct Snapshot {
    chunks: ChunkMap,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    chunks: &'a ChunkMap,
}

/// In-memory cosine index with optional JSON snapshot persistence.
///
/// Writes build the next map, persist it, and only then replace the live
/// one, so a failed snapshot write leaves the store as it was.
pub struct LocalVectorStore {
    embedder: Arc<dyn Embedder>,
    chunks: RwLock<ChunkMap>,
    snapshot_path: Option<PathBuf>,
    writer: tokio::sync::Mutex<()>,
}

impl LocalVectorStore {
    /// Create an empty, memory-only store
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            chunks: RwLock::new(BTreeMap::new()),
            snapshot_path: None,
            writer: tokio::sync::Mutex::new(()),
        }
    }

    /// Open a store persisted at `path`, starting empty if the file does not exist
    pub async fn open(embedder: Arc<dyn Embedder>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let chunks = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str::<Snapshot>(&content)?.chunks,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(Error::Io(e)),
        };

        info!(path = %path.display(), chunks = chunks.len(), "Opened vector store");

        Ok(Self {
            embedder,
            chunks: RwLock::new(chunks),
            snapshot_path: Some(path),
            writer: tokio::sync::Mutex::new(()),
        })
    }

    fn lock_error<E: std::fmt::Display>(e: E) -> Error {
        Error::VectorStore(format!("Lock error: {}", e))
    }

    /// Cosine similarity; 0 when either vector has no magnitude
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }

    async fn persist(&self, chunks: &ChunkMap) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let content = serde_json::to_string(&SnapshotRef { chunks })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content).await?;

        debug!(path = %path.display(), "Persisted vector store snapshot");
        Ok(())
    }

    /// Persist `next` and install it as the live map
    async fn commit(&self, next: ChunkMap) -> Result<()> {
        self.persist(&next).await?;
        *self.chunks.write().map_err(Self::lock_error)? = next;
        Ok(())
    }
}

#[async_trait]
impl EmbeddingIndex for LocalVectorStore {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embedder.embed(texts).await
    }

    async fn add(&self, chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>, ids: Vec<String>) -> Result<()> {
        if chunks.len() != vectors.len() || chunks.len() != ids.len() {
            return Err(Error::InvalidInput(format!(
                "mismatched batch: {} chunks, {} vectors, {} ids",
                chunks.len(),
                vectors.len(),
                ids.len()
            )));
        }

        let added = chunks.len();
        let _writer = self.writer.lock().await;

        let mut next = self.chunks.read().map_err(Self::lock_error)?.clone();
        for ((chunk, embedding), id) in chunks.into_iter().zip(vectors).zip(ids) {
            next.insert(
                id,
                StoredChunk {
                    text: chunk.text,
                    metadata: chunk.metadata,
                    embedding,
                },
            );
        }

        self.commit(next).await?;
        info!(added, "Added chunks to vector store");
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>> {
        let stored = self.chunks.read().map_err(Self::lock_error)?;

        let mut matches = Vec::with_capacity(stored.len());
        for (id, chunk) in stored.iter() {
            if chunk.embedding.len() != vector.len() {
                return Err(Error::VectorStore(format!(
                    "embedding dimension mismatch: query has {}, chunk '{}' has {}",
                    vector.len(),
                    id,
                    chunk.embedding.len()
                )));
            }

            matches.push(IndexMatch {
                id: id.clone(),
                text: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
                distance: (1.0 - Self::cosine_similarity(vector, &chunk.embedding)).clamp(0.0, 2.0),
            });
        }

        matches.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);

        Ok(matches)
    }

    async fn count(&self) -> Result<usize> {
        let stored = self.chunks.read().map_err(Self::lock_error)?;
        Ok(stored.len())
    }

    async fn clear(&self) -> Result<()> {
        let _writer = self.writer.lock().await;
        self.commit(BTreeMap::new()).await?;
        info!("Vector store cleared");
        Ok(())
    }
}
