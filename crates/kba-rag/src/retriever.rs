//! Nearest-neighbor retrieval over an embedding index

use std::sync::Arc;
use tracing::{debug, warn};

use kba_core::{EmbeddingIndex, Error, Result, RetrievedPassage};

/// Embeds a question and returns the index's ranked matches as passages
pub struct Retriever<I: EmbeddingIndex> {
    index: Arc<I>,
}

impl<I: EmbeddingIndex> Retriever<I> {
    pub fn new(index: Arc<I>) -> Self {
        Self { index }
    }

    /// Search for the `top_k` passages most similar to `query`.
    ///
    /// Ranking is the index's own (ascending distance) and is kept as is.
    /// An unreachable index or embedder degrades to an empty result; other
    /// faults are returned to the caller.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedPassage>> {
        if top_k == 0 {
            return Err(Error::InvalidInput("top_k must be positive".to_string()));
        }

        match self.search_index(query, top_k).await {
            Ok(passages) => {
                debug!(top_k, found = passages.len(), "Retrieved passages");
                Ok(passages)
            }
            Err(e) if e.is_unavailable() => {
                warn!(error = %e, "Index unavailable, answering without context");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn search_index(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedPassage>> {
        let vector = self
            .index
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("embedder returned no vector for the query".to_string()))?;

        let matches = self.index.query(&vector, top_k).await?;

        Ok(matches
            .into_iter()
            .take(top_k)
            .map(|m| RetrievedPassage {
                text: m.text,
                metadata: m.metadata,
                similarity: 1.0 - m.distance,
            })
            .collect())
    }
}
