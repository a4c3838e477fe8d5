//! Offline embedder

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use kba_core::{Embedder, Result};

pub const DEFAULT_DIMENSION: usize = 384;

/// Deterministic embedder built from hashed word and bigram features.
///
/// No model download and no server: useful for air-gapped installs and tests.
/// Vectors are L2-normalized so cosine distance stays in [0, 2].
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn bucket(&self, feature: &str, shift: u32) -> usize {
        let mut hasher = DefaultHasher::new();
        feature.hash(&mut hasher);
        ((hasher.finish() >> shift) % self.dimension as u64) as usize
    }

    /// Embed a single text
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let normalized_text = text.to_lowercase();
        let words: Vec<&str> = normalized_text
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|w| !w.is_empty())
            .collect();

        let mut embedding = vec![0.0f32; self.dimension];

        for word in &words {
            embedding[self.bucket(word, 0)] += 1.0;
            embedding[self.bucket(word, 16)] += 0.5;
        }

        for pair in words.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            embedding[self.bucket(&bigram, 0)] += 0.8;
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for val in embedding.iter_mut() {
                *val /= magnitude;
            }
        }

        embedding
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }
}
