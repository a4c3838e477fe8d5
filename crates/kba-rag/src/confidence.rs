//! Confidence estimation from retrieval quality

use kba_core::RetrievedPassage;

pub const DEFAULT_SATURATION: usize = 5;

/// Scores how far an answer can lean on the retrieved passages.
///
/// Mean similarity, scaled down while fewer than `saturation` passages came
/// back, so one strong match alone never yields full confidence.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceScorer {
    saturation: usize,
}

impl ConfidenceScorer {
    pub fn new(saturation: usize) -> Self {
        Self {
            saturation: saturation.max(1),
        }
    }

    /// Confidence in [0, 1], rounded to two decimals
    pub fn score(&self, passages: &[RetrievedPassage]) -> f32 {
        if passages.is_empty() {
            return 0.0;
        }

        let count = passages.len() as f32;
        let avg_similarity = passages.iter().map(|p| p.similarity).sum::<f32>() / count;
        let count_factor = (count / self.saturation as f32).min(1.0);

        let confidence = (avg_similarity * count_factor).clamp(0.0, 1.0);
        (confidence * 100.0).round() / 100.0
    }
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::new(DEFAULT_SATURATION)
    }
}
