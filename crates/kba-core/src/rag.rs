//! Retrieval and answer types

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::ChunkMetadata;

/// A chunk retrieved for a query, with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub text: String,
    pub metadata: ChunkMetadata,
    /// `1 - cosine distance`; in [-1, 1], usually [0, 1]
    pub similarity: f32,
}

/// Answer to one question, with the retrieval that grounded it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub answer: String,
    pub sources: BTreeSet<String>,
    /// Ranked, most similar first
    pub relevant_chunks: Vec<RetrievedPassage>,
    pub context_used: bool,
    pub confidence: f32,
    /// Seconds, rounded to two decimals
    pub response_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
