//! Document source trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Result;

/// Raw text extracted from one source document, ready for chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceText {
    pub text: String,
    pub source: String,
}

/// Trait for document sources
///
/// A source turns a file or directory into extracted text. A document that
/// cannot be read is logged and skipped; only a failure of the whole walk
/// (e.g. a missing root) is returned as an error.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Extract text from every supported document under `path`
    async fn process(&self, path: &Path) -> Result<Vec<SourceText>>;

    /// Whether a file would be picked up by `process`
    fn supports(&self, path: &Path) -> bool;
}
