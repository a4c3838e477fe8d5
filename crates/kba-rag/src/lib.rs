//! Retrieval-augmented answering pipeline for KBA
//!
//! Chunking, retrieval, context assembly, confidence scoring and resilient
//! generation, sequenced by [`RagPipeline`]. Local collaborators
//! ([`LocalVectorStore`], [`HashEmbedder`], [`DirectoryDocumentSource`])
//! make the pipeline usable without extra services.

pub mod chunker;
pub mod confidence;
pub mod config;
pub mod context;
pub mod document_source;
pub mod embedder;
pub mod generation;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod vector_store;


pub use chunker::Chunker;
pub use confidence::ConfidenceScorer;
pub use config::{EmbedderKind, PipelineConfig};
pub use context::{ContextAssembler, NO_CONTEXT};
pub use document_source::DirectoryDocumentSource;
pub use embedder::HashEmbedder;
pub use generation::{AttemptState, FaultKind, GenerationClient};
pub use pipeline::{
    ComponentStatus, HealthReport, HealthStatus, PipelineStats, RagPipeline, APOLOGY_MESSAGE,
};
pub use prompt::{PromptTemplate, PromptTemplates};
pub use retriever::Retriever;
pub use vector_store::LocalVectorStore;

// Re-export core types for convenience
pub use kba_core::{Error, QueryResult, Result, RetrievedPassage};
