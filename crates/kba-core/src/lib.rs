//! Core traits and types for KBA (Knowledge-Base Assistant)
//!
//! This crate defines the fundamental traits and types used across the KBA system.
//! It provides capability-facing interfaces for generation backends, embedders,
//! embedding indexes and document sources, so the answering pipeline can be
//! exercised against fakes in tests and swapped to other backends in production.

pub mod document_source;
pub mod error;
pub mod llm;
pub mod rag;
pub mod types;
pub mod vector_store;


pub use document_source::{DocumentSource, SourceText};
pub use error::{Error, Result};
pub use llm::{GenerationConfig, GenerationResult, LLMProvider};
pub use rag::{QueryResult, RetrievedPassage};
pub use types::*;
pub use vector_store::{Embedder, EmbeddingIndex, IndexMatch};
