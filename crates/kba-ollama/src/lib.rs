//! Ollama integration for the knowledge-base assistant
//!
//! This crate provides the Ollama implementations of the LLMProvider and
//! Embedder traits.

mod client;
mod config;
mod embedder;


pub use client::OllamaClient;
pub use config::OllamaConfig;
pub use embedder::OllamaEmbedder;

// Re-export core types for convenience
pub use kba_core::{Embedder, Error, GenerationConfig, GenerationResult, LLMProvider, Result};
