//! LLM provider trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Sampling options for text generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub model_id: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub num_ctx: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model_id: "llama3.2".to_string(),
            temperature: 0.1,
            top_p: 0.9,
            top_k: 40,
            num_ctx: 4096,
        }
    }
}

/// Result of a text generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
    pub model_id: String,
}

/// Trait for LLM providers (e.g., Ollama)
///
/// A single call is one request/response round trip. Implementations report
/// faults through distinct error variants: `Error::Connection` when the
/// backend cannot be reached, `Error::Timeout` when the request outlives its
/// timeout, anything else for HTTP or decoding failures. Retrying is the
/// caller's business.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate text using the provider's default configuration
    async fn generate(&self, prompt: &str) -> Result<GenerationResult>;

    /// Generate text with custom configuration
    async fn generate_with_config(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<GenerationResult>;

    /// Probe whether the backend is up
    async fn health_check(&self) -> Result<bool>;

    /// Get the model ID being used
    fn model_id(&self) -> &str;
}
