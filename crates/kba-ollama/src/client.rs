//! Ollama generation client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use kba_core::{Error, GenerationConfig, GenerationResult, LLMProvider, Result};

use crate::config::OllamaConfig;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Ollama client speaking the `/api/generate` protocol
pub struct OllamaClient {
    config: OllamaConfig,
    client: Client,
    generation: GenerationConfig,
}

#[derive(Serialize)]
struct SamplingOptions {
    temperature: f32,
    top_p: f32,
    num_ctx: u32,
    top_k: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: SamplingOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransportFault {
    Connect,
    Timeout,
    Decode,
    Other,
}

impl TransportFault {
    /// A timeout while connecting counts as a connect failure, so only a
    /// server that accepted the request and went quiet is a `Timeout`.
    fn classify(is_connect: bool, is_timeout: bool, is_decode: bool) -> Self {
        if is_connect {
            TransportFault::Connect
        } else if is_timeout {
            TransportFault::Timeout
        } else if is_decode {
            TransportFault::Decode
        } else {
            TransportFault::Other
        }
    }

    fn of(err: &reqwest::Error) -> Self {
        Self::classify(err.is_connect(), err.is_timeout(), err.is_decode())
    }
}

/// Classify a transport failure into the error kinds callers retry on
pub(crate) fn map_request_error(err: reqwest::Error) -> Error {
    match TransportFault::of(&err) {
        TransportFault::Connect => Error::Connection(format!("Failed to connect to Ollama: {}", err)),
        TransportFault::Timeout => Error::Timeout(format!("Ollama request timed out: {}", err)),
        TransportFault::Decode => Error::Serialization(format!("Invalid response from Ollama: {}", err)),
        TransportFault::Other => Error::LLMProvider(format!("Ollama request failed: {}", err)),
    }
}

/// HTTP client shared by the generation and embedding backends.
///
/// The connect phase gets its own, shorter bound so an unreachable host
/// fails as a connection error instead of eating the whole request budget.
pub(crate) fn http_client(config: &OllamaConfig) -> Result<Client> {
    Client::builder()
        .timeout(config.timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(config.timeout))
        .build()
        .map_err(|e| Error::Configuration(e.to_string()))
}

impl OllamaClient {
    /// Create a new Ollama client from configuration
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = http_client(&config)?;

        let generation = GenerationConfig {
            model_id: config.model.clone(),
            ..Default::default()
        };

        Ok(Self {
            config,
            client,
            generation,
        })
    }

    /// Create a new Ollama client from environment variables
    pub fn from_env() -> Result<Self> {
        let config = OllamaConfig::from_env()?;
        Self::new(config)
    }

    /// Set the model to use for generation
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.generation.model_id = model_id.into();
        self
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }
}

#[async_trait]
impl LLMProvider for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult> {
        self.generate_with_config(prompt, &self.generation).await
    }

    async fn generate_with_config(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<GenerationResult> {
        let url = self.config.endpoint("api/generate")?;

        let request_body = GenerateRequest {
            model: &config.model_id,
            prompt,
            stream: false,
            options: SamplingOptions {
                temperature: config.temperature,
                top_p: config.top_p,
                num_ctx: config.num_ctx,
                top_k: config.top_k,
            },
        };

        debug!(model = %config.model_id, prompt_chars = prompt.len(), "Sending generate request");

        let response = self
            .client
            .post(url)
            .json(&request_body)
            .send()
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::LLMProvider(format!(
                "Ollama request failed with status {}: {}",
                status, error_text
            )));
        }

        let body: GenerateResponse = response.json().await.map_err(map_request_error)?;

        Ok(GenerationResult {
            text: body.response,
            model_id: config.model_id.clone(),
        })
    }

    async fn health_check(&self) -> Result<bool> {
        let url = self.config.endpoint("api/tags")?;

        let response = self
            .client
            .get(url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map_err(map_request_error)?;

        Ok(response.status().is_success())
    }

    fn model_id(&self) -> &str {
        &self.generation.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_phase_timeout_is_a_connection_fault() {
        assert_eq!(TransportFault::classify(true, true, false), TransportFault::Connect);
        assert_eq!(TransportFault::classify(true, false, false), TransportFault::Connect);
    }

    #[test]
    fn test_response_timeout_stays_a_timeout() {
        assert_eq!(TransportFault::classify(false, true, false), TransportFault::Timeout);
        assert_eq!(TransportFault::classify(false, false, true), TransportFault::Decode);
        assert_eq!(TransportFault::classify(false, false, false), TransportFault::Other);
    }

    #[test]
    fn test_connect_timeout_never_exceeds_request_timeout() {
        let config = OllamaConfig::default().with_timeout(Duration::from_millis(200));
        assert!(http_client(&config).is_ok());
        assert_eq!(CONNECT_TIMEOUT.min(config.timeout), Duration::from_millis(200));
    }
}
