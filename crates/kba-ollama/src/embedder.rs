//! Ollama embedding backend

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use kba_core::{Embedder, Error, Result};

use crate::client::{http_client, map_request_error};
use crate::config::OllamaConfig;

/// Embedder backed by Ollama's `/api/embed` endpoint
pub struct OllamaEmbedder {
    config: OllamaConfig,
    client: Client,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedder {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = http_client(&config)?;

        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.embed_model
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.config.endpoint("api/embed")?;
        let request_body = EmbedRequest {
            model: &self.config.embed_model,
            input: texts,
        };

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
            return Err(Error::Embedding(format!(
                "Ollama embed request failed with status {}: {}",
                status, error_text
            )));
        }

        let body: EmbedResponse = response.json().await.map_err(map_request_error)?;

        if body.embeddings.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                body.embeddings.len()
            )));
        }

        Ok(body.embeddings)
    }

    fn dimension(&self) -> Option<usize> {
        None
    }
}
