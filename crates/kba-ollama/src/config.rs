//! Ollama configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use url::Url;

use kba_core::{Error, Result};

pub const DEFAULT_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.2";
pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for the Ollama backends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub embed_model: String,
    pub timeout: Duration,
}

impl OllamaConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("OLLAMA_URL").unwrap_or_else(|| DEFAULT_URL.to_string());
        let model = lookup("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let embed_model =
            lookup("OLLAMA_EMBED_MODEL").unwrap_or_else(|| DEFAULT_EMBED_MODEL.to_string());

        let timeout_secs = match lookup("OLLAMA_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                Error::Configuration(format!("OLLAMA_TIMEOUT_SECS is not a number: {}", raw))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let config = Self {
            base_url,
            model,
            embed_model,
            timeout: Duration::from_secs(timeout_secs),
        };
        config.endpoint("")?;
        Ok(config)
    }

    /// Create configuration with explicit values
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve an API path such as `api/generate` against the base URL
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let mut base = Url::parse(&self.base_url).map_err(|e| {
            Error::Configuration(format!("invalid Ollama URL '{}': {}", self.base_url, e))
        })?;

        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::Configuration(format!(
                "Ollama URL must be http or https: {}",
                self.base_url
            )));
        }

        if !base.path().ends_with('/') {
            let path_with_slash = format!("{}/", base.path());
            base.set_path(&path_with_slash);
        }

        base.join(path)
            .map_err(|e| Error::Configuration(format!("invalid Ollama endpoint '{}': {}", path, e)))
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self::new(DEFAULT_URL, DEFAULT_MODEL)
    }
}
