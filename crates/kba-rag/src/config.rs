//! Pipeline configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use kba_core::{Error, IndexingConfig, Result, RetryConfig};

pub const DEFAULT_ASSISTANT_ROLE: &str = "an IT support expert assistant";

/// Which embedding model backs the local vector store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Remote embeddings from the Ollama server
    Ollama,
    /// Offline hashed bag-of-words features
    Hash,
}

impl FromStr for EmbedderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(EmbedderKind::Ollama),
            "hash" => Ok(EmbedderKind::Hash),
            other => Err(Error::Configuration(format!("unknown embedder '{}'", other))),
        }
    }
}

/// Configuration for the answering pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub indexing: IndexingConfig,
    pub retry: RetryConfig,
    /// Passages retrieved per question when the caller does not say
    pub top_k: usize,
    /// Passage count at which confidence stops growing with more results
    pub confidence_saturation: usize,
    pub knowledge_base_dir: PathBuf,
    pub vector_db_path: PathBuf,
    /// Larger documents are skipped during ingestion
    pub max_file_size: u64,
    pub embedder: EmbedderKind,
    /// Persona the prompt templates address the model as
    pub assistant_role: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            indexing: IndexingConfig::default(),
            retry: RetryConfig::default(),
            top_k: 5,
            confidence_saturation: 5,
            knowledge_base_dir: PathBuf::from("knowledge-base"),
            vector_db_path: PathBuf::from("vector-db/index.json"),
            max_file_size: 50 * 1024 * 1024,
            embedder: EmbedderKind::Ollama,
            assistant_role: DEFAULT_ASSISTANT_ROLE.to_string(),
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            Error::Configuration(format!("{} has an invalid value: {}", key, raw))
        }),
        None => Ok(default),
    }
}

impl PipelineConfig {
    /// Create configuration from `KBA_*` environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let indexing = IndexingConfig {
            chunk_size: parse_var(&lookup, "KBA_CHUNK_SIZE", defaults.indexing.chunk_size)?,
            chunk_overlap: parse_var(&lookup, "KBA_CHUNK_OVERLAP", defaults.indexing.chunk_overlap)?,
            batch_size: parse_var(&lookup, "KBA_EMBEDDING_BATCH_SIZE", defaults.indexing.batch_size)?,
        };

        let deadline = match lookup("KBA_REQUEST_DEADLINE_SECS") {
            Some(_) => Some(Duration::from_secs(parse_var(&lookup, "KBA_REQUEST_DEADLINE_SECS", 0u64)?)),
            None => None,
        };

        let retry = RetryConfig {
            max_attempts: parse_var(&lookup, "KBA_RETRY_ATTEMPTS", defaults.retry.max_attempts)?,
            retry_delay: Duration::from_secs(parse_var(
                &lookup,
                "KBA_RETRY_DELAY_SECS",
                defaults.retry.retry_delay.as_secs(),
            )?),
            deadline,
        };

        let config = Self {
            indexing,
            retry,
            top_k: parse_var(&lookup, "KBA_TOP_K", defaults.top_k)?,
            confidence_saturation: parse_var(
                &lookup,
                "KBA_CONFIDENCE_SATURATION",
                defaults.confidence_saturation,
            )?,
            knowledge_base_dir: lookup("KBA_KNOWLEDGE_BASE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.knowledge_base_dir),
            vector_db_path: lookup("KBA_VECTOR_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.vector_db_path),
            max_file_size: parse_var(&lookup, "KBA_MAX_FILE_SIZE", defaults.max_file_size)?,
            embedder: parse_var(&lookup, "KBA_EMBEDDER", defaults.embedder)?,
            assistant_role: lookup("KBA_ASSISTANT_ROLE").unwrap_or(defaults.assistant_role),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.indexing.chunk_size == 0 {
            return Err(Error::Configuration("chunk_size must be positive".to_string()));
        }
        if self.indexing.chunk_overlap >= self.indexing.chunk_size {
            return Err(Error::Configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.indexing.chunk_overlap, self.indexing.chunk_size
            )));
        }
        if self.indexing.batch_size == 0 {
            return Err(Error::Configuration("embedding batch size must be positive".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Configuration("retry attempts must be at least 1".to_string()));
        }
        if self.retry.deadline == Some(Duration::ZERO) {
            return Err(Error::Configuration("request deadline must be positive".to_string()));
        }
        if self.top_k == 0 {
            return Err(Error::Configuration("top_k must be positive".to_string()));
        }
        if self.confidence_saturation == 0 {
            return Err(Error::Configuration("confidence saturation must be positive".to_string()));
        }
        Ok(())
    }
}
