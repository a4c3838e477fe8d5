//! Generation with bounded retries and per-fault fallback answers

use std::sync::Arc;
use tracing::{debug, error, warn};

use kba_core::{Error, LLMProvider, RetryConfig};

pub const CONNECTION_FAILURE_MESSAGE: &str =
    "I apologize, but I'm unable to connect to the AI service. Please check if Ollama is running.";
pub const TIMEOUT_MESSAGE: &str =
    "The request took too long to process. Please try again with a more specific question.";
pub const UNEXPECTED_ERROR_MESSAGE: &str =
    "I encountered an unexpected error while processing your request. Please try again.";

/// How a failed generation attempt is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Backend unreachable; retried
    Connection,
    /// Request outlived its timeout; never retried
    Timeout,
    /// HTTP, decoding or anything else; retried
    Other,
}

impl FaultKind {
    pub fn of(error: &Error) -> Self {
        match error {
            Error::Connection(_) => FaultKind::Connection,
            Error::Timeout(_) => FaultKind::Timeout,
            _ => FaultKind::Other,
        }
    }

    pub fn is_retryable(self) -> bool {
        !matches!(self, FaultKind::Timeout)
    }

    pub fn fallback_message(self) -> &'static str {
        match self {
            FaultKind::Connection => CONNECTION_FAILURE_MESSAGE,
            FaultKind::Timeout => TIMEOUT_MESSAGE,
            FaultKind::Other => UNEXPECTED_ERROR_MESSAGE,
        }
    }
}

/// Retry loop state. Attempts are numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptState {
    Attempting(u32),
    /// Waiting `retry_delay` before the given attempt
    Backoff(u32),
    Done(String),
}

impl AttemptState {
    /// State following a failure of attempt `attempt`
    pub fn after_failure(attempt: u32, fault: FaultKind, max_attempts: u32) -> Self {
        if fault.is_retryable() && attempt < max_attempts {
            AttemptState::Backoff(attempt + 1)
        } else {
            AttemptState::Done(fault.fallback_message().to_string())
        }
    }
}

/// Calls the generation backend and always comes back with an answer string
pub struct GenerationClient<L: LLMProvider + ?Sized> {
    backend: Arc<L>,
    retry: RetryConfig,
}

impl<L: LLMProvider + ?Sized> GenerationClient<L> {
    pub fn new(backend: Arc<L>, retry: RetryConfig) -> Self {
        Self { backend, retry }
    }

    pub fn backend(&self) -> &L {
        &self.backend
    }

    /// Generate an answer for `prompt`.
    ///
    /// Failures never escape: they resolve to the fallback message of the
    /// last fault. When a deadline is configured it bounds the whole call,
    /// retries and backoff included, and expiry answers like a timeout.
    pub async fn generate(&self, prompt: &str) -> String {
        match self.retry.deadline {
            Some(deadline) => match tokio::time::timeout(deadline, self.run(prompt)).await {
                Ok(answer) => answer,
                Err(_) => {
                    error!(deadline_secs = deadline.as_secs_f64(), "Generation deadline exceeded");
                    TIMEOUT_MESSAGE.to_string()
                }
            },
            None => self.run(prompt).await,
        }
    }

    async fn run(&self, prompt: &str) -> String {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut state = AttemptState::Attempting(1);

        loop {
            state = match state {
                AttemptState::Attempting(attempt) => match self.backend.generate(prompt).await {
                    Ok(result) => {
                        debug!(attempt, model = %result.model_id, "Generation succeeded");
                        AttemptState::Done(result.text)
                    }
                    Err(e) => {
                        let fault = FaultKind::of(&e);
                        let next = AttemptState::after_failure(attempt, fault, max_attempts);
                        if let AttemptState::Backoff(_) = next {
                            warn!(attempt, max_attempts, ?fault, error = %e, "Generation attempt failed, retrying");
                        } else {
                            error!(attempt, max_attempts, ?fault, error = %e, "Generation failed, using fallback answer");
                        }
                        next
                    }
                },
                AttemptState::Backoff(attempt) => {
                    tokio::time::sleep(self.retry.retry_delay).await;
                    AttemptState::Attempting(attempt)
                }
                AttemptState::Done(answer) => return answer,
            };
        }
    }
}
