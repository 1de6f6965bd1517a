//! LLM provider trait and status

use super::{CompletionRequest, LlmError};
use std::time::Duration;

/// Provider status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    /// Ready to accept requests
    Ready,

    /// Not available (no API key, server down, etc.)
    Unavailable(String),
}

impl ProviderStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ProviderStatus::Ready)
    }
}

/// LLM provider trait
///
/// The orchestrator and its collaborators depend only on this capability,
/// never on a concrete provider.
pub trait LlmProvider: Send + Sync {
    /// Get the provider's unique identifier (e.g., "openai", "deepseek", "ollama")
    fn id(&self) -> &str;

    /// Get the provider's display name
    fn name(&self) -> &str;

    /// Get the model used for completions
    fn model(&self) -> String;

    /// Get current provider status
    fn status(&self) -> ProviderStatus;

    /// Run a single blocking completion and return its plain text content
    fn generate(&self, request: &CompletionRequest) -> Result<String, LlmError>;

    /// Check if the provider is currently available
    fn is_available(&self) -> bool {
        self.status().is_ready()
    }
}

/// Wrapper to make Box<dyn LlmProvider> cloneable via Arc
pub type SharedProvider = std::sync::Arc<dyn LlmProvider>;

/// Run `call` up to `max_retries + 1` times while it fails with a retryable error
pub(crate) fn with_retries<T>(
    provider: &str,
    max_retries: u32,
    mut call: impl FnMut() -> Result<T, LlmError>,
) -> Result<T, LlmError> {
    let mut attempt = 0;
    loop {
        match call() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < max_retries => {
                attempt += 1;
                let delay = match &err {
                    LlmError::RateLimited {
                        retry_after: Some(secs),
                    } => Duration::from_secs(*secs),
                    _ => Duration::from_millis(500 * u64::from(attempt)),
                };
                tracing::warn!(
                    "{} request failed ({}), retry {}/{} in {:?}",
                    provider,
                    err,
                    attempt,
                    max_retries,
                    delay
                );
                std::thread::sleep(delay);
            }
            Err(err) => return Err(err),
        }
    }
}
