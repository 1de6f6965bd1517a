//! Ollama LLM provider
//!
//! Connects to local Ollama instance for chat completions.

use super::provider::with_retries;
use super::{CompletionRequest, LlmError, LlmProvider, ProviderStatus};
use std::time::Duration;

/// Ollama provider for local LLM inference
pub struct OllamaProvider {
    /// Base URL for Ollama API
    base_url: String,

    /// Model to use
    model: String,

    /// HTTP agent carrying the request timeout
    agent: ureq::Agent,

    /// Retries on connection errors
    max_retries: u32,
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new("http://localhost:11434", "deepseek-coder")
    }
}

impl OllamaProvider {
    /// Create a new Ollama provider
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(120))
                .build(),
            max_retries: 1,
        }
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::AgentBuilder::new().timeout(timeout).build();
        self
    }

    /// Set the retry budget for retryable failures
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Check if Ollama is running
    fn check_connection(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        ureq::get(&url)
            .timeout(Duration::from_secs(5))
            .call()
            .is_ok()
    }

    fn send(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let mut options = serde_json::json!({
            "temperature": request.options.temperature
        });
        if let Some(max_tokens) = request.options.max_tokens {
            options["num_predict"] = serde_json::Value::from(max_tokens);
        }

        let body = serde_json::json!({
            "model": self.model,
            "messages": request.messages().iter().map(|m| m.to_json()).collect::<Vec<_>>(),
            "stream": false,
            "options": options
        });

        let response = self
            .agent
            .post(&format!("{}/api/chat", self.base_url))
            .set("Content-Type", "application/json")
            .send_json(&body)?;

        let json: serde_json::Value = response.into_json()?;

        json.get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| LlmError::InvalidResponse("missing message.content".to_string()))
    }
}

impl LlmProvider for OllamaProvider {
    fn id(&self) -> &str {
        "ollama"
    }

    fn name(&self) -> &str {
        "Ollama"
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    fn status(&self) -> ProviderStatus {
        if self.check_connection() {
            ProviderStatus::Ready
        } else {
            ProviderStatus::Unavailable("Cannot connect to Ollama".to_string())
        }
    }

    fn generate(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        tracing::debug!("ollama completion with model {}", self.model);
        with_retries("ollama", self.max_retries, || self.send(request))
    }
}
