//! OpenAI-compatible LLM provider
//!
//! Connects to OpenAI's chat completions API, or any API speaking the same
//! protocol (DeepSeek, local proxies).

use super::provider::with_retries;
use super::{CompletionRequest, LlmError, LlmProvider, ProviderStatus};
use std::time::Duration;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";

/// OpenAI-compatible provider
pub struct OpenAIProvider {
    /// Registry identifier ("openai", "deepseek", ...)
    id: String,

    /// Display name
    name: String,

    /// API key
    api_key: String,

    /// Base URL for the API
    base_url: String,

    /// Model used for completions
    model: String,

    /// HTTP agent carrying the request timeout
    agent: ureq::Agent,

    /// Retries on connection errors and rate limits
    max_retries: u32,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            id: "openai".to_string(),
            name: "OpenAI".to_string(),
            api_key: api_key.to_string(),
            base_url: OPENAI_BASE_URL.to_string(),
            model: model.to_string(),
            agent: build_agent(Duration::from_secs(120)),
            max_retries: 3,
        }
    }

    /// DeepSeek speaks the OpenAI protocol on its own base URL
    pub fn deepseek(api_key: &str, model: &str) -> Self {
        Self::new(api_key, model)
            .with_identity("deepseek", "DeepSeek")
            .with_base_url(DEEPSEEK_BASE_URL)
    }

    /// Create with a specific base URL (for OpenAI-compatible APIs like Azure, local proxies)
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Override the registry identifier and display name
    pub fn with_identity(mut self, id: &str, name: &str) -> Self {
        self.id = id.to_string();
        self.name = name.to_string();
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    /// Set the retry budget for retryable failures
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> =
            request.messages().iter().map(|m| m.to_json()).collect();

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.options.temperature
        });
        if let Some(max_tokens) = request.options.max_tokens {
            body["max_tokens"] = serde_json::Value::from(max_tokens);
        }
        body
    }

    fn send(&self, body: &serde_json::Value) -> Result<String, LlmError> {
        let response = self
            .agent
            .post(&format!("{}/chat/completions", self.base_url))
            .set("Content-Type", "application/json")
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(body)?;

        let json: serde_json::Value = response.into_json()?;
        extract_content(&json)
    }
}

impl LlmProvider for OpenAIProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    fn status(&self) -> ProviderStatus {
        if self.api_key.is_empty() {
            ProviderStatus::Unavailable("No API key configured".to_string())
        } else {
            ProviderStatus::Ready
        }
    }

    fn generate(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        if let ProviderStatus::Unavailable(reason) = self.status() {
            return Err(LlmError::ProviderUnavailable(format!("{}: {}", self.id, reason)));
        }

        let body = self.request_body(request);
        tracing::debug!("{} completion with model {}", self.id, self.model);
        with_retries(&self.id, self.max_retries, || self.send(&body))
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(timeout).build()
}

/// Pull `choices[0].message.content` out of a chat completion response
fn extract_content(json: &serde_json::Value) -> Result<String, LlmError> {
    if let Some(error) = json.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error");
        return Err(LlmError::Api {
            status: 500,
            message: message.to_string(),
        });
    }

    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].message.content".to_string()))
}
