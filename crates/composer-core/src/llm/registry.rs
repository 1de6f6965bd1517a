//! Provider registry mapping provider identifiers to constructors

use super::{LlmError, OllamaProvider, OpenAIProvider, SharedProvider};
use crate::config::{LlmConfig, ProviderConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Builds a provider from its configuration section
pub type ProviderConstructor =
    Box<dyn Fn(&ProviderConfig, &LlmConfig) -> Result<SharedProvider, LlmError> + Send + Sync>;

/// Registry for selecting an LLM provider at runtime
pub struct ProviderRegistry {
    constructors: HashMap<String, ProviderConstructor>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registry with the built-in providers (openai, deepseek, ollama)
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();

        registry.register("openai", |cfg, llm| {
            let mut provider = OpenAIProvider::new(&require_key("openai", cfg)?, &model_or(cfg, "gpt-4o"))
                .with_timeout(Duration::from_secs(llm.timeout))
                .with_max_retries(llm.max_retries);
            if let Some(url) = &cfg.base_url {
                provider = provider.with_base_url(url);
            }
            Ok(Arc::new(provider) as SharedProvider)
        });

        registry.register("deepseek", |cfg, llm| {
            let mut provider = OpenAIProvider::deepseek(
                &require_key("deepseek", cfg)?,
                &model_or(cfg, "deepseek-coder"),
            )
            .with_timeout(Duration::from_secs(llm.timeout))
            .with_max_retries(llm.max_retries);
            if let Some(url) = &cfg.base_url {
                provider = provider.with_base_url(url);
            }
            Ok(Arc::new(provider) as SharedProvider)
        });

        registry.register("ollama", |cfg, llm| {
            let base_url = cfg
                .base_url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string());
            let provider = OllamaProvider::new(&base_url, &model_or(cfg, "deepseek-coder"))
                .with_timeout(Duration::from_secs(llm.timeout))
                .with_max_retries(llm.max_retries);
            Ok(Arc::new(provider) as SharedProvider)
        });

        registry
    }

    /// Register (or replace) a provider constructor
    pub fn register<F>(&mut self, id: &str, constructor: F)
    where
        F: Fn(&ProviderConfig, &LlmConfig) -> Result<SharedProvider, LlmError>
            + Send
            + Sync
            + 'static,
    {
        self.constructors.insert(id.to_string(), Box::new(constructor));
    }

    /// Whether a constructor exists for `id`
    pub fn is_registered(&self, id: &str) -> bool {
        self.constructors.contains_key(id)
    }

    /// Get all registered provider IDs, sorted
    pub fn provider_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.constructors.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Construct the provider `id` from its configuration section
    pub fn create(&self, id: &str, config: &LlmConfig) -> Result<SharedProvider, LlmError> {
        let constructor = self.constructors.get(id).ok_or_else(|| {
            LlmError::ProviderUnavailable(format!("Provider '{}' not registered", id))
        })?;

        let default_section = ProviderConfig::default();
        let section = config.providers.get(id).unwrap_or(&default_section);
        if !section.enabled {
            return Err(LlmError::ProviderUnavailable(format!(
                "Provider '{}' is disabled",
                id
            )));
        }

        let provider = constructor(section, config)?;
        tracing::info!("Using LLM provider {} ({})", provider.name(), provider.model());
        Ok(provider)
    }

    /// Construct the configured default provider
    pub fn create_default(&self, config: &LlmConfig) -> Result<SharedProvider, LlmError> {
        self.create(&config.default_provider, config)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

fn require_key(id: &str, cfg: &ProviderConfig) -> Result<String, LlmError> {
    cfg.api_key
        .clone()
        .filter(|key| !key.is_empty() && !key.starts_with("${"))
        .ok_or_else(|| LlmError::ProviderUnavailable(format!("No API key configured for {}", id)))
}

fn model_or(cfg: &ProviderConfig, fallback: &str) -> String {
    cfg.default_model
        .clone()
        .unwrap_or_else(|| fallback.to_string())
}
