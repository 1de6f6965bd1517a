//! LLM integration module
//!
//! Provides blocking, timeout-bounded completions behind a single provider
//! capability, selected at runtime through the registry.
//!
//! Supported providers:
//! - OpenAI (and OpenAI-compatible APIs)
//! - DeepSeek (OpenAI protocol, own base URL)
//! - Ollama (local inference)

mod error;
mod message;
mod ollama;
mod openai;
mod provider;
mod registry;

pub use error::LlmError;
pub use message::{ChatMessage, CompletionRequest, GenerationOptions, Role};
pub use provider::{LlmProvider, ProviderStatus, SharedProvider};
pub use registry::{ProviderConstructor, ProviderRegistry};

// Provider implementations
pub use ollama::OllamaProvider;
pub use openai::OpenAIProvider;
