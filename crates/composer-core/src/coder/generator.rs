//! LLM-backed code generator

use super::prompt::{extract_code, generation_prompt, CODER_SYSTEM_PROMPT};
use super::{CodeGenerator, GenerationRequest};
use crate::error::{ComposerError, Result};
use crate::llm::{CompletionRequest, SharedProvider};

pub struct LlmCodeGenerator {
    provider: SharedProvider,
    temperature: f32,
}

impl LlmCodeGenerator {
    pub fn new(provider: SharedProvider) -> Self {
        Self {
            provider,
            temperature: 0.3,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

impl CodeGenerator for LlmCodeGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let prompt = generation_prompt(request);
        tracing::debug!("Generation prompt for {}:\n{}", request.component.name, prompt);

        let completion = CompletionRequest::new(prompt)
            .with_system(CODER_SYSTEM_PROMPT)
            .with_temperature(self.temperature)
            .with_max_tokens(4096);
        let response = self.provider.generate(&completion)?;

        let code = extract_code(&response);
        if code.is_empty() {
            return Err(ComposerError::collaborator(
                "CodeGenerator",
                format!("empty code for component {}", request.component.name),
            ));
        }
        Ok(code)
    }
}
