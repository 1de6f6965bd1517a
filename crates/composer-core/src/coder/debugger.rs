//! LLM-backed debugger

use super::prompt::{extract_code, repair_prompt, security_prompt, CODER_SYSTEM_PROMPT};
use super::{Debugger, RepairRequest};
use crate::error::{ComposerError, Result};
use crate::llm::{CompletionRequest, SharedProvider};

pub struct LlmDebugger {
    provider: SharedProvider,
}

impl LlmDebugger {
    pub fn new(provider: SharedProvider) -> Self {
        Self { provider }
    }

    fn complete(&self, prompt: String) -> Result<String> {
        let request = CompletionRequest::new(prompt)
            .with_system(CODER_SYSTEM_PROMPT)
            .with_temperature(0.2)
            .with_max_tokens(4096);
        let code = extract_code(&self.provider.generate(&request)?);
        if code.is_empty() {
            return Err(ComposerError::collaborator("Debugger", "model returned no code"));
        }
        Ok(code)
    }
}

impl Debugger for LlmDebugger {
    fn fix_security(&self, code: &str, issues: &[String], tech_stack: &[String]) -> Result<String> {
        tracing::debug!("Requesting security fix for {} issues", issues.len());
        self.complete(security_prompt(code, issues, tech_stack))
    }

    fn fix(&self, request: &RepairRequest) -> Result<String> {
        tracing::debug!(
            "Requesting repair of {} ({} reference solutions)",
            request.component.name,
            request.reference_solutions.len()
        );
        self.complete(repair_prompt(request))
    }
}
