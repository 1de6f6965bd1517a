//! Architecture planner
//!
//! Turns a natural-language requirement into a [`Plan`] by asking the
//! configured LLM for a YAML document with the fields the build needs.

use super::parser::{parse_ambiguity, parse_plan};
use super::types::{AmbiguityReport, Plan};
use crate::config::TechConstraints;
use crate::error::Result;
use crate::llm::{CompletionRequest, SharedProvider};

/// Produces architecture plans
pub trait Planner: Send + Sync {
    /// Create a plan for `requirement`
    fn create_plan(&self, requirement: &str) -> Result<Plan>;

    /// Report whether `requirement` needs clarification before planning
    fn analyze_ambiguity(&self, _requirement: &str) -> Result<AmbiguityReport> {
        Ok(AmbiguityReport::default())
    }
}

const PLAN_SYSTEM_PROMPT: &str = r#"You are a senior software architect. Select the optimal tech stack for the
requirement, considering project complexity, a team of senior engineers,
community support and cloud-native capabilities.

Answer with a single YAML document containing these required fields:

project_name: <single word, snake_case>
directory_structure:
  # keys are folder names, values are lists of file names
  src:
    - __init__.py
    - main.py
  tests:
    - test_main.py
components:
  - name: <component_name, snake_case>
    description: <what this component must do>
tech_stack:
  - <technology and version>

List components in the order they should be built. Do not wrap the answer
in a markdown code block."#;

const AMBIGUITY_SYSTEM_PROMPT: &str = r#"Analyze the technical requirement. Identify unspecified components, missing
technical specifications and contradictions.

Answer with JSON only: {"needs_clarification": bool, "questions": [string]}"#;

/// Planner backed by an LLM provider
pub struct LlmPlanner {
    provider: SharedProvider,
    constraints: TechConstraints,
}

impl LlmPlanner {
    pub fn new(provider: SharedProvider, constraints: TechConstraints) -> Self {
        Self {
            provider,
            constraints,
        }
    }

    fn system_prompt(&self) -> String {
        let mut prompt = PLAN_SYSTEM_PROMPT.to_string();
        if !self.constraints.banned_tech.is_empty() {
            prompt.push_str(&format!(
                "\n\nNever use these technologies: {}.",
                self.constraints.banned_tech.join(", ")
            ));
        }
        if let Some(cloud) = &self.constraints.preferred_cloud {
            prompt.push_str(&format!("\nPrefer {} services where a cloud is needed.", cloud));
        }
        prompt
    }
}

impl Planner for LlmPlanner {
    fn create_plan(&self, requirement: &str) -> Result<Plan> {
        let request = CompletionRequest::new(requirement)
            .with_system(self.system_prompt())
            .with_temperature(0.2);

        tracing::info!("Requesting plan from {}", self.provider.name());
        let response = self.provider.generate(&request)?;
        tracing::debug!("Raw plan response:\n{}", response);

        let plan = parse_plan(&response)?;
        tracing::info!(
            "Plan '{}' with {} components",
            plan.project_name,
            plan.components.len()
        );
        Ok(plan)
    }

    fn analyze_ambiguity(&self, requirement: &str) -> Result<AmbiguityReport> {
        let request = CompletionRequest::new(requirement)
            .with_system(AMBIGUITY_SYSTEM_PROMPT)
            .with_temperature(0.0);

        let response = self.provider.generate(&request)?;
        parse_ambiguity(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ComposerError;
    use crate::llm::{LlmError, LlmProvider, ProviderStatus};
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct CannedProvider {
        reply: std::result::Result<String, LlmError>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl CannedProvider {
        fn new(reply: std::result::Result<&str, LlmError>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(String::from),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl LlmProvider for CannedProvider {
        fn id(&self) -> &str {
            "canned"
        }
        fn name(&self) -> &str {
            "Canned"
        }
        fn model(&self) -> String {
            "canned-1".to_string()
        }
        fn status(&self) -> ProviderStatus {
            ProviderStatus::Ready
        }
        fn generate(&self, request: &CompletionRequest) -> std::result::Result<String, LlmError> {
            self.seen.lock().push(request.clone());
            self.reply.clone()
        }
    }

    #[test]
    fn test_create_plan_parses_response() {
        let provider = CannedProvider::new(Ok(
            "project_name: shop\ndirectory_structure:\n  src: [main.py]\ncomponents:\n  - name: cart\n    description: cart ops\ntech_stack: [python]\n",
        ));
        let planner = LlmPlanner::new(provider.clone(), TechConstraints::default());

        let plan = planner.create_plan("an online shop").unwrap();
        assert_eq!(plan.project_name, "shop");

        let seen = provider.seen.lock();
        assert_eq!(seen[0].prompt, "an online shop");
        let system = seen[0].system_message.as_deref().unwrap();
        assert!(system.contains("COBOL, VB6"));
        assert!(system.contains("Prefer AWS"));
    }

    #[test]
    fn test_llm_failure_propagates() {
        let provider = CannedProvider::new(Err(LlmError::Timeout));
        let planner = LlmPlanner::new(provider, TechConstraints::default());
        assert!(matches!(
            planner.create_plan("x"),
            Err(ComposerError::Llm(LlmError::Timeout))
        ));
    }

    #[test]
    fn test_analyze_ambiguity() {
        let provider = CannedProvider::new(Ok(
            r#"{"needs_clarification": true, "questions": ["Which auth provider?"]}"#,
        ));
        let planner = LlmPlanner::new(provider, TechConstraints::default());
        let report = planner.analyze_ambiguity("build auth").unwrap();
        assert!(report.needs_clarification);
        assert_eq!(report.questions.len(), 1);
    }
}
