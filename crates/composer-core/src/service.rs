//! ComposerService - wiring facade
//!
//! Builds the default collaborators from a [`ComposerConfig`] and hands them
//! to a [`BuildOrchestrator`]. Callers that need custom collaborators can
//! construct the orchestrator directly.
//!
//! # Example
//!
//! ```ignore
//! use composer_core::{load_config, ComposerService};
//!
//! let config = load_config(&std::env::current_dir()?)?;
//! let service = ComposerService::from_config(config)?;
//! let result = service.build("A REST API for managing todo items");
//! println!("{}", serde_json::to_string_pretty(&result)?);
//! ```

use crate::coder::{LlmCodeGenerator, LlmDebugger};
use crate::config::ComposerConfig;
use crate::error::Result;
use crate::knowledge::{FileKnowledgeBase, KnowledgeBase, NoopKnowledgeBase};
use crate::llm::{ProviderRegistry, SharedProvider};
use crate::orchestration::{BuildEvent, BuildOrchestrator, BuildResult, CancelFlag, Collaborators};
use crate::plan::LlmPlanner;
use crate::project::FsProjectStore;
use crate::security::PatternValidator;
use crate::testing::CommandTestRunner;
use crossbeam_channel::Sender;
use std::sync::Arc;

pub struct ComposerService {
    config: ComposerConfig,
    provider: SharedProvider,
    orchestrator: BuildOrchestrator,
}

impl ComposerService {
    /// Wire everything using the built-in providers
    pub fn from_config(config: ComposerConfig) -> Result<Self> {
        Self::with_registry(config, &ProviderRegistry::default())
    }

    /// Wire everything, selecting the configured default provider from `registry`
    pub fn with_registry(config: ComposerConfig, registry: &ProviderRegistry) -> Result<Self> {
        let provider = registry.create_default(&config.llm)?;
        Self::with_provider(config, provider)
    }

    /// Wire everything around an already constructed provider
    pub fn with_provider(config: ComposerConfig, provider: SharedProvider) -> Result<Self> {
        let collaborators = Collaborators {
            planner: Arc::new(LlmPlanner::new(
                provider.clone(),
                config.constraints.clone(),
            )),
            generator: Arc::new(LlmCodeGenerator::new(provider.clone())),
            debugger: Arc::new(LlmDebugger::new(provider.clone())),
            validator: Arc::new(PatternValidator::new(&config.security)?),
            store: Arc::new(FsProjectStore::from_config(&config.build)),
            runner: Arc::new(CommandTestRunner::from_config(&config.testing)),
            knowledge: knowledge_base(&config),
        };

        let orchestrator = BuildOrchestrator::new(
            config.build.clone(),
            config.constraints.clone(),
            collaborators,
        );

        Ok(Self {
            config,
            provider,
            orchestrator,
        })
    }

    /// Send progress events to `tx`
    pub fn with_events(mut self, tx: Sender<BuildEvent>) -> Self {
        self.orchestrator = self.orchestrator.with_events(tx);
        self
    }

    pub fn build(&self, requirement: &str) -> BuildResult {
        self.orchestrator.build(requirement)
    }

    pub fn build_with_cancel(&self, requirement: &str, cancel: &CancelFlag) -> BuildResult {
        self.orchestrator.build_with_cancel(requirement, cancel)
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    pub fn provider(&self) -> &SharedProvider {
        &self.provider
    }

    pub fn orchestrator(&self) -> &BuildOrchestrator {
        &self.orchestrator
    }
}

fn knowledge_base(config: &ComposerConfig) -> Arc<dyn KnowledgeBase> {
    match &config.build.knowledge_dir {
        Some(dir) => {
            tracing::debug!("Knowledge base at {}", dir.display());
            Arc::new(FileKnowledgeBase::new(dir.clone()))
        }
        None => Arc::new(NoopKnowledgeBase),
    }
}
