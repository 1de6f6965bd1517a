//! Composer Core - autonomous build-a-service library
//!
//! Turns a natural-language requirement into a working project:
//! - Architecture planning through an LLM
//! - Per-component generate → security check → persist → test → repair loop
//! - Final whole-project audit and test run
//! - Durable build state and versioned artifacts on disk
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────────┐
//! requirement ───▶│  BuildOrchestrator   │───▶ BuildResult
//!                 └──────────┬───────────┘
//!                            │ delegates to
//!   ┌─────────┬──────────┬───┴──────┬───────────┬──────────┬───────────┐
//!   Planner  CodeGen   Debugger  Validator  ProjectStore TestRunner Knowledge
//!   └─────────┴──────────┴── LlmProvider (ProviderRegistry) ─┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use composer_core::{ComposerConfig, ComposerService};
//!
//! let service = ComposerService::from_config(ComposerConfig::default())?;
//! match service.build("A CLI that converts CSV to JSON") {
//!     BuildResult::Success { path, .. } => println!("built {}", path.display()),
//!     other => eprintln!("{:?}", other),
//! }
//! ```

pub mod config;
pub mod error;

// LLM provider system
pub mod llm;

// Collaborators
pub mod coder;
pub mod knowledge;
pub mod plan;
pub mod project;
pub mod security;
pub mod testing;

// Build lifecycle
pub mod orchestration;

// Wiring facade
pub mod service;

pub use error::{BuildFailure, ComposerError, FailureKind, Result};

pub use config::{
    load_config, load_from_file, BuildConfig, ComposerConfig, ConfigError, LlmConfig,
    ProviderConfig, SecurityConfig, TechConstraints, TestConfig,
};

pub use llm::{
    CompletionRequest, LlmError, LlmProvider, OllamaProvider, OpenAIProvider, ProviderRegistry,
    SharedProvider,
};

pub use plan::{AmbiguityReport, Component, DirectoryLayout, LlmPlanner, Plan, Planner};

pub use coder::{CodeGenerator, Debugger, GenerationRequest, LlmCodeGenerator, LlmDebugger, RepairRequest};
pub use knowledge::{FileKnowledgeBase, KnowledgeBase, NoopKnowledgeBase};
pub use project::{CodeArtifact, FsProjectStore, ProjectStore, StyleReport};
pub use security::{AuditReport, PatternValidator, SecurityReport, SecurityValidator};
pub use testing::{CommandTestRunner, SuiteOutcome, TestOutcome, TestRunner};

pub use orchestration::{
    BuildEvent, BuildOrchestrator, BuildResult, BuildState, BuildStatus, CancelFlag,
    Collaborators, ErrorHistory, ErrorRecord,
};

pub use service::ComposerService;

/// Get the crate version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
