//! Error types for Composer Core
//!
//! Provides a unified error type for collaborator operations and the
//! build-level failure taxonomy reported by the orchestrator.

use crate::llm::LlmError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for Composer Core operations
pub type Result<T> = std::result::Result<T, ComposerError>;

/// Unified error type for collaborator operations
#[derive(Error, Debug)]
pub enum ComposerError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// LLM response could not be parsed into a plan
    #[error("Invalid plan format: {0}")]
    PlanFormat(String),

    /// Plan parsed but is structurally invalid
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Test execution could not be started or observed
    #[error("Test runner error: {0}")]
    TestRunner(String),

    /// Any other collaborator failure
    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: &'static str,
        message: String,
    },
}

impl ComposerError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        ComposerError::Config(msg.into())
    }

    /// Create a plan format error
    pub fn plan_format(msg: impl Into<String>) -> Self {
        ComposerError::PlanFormat(msg.into())
    }

    /// Create an invalid plan error
    pub fn invalid_plan(msg: impl Into<String>) -> Self {
        ComposerError::InvalidPlan(msg.into())
    }

    /// Create a test runner error
    pub fn test_runner(msg: impl Into<String>) -> Self {
        ComposerError::TestRunner(msg.into())
    }

    /// Create a generic collaborator error
    pub fn collaborator(collaborator: &'static str, msg: impl Into<String>) -> Self {
        ComposerError::Collaborator {
            collaborator,
            message: msg.into(),
        }
    }
}

impl From<serde_json::Error> for ComposerError {
    fn from(err: serde_json::Error) -> Self {
        ComposerError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for ComposerError {
    fn from(err: serde_yaml::Error) -> Self {
        ComposerError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ComposerError {
    fn from(err: toml::de::Error) -> Self {
        ComposerError::Config(err.to_string())
    }
}

/// Why a build ended in `error`
///
/// Every variant is caught at the `build()` boundary and folded into the
/// build state and the structured result.
#[derive(Error, Debug)]
pub enum BuildFailure {
    /// No plan, or a structurally invalid plan. No project was created.
    #[error("planning failed: {0}")]
    Planning(String),

    /// A component consumed its retry budget without a passing test run
    #[error("failed to implement {component} after {attempts} attempts")]
    ComponentExhausted { component: String, attempts: u32 },

    /// Whole-project audit or test run failed after every component passed
    #[error("final validation failed: {0}")]
    FinalValidation(String),

    /// Unexpected collaborator failure
    #[error("collaborator error: {0}")]
    Collaborator(String),

    /// The build was cancelled between development steps
    #[error("build cancelled before component {next_component}")]
    Cancelled { next_component: String },
}

impl BuildFailure {
    /// Machine-readable kind of this failure
    pub fn kind(&self) -> FailureKind {
        match self {
            BuildFailure::Planning(_) => FailureKind::Planning,
            BuildFailure::ComponentExhausted { .. } => FailureKind::ComponentExhausted,
            BuildFailure::FinalValidation(_) => FailureKind::FinalValidation,
            BuildFailure::Collaborator(_) => FailureKind::Collaborator,
            BuildFailure::Cancelled { .. } => FailureKind::Cancelled,
        }
    }
}

impl From<ComposerError> for BuildFailure {
    fn from(err: ComposerError) -> Self {
        BuildFailure::Collaborator(err.to_string())
    }
}

/// Serializable failure kind carried in error results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Planning,
    ComponentExhausted,
    FinalValidation,
    Collaborator,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_mapping() {
        let failure = BuildFailure::ComponentExhausted {
            component: "auth".to_string(),
            attempts: 5,
        };
        assert_eq!(failure.kind(), FailureKind::ComponentExhausted);
        assert_eq!(
            failure.to_string(),
            "failed to implement auth after 5 attempts"
        );
    }

    #[test]
    fn test_collaborator_error_folds_into_failure() {
        let err = ComposerError::collaborator("TestRunner", "pytest missing");
        let failure: BuildFailure = err.into();
        assert_eq!(failure.kind(), FailureKind::Collaborator);
        assert!(failure.to_string().contains("pytest missing"));
    }

    #[test]
    fn test_failure_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FailureKind::FinalValidation).unwrap();
        assert_eq!(json, "\"final_validation\"");
    }
}
