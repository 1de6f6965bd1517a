//! Test execution against a project root

mod command;

pub use command::CommandTestRunner;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Result of running one component's tests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub passed: bool,

    /// Short failure summary
    pub error: Option<String>,

    /// Captured output of the run
    pub logs: String,

    #[serde(default)]
    pub timed_out: bool,
}

impl TestOutcome {
    pub fn pass(logs: impl Into<String>) -> Self {
        Self {
            passed: true,
            error: None,
            logs: logs.into(),
            timed_out: false,
        }
    }

    pub fn failed(error: impl Into<String>, logs: impl Into<String>) -> Self {
        Self {
            passed: false,
            error: Some(error.into()),
            logs: logs.into(),
            timed_out: false,
        }
    }

    pub fn timeout(timeout_secs: u64, logs: impl Into<String>) -> Self {
        Self {
            passed: false,
            error: Some(format!("tests timed out after {}s", timeout_secs)),
            logs: logs.into(),
            timed_out: true,
        }
    }

    /// Message recorded in the error history for a failed run
    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| "tests failed".to_string())
    }
}

/// Result of running the whole suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteOutcome {
    pub all_passed: bool,
    pub details: String,
}

pub trait TestRunner: Send + Sync {
    fn run_component(&self, root: &Path, component: &str) -> Result<TestOutcome>;

    fn run_all(&self, root: &Path) -> Result<SuiteOutcome>;
}
