//! Code generation and repair
//!
//! The development step only sees the [`CodeGenerator`] and [`Debugger`]
//! capabilities. The LLM-backed implementations live here too.

mod debugger;
mod generator;
mod prompt;

pub use debugger::LlmDebugger;
pub use generator::LlmCodeGenerator;
pub use prompt::extract_code;

use crate::error::Result;
use crate::orchestration::ErrorRecord;
use crate::plan::Component;
use crate::testing::TestOutcome;

/// Input for a fresh generation attempt
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub component: Component,
    pub tech_stack: Vec<String>,

    /// Most recent errors of the build, oldest first
    pub previous_errors: Vec<ErrorRecord>,
}

/// Input for repairing code that failed its tests
#[derive(Debug, Clone, PartialEq)]
pub struct RepairRequest {
    pub component: Component,
    pub code: String,
    pub failure: TestOutcome,
    pub tech_stack: Vec<String>,

    /// Known-good solutions to similar failures, if any
    pub reference_solutions: Vec<String>,
}

/// Produces source code for a component
pub trait CodeGenerator: Send + Sync {
    fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

/// Produces corrected source code
pub trait Debugger: Send + Sync {
    /// Rewrite `code` so the reported security issues go away
    fn fix_security(&self, code: &str, issues: &[String], tech_stack: &[String]) -> Result<String>;

    /// Rewrite code that failed its tests
    fn fix(&self, request: &RepairRequest) -> Result<String>;
}
