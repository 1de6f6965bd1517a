//! Knowledge base of past successes
//!
//! Purely advisory: the build records into it and may consult it during
//! repair, but its failures never decide the outcome of a build.

mod file;

pub use file::{FileKnowledgeBase, ProjectEntry, SolutionEntry};

use crate::error::Result;
use crate::orchestration::BuildState;
use crate::plan::Component;
use std::path::Path;

pub trait KnowledgeBase: Send + Sync {
    /// Remember code that passed its tests
    fn record_success(&self, component: &Component, code: &str, tech_stack: &[String])
        -> Result<()>;

    /// Remember a finished project
    fn record_project(&self, root: &Path, state: &BuildState) -> Result<()>;

    /// Code of past successes relevant to `query`, best first
    fn lookup_solutions(&self, _query: &str, _limit: usize) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Knowledge base that remembers nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopKnowledgeBase;

impl KnowledgeBase for NoopKnowledgeBase {
    fn record_success(&self, component: &Component, _code: &str, _tech_stack: &[String])
        -> Result<()> {
        tracing::debug!("Not recording success for {}", component.name);
        Ok(())
    }

    fn record_project(&self, _root: &Path, _state: &BuildState) -> Result<()> {
        Ok(())
    }
}
