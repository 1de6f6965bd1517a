//! Project persistence
//!
//! Everything a build writes to disk goes through [`ProjectStore`]: the
//! directory skeleton, the plan, every artifact version and the build state.

mod fs_store;
mod walk;

pub use fs_store::FsProjectStore;
pub use walk::{collect_files, PLAN_FILE, STATE_FILE};

use crate::error::Result;
use crate::orchestration::BuildState;
use crate::plan::{DirectoryLayout, Plan};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One persisted version of a component's code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeArtifact {
    pub component: String,
    pub iteration: u32,
    pub path: PathBuf,
    pub code: String,
}

/// Non-blocking style findings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleReport {
    pub passed: bool,
    pub warnings: Vec<String>,
}

pub trait ProjectStore: Send + Sync {
    /// Create the project root and layout
    ///
    /// Idempotent; existing files are never truncated or removed.
    fn initialize(&self, root: &Path, layout: &DirectoryLayout) -> Result<()>;

    fn persist_plan(&self, root: &Path, plan: &Plan) -> Result<PathBuf>;

    /// Write one version of a component's code and return its path
    fn persist_artifact(
        &self,
        root: &Path,
        component: &str,
        code: &str,
        iteration: u32,
    ) -> Result<PathBuf>;

    /// Replace the durable build state
    fn persist_state(&self, root: &Path, state: &BuildState) -> Result<()>;

    fn run_style_check(&self, root: &Path) -> Result<StyleReport>;
}
