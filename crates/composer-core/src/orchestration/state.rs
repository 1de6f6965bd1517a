//! Build state type definitions
//!
//! Serializable so the project store can persist them as `build_state.json`.

use crate::plan::Plan;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique build identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildId(pub Uuid);

impl BuildId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BuildId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub(crate) fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// One failed attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Build-global attempt number, starting at 1
    pub iteration: u32,
    pub component: String,
    pub error: String,
    pub logs: String,
}

/// Append-only, order-preserving list of failed attempts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorHistory(Vec<ErrorRecord>);

impl ErrorHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ErrorRecord) {
        self.0.push(record);
    }

    /// The last `n` records, oldest first
    pub fn recent(&self, n: usize) -> &[ErrorRecord] {
        let start = self.0.len().saturating_sub(n);
        &self.0[start..]
    }

    pub fn records(&self) -> &[ErrorRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Records belonging to one component
    pub fn for_component<'a>(
        &'a self,
        component: &'a str,
    ) -> impl Iterator<Item = &'a ErrorRecord> {
        self.0.iter().filter(move |r| r.component == component)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    InProgress,
    Success,
    Failed,
}

impl BuildStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BuildStatus::InProgress)
    }
}

/// Durable snapshot of one build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildState {
    pub build_id: BuildId,

    /// Unix seconds
    pub created_at: i64,
    pub updated_at: i64,

    pub requirement: String,
    pub plan: Plan,
    pub status: BuildStatus,

    /// Attempts made so far across all components
    pub iteration_count: u32,

    pub error_history: ErrorHistory,

    /// Components whose tests passed, in build order
    #[serde(default)]
    pub completed_components: Vec<String>,

    /// Final error message when the build failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BuildState {
    pub fn new(requirement: impl Into<String>, plan: Plan) -> Self {
        let now = now();
        Self {
            build_id: BuildId::new(),
            created_at: now,
            updated_at: now,
            requirement: requirement.into(),
            plan,
            status: BuildStatus::InProgress,
            iteration_count: 0,
            error_history: ErrorHistory::new(),
            completed_components: Vec::new(),
            error: None,
        }
    }

    pub fn mark_success(&mut self) {
        self.status = BuildStatus::Success;
        self.error = None;
        self.updated_at = now();
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = BuildStatus::Failed;
        self.error = Some(error.into());
        self.updated_at = now();
    }
}
