//! Build result and cancellation types

use super::state::ErrorRecord;
use crate::error::FailureKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Structured outcome of one build call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BuildResult {
    Success {
        path: PathBuf,
        /// Total attempts across all components
        iterations: u32,
        /// Non-blocking findings such as style issues
        warnings: Vec<String>,
    },

    Error {
        /// Project root, absent when planning failed
        path: Option<PathBuf>,
        iterations: u32,
        error: String,
        kind: FailureKind,
        /// Full error history of the build
        errors: Vec<ErrorRecord>,
    },

    NeedsClarification {
        questions: Vec<String>,
    },
}

impl BuildResult {
    pub fn is_success(&self) -> bool {
        matches!(self, BuildResult::Success { .. })
    }

    pub fn status(&self) -> &'static str {
        match self {
            BuildResult::Success { .. } => "success",
            BuildResult::Error { .. } => "error",
            BuildResult::NeedsClarification { .. } => "needs_clarification",
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            BuildResult::Success { path, .. } => Some(path),
            BuildResult::Error { path, .. } => path.as_deref(),
            BuildResult::NeedsClarification { .. } => None,
        }
    }

    pub fn iterations(&self) -> u32 {
        match self {
            BuildResult::Success { iterations, .. } | BuildResult::Error { iterations, .. } => {
                *iterations
            }
            BuildResult::NeedsClarification { .. } => 0,
        }
    }
}

/// Cooperative cancellation shared between a build and its caller
///
/// Checked before each component; a running step is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
