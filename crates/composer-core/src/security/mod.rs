//! Security validation of generated code
//!
//! Every piece of code is checked before it touches the disk, and the whole
//! project is audited once more after the last component passes.

mod pattern;

pub use pattern::PatternValidator;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Outcome of checking one piece of code
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityReport {
    pub passed: bool,
    pub issues: Vec<String>,
}

impl SecurityReport {
    pub fn from_issues(issues: Vec<String>) -> Self {
        Self {
            passed: issues.is_empty(),
            issues,
        }
    }
}

/// Outcome of auditing a whole project tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub passed: bool,
    pub details: String,
}

pub trait SecurityValidator: Send + Sync {
    fn validate(&self, code: &str) -> Result<SecurityReport>;

    fn full_audit(&self, root: &Path) -> Result<AuditReport>;
}
