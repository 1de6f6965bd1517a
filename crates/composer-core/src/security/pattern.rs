//! Regex-based banned-construct scanner

use super::{AuditReport, SecurityReport, SecurityValidator};
use crate::config::SecurityConfig;
use crate::error::{ComposerError, Result};
use crate::project::collect_files;
use regex::Regex;
use std::path::Path;

struct CompiledPattern {
    regex: Regex,
    description: String,
}

/// Flags every line matching one of the configured banned patterns
pub struct PatternValidator {
    patterns: Vec<CompiledPattern>,
}

impl PatternValidator {
    pub fn new(config: &SecurityConfig) -> Result<Self> {
        let patterns = config
            .banned_patterns
            .iter()
            .map(|banned| {
                let regex = Regex::new(&banned.pattern).map_err(|e| {
                    ComposerError::config(format!(
                        "invalid banned pattern '{}': {}",
                        banned.pattern, e
                    ))
                })?;
                Ok(CompiledPattern {
                    regex,
                    description: banned.description.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    fn scan(&self, code: &str) -> Vec<(usize, &str)> {
        let mut hits = Vec::new();
        for (index, line) in code.lines().enumerate() {
            for pattern in &self.patterns {
                if pattern.regex.is_match(line) {
                    hits.push((index + 1, pattern.description.as_str()));
                }
            }
        }
        hits
    }
}

impl SecurityValidator for PatternValidator {
    fn validate(&self, code: &str) -> Result<SecurityReport> {
        let issues = self
            .scan(code)
            .into_iter()
            .map(|(line, description)| format!("{} (line {})", description, line))
            .collect();
        Ok(SecurityReport::from_issues(issues))
    }

    fn full_audit(&self, root: &Path) -> Result<AuditReport> {
        let mut findings = Vec::new();
        let mut scanned = 0usize;

        for path in collect_files(root) {
            // Binary and non-UTF-8 files carry no source to scan
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            scanned += 1;
            let relative = path.strip_prefix(root).unwrap_or(&path);
            for (line, description) in self.scan(&content) {
                findings.push(format!("{}:{}: {}", relative.display(), line, description));
            }
        }

        tracing::debug!("Audited {} files under {}", scanned, root.display());

        if findings.is_empty() {
            Ok(AuditReport {
                passed: true,
                details: format!("No issues found in {} files", scanned),
            })
        } else {
            Ok(AuditReport {
                passed: false,
                details: findings.join("\n"),
            })
        }
    }
}
