//! JSON-lines knowledge base

use super::KnowledgeBase;
use crate::error::Result;
use crate::orchestration::{now, BuildState, BuildStatus};
use crate::plan::Component;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const SOLUTIONS_FILE: &str = "solutions.jsonl";
const PROJECTS_FILE: &str = "projects.jsonl";

/// Shortest word that counts when matching a query
const MIN_KEYWORD_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionEntry {
    pub component: String,
    pub description: String,
    pub tech_stack: Vec<String>,
    pub code: String,
    pub recorded_at: i64,
}

impl SolutionEntry {
    fn keywords(&self) -> HashSet<String> {
        let mut words = keywords(&self.component);
        words.extend(keywords(&self.description));
        for tech in &self.tech_stack {
            words.extend(keywords(tech));
        }
        words
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub project_name: String,
    pub root: PathBuf,
    pub status: BuildStatus,
    pub iterations: u32,
    pub components: Vec<String>,
    pub error_count: usize,
    pub recorded_at: i64,
}

/// Appends entries to `solutions.jsonl` and `projects.jsonl` in a directory
pub struct FileKnowledgeBase {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileKnowledgeBase {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Default location under the user data directory
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("composer").join("knowledge"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn append<T: Serialize>(&self, file: &str, entry: &T) -> Result<()> {
        let line = serde_json::to_string(entry)?;
        let _guard = self.write_lock.lock();
        fs::create_dir_all(&self.dir)?;
        let mut handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(file))?;
        writeln!(handle, "{}", line)?;
        Ok(())
    }

    /// Every recorded solution, oldest first; malformed lines are skipped
    pub fn solutions(&self) -> Result<Vec<SolutionEntry>> {
        read_entries(&self.dir.join(SOLUTIONS_FILE))
    }

    pub fn projects(&self) -> Result<Vec<ProjectEntry>> {
        read_entries(&self.dir.join(PROJECTS_FILE))
    }
}

impl KnowledgeBase for FileKnowledgeBase {
    fn record_success(
        &self,
        component: &Component,
        code: &str,
        tech_stack: &[String],
    ) -> Result<()> {
        let entry = SolutionEntry {
            component: component.name.clone(),
            description: component.description.clone(),
            tech_stack: tech_stack.to_vec(),
            code: code.to_string(),
            recorded_at: now(),
        };
        self.append(SOLUTIONS_FILE, &entry)?;
        tracing::debug!("Recorded solution for {}", component.name);
        Ok(())
    }

    fn record_project(&self, root: &Path, state: &BuildState) -> Result<()> {
        let entry = ProjectEntry {
            project_name: state.plan.project_name.clone(),
            root: root.to_path_buf(),
            status: state.status,
            iterations: state.iteration_count,
            components: state.completed_components.clone(),
            error_count: state.error_history.len(),
            recorded_at: now(),
        };
        self.append(PROJECTS_FILE, &entry)
    }

    fn lookup_solutions(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let wanted = keywords(query);
        if wanted.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, usize, SolutionEntry)> = self
            .solutions()?
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let score = entry.keywords().intersection(&wanted).count();
                (score > 0).then_some((score, index, entry))
            })
            .collect();

        // Best score first, newer entries win ties
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, _, entry)| entry.code)
            .collect())
    }
}

fn read_entries<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping malformed entry in {}: {}", path.display(), e);
                None
            }
        })
        .collect())
}

fn keywords(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() >= MIN_KEYWORD_LEN)
        .map(str::to_lowercase)
        .collect()
}
