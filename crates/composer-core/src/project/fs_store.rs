//! File-system project store
//!
//! Layout of a project root:
//!
//! ```text
//! <root>/plan.yaml
//! <root>/build_state.json
//! <root>/<folder>/...                      from the plan layout
//! <root>/<component>/iteration_<n>/<file>  one per attempt, all retained
//! ```

use super::walk::{PLAN_FILE, STATE_FILE};
use super::{CodeArtifact, ProjectStore, StyleReport};
use crate::config::BuildConfig;
use crate::error::{ComposerError, Result};
use crate::orchestration::BuildState;
use crate::plan::{is_safe_relative, DirectoryLayout, LayoutEntry, Plan};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const ITERATION_PREFIX: &str = "iteration_";

/// Stores projects as plain directories
#[derive(Debug, Clone)]
pub struct FsProjectStore {
    artifact_file: String,
    max_line_length: usize,
}

impl FsProjectStore {
    pub fn new(artifact_file: impl Into<String>) -> Self {
        Self {
            artifact_file: artifact_file.into(),
            max_line_length: 120,
        }
    }

    pub fn from_config(config: &BuildConfig) -> Self {
        Self::new(config.artifact_file.clone()).with_max_line_length(config.max_line_length)
    }

    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    /// Read back the persisted build state, if any
    pub fn load_state(&self, root: &Path) -> Result<Option<BuildState>> {
        let path = root.join(STATE_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| io_context(e, format!("Failed to read {}", path.display())))?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Every persisted version of a component, oldest first
    pub fn artifact_history(&self, root: &Path, component: &str) -> Result<Vec<CodeArtifact>> {
        let mut artifacts = Vec::new();
        for (iteration, dir) in self.iteration_dirs(&root.join(component))? {
            let path = dir.join(&self.artifact_file);
            let Ok(code) = fs::read_to_string(&path) else {
                continue;
            };
            artifacts.push(CodeArtifact {
                component: component.to_string(),
                iteration,
                path,
                code,
            });
        }
        Ok(artifacts)
    }

    /// `iteration_<n>` directories under `component_dir`, sorted by `n`
    fn iteration_dirs(&self, component_dir: &Path) -> Result<Vec<(u32, PathBuf)>> {
        let entries = match fs::read_dir(component_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut dirs: Vec<(u32, PathBuf)> = entries
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                let n = name.strip_prefix(ITERATION_PREFIX)?.parse().ok()?;
                Some((n, entry.path()))
            })
            .collect();
        dirs.sort_by_key(|(n, _)| *n);
        Ok(dirs)
    }

    /// Latest artifact of every component directory under `root`
    fn latest_artifacts(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut latest = Vec::new();
        for entry in fs::read_dir(root)?.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            if let Some((_, dir)) = self.iteration_dirs(&entry.path())?.pop() {
                let path = dir.join(&self.artifact_file);
                if path.is_file() {
                    latest.push(path);
                }
            }
        }
        latest.sort();
        Ok(latest)
    }

    fn create_layout(&self, base: &Path, layout: &DirectoryLayout) -> Result<()> {
        for (folder, entries) in layout {
            let folder = folder.trim_end_matches('/');
            ensure_relative(folder)?;
            let folder_path = base.join(folder);
            create_dir(&folder_path)?;

            for entry in &entries.0 {
                match entry {
                    LayoutEntry::Name(name) if name.ends_with('/') => {
                        let name = name.trim_end_matches('/');
                        ensure_relative(name)?;
                        create_dir(&folder_path.join(name))?;
                    }
                    LayoutEntry::Name(name) => {
                        ensure_relative(name)?;
                        touch(&folder_path.join(name))?;
                    }
                    LayoutEntry::Nested(nested) => self.create_layout(&folder_path, nested)?,
                }
            }
        }
        Ok(())
    }
}

impl Default for FsProjectStore {
    fn default() -> Self {
        Self::from_config(&BuildConfig::default())
    }
}

impl ProjectStore for FsProjectStore {
    fn initialize(&self, root: &Path, layout: &DirectoryLayout) -> Result<()> {
        create_dir(root)?;
        self.create_layout(root, layout)?;
        tracing::info!("Initialized project at {}", root.display());
        Ok(())
    }

    fn persist_plan(&self, root: &Path, plan: &Plan) -> Result<PathBuf> {
        let path = root.join(PLAN_FILE);
        let content = serde_yaml::to_string(plan)?;
        write_atomic(&path, &content)?;
        tracing::debug!("Saved plan to {}", path.display());
        Ok(path)
    }

    fn persist_artifact(
        &self,
        root: &Path,
        component: &str,
        code: &str,
        iteration: u32,
    ) -> Result<PathBuf> {
        ensure_relative(component)?;
        let dir = root
            .join(component)
            .join(format!("{}{}", ITERATION_PREFIX, iteration));
        create_dir(&dir)?;

        let path = dir.join(&self.artifact_file);
        fs::write(&path, code)
            .map_err(|e| io_context(e, format!("Failed to write {}", path.display())))?;
        tracing::info!(
            "Wrote {} (iteration {}) to {}",
            component,
            iteration,
            path.display()
        );
        Ok(path)
    }

    fn persist_state(&self, root: &Path, state: &BuildState) -> Result<()> {
        let content = serde_json::to_string_pretty(state)?;
        write_atomic(&root.join(STATE_FILE), &content)
    }

    fn run_style_check(&self, root: &Path) -> Result<StyleReport> {
        let mut warnings = Vec::new();
        for path in self.latest_artifacts(root)? {
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            let relative = path.strip_prefix(root).unwrap_or(&path).display().to_string();
            for (index, line) in content.lines().enumerate() {
                let length = line.chars().count();
                if length > self.max_line_length {
                    warnings.push(format!(
                        "{}:{}: line too long ({} > {})",
                        relative,
                        index + 1,
                        length,
                        self.max_line_length
                    ));
                }
                if line.ends_with([' ', '\t']) {
                    warnings.push(format!("{}:{}: trailing whitespace", relative, index + 1));
                }
            }
        }
        Ok(StyleReport {
            passed: warnings.is_empty(),
            warnings,
        })
    }
}

fn ensure_relative(path: &str) -> Result<()> {
    if is_safe_relative(path) {
        Ok(())
    } else {
        Err(ComposerError::invalid_plan(format!(
            "'{}' escapes the project root",
            path
        )))
    }
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .map_err(|e| io_context(e, format!("Failed to create {}", path.display())))
}

/// Create an empty file unless something already exists at `path`
fn touch(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(io_context(e, format!("Failed to create {}", path.display()))),
    }
}

/// Write through a temp file and rename, so readers never see a torn file
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!("{}.tmp", file_name));

    fs::write(&temp_path, content)
        .map_err(|e| io_context(e, format!("Failed to write {}", temp_path.display())))?;
    fs::rename(&temp_path, path)
        .map_err(|e| io_context(e, format!("Failed to save {}", path.display())))?;
    Ok(())
}

fn io_context(e: std::io::Error, message: String) -> ComposerError {
    ComposerError::Io(std::io::Error::new(e.kind(), format!("{}: {}", message, e)))
}
