//! Plan type definitions
//!
//! The structured output of architecture planning. Serializable so the
//! accepted plan can be persisted next to the project.

use crate::config::TechConstraints;
use crate::error::{ComposerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Component as PathComponent, Path};

/// Version stamped into every parsed plan
pub const PLAN_VERSION: &str = "1.0.0";

/// Folder path → entries, relative to the project root
pub type DirectoryLayout = BTreeMap<String, FolderEntries>;

/// Entries of one folder in the layout
///
/// Accepts a list, a nested mapping, a single name, or nothing at all
/// (`docs:` with no value).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawFolder", into = "Vec<LayoutEntry>")]
pub struct FolderEntries(pub Vec<LayoutEntry>);

/// One entry inside a folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayoutEntry {
    /// A file name, or a folder name when it ends with `/`
    Name(String),

    /// Nested folders with their own entries
    Nested(DirectoryLayout),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFolder {
    List(Vec<LayoutEntry>),
    Nested(DirectoryLayout),
    Single(String),
    Empty(()),
}

impl From<RawFolder> for FolderEntries {
    fn from(raw: RawFolder) -> Self {
        match raw {
            RawFolder::List(entries) => FolderEntries(entries),
            RawFolder::Nested(layout) => FolderEntries(vec![LayoutEntry::Nested(layout)]),
            RawFolder::Single(name) => FolderEntries(vec![LayoutEntry::Name(name)]),
            RawFolder::Empty(()) => FolderEntries(Vec::new()),
        }
    }
}

impl From<FolderEntries> for Vec<LayoutEntry> {
    fn from(entries: FolderEntries) -> Self {
        entries.0
    }
}

impl FolderEntries {
    pub fn files<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FolderEntries(names.into_iter().map(|n| LayoutEntry::Name(n.into())).collect())
    }
}

/// One independently developed and tested unit of the planned system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub description: String,
}

impl Component {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanMetadata {
    pub version: String,
}

impl Default for PlanMetadata {
    fn default() -> Self {
        Self {
            version: PLAN_VERSION.to_string(),
        }
    }
}

/// Architecture plan for one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub project_name: String,

    pub directory_layout: DirectoryLayout,

    /// Build order
    pub components: Vec<Component>,

    pub tech_stack: Vec<String>,

    #[serde(default)]
    pub metadata: PlanMetadata,
}

impl Plan {
    /// Check the invariants a plan must hold before anything is written to
    /// disk, including the banned technologies of `constraints`.
    pub fn validate(&self, constraints: &TechConstraints) -> Result<()> {
        if self.project_name.trim().is_empty() {
            return Err(ComposerError::invalid_plan("project name is empty"));
        }
        if !is_single_segment(&self.project_name) {
            return Err(ComposerError::invalid_plan(format!(
                "project name '{}' must be a single path segment",
                self.project_name
            )));
        }
        if self.directory_layout.is_empty() {
            return Err(ComposerError::invalid_plan("directory layout is empty"));
        }
        validate_layout(&self.directory_layout)?;

        if self.components.is_empty() {
            return Err(ComposerError::invalid_plan("plan has no components"));
        }
        let mut seen = HashSet::new();
        for component in &self.components {
            if !is_single_segment(&component.name) {
                return Err(ComposerError::invalid_plan(format!(
                    "component name '{}' must be a single path segment",
                    component.name
                )));
            }
            if !seen.insert(component.name.as_str()) {
                return Err(ComposerError::invalid_plan(format!(
                    "duplicate component name '{}'",
                    component.name
                )));
            }
        }

        if self.tech_stack.is_empty() {
            return Err(ComposerError::invalid_plan("tech stack is empty"));
        }
        let banned = self.banned_technologies(&constraints.banned_tech);
        if !banned.is_empty() {
            return Err(ComposerError::invalid_plan(format!(
                "tech stack uses banned technology: {}",
                banned.join(", ")
            )));
        }
        Ok(())
    }

    /// Entries of the tech stack that mention a banned technology
    pub fn banned_technologies(&self, banned: &[String]) -> Vec<String> {
        self.tech_stack
            .iter()
            .filter(|tech| {
                let tech = tech.to_lowercase();
                banned
                    .iter()
                    .any(|b| !b.is_empty() && tech.contains(&b.to_lowercase()))
            })
            .cloned()
            .collect()
    }

    pub fn component_names(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Result of asking whether a requirement is ambiguous
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbiguityReport {
    #[serde(default)]
    pub needs_clarification: bool,

    #[serde(default)]
    pub questions: Vec<String>,
}

fn validate_layout(layout: &DirectoryLayout) -> Result<()> {
    for (folder, entries) in layout {
        if !is_safe_relative(folder.trim_end_matches('/')) {
            return Err(ComposerError::invalid_plan(format!(
                "layout folder '{}' escapes the project root",
                folder
            )));
        }
        for entry in &entries.0 {
            match entry {
                LayoutEntry::Name(name) => {
                    if !is_safe_relative(name.trim_end_matches('/')) {
                        return Err(ComposerError::invalid_plan(format!(
                            "layout entry '{}' escapes the project root",
                            name
                        )));
                    }
                }
                LayoutEntry::Nested(nested) => validate_layout(nested)?,
            }
        }
    }
    Ok(())
}

/// Relative, non-empty, and made only of normal segments
pub(crate) fn is_safe_relative(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    Path::new(path)
        .components()
        .all(|c| matches!(c, PathComponent::Normal(_) | PathComponent::CurDir))
}

fn is_single_segment(name: &str) -> bool {
    is_safe_relative(name) && !name.contains(['/', '\\']) && name != "."
}
