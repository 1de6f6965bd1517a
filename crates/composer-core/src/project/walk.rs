//! Project tree walking shared by the audit and the style check

use std::path::{Path, PathBuf};

/// Files written by composer itself, never part of the generated code
pub const STATE_FILE: &str = "build_state.json";
pub const PLAN_FILE: &str = "plan.yaml";

const MAX_DEPTH: usize = 16;

/// Collect the generated files under `root`, sorted
///
/// Skips hidden entries, tool caches and composer's own state files.
pub fn collect_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    collect(root, root, &mut files, 0);
    files.sort();
    files
}

fn collect(root: &Path, current: &Path, files: &mut Vec<PathBuf>, depth: usize) {
    if depth > MAX_DEPTH {
        return;
    }

    let Ok(entries) = std::fs::read_dir(current) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();

        if name.starts_with('.')
            || name == "__pycache__"
            || name == "node_modules"
            || name == "target"
        {
            continue;
        }

        if path.is_dir() {
            collect(root, &path, files, depth + 1);
        } else if current == root && (name == STATE_FILE || name == PLAN_FILE) {
            continue;
        } else if name.ends_with(".tmp") {
            continue;
        } else {
            files.push(path);
        }
    }
}
