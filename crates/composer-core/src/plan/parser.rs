//! Plan parsing from raw LLM output
//!
//! Models wrap their answers in markdown fences, YAML document markers or
//! answer in JSON despite being asked for YAML. Everything is normalized into
//! a `serde_yaml::Value` first and the plan fields are read from there.

use super::types::{AmbiguityReport, Component, DirectoryLayout, Plan, PlanMetadata};
use crate::error::{ComposerError, Result};
use serde_yaml::{Mapping, Value};

const NAME_KEYS: &[&str] = &["project_name", "project", "name"];
const LAYOUT_KEYS: &[&str] = &["directory_structure", "directory_layout", "structure"];
const STACK_KEYS: &[&str] = &["tech_stack", "technology_stack"];
const DESCRIPTION_KEYS: &[&str] = &["description", "requirements"];

/// Strip markdown fences and `---` document markers
pub fn sanitize_response(response: &str) -> String {
    response
        .lines()
        .filter(|line| {
            let line = line.trim();
            !line.starts_with("```") && !line.starts_with("---")
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Parse a sanitized or raw response into a JSON or YAML value
fn parse_document(response: &str) -> Result<Value> {
    let text = sanitize_response(response);
    if text.is_empty() {
        return Err(ComposerError::plan_format("empty response"));
    }

    if text.starts_with('{') {
        let json: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| ComposerError::plan_format(format!("invalid JSON: {}", e)))?;
        serde_yaml::to_value(json).map_err(|e| ComposerError::plan_format(e.to_string()))
    } else {
        serde_yaml::from_str(&text)
            .map_err(|e| ComposerError::plan_format(format!("invalid YAML: {}", e)))
    }
}

/// Parse an architecture plan out of an LLM response
///
/// Only the shape is checked here; `Plan::validate` enforces the invariants.
pub fn parse_plan(response: &str) -> Result<Plan> {
    let document = parse_document(response)?;
    let root = document
        .as_mapping()
        .ok_or_else(|| ComposerError::plan_format("plan is not a mapping"))?;

    let project_name = lookup(root, NAME_KEYS)
        .and_then(scalar_to_string)
        .ok_or_else(|| missing("project_name"))?;

    let layout_value = lookup(root, LAYOUT_KEYS).ok_or_else(|| missing("directory_structure"))?;
    let directory_layout: DirectoryLayout = serde_yaml::from_value(layout_value.clone())
        .map_err(|e| {
            ComposerError::plan_format(format!("directory_structure must be a mapping: {}", e))
        })?;

    let components = lookup(root, &["components"])
        .ok_or_else(|| missing("components"))
        .and_then(parse_components)?;

    let tech_stack = lookup(root, STACK_KEYS)
        .map(parse_tech_stack)
        .ok_or_else(|| missing("tech_stack"))?;

    Ok(Plan {
        project_name: project_name.trim().to_string(),
        directory_layout,
        components,
        tech_stack,
        metadata: PlanMetadata::default(),
    })
}

/// Parse an ambiguity analysis response
pub fn parse_ambiguity(response: &str) -> Result<AmbiguityReport> {
    let document = parse_document(response)?;
    serde_yaml::from_value(document)
        .map_err(|e| ComposerError::plan_format(format!("invalid ambiguity report: {}", e)))
}

fn missing(field: &str) -> ComposerError {
    ComposerError::plan_format(format!("missing required field `{}`", field))
}

fn lookup<'a>(map: &'a Mapping, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| !value.is_null())
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_components(value: &Value) -> Result<Vec<Component>> {
    let items = value
        .as_sequence()
        .ok_or_else(|| ComposerError::plan_format("components must be a list"))?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let map = item.as_mapping().ok_or_else(|| {
                ComposerError::plan_format(format!("component #{} is not a mapping", index + 1))
            })?;
            let name = lookup(map, &["name"])
                .and_then(scalar_to_string)
                .ok_or_else(|| {
                    ComposerError::plan_format(format!("component #{} has no name", index + 1))
                })?;
            let description = lookup(map, DESCRIPTION_KEYS)
                .map(describe)
                .unwrap_or_default();
            Ok(Component::new(name.trim(), description))
        })
        .collect()
}

/// Flatten a description that may itself be a list of requirement lines
fn describe(value: &Value) -> String {
    match value {
        Value::Sequence(items) => items
            .iter()
            .filter_map(scalar_to_string)
            .collect::<Vec<_>>()
            .join("\n"),
        other => scalar_to_string(other).unwrap_or_default(),
    }
}

/// Normalize a tech stack into a flat list of strings
///
/// `language: python` becomes `"language: python"`, a list under a key is
/// joined with commas, and a comma separated string is split.
fn parse_tech_stack(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items.iter().flat_map(stack_entries).collect(),
        Value::Mapping(map) => map
            .iter()
            .filter_map(|(k, v)| keyed_entry(k, v))
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        other => scalar_to_string(other).into_iter().collect(),
    }
}

fn stack_entries(item: &Value) -> Vec<String> {
    match item {
        Value::Mapping(map) => map
            .iter()
            .filter_map(|(k, v)| keyed_entry(k, v))
            .collect(),
        other => scalar_to_string(other).into_iter().collect(),
    }
}

fn keyed_entry(key: &Value, value: &Value) -> Option<String> {
    let key = scalar_to_string(key)?;
    let value = match value {
        Value::Sequence(items) => items
            .iter()
            .filter_map(scalar_to_string)
            .collect::<Vec<_>>()
            .join(", "),
        other => scalar_to_string(other)?,
    };
    Some(format!("{}: {}", key, value))
}
