//! Architecture planning
//!
//! The plan model, its invariants, and the planner that produces it.

mod parser;
mod planner;
mod types;

pub use parser::{parse_ambiguity, parse_plan, sanitize_response};
pub use planner::{LlmPlanner, Planner};
pub use types::{
    AmbiguityReport, Component, DirectoryLayout, FolderEntries, LayoutEntry, Plan, PlanMetadata,
    PLAN_VERSION,
};

pub(crate) use types::is_safe_relative;
