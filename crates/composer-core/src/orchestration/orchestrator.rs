//! Build orchestrator
//!
//! Runs the whole lifecycle of one build: ambiguity gate, planning, project
//! initialization, the development loop for every component, final
//! validation, and the durable record of the outcome.
//!
//! `build` never returns an error and never panics. Every failure, including
//! a panicking collaborator, ends up in the returned [`BuildResult`] and, once
//! the project exists, in `build_state.json`.

use super::development::DevelopmentStep;
use super::events::{BuildEvent, EventSink};
use super::state::{BuildState, ErrorRecord};
use super::types::{BuildResult, CancelFlag};
use crate::coder::{CodeGenerator, Debugger};
use crate::config::{BuildConfig, TechConstraints};
use crate::error::BuildFailure;
use crate::knowledge::KnowledgeBase;
use crate::plan::{Plan, Planner};
use crate::project::ProjectStore;
use crate::security::SecurityValidator;
use crate::testing::TestRunner;
use crossbeam_channel::Sender;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything the orchestrator delegates to
#[derive(Clone)]
pub struct Collaborators {
    pub planner: Arc<dyn Planner>,
    pub generator: Arc<dyn CodeGenerator>,
    pub debugger: Arc<dyn Debugger>,
    pub validator: Arc<dyn SecurityValidator>,
    pub store: Arc<dyn ProjectStore>,
    pub runner: Arc<dyn TestRunner>,
    pub knowledge: Arc<dyn KnowledgeBase>,
}

enum Planned {
    Ready(Plan),
    NeedsClarification(Vec<String>),
}

/// Orchestrates builds
///
/// Holds no per-build state, so one orchestrator can serve builds on
/// several threads at once.
pub struct BuildOrchestrator {
    config: BuildConfig,
    constraints: TechConstraints,
    collaborators: Collaborators,
    events: EventSink,
}

impl BuildOrchestrator {
    pub fn new(
        config: BuildConfig,
        constraints: TechConstraints,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            config,
            constraints,
            collaborators,
            events: EventSink::disabled(),
        }
    }

    /// Send progress events to `tx`
    pub fn with_events(mut self, tx: Sender<BuildEvent>) -> Self {
        self.events = EventSink::new(tx);
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build a service from a natural-language requirement
    pub fn build(&self, requirement: &str) -> BuildResult {
        self.build_with_cancel(requirement, &CancelFlag::new())
    }

    /// Like [`build`](Self::build), stopping before the next component once
    /// `cancel` is set
    pub fn build_with_cancel(&self, requirement: &str, cancel: &CancelFlag) -> BuildResult {
        let result = self.run(requirement, cancel);
        self.events.emit(BuildEvent::BuildFinished {
            status: result.status().to_string(),
        });
        result
    }

    fn run(&self, requirement: &str, cancel: &CancelFlag) -> BuildResult {
        tracing::info!("Starting build");

        let plan = match guard(|| self.plan(requirement)) {
            Ok(Planned::Ready(plan)) => plan,
            Ok(Planned::NeedsClarification(questions)) => {
                tracing::info!("Requirement needs clarification ({} questions)", questions.len());
                return BuildResult::NeedsClarification { questions };
            }
            Err(failure) => {
                tracing::error!("{}", failure);
                return failed_result(None, 0, &failure, Vec::new());
            }
        };

        let root = self.config.output_dir.join(&plan.project_name);
        self.events.emit(BuildEvent::PlanAccepted {
            project_name: plan.project_name.clone(),
            components: plan.components.iter().map(|c| c.name.clone()).collect(),
        });

        let mut state = BuildState::new(requirement, plan);
        let store = &self.collaborators.store;
        if let Err(failure) =
            guard(|| Ok(store.initialize(&root, &state.plan.directory_layout)?))
        {
            tracing::error!("Project initialization failed: {}", failure);
            return failed_result(Some(root), 0, &failure, Vec::new());
        }
        // From here on the project exists, so every failure lands in build_state.json
        if let Err(failure) = guard(|| self.record_start(&root, &state)) {
            tracing::error!("Project initialization failed: {}", failure);
            return self.fail(root, &mut state, failure);
        }

        match guard(|| self.develop(&root, &mut state, cancel)) {
            Ok(warnings) => {
                let knowledge = &self.collaborators.knowledge;
                state.mark_success();
                if let Err(e) = guard(|| Ok(knowledge.record_project(&root, &state)?)) {
                    tracing::warn!("Failed to record project in knowledge base: {}", e);
                }
                self.persist_terminal_state(&root, &state);
                tracing::info!(
                    "Build succeeded after {} iterations: {}",
                    state.iteration_count,
                    root.display()
                );
                BuildResult::Success {
                    path: root,
                    iterations: state.iteration_count,
                    warnings,
                }
            }
            Err(failure) => {
                tracing::error!("Build failed: {}", failure);
                self.fail(root, &mut state, failure)
            }
        }
    }

    /// Record `failure` in the persisted state and turn it into a result
    fn fail(&self, root: PathBuf, state: &mut BuildState, failure: BuildFailure) -> BuildResult {
        state.mark_failed(failure.to_string());
        self.persist_terminal_state(&root, state);
        failed_result(
            Some(root),
            state.iteration_count,
            &failure,
            state.error_history.records().to_vec(),
        )
    }

    fn plan(&self, requirement: &str) -> Result<Planned, BuildFailure> {
        let planner = &self.collaborators.planner;

        if self.config.check_ambiguity {
            match planner.analyze_ambiguity(requirement) {
                Ok(report) if report.needs_clarification => {
                    return Ok(Planned::NeedsClarification(report.questions));
                }
                Ok(_) => {}
                // The gate is advisory; an unreadable answer does not block planning
                Err(e) => tracing::warn!("Ambiguity analysis failed, continuing: {}", e),
            }
        }

        let plan = planner
            .create_plan(requirement)
            .map_err(|e| BuildFailure::Planning(e.to_string()))?;
        plan.validate(&self.constraints)
            .map_err(|e| BuildFailure::Planning(e.to_string()))?;

        tracing::info!(
            "Accepted plan '{}': {}",
            plan.project_name,
            plan.component_names().join(", ")
        );
        Ok(Planned::Ready(plan))
    }

    /// Write the plan and the initial state into a freshly initialized project
    fn record_start(&self, root: &Path, state: &BuildState) -> Result<(), BuildFailure> {
        let store = &self.collaborators.store;
        store.persist_plan(root, &state.plan)?;
        store.persist_state(root, state)?;
        Ok(())
    }

    /// Develop every component in plan order, then validate the whole project
    ///
    /// Returns the non-blocking warnings of the final validation.
    fn develop(
        &self,
        root: &Path,
        state: &mut BuildState,
        cancel: &CancelFlag,
    ) -> Result<Vec<String>, BuildFailure> {
        let step = DevelopmentStep {
            collaborators: &self.collaborators,
            config: &self.config,
            events: &self.events,
        };

        let components = state.plan.components.clone();
        for component in &components {
            if cancel.is_cancelled() {
                tracing::warn!("Build cancelled before {}", component.name);
                return Err(BuildFailure::Cancelled {
                    next_component: component.name.clone(),
                });
            }
            step.run(root, state, component)?;
        }

        self.final_validation(root)
    }

    fn final_validation(&self, root: &Path) -> Result<Vec<String>, BuildFailure> {
        let c = &self.collaborators;

        let audit = c.validator.full_audit(root)?;
        if !audit.passed {
            return Err(BuildFailure::FinalValidation(format!(
                "security audit failed: {}",
                audit.details
            )));
        }

        let suite = c.runner.run_all(root)?;
        if !suite.all_passed {
            return Err(BuildFailure::FinalValidation(format!(
                "test suite failed: {}",
                suite.details
            )));
        }

        // Style findings never block a build, and neither does a broken linter
        match guard(|| Ok(c.store.run_style_check(root)?)) {
            Ok(style) => {
                if !style.passed {
                    tracing::info!("Style check reported {} warnings", style.warnings.len());
                }
                Ok(style.warnings)
            }
            Err(e) => {
                tracing::warn!("Style check failed, reporting no warnings: {}", e);
                Ok(Vec::new())
            }
        }
    }

    fn persist_terminal_state(&self, root: &Path, state: &BuildState) {
        let store = &self.collaborators.store;
        if let Err(e) = guard(|| Ok(store.persist_state(root, state)?)) {
            tracing::error!("Failed to persist final build state: {}", e);
        }
    }
}

fn failed_result(
    path: Option<PathBuf>,
    iterations: u32,
    failure: &BuildFailure,
    errors: Vec<ErrorRecord>,
) -> BuildResult {
    BuildResult::Error {
        path,
        iterations,
        error: failure.to_string(),
        kind: failure.kind(),
        errors,
    }
}

/// Run `f`, turning a panic into a collaborator failure
pub(super) fn guard<T>(
    f: impl FnOnce() -> Result<T, BuildFailure>,
) -> Result<T, BuildFailure> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(BuildFailure::Collaborator(format!(
            "collaborator panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
