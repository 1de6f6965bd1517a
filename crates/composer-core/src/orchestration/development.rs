//! Per-component development loop
//!
//! ```text
//! Generate ──▶ SecurityCheck ──pass──▶ Persist ──▶ Test ──pass──▶ Done
//!    ▲            │    ▲                             │
//!    │       fail │    │ fixed                  fail │ (budget left)
//!    │            ▼    │                             ▼
//!    └──repairs── Repair(security)          Repair(test failure)
//!       exhausted                                    │ fixed, new attempt
//!                                                    └──▶ SecurityCheck
//! ```
//!
//! Every attempt bumps the build-global iteration. Insecure code never
//! reaches the disk.

use super::events::{BuildEvent, EventSink};
use super::orchestrator::{guard, Collaborators};
use super::state::{BuildState, ErrorRecord};
use crate::coder::{GenerationRequest, RepairRequest};
use crate::config::BuildConfig;
use crate::error::BuildFailure;
use crate::plan::Component;
use crate::testing::TestOutcome;
use std::path::{Path, PathBuf};

/// Reference solutions requested from the knowledge base per repair
const REFERENCE_LIMIT: usize = 3;

enum Stage {
    Generate,
    SecurityCheck { code: String, repairs: u32 },
    Repair { code: String, reason: RepairReason },
    Persist { code: String },
    Test { code: String, path: PathBuf },
    Done,
    Failed,
}

enum RepairReason {
    Security { issues: Vec<String>, repairs: u32 },
    TestFailure(TestOutcome),
}

/// Drives one component from nothing to passing tests
pub(crate) struct DevelopmentStep<'a> {
    pub collaborators: &'a Collaborators,
    pub config: &'a BuildConfig,
    pub events: &'a EventSink,
}

impl DevelopmentStep<'_> {
    /// Run the loop until the component's tests pass or its budget is spent
    ///
    /// Updates `state` in place: iteration count, error history and
    /// completed components.
    pub fn run(
        &self,
        root: &Path,
        state: &mut BuildState,
        component: &Component,
    ) -> Result<(), BuildFailure> {
        let c = self.collaborators;
        let max_attempts = self.config.max_attempts;
        let mut attempts = 0u32;
        let mut stage = Stage::Generate;

        self.events.emit(BuildEvent::ComponentStarted {
            component: component.name.clone(),
        });

        loop {
            stage = match stage {
                Stage::Generate => {
                    if attempts >= max_attempts {
                        Stage::Failed
                    } else {
                        self.begin_attempt(state, component, &mut attempts);
                        let request = GenerationRequest {
                            component: component.clone(),
                            tech_stack: state.plan.tech_stack.clone(),
                            previous_errors: state
                                .error_history
                                .recent(self.config.error_context_window)
                                .to_vec(),
                        };
                        let code = c.generator.generate(&request)?;
                        Stage::SecurityCheck { code, repairs: 0 }
                    }
                }

                Stage::SecurityCheck { code, repairs } => {
                    let report = c.validator.validate(&code)?;
                    if report.passed {
                        Stage::Persist { code }
                    } else {
                        tracing::warn!(
                            "Security check rejected {} (iteration {}): {}",
                            component.name,
                            state.iteration_count,
                            report.issues.join("; ")
                        );
                        self.events.emit(BuildEvent::SecurityRejected {
                            component: component.name.clone(),
                            issues: report.issues.clone(),
                        });

                        if repairs < self.config.max_security_repairs {
                            Stage::Repair {
                                code,
                                reason: RepairReason::Security {
                                    issues: report.issues,
                                    repairs,
                                },
                            }
                        } else {
                            state.error_history.push(ErrorRecord {
                                iteration: state.iteration_count,
                                component: component.name.clone(),
                                error: format!(
                                    "security validation failed: {}",
                                    report.issues.join("; ")
                                ),
                                logs: report.issues.join("\n"),
                            });
                            Stage::Generate
                        }
                    }
                }

                Stage::Repair {
                    code,
                    reason: RepairReason::Security { issues, repairs },
                } => {
                    let fixed = c
                        .debugger
                        .fix_security(&code, &issues, &state.plan.tech_stack)?;
                    Stage::SecurityCheck {
                        code: fixed,
                        repairs: repairs + 1,
                    }
                }

                Stage::Repair {
                    code,
                    reason: RepairReason::TestFailure(failure),
                } => {
                    let request = RepairRequest {
                        component: component.clone(),
                        reference_solutions: self.reference_solutions(component, &failure),
                        code,
                        failure,
                        tech_stack: state.plan.tech_stack.clone(),
                    };
                    let fixed = c.debugger.fix(&request)?;
                    self.begin_attempt(state, component, &mut attempts);
                    Stage::SecurityCheck {
                        code: fixed,
                        repairs: 0,
                    }
                }

                Stage::Persist { code } => {
                    let path = c.store.persist_artifact(
                        root,
                        &component.name,
                        &code,
                        state.iteration_count,
                    )?;
                    self.events.emit(BuildEvent::ArtifactPersisted {
                        component: component.name.clone(),
                        iteration: state.iteration_count,
                        path: path.clone(),
                    });
                    Stage::Test { code, path }
                }

                Stage::Test { code, path } => {
                    let outcome = c.runner.run_component(root, &component.name)?;
                    if outcome.passed {
                        tracing::info!(
                            "{} passed its tests at iteration {} ({})",
                            component.name,
                            state.iteration_count,
                            path.display()
                        );
                        let tech_stack = &state.plan.tech_stack;
                        let recorded = guard(|| {
                            Ok(c.knowledge.record_success(component, &code, tech_stack)?)
                        });
                        if let Err(e) = recorded {
                            tracing::warn!(
                                "Failed to record success for {}: {}",
                                component.name,
                                e
                            );
                        }
                        Stage::Done
                    } else {
                        let error = outcome.error_message();
                        tracing::warn!(
                            "{} failed its tests at iteration {}: {}",
                            component.name,
                            state.iteration_count,
                            error
                        );
                        state.error_history.push(ErrorRecord {
                            iteration: state.iteration_count,
                            component: component.name.clone(),
                            error: error.clone(),
                            logs: outcome.logs.clone(),
                        });
                        self.events.emit(BuildEvent::TestsFailed {
                            component: component.name.clone(),
                            iteration: state.iteration_count,
                            error,
                        });

                        if attempts >= max_attempts {
                            Stage::Failed
                        } else {
                            Stage::Repair {
                                code,
                                reason: RepairReason::TestFailure(outcome),
                            }
                        }
                    }
                }

                Stage::Done => {
                    state.completed_components.push(component.name.clone());
                    self.events.emit(BuildEvent::ComponentCompleted {
                        component: component.name.clone(),
                    });
                    return Ok(());
                }

                Stage::Failed => {
                    tracing::error!(
                        "Giving up on {} after {} attempts",
                        component.name,
                        attempts
                    );
                    return Err(BuildFailure::ComponentExhausted {
                        component: component.name.clone(),
                        attempts,
                    });
                }
            };
        }
    }

    fn begin_attempt(&self, state: &mut BuildState, component: &Component, attempts: &mut u32) {
        *attempts += 1;
        state.iteration_count += 1;
        tracing::info!(
            "{}: attempt {}/{} (iteration {})",
            component.name,
            attempts,
            self.config.max_attempts,
            state.iteration_count
        );
        self.events.emit(BuildEvent::AttemptStarted {
            component: component.name.clone(),
            iteration: state.iteration_count,
        });
    }

    /// Knowledge-base lookups are advisory; failures and panics yield no references
    fn reference_solutions(&self, component: &Component, failure: &TestOutcome) -> Vec<String> {
        let query = format!(
            "{} {} {}",
            component.name,
            component.description,
            failure.error_message()
        );
        let knowledge = &self.collaborators.knowledge;
        match guard(|| Ok(knowledge.lookup_solutions(&query, REFERENCE_LIMIT)?)) {
            Ok(solutions) => solutions,
            Err(e) => {
                tracing::warn!("Knowledge lookup failed for {}: {}", component.name, e);
                Vec::new()
            }
        }
    }
}
