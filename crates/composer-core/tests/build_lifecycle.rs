//! End-to-end build lifecycle against scripted collaborators
//!
//! The LLM-backed collaborators and the test runner are scripted; the project
//! store and the security validator are the real implementations, so every
//! test also exercises what lands on disk.

use composer_core::{
    AmbiguityReport, AuditReport, BuildConfig, BuildEvent, BuildOrchestrator, BuildResult,
    BuildState, BuildStatus, CancelFlag, CodeGenerator, Collaborators, Component, ComposerError,
    Debugger, FailureKind, FsProjectStore, GenerationRequest, KnowledgeBase, PatternValidator,
    Plan, Planner, ProjectStore, RepairRequest, SecurityConfig, SecurityReport, SecurityValidator,
    StyleReport, SuiteOutcome, TechConstraints, TestOutcome, TestRunner,
};
use composer_core::plan::{DirectoryLayout, FolderEntries};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const CLEAN_CODE: &str = "def handler():\n    return 1\n";
const INSECURE_CODE: &str = "def handler(data):\n    return eval(data)\n";

type CallLog = Arc<Mutex<Vec<String>>>;

fn plan(project: &str, components: &[&str]) -> Plan {
    let mut layout = DirectoryLayout::new();
    layout.insert("src".to_string(), FolderEntries::files(["app.py"]));
    layout.insert("tests".to_string(), FolderEntries::files(["test_app.py"]));

    Plan {
        project_name: project.to_string(),
        directory_layout: layout,
        components: components
            .iter()
            .map(|name| Component::new(*name, format!("The {} layer", name)))
            .collect(),
        tech_stack: vec!["language: Python".to_string(), "framework: FastAPI".to_string()],
        metadata: Default::default(),
    }
}

// --- Scripted collaborators -------------------------------------------------

struct ScriptedPlanner {
    log: CallLog,
    plan: Mutex<Result<Plan, String>>,
    ambiguity: Mutex<Option<Result<AmbiguityReport, String>>>,
}

impl Planner for ScriptedPlanner {
    fn create_plan(&self, _requirement: &str) -> composer_core::Result<Plan> {
        self.log.lock().push("create_plan".to_string());
        self.plan.lock().clone().map_err(ComposerError::plan_format)
    }

    fn analyze_ambiguity(&self, _requirement: &str) -> composer_core::Result<AmbiguityReport> {
        self.log.lock().push("analyze_ambiguity".to_string());
        match self.ambiguity.lock().clone() {
            Some(Ok(report)) => Ok(report),
            Some(Err(message)) => Err(ComposerError::collaborator("Planner", message)),
            None => Ok(AmbiguityReport::default()),
        }
    }
}

struct ScriptedGenerator {
    log: CallLog,
    requests: Mutex<Vec<GenerationRequest>>,
    /// Code handed out per call, `CLEAN_CODE` once exhausted
    queue: Mutex<Vec<String>>,
    panic_on: Mutex<Option<String>>,
}

impl CodeGenerator for ScriptedGenerator {
    fn generate(&self, request: &GenerationRequest) -> composer_core::Result<String> {
        self.log
            .lock()
            .push(format!("generate:{}", request.component.name));
        self.requests.lock().push(request.clone());

        if self.panic_on.lock().as_deref() == Some(request.component.name.as_str()) {
            panic!("generator exploded on {}", request.component.name);
        }

        let mut queue = self.queue.lock();
        if queue.is_empty() {
            Ok(CLEAN_CODE.to_string())
        } else {
            Ok(queue.remove(0))
        }
    }
}

struct ScriptedDebugger {
    log: CallLog,
    repairs: Mutex<Vec<RepairRequest>>,
    /// What `fix_security` returns
    security_fix: Mutex<String>,
}

impl Debugger for ScriptedDebugger {
    fn fix_security(
        &self,
        _code: &str,
        issues: &[String],
        _tech_stack: &[String],
    ) -> composer_core::Result<String> {
        assert!(!issues.is_empty());
        self.log.lock().push("fix_security".to_string());
        Ok(self.security_fix.lock().clone())
    }

    fn fix(&self, request: &RepairRequest) -> composer_core::Result<String> {
        self.log
            .lock()
            .push(format!("fix:{}", request.component.name));
        self.repairs.lock().push(request.clone());
        Ok(format!(
            "def handler():\n    return {}\n",
            self.repairs.lock().len() + 1
        ))
    }
}

struct LoggingValidator {
    log: CallLog,
    inner: PatternValidator,
    audit: Mutex<Option<AuditReport>>,
}

impl SecurityValidator for LoggingValidator {
    fn validate(&self, code: &str) -> composer_core::Result<SecurityReport> {
        self.log.lock().push("validate".to_string());
        self.inner.validate(code)
    }

    fn full_audit(&self, root: &Path) -> composer_core::Result<AuditReport> {
        self.log.lock().push("full_audit".to_string());
        match self.audit.lock().clone() {
            Some(report) => Ok(report),
            None => self.inner.full_audit(root),
        }
    }
}

struct RecordingStore {
    log: CallLog,
    inner: FsProjectStore,
    states: Mutex<Vec<BuildStatus>>,
    plan_error: Mutex<Option<String>>,
    style_broken: Mutex<bool>,
}

impl ProjectStore for RecordingStore {
    fn initialize(&self, root: &Path, layout: &DirectoryLayout) -> composer_core::Result<()> {
        self.log.lock().push("initialize".to_string());
        self.inner.initialize(root, layout)
    }

    fn persist_plan(&self, root: &Path, plan: &Plan) -> composer_core::Result<PathBuf> {
        if let Some(message) = self.plan_error.lock().clone() {
            return Err(ComposerError::collaborator("ProjectStore", message));
        }
        self.inner.persist_plan(root, plan)
    }

    fn persist_artifact(
        &self,
        root: &Path,
        component: &str,
        code: &str,
        iteration: u32,
    ) -> composer_core::Result<PathBuf> {
        self.log
            .lock()
            .push(format!("persist:{}:{}", component, iteration));
        self.inner.persist_artifact(root, component, code, iteration)
    }

    fn persist_state(&self, root: &Path, state: &BuildState) -> composer_core::Result<()> {
        self.states.lock().push(state.status);
        self.inner.persist_state(root, state)
    }

    fn run_style_check(&self, root: &Path) -> composer_core::Result<StyleReport> {
        if *self.style_broken.lock() {
            return Err(ComposerError::collaborator("ProjectStore", "linter not found"));
        }
        self.inner.run_style_check(root)
    }
}

struct ScriptedRunner {
    log: CallLog,
    /// Remaining failures per component, passing once exhausted
    failures: Mutex<HashMap<String, u32>>,
    suite: Mutex<SuiteOutcome>,
    cancel_after: Mutex<Option<(String, CancelFlag)>>,
}

impl TestRunner for ScriptedRunner {
    fn run_component(&self, _root: &Path, component: &str) -> composer_core::Result<TestOutcome> {
        self.log.lock().push(format!("test:{}", component));

        if let Some((name, flag)) = self.cancel_after.lock().as_ref() {
            if name == component {
                flag.cancel();
            }
        }

        let mut failures = self.failures.lock();
        match failures.get_mut(component) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Ok(TestOutcome::failed(
                    format!("AssertionError in test_{}", component),
                    format!("FAILED tests/test_{}.py::test_basic", component),
                ))
            }
            _ => Ok(TestOutcome::pass("1 passed")),
        }
    }

    fn run_all(&self, _root: &Path) -> composer_core::Result<SuiteOutcome> {
        self.log.lock().push("run_all".to_string());
        Ok(self.suite.lock().clone())
    }
}

#[derive(Default)]
struct RecordingKnowledge {
    successes: Mutex<Vec<String>>,
    projects: Mutex<Vec<PathBuf>>,
    broken: Mutex<bool>,
    panicking: Mutex<bool>,
    lookups: Mutex<u32>,
}

impl KnowledgeBase for RecordingKnowledge {
    fn record_success(
        &self,
        component: &Component,
        _code: &str,
        _tech_stack: &[String],
    ) -> composer_core::Result<()> {
        if *self.panicking.lock() {
            panic!("knowledge index corrupted");
        }
        if *self.broken.lock() {
            return Err(ComposerError::collaborator("KnowledgeBase", "disk full"));
        }
        self.successes.lock().push(component.name.clone());
        Ok(())
    }

    fn record_project(&self, root: &Path, _state: &BuildState) -> composer_core::Result<()> {
        if *self.broken.lock() {
            return Err(ComposerError::collaborator("KnowledgeBase", "disk full"));
        }
        self.projects.lock().push(root.to_path_buf());
        Ok(())
    }

    fn lookup_solutions(&self, _query: &str, _limit: usize) -> composer_core::Result<Vec<String>> {
        *self.lookups.lock() += 1;
        if *self.panicking.lock() {
            panic!("knowledge index corrupted");
        }
        Ok(Vec::new())
    }
}

// --- Harness ----------------------------------------------------------------

struct Harness {
    dir: TempDir,
    log: CallLog,
    config: BuildConfig,
    planner: Arc<ScriptedPlanner>,
    generator: Arc<ScriptedGenerator>,
    debugger: Arc<ScriptedDebugger>,
    validator: Arc<LoggingValidator>,
    store: Arc<RecordingStore>,
    runner: Arc<ScriptedRunner>,
    knowledge: Arc<RecordingKnowledge>,
}

impl Harness {
    fn new(plan: Plan) -> Self {
        let dir = TempDir::new().unwrap();
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let config = BuildConfig {
            output_dir: dir.path().to_path_buf(),
            ..BuildConfig::default()
        };

        Self {
            planner: Arc::new(ScriptedPlanner {
                log: log.clone(),
                plan: Mutex::new(Ok(plan)),
                ambiguity: Mutex::new(None),
            }),
            generator: Arc::new(ScriptedGenerator {
                log: log.clone(),
                requests: Mutex::new(Vec::new()),
                queue: Mutex::new(Vec::new()),
                panic_on: Mutex::new(None),
            }),
            debugger: Arc::new(ScriptedDebugger {
                log: log.clone(),
                repairs: Mutex::new(Vec::new()),
                security_fix: Mutex::new(CLEAN_CODE.to_string()),
            }),
            validator: Arc::new(LoggingValidator {
                log: log.clone(),
                inner: PatternValidator::new(&SecurityConfig::default()).unwrap(),
                audit: Mutex::new(None),
            }),
            store: Arc::new(RecordingStore {
                log: log.clone(),
                inner: FsProjectStore::from_config(&config),
                states: Mutex::new(Vec::new()),
                plan_error: Mutex::new(None),
                style_broken: Mutex::new(false),
            }),
            runner: Arc::new(ScriptedRunner {
                log: log.clone(),
                failures: Mutex::new(HashMap::new()),
                suite: Mutex::new(SuiteOutcome {
                    all_passed: true,
                    details: "all tests passed".to_string(),
                }),
                cancel_after: Mutex::new(None),
            }),
            knowledge: Arc::new(RecordingKnowledge::default()),
            dir,
            log,
            config,
        }
    }

    fn orchestrator(&self) -> BuildOrchestrator {
        let collaborators = Collaborators {
            planner: self.planner.clone(),
            generator: self.generator.clone(),
            debugger: self.debugger.clone(),
            validator: self.validator.clone(),
            store: self.store.clone(),
            runner: self.runner.clone(),
            knowledge: self.knowledge.clone(),
        };
        BuildOrchestrator::new(self.config.clone(), TechConstraints::default(), collaborators)
    }

    fn build(&self) -> BuildResult {
        self.orchestrator().build("todo list API")
    }

    fn fail_tests(&self, component: &str, times: u32) {
        self.runner
            .failures
            .lock()
            .insert(component.to_string(), times);
    }

    fn calls(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    fn position(&self, call: &str) -> usize {
        self.calls()
            .iter()
            .position(|c| c == call)
            .unwrap_or_else(|| panic!("{} was never called", call))
    }

    fn project_root(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn saved_state(&self, name: &str) -> BuildState {
        self.store
            .inner
            .load_state(&self.project_root(name))
            .unwrap()
            .expect("state file written")
    }

    fn output_is_empty(&self) -> bool {
        std::fs::read_dir(self.dir.path()).unwrap().next().is_none()
    }
}

// --- Tests ------------------------------------------------------------------

#[test]
fn test_all_components_pass_first_try() {
    let h = Harness::new(plan("todo_api", &["storage", "api"]));

    let result = h.build();

    match &result {
        BuildResult::Success {
            path,
            iterations,
            warnings,
        } => {
            assert_eq!(path, &h.project_root("todo_api"));
            assert_eq!(*iterations, 2);
            assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
        }
        other => panic!("expected success, got {:?}", other),
    }

    let state = h.saved_state("todo_api");
    assert_eq!(state.status, BuildStatus::Success);
    assert_eq!(state.iteration_count, 2);
    assert!(state.error_history.is_empty());
    assert_eq!(state.completed_components, vec!["storage", "api"]);

    let root = h.project_root("todo_api");
    assert!(root.join("plan.yaml").is_file());
    assert!(root.join("src/app.py").is_file());
    assert!(root.join("storage/iteration_1/main.py").is_file());
    assert!(root.join("api/iteration_2/main.py").is_file());

    assert_eq!(*h.knowledge.successes.lock(), vec!["storage", "api"]);
    assert_eq!(*h.knowledge.projects.lock(), vec![root]);
    assert!(h.debugger.repairs.lock().is_empty());
}

#[test]
fn test_state_written_at_start_and_at_end() {
    let h = Harness::new(plan("todo_api", &["storage"]));
    assert!(h.build().is_success());
    assert_eq!(
        *h.store.states.lock(),
        vec![BuildStatus::InProgress, BuildStatus::Success]
    );

    let h = Harness::new(plan("todo_api", &["auth"]));
    h.fail_tests("auth", u32::MAX);
    assert!(!h.build().is_success());
    assert_eq!(
        *h.store.states.lock(),
        vec![BuildStatus::InProgress, BuildStatus::Failed]
    );
}

#[test]
fn test_exhausted_component_fails_the_build() {
    let h = Harness::new(plan("shop", &["storage", "auth", "api"]));
    h.fail_tests("auth", u32::MAX);

    let result = h.build();

    let BuildResult::Error {
        path,
        iterations,
        error,
        kind,
        errors,
    } = &result
    else {
        panic!("expected error, got {:?}", result);
    };
    assert_eq!(path.as_deref(), Some(h.project_root("shop").as_path()));
    assert_eq!(*kind, FailureKind::ComponentExhausted);
    assert_eq!(error, "failed to implement auth after 5 attempts");
    // One attempt for storage plus the five spent on auth
    assert_eq!(*iterations, 6);
    assert_eq!(errors.len(), 5);
    assert!(errors.iter().all(|e| e.component == "auth"));
    assert_eq!(
        errors.iter().map(|e| e.iteration).collect::<Vec<_>>(),
        vec![2, 3, 4, 5, 6]
    );
    assert_eq!(errors[0].error, "AssertionError in test_auth");
    assert_eq!(errors[0].logs, "FAILED tests/test_auth.py::test_basic");

    // Later components are never attempted
    let calls = h.calls();
    assert!(!calls.iter().any(|c| c.ends_with(":api")));
    assert!(!calls.contains(&"run_all".to_string()));

    // No repair after the final attempt
    assert_eq!(h.debugger.repairs.lock().len(), 4);

    // Every attempt left an artifact behind
    let history = h
        .store
        .inner
        .artifact_history(&h.project_root("shop"), "auth")
        .unwrap();
    assert_eq!(history.len(), 5);

    let state = h.saved_state("shop");
    assert_eq!(state.status, BuildStatus::Failed);
    assert_eq!(state.error_history.len(), 5);
    assert_eq!(state.completed_components, vec!["storage"]);
    assert_eq!(
        state.error.as_deref(),
        Some("failed to implement auth after 5 attempts")
    );
    assert!(h.knowledge.projects.lock().is_empty());
}

#[test]
fn test_repair_uses_failure_context() {
    let h = Harness::new(plan("todo_api", &["storage"]));
    h.fail_tests("storage", 1);

    let result = h.build();

    assert!(result.is_success());
    assert_eq!(result.iterations(), 2);

    let repairs = h.debugger.repairs.lock();
    assert_eq!(repairs.len(), 1);
    assert_eq!(repairs[0].code, CLEAN_CODE);
    assert_eq!(
        repairs[0].failure.error.as_deref(),
        Some("AssertionError in test_storage")
    );
    assert_eq!(repairs[0].tech_stack.len(), 2);

    // The repaired candidate is what ends up as the second iteration
    let history = h
        .store
        .inner
        .artifact_history(&h.project_root("todo_api"), "storage")
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].iteration, 2);
    assert_eq!(history[1].code, "def handler():\n    return 2\n");

    // One failure stays on record even though the build succeeded
    let state = h.saved_state("todo_api");
    assert_eq!(state.error_history.len(), 1);
}

#[test]
fn test_generation_context_is_the_three_latest_errors() {
    let h = Harness::new(plan("todo_api", &["storage", "api"]));
    h.fail_tests("storage", 4);

    assert!(h.build().is_success());

    let requests = h.generator.requests.lock();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].previous_errors.is_empty());

    let context = &requests[1].previous_errors;
    assert_eq!(context.len(), 3);
    assert_eq!(
        context.iter().map(|e| e.iteration).collect::<Vec<_>>(),
        vec![2, 3, 4]
    );
}

#[test]
fn test_insecure_candidate_is_repaired_before_persisting() {
    let h = Harness::new(plan("todo_api", &["api"]));
    h.generator.queue.lock().push(INSECURE_CODE.to_string());

    let result = h.build();

    assert!(result.is_success());
    // The security repair happens inside the same attempt
    assert_eq!(result.iterations(), 1);

    assert!(h.position("fix_security") < h.position("persist:api:1"));
    let calls = h.calls();
    let validations = calls.iter().filter(|c| *c == "validate").count();
    assert_eq!(validations, 2);

    let history = h
        .store
        .inner
        .artifact_history(&h.project_root("todo_api"), "api")
        .unwrap();
    assert_eq!(history.len(), 1);
    assert!(!history[0].code.contains("eval("));
}

#[test]
fn test_unrepairable_candidate_is_never_written() {
    let h = Harness::new(plan("todo_api", &["api"]));
    h.generator.queue.lock().push(INSECURE_CODE.to_string());
    *h.debugger.security_fix.lock() = INSECURE_CODE.to_string();

    let result = h.build();

    // First attempt burns its security repairs, the second generates clean code
    assert!(result.is_success());
    assert_eq!(result.iterations(), 2);
    assert_eq!(
        h.calls().iter().filter(|c| *c == "fix_security").count(),
        2
    );

    let root = h.project_root("todo_api");
    assert!(!root.join("api/iteration_1").exists());
    let history = h.store.inner.artifact_history(&root, "api").unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].iteration, 2);

    let state = h.saved_state("todo_api");
    let records = state.error_history.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].iteration, 1);
    assert!(records[0].error.starts_with("security validation failed"));

    // The rejection reaches the next generation request
    let requests = h.generator.requests.lock();
    assert_eq!(requests[1].previous_errors.len(), 1);
}

#[test]
fn test_failing_suite_fails_final_validation() {
    let h = Harness::new(plan("todo_api", &["storage", "api"]));
    *h.runner.suite.lock() = SuiteOutcome {
        all_passed: false,
        details: "2 failed, 8 passed".to_string(),
    };

    let result = h.build();

    let BuildResult::Error {
        kind,
        error,
        errors,
        iterations,
        ..
    } = &result
    else {
        panic!("expected error, got {:?}", result);
    };
    assert_eq!(*kind, FailureKind::FinalValidation);
    assert_eq!(
        error,
        "final validation failed: test suite failed: 2 failed, 8 passed"
    );
    assert!(errors.is_empty());
    assert_eq!(*iterations, 2);

    let state = h.saved_state("todo_api");
    assert_eq!(state.status, BuildStatus::Failed);
    assert_eq!(state.completed_components, vec!["storage", "api"]);
    assert!(h.knowledge.projects.lock().is_empty());
}

#[test]
fn test_failing_audit_fails_final_validation() {
    let h = Harness::new(plan("todo_api", &["storage"]));
    *h.validator.audit.lock() = Some(AuditReport {
        passed: false,
        details: "storage/iteration_1/main.py:2: hardcoded secret".to_string(),
    });

    let result = h.build();

    let BuildResult::Error { kind, error, .. } = &result else {
        panic!("expected error, got {:?}", result);
    };
    assert_eq!(*kind, FailureKind::FinalValidation);
    assert!(error.contains("security audit failed"));
    // The suite never runs once the audit fails
    assert!(!h.calls().contains(&"run_all".to_string()));
}

#[test]
fn test_planning_failure_creates_nothing() {
    let h = Harness::new(plan("todo_api", &["storage"]));
    *h.planner.plan.lock() = Err("no YAML found".to_string());

    let result = h.build();

    let BuildResult::Error {
        path,
        iterations,
        kind,
        ..
    } = &result
    else {
        panic!("expected error, got {:?}", result);
    };
    assert_eq!(*kind, FailureKind::Planning);
    assert_eq!(*path, None);
    assert_eq!(*iterations, 0);
    assert!(h.output_is_empty());
    assert!(h.store.states.lock().is_empty());
}

#[test]
fn test_invalid_plan_is_rejected_before_initialization() {
    let mut banned = plan("legacy", &["ledger"]);
    banned.tech_stack = vec!["language: COBOL".to_string()];
    let h = Harness::new(banned);

    let result = h.build();

    assert!(matches!(
        &result,
        BuildResult::Error { kind: FailureKind::Planning, error, .. } if error.contains("COBOL")
    ));
    assert!(!h.calls().contains(&"initialize".to_string()));
    assert!(h.output_is_empty());

    let h = Harness::new(plan("empty", &[]));
    assert!(matches!(
        h.build(),
        BuildResult::Error {
            kind: FailureKind::Planning,
            ..
        }
    ));
    assert!(h.output_is_empty());
}

#[test]
fn test_ambiguous_requirement_asks_for_clarification() {
    let h = Harness::new(plan("todo_api", &["storage"]));
    *h.planner.ambiguity.lock() = Some(Ok(AmbiguityReport {
        needs_clarification: true,
        questions: vec!["Which database?".to_string()],
    }));

    let result = h.build();

    assert_eq!(
        result,
        BuildResult::NeedsClarification {
            questions: vec!["Which database?".to_string()]
        }
    );
    assert_eq!(h.calls(), vec!["analyze_ambiguity"]);
    assert!(h.output_is_empty());
}

#[test]
fn test_ambiguity_check_can_be_skipped_or_fail() {
    let mut h = Harness::new(plan("todo_api", &["storage"]));
    *h.planner.ambiguity.lock() = Some(Err("model returned prose".to_string()));
    assert!(h.build().is_success());

    h.config.check_ambiguity = false;
    *h.planner.ambiguity.lock() = Some(Ok(AmbiguityReport {
        needs_clarification: true,
        questions: vec!["?".to_string()],
    }));
    h.log.lock().clear();
    assert!(h.build().is_success());
    assert!(!h.calls().contains(&"analyze_ambiguity".to_string()));
}

#[test]
fn test_rebuild_keeps_existing_files() {
    let h = Harness::new(plan("todo_api", &["storage"]));
    assert!(h.build().is_success());

    let app = h.project_root("todo_api").join("src/app.py");
    std::fs::write(&app, "print('kept')\n").unwrap();

    assert!(h.build().is_success());
    assert_eq!(std::fs::read_to_string(&app).unwrap(), "print('kept')\n");
}

#[test]
fn test_cancel_stops_before_next_component() {
    let h = Harness::new(plan("todo_api", &["storage", "api"]));
    let cancel = CancelFlag::new();
    *h.runner.cancel_after.lock() = Some(("storage".to_string(), cancel.clone()));

    let result = h.orchestrator().build_with_cancel("todo list API", &cancel);

    let BuildResult::Error {
        kind,
        error,
        iterations,
        ..
    } = &result
    else {
        panic!("expected error, got {:?}", result);
    };
    assert_eq!(*kind, FailureKind::Cancelled);
    assert_eq!(error, "build cancelled before component api");
    assert_eq!(*iterations, 1);
    assert!(!h.calls().contains(&"generate:api".to_string()));

    let state = h.saved_state("todo_api");
    assert_eq!(state.status, BuildStatus::Failed);
    assert_eq!(state.completed_components, vec!["storage"]);
}

#[test]
fn test_panicking_collaborator_becomes_error_result() {
    let h = Harness::new(plan("todo_api", &["storage", "api"]));
    *h.generator.panic_on.lock() = Some("api".to_string());

    let result = h.build();

    let BuildResult::Error { kind, error, .. } = &result else {
        panic!("expected error, got {:?}", result);
    };
    assert_eq!(*kind, FailureKind::Collaborator);
    assert!(error.contains("collaborator panicked: generator exploded on api"));

    let state = h.saved_state("todo_api");
    assert_eq!(state.status, BuildStatus::Failed);
    assert_eq!(state.completed_components, vec!["storage"]);
    assert_eq!(
        *h.store.states.lock(),
        vec![BuildStatus::InProgress, BuildStatus::Failed]
    );
}

#[test]
fn test_knowledge_failures_do_not_fail_the_build() {
    let h = Harness::new(plan("todo_api", &["storage", "api"]));
    *h.knowledge.broken.lock() = true;

    let result = h.build();

    assert!(result.is_success());
    assert_eq!(h.saved_state("todo_api").status, BuildStatus::Success);
}

#[test]
fn test_panicking_knowledge_base_does_not_fail_the_build() {
    let h = Harness::new(plan("todo_api", &["storage", "api"]));
    h.fail_tests("api", 1);
    *h.knowledge.panicking.lock() = true;

    let result = h.build();

    assert!(result.is_success(), "expected success, got {:?}", result);
    assert_eq!(result.iterations(), 3);
    // The repair still ran, without reference solutions
    assert_eq!(*h.knowledge.lookups.lock(), 1);
    let repairs = h.debugger.repairs.lock();
    assert_eq!(repairs.len(), 1);
    assert!(repairs[0].reference_solutions.is_empty());

    let state = h.saved_state("todo_api");
    assert_eq!(state.status, BuildStatus::Success);
    assert_eq!(state.completed_components, vec!["storage", "api"]);
}

#[test]
fn test_failure_after_initialization_is_persisted() {
    let h = Harness::new(plan("demo", &["storage"]));
    *h.store.plan_error.lock() = Some("disk full".to_string());

    let result = h.build();

    let BuildResult::Error {
        path,
        iterations,
        error,
        kind,
        ..
    } = &result
    else {
        panic!("expected error, got {:?}", result);
    };
    assert_eq!(path.as_deref(), Some(h.project_root("demo").as_path()));
    assert_eq!(*iterations, 0);
    assert_eq!(*kind, FailureKind::Collaborator);
    assert!(error.contains("disk full"), "unexpected error: {}", error);

    assert!(h.project_root("demo").join("src").is_dir());
    let state = h.saved_state("demo");
    assert_eq!(state.status, BuildStatus::Failed);
    assert!(state.error.as_deref().unwrap_or_default().contains("disk full"));
    assert_eq!(*h.store.states.lock(), vec![BuildStatus::Failed]);
    assert!(h.generator.requests.lock().is_empty());
}

#[test]
fn test_broken_style_check_does_not_fail_the_build() {
    let h = Harness::new(plan("todo_api", &["storage"]));
    *h.store.style_broken.lock() = true;

    match h.build() {
        BuildResult::Success { warnings, .. } => assert!(warnings.is_empty()),
        other => panic!("expected success, got {:?}", other),
    }
    assert_eq!(h.saved_state("todo_api").status, BuildStatus::Success);
}

#[test]
fn test_progress_events() {
    let h = Harness::new(plan("todo_api", &["storage"]));
    h.fail_tests("storage", 1);
    let (tx, rx) = crossbeam_channel::unbounded();

    let result = h.orchestrator().with_events(tx).build("todo list API");
    assert!(result.is_success());

    let events: Vec<BuildEvent> = rx.try_iter().collect();
    assert_eq!(
        events.first(),
        Some(&BuildEvent::PlanAccepted {
            project_name: "todo_api".to_string(),
            components: vec!["storage".to_string()],
        })
    );
    assert_eq!(
        events.last(),
        Some(&BuildEvent::BuildFinished {
            status: "success".to_string()
        })
    );
    assert!(events.contains(&BuildEvent::TestsFailed {
        component: "storage".to_string(),
        iteration: 1,
        error: "AssertionError in test_storage".to_string(),
    }));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, BuildEvent::AttemptStarted { .. }))
            .count(),
        2
    );
}
