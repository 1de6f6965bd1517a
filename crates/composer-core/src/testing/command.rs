//! Test runner that shells out to a configured test command

use super::{SuiteOutcome, TestOutcome, TestRunner};
use crate::config::TestConfig;
use crate::error::{ComposerError, Result};
use crossbeam_channel::{bounded, Receiver};
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Output kept per stream; the rest is drained and dropped
const MAX_OUTPUT_BYTES: u64 = 256 * 1024;

/// How long to wait for the pipes of a killed process to close
const DRAIN_GRACE: Duration = Duration::from_secs(2);

const COMPONENT_PLACEHOLDER: &str = "{component}";

struct CommandOutput {
    status: Option<ExitStatus>,
    stdout: String,
    stderr: String,
}

impl CommandOutput {
    fn logs(&self) -> String {
        match (self.stdout.trim(), self.stderr.trim()) {
            (out, "") => out.to_string(),
            ("", err) => err.to_string(),
            (out, err) => format!("{}\n{}", out, err),
        }
    }

    /// Last non-empty output line, usually the runner's summary
    fn summary(&self) -> Option<&str> {
        self.stdout
            .lines()
            .chain(self.stderr.lines())
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
    }
}

/// Runs `program args...` inside the project root
#[derive(Debug, Clone)]
pub struct CommandTestRunner {
    program: String,
    all_args: Vec<String>,
    component_args: Vec<String>,
    timeout: Duration,
}

impl CommandTestRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self::from_config(&TestConfig {
            program: program.into(),
            ..TestConfig::default()
        })
    }

    pub fn from_config(config: &TestConfig) -> Self {
        Self {
            program: config.program.clone(),
            all_args: config.all_args.clone(),
            component_args: config.component_args.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn with_all_args(mut self, args: Vec<String>) -> Self {
        self.all_args = args;
        self
    }

    pub fn with_component_args(mut self, args: Vec<String>) -> Self {
        self.component_args = args;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn component_args(&self, component: &str) -> Vec<String> {
        self.component_args
            .iter()
            .map(|arg| arg.replace(COMPONENT_PLACEHOLDER, component))
            .collect()
    }

    fn execute(&self, root: &Path, args: &[String]) -> Result<CommandOutput> {
        tracing::debug!("Running {} {:?} in {}", self.program, args, root.display());

        let mut child = Command::new(&self.program)
            .args(args)
            .current_dir(root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    ComposerError::test_runner(format!("test program '{}' not found", self.program))
                } else {
                    ComposerError::test_runner(format!("failed to start '{}': {}", self.program, e))
                }
            })?;

        // Drain both pipes concurrently so a chatty test run cannot block on a full pipe
        let stdout_rx = child.stdout.take().map(spawn_reader);
        let stderr_rx = child.stderr.take().map(spawn_reader);

        let status = match child.wait_timeout(self.timeout) {
            Ok(status) => status,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ComposerError::test_runner(format!(
                    "failed to wait for '{}': {}",
                    self.program, e
                )));
            }
        };

        if status.is_none() {
            tracing::warn!(
                "{} exceeded {:?}, killing it",
                self.program,
                self.timeout
            );
            let _ = child.kill();
            let _ = child.wait();
        }

        // A killed process may leave grandchildren holding the pipes open
        let wait = if status.is_some() {
            None
        } else {
            Some(DRAIN_GRACE)
        };
        Ok(CommandOutput {
            status,
            stdout: collect(stdout_rx, wait),
            stderr: collect(stderr_rx, wait),
        })
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> Receiver<String> {
    let (tx, rx) = bounded(1);
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.by_ref().take(MAX_OUTPUT_BYTES).read_to_end(&mut buf);
        let _ = std::io::copy(&mut pipe, &mut std::io::sink());
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

fn collect(rx: Option<Receiver<String>>, wait: Option<Duration>) -> String {
    let Some(rx) = rx else {
        return String::new();
    };
    match wait {
        Some(limit) => rx.recv_timeout(limit).unwrap_or_default(),
        None => rx.recv().unwrap_or_default(),
    }
}

impl Default for CommandTestRunner {
    fn default() -> Self {
        Self::from_config(&TestConfig::default())
    }
}

impl TestRunner for CommandTestRunner {
    fn run_component(&self, root: &Path, component: &str) -> Result<TestOutcome> {
        let output = self.execute(root, &self.component_args(component))?;
        let logs = output.logs();

        let outcome = match output.status {
            None => TestOutcome::timeout(self.timeout.as_secs(), logs),
            Some(status) if status.success() => TestOutcome::pass(logs),
            Some(status) => {
                let code = status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                let error = match output.summary() {
                    Some(summary) => format!("tests failed (exit {}): {}", code, summary),
                    None => format!("tests failed (exit {})", code),
                };
                TestOutcome::failed(error, logs)
            }
        };

        tracing::info!(
            "Tests for {}: {}",
            component,
            if outcome.passed { "passed" } else { "failed" }
        );
        Ok(outcome)
    }

    fn run_all(&self, root: &Path) -> Result<SuiteOutcome> {
        let output = self.execute(root, &self.all_args)?;
        let all_passed = output.status.map(|s| s.success()).unwrap_or(false);

        let details = match (output.status, output.summary()) {
            (None, _) => format!("test suite timed out after {}s", self.timeout.as_secs()),
            (Some(_), Some(summary)) => summary.to_string(),
            (Some(_), None) if all_passed => "all tests passed".to_string(),
            (Some(_), None) => "test suite failed".to_string(),
        };
        Ok(SuiteOutcome {
            all_passed,
            details,
        })
    }
}
