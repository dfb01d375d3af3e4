//! Per-run execution state shared between the host and a loaded harness

use thiserror::Error;

use super::project::TempArtifacts;

/// Explicit execution context for one harness invocation.
///
/// Records which test is running so a failure can be attributed, and how many tests completed. A fresh context
/// is created for every invocation; nothing about a run lives in process-wide state on the host side.
///
/// A context may also carry the run's temporary files. They are removed if test code ends the process
/// while the harness is running, since no destructor runs then.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunContext {
    current_test: Option<String>,
    executed: usize,
    exit_cleanup: TempArtifacts,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exit_cleanup(mut self, artifacts: TempArtifacts) -> Self {
        self.exit_cleanup = artifacts;
        self
    }

    /// Files to remove when the process exits mid-run.
    pub fn exit_cleanup(&self) -> &TempArtifacts {
        &self.exit_cleanup
    }

    /// Record that `test` (the full function name) is about to run.
    pub fn enter(&mut self, test: impl Into<String>) {
        self.current_test = Some(test.into());
    }

    /// Record that the current test returned normally.
    pub fn complete(&mut self) {
        self.executed += 1;
    }

    pub fn set_executed(&mut self, executed: usize) {
        self.executed = executed;
    }

    pub fn current_test(&self) -> Option<&str> {
        self.current_test.as_deref()
    }

    pub fn executed(&self) -> usize {
        self.executed
    }

    /// Attribute a failure to the current test.
    pub fn fail(&self, message: impl Into<String>) -> TestFailure {
        TestFailure {
            test: self.current_test.clone().unwrap_or_else(|| "<unknown test>".to_string()),
            message: message.into(),
        }
    }
}

/// The first failing test of a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{test}: {message}")]
pub struct TestFailure {
    /// Full function name, e.g. `TestTwo`.
    pub test: String,
    pub message: String,
}

/// A run in which every test passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub executed: usize,
}
