//! Test runner implementation
//!
//! One run, strictly in sequence:
//!
//! 1. list the directory and keep the `_test.c` files (sorted by name)
//! 2. scan each file for `void Test<Name>(` signatures
//! 3. generate the harness and write it under the work directory
//! 4. compile it ([`Toolchain`])
//! 5. load it, resolve [`ENTRY_SYMBOL`] and invoke it ([`ModuleLoader`], [`EntryPoint`])
//!
//! Every temporary path is owned by an [`ArtifactGuard`] created before anything is written, so the harness,
//! the support header and the module are removed on every exit path. The same paths travel in the
//! [`RunContext`] handed to the harness, which removes them if a test ends the process.
//!
//! ## TestReporter Trait
//!
//! Progress output goes through `TestReporter`, keeping the pipeline itself silent.

use std::fs::{self, File};
use std::path::Path;

use ctester_syntax::{TestName, naming, scanner};

use super::test_interfaces::{ModuleLoader, NativeLoader, TestError, Toolchain};
use super::{CliError, CliResult, ExitCode};
use crate::backend::harness::{self, ENTRY_SYMBOL, HarnessError, TestUnit};
use crate::backend::project::{CcToolchain, HarnessProject, TempArtifacts};
use crate::backend::runtime::{RunContext, RunOutcome};
use crate::config::RunnerConfig;
use miette::Diagnostic;

// ============================================================================
// Test Reporter Trait
// ============================================================================

/// Trait for reporting run progress.
pub trait TestReporter {
    /// Called when test discovery begins
    fn on_discovery_start(&mut self, _dir: &Path) {}

    /// Called after a test file has been scanned
    fn on_file_scanned(&mut self, _name: &str, _tests: &[TestName]) {}

    /// Called when test collection is complete
    fn on_collection_complete(&mut self, _file_count: usize, _test_count: usize) {}

    /// Called when the run stops with an error
    fn on_run_failed(&mut self, _error: &TestError) {}
}

/// Reporter that prints nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl TestReporter for SilentReporter {}

/// Console reporter: progress on stderr when verbose.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    pub verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl TestReporter for ConsoleReporter {
    fn on_discovery_start(&mut self, dir: &Path) {
        if self.verbose {
            eprintln!("searching {} for test files", dir.display());
        }
    }

    fn on_file_scanned(&mut self, name: &str, tests: &[TestName]) {
        if self.verbose {
            eprintln!("  {}: {} test(s)", name, tests.len());
            for test in tests {
                eprintln!("    {}", test.function());
            }
        }
    }

    fn on_collection_complete(&mut self, file_count: usize, test_count: usize) {
        if self.verbose {
            eprintln!("collected {} test(s) from {} file(s)", test_count, file_count);
        }
    }

    fn on_run_failed(&mut self, error: &TestError) {
        if self.verbose {
            if let Some(help) = error.help() {
                eprintln!("help: {}", help);
            }
        }
    }
}

// ============================================================================
// Temporary artifacts
// ============================================================================

/// Removes the generated harness, support directory and module when dropped.
#[derive(Debug)]
pub struct ArtifactGuard {
    artifacts: TempArtifacts,
}

impl ArtifactGuard {
    pub fn new(project: &HarnessProject) -> Self {
        Self {
            artifacts: project.temp_artifacts(),
        }
    }

    pub fn artifacts(&self) -> &TempArtifacts {
        &self.artifacts
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        self.artifacts.remove_all();
    }
}

// ============================================================================
// Discovery
// ============================================================================

/// Names of the test files in `dir`, sorted so harness generation is reproducible.
pub fn discover_test_files(dir: &Path) -> Result<Vec<String>, TestError> {
    let entries = fs::read_dir(dir).map_err(|source| TestError::ListDir {
        dir: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| TestError::ListDir {
            dir: dir.to_path_buf(),
            source,
        })?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            tracing::debug!(entry = ?entry.file_name(), "skipping non-UTF-8 directory entry");
            continue;
        };
        if naming::is_test_file(&name) {
            files.push(name);
        }
    }

    if files.is_empty() {
        return Err(TestError::NoTestFiles { dir: dir.to_path_buf() });
    }
    files.sort();
    Ok(files)
}

/// Scan one test file. A file that cannot be opened or read contributes no tests.
pub fn discover_tests(dir: &Path, name: &str) -> TestUnit {
    let path = dir.join(name);
    let tests = match File::open(&path) {
        Ok(file) => scanner::scan_reader(file),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "did not open test file");
            Vec::new()
        }
    };
    TestUnit::new(name, tests)
}

// ============================================================================
// Execution
// ============================================================================

/// Load `artifact`, resolve the entry point and run it on this thread.
///
/// The module is released before returning, whatever the outcome.
pub fn execute(loader: &dyn ModuleLoader, artifact: &Path) -> Result<RunOutcome, TestError> {
    execute_in(loader, artifact, RunContext::new())
}

/// [`execute`] with a prepared context, e.g. one carrying exit cleanup.
#[tracing::instrument(skip_all, fields(artifact = %artifact.display()))]
pub fn execute_in(loader: &dyn ModuleLoader, artifact: &Path, mut ctx: RunContext) -> Result<RunOutcome, TestError> {
    let module = loader.load(artifact)?;
    let result = module
        .resolve(ENTRY_SYMBOL)
        .and_then(|entry| entry.invoke(&mut ctx).map_err(TestError::from));
    drop(module);

    result?;
    tracing::debug!(executed = ctx.executed(), "harness finished");
    Ok(RunOutcome {
        executed: ctx.executed(),
    })
}

// ============================================================================
// Pipeline
// ============================================================================

/// Run every test in `dir` with the given collaborators.
#[tracing::instrument(skip_all, fields(dir = %dir.display()))]
pub fn run_pipeline(
    dir: &Path,
    config: &RunnerConfig,
    toolchain: &dyn Toolchain,
    loader: &dyn ModuleLoader,
    reporter: &mut dyn TestReporter,
) -> Result<RunOutcome, TestError> {
    let project = HarnessProject::new(&config.work_dir);
    let guard = ArtifactGuard::new(&project);

    let result = run_stages(dir, &project, guard.artifacts(), toolchain, loader, reporter);
    if let Err(e) = &result {
        reporter.on_run_failed(e);
    }
    result
}

fn run_stages(
    dir: &Path,
    project: &HarnessProject,
    artifacts: &TempArtifacts,
    toolchain: &dyn Toolchain,
    loader: &dyn ModuleLoader,
    reporter: &mut dyn TestReporter,
) -> Result<RunOutcome, TestError> {
    reporter.on_discovery_start(dir);
    let files = discover_test_files(dir)?;

    let mut units = Vec::with_capacity(files.len());
    for name in &files {
        let unit = discover_tests(dir, name);
        reporter.on_file_scanned(&unit.name, &unit.tests);
        units.push(unit);
    }

    let harness = harness::generate(&units).map_err(|e| match e {
        HarnessError::EmptyTestSet { units } => TestError::EmptyTestSet {
            dir: dir.to_path_buf(),
            files: units,
        },
    })?;
    reporter.on_collection_complete(files.len(), harness.test_count());

    project.generate(&harness).map_err(|source| TestError::WriteHarness {
        path: project.source_path(),
        source,
    })?;

    let artifact = toolchain.compile(&project.build_request(dir))?;
    execute_in(loader, &artifact, RunContext::new().with_exit_cleanup(artifacts.clone()))
}

/// Run all tests in the given directory with the system compiler and loader.
pub fn run_tests(dir: &str, config: &RunnerConfig, verbose: bool) -> CliResult<ExitCode> {
    let toolchain = CcToolchain::from_config(config);
    let mut reporter = ConsoleReporter::new(verbose);

    match run_pipeline(Path::new(dir), config, &toolchain, &NativeLoader, &mut reporter) {
        // The harness prints the `ok (<n> tests)` summary itself.
        Ok(outcome) => {
            tracing::info!(executed = outcome.executed, "all tests passed");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Err(CliError::failure(format!("Fail: {}", e))),
    }
}
