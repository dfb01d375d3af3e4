//! Test runner I/O boundary interfaces
//!
//! This module defines trait-based abstractions for the external collaborators of a run:
//! - Compilation (harness source → loadable module)
//! - Module loading and entry-point resolution
//! - Entry-point invocation
//!
//! The default implementations drive the system C compiler and the OS loader. Tests substitute fakes so the
//! pipeline can be exercised without a toolchain.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

use crate::backend::loader::{LoaderError, NativeEntryPoint, NativeModule};
use crate::backend::project::{BuildRequest, CcToolchain};
use crate::backend::runtime::{RunContext, TestFailure};
use ctester_syntax::naming::TEST_FILE_MARKER;

/// Errors that stop a test run. The first one wins; there is no partial continuation.
#[derive(Debug, Error, Diagnostic)]
pub enum TestError {
    #[error("no test files ending {marker} in {}", dir.display(), marker = TEST_FILE_MARKER)]
    #[diagnostic(
        code(ctester::no_test_files),
        help("test files are recognized by the `_test.c` marker in their name")
    )]
    NoTestFiles { dir: PathBuf },

    #[error("no test functions found in {files} test file(s) in {}", dir.display())]
    #[diagnostic(
        code(ctester::empty_test_set),
        help("declare tests as `void TestName() {{ ... }}` at the start of a line, outside comments")
    )]
    EmptyTestSet { dir: PathBuf, files: usize },

    #[error("not a directory: {}: {source}", dir.display())]
    #[diagnostic(code(ctester::list_dir))]
    ListDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("did not write test harness {}: {source}", path.display())]
    #[diagnostic(code(ctester::write_harness), help("the work directory must be writable"))]
    WriteHarness {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("did not compile: {message}")]
    #[diagnostic(
        code(ctester::compile),
        help("set CC to choose the compiler and CTESTER_CFLAGS to change its flags")
    )]
    Compile { message: String },

    #[error("did not open shared library {}: {reason}", path.display())]
    #[diagnostic(code(ctester::load))]
    Load { path: PathBuf, reason: String },

    #[error("did not find entry point `{symbol}`: {reason}")]
    #[diagnostic(code(ctester::symbol))]
    Symbol { symbol: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(ctester::test_failure))]
    TestFailure(#[from] TestFailure),
}

impl From<LoaderError> for TestError {
    fn from(err: LoaderError) -> Self {
        match err {
            LoaderError::Load { path, reason } => TestError::Load { path, reason },
            LoaderError::Symbol { symbol, reason, .. } => TestError::Symbol { symbol, reason },
        }
    }
}

// ============================================================================
// Build Interface
// ============================================================================

/// Compiles a harness into a loadable module.
pub trait Toolchain {
    /// Returns the artifact path on success.
    fn compile(&self, request: &BuildRequest) -> Result<PathBuf, TestError>;
}

// ============================================================================
// Loader Interfaces
// ============================================================================

/// Opens compiled modules.
pub trait ModuleLoader {
    fn load(&self, artifact: &Path) -> Result<Box<dyn LoadedModule>, TestError>;
}

/// An open module. Dropping it releases the module.
pub trait LoadedModule {
    fn resolve(&self, symbol: &str) -> Result<Box<dyn EntryPoint + '_>, TestError>;
}

/// A harness entry point: runs every test, in order, stopping at the first failure.
pub trait EntryPoint {
    fn invoke(&self, ctx: &mut RunContext) -> Result<(), TestFailure>;
}

// ============================================================================
// Default Implementations
// ============================================================================

impl Toolchain for CcToolchain {
    fn compile(&self, request: &BuildRequest) -> Result<PathBuf, TestError> {
        let result = self.build(request).map_err(|e| TestError::Compile {
            message: format!("failed to run `{}`: {}", self.program(), e),
        })?;

        if !result.success {
            let detail = result.stderr.trim();
            let status = result
                .exit_code
                .map(|c| format!("exit status {c}"))
                .unwrap_or_else(|| "terminated by signal".to_string());
            let message = if detail.is_empty() {
                format!("`{}` failed ({status})", self.program())
            } else {
                format!("`{}` failed ({status})\n{detail}", self.program())
            };
            return Err(TestError::Compile { message });
        }

        Ok(request.artifact.clone())
    }
}

/// OS loader via `libloading`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeLoader;

impl ModuleLoader for NativeLoader {
    fn load(&self, artifact: &Path) -> Result<Box<dyn LoadedModule>, TestError> {
        Ok(Box::new(NativeModule::open(artifact)?))
    }
}

impl LoadedModule for NativeModule {
    fn resolve(&self, symbol: &str) -> Result<Box<dyn EntryPoint + '_>, TestError> {
        Ok(Box::new(self.entry_point(symbol)?))
    }
}

impl EntryPoint for NativeEntryPoint<'_> {
    fn invoke(&self, ctx: &mut RunContext) -> Result<(), TestFailure> {
        self.call(ctx)
    }
}
