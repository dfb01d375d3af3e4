//! CLI module for ctester
//!
//! `ctester [DIR]` discovers the `_test.c` files in `DIR` (default: the current directory), builds a harness
//! calling every `void Test<Name>()` function, and runs it.
//!
//! ## Modules
//!
//! - `test_interfaces` - Collaborator traits (compiler, loader, entry point) and the error taxonomy
//! - `test_runner` - Discovery, execution and the pipeline
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod test_interfaces;
pub mod test_runner;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::Parser;

use crate::config::RunnerConfig;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Process exit status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// A run that ended badly: the `Fail: ...` line for stderr and the exit status.
#[derive(Debug)]
pub struct CliError {
    pub message: String,
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Discover, build and run C unit tests
#[derive(Parser, Debug)]
#[command(name = "ctester")]
#[command(version = VERSION)]
#[command(about = "Discover, build and run C unit tests", long_about = None)]
pub struct Cli {
    /// Directory containing the *_test.c files
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// C compiler used to build the harness [env: CC] (default: cc)
    #[arg(long = "cc", value_name = "PROGRAM")]
    pub compiler: Option<String>,

    /// Compiler flag, repeatable; replaces the defaults and CTESTER_CFLAGS
    #[arg(long = "cflag", value_name = "FLAG", allow_hyphen_values = true)]
    pub cflags: Vec<String>,

    /// Directory for the generated harness and module (default: current directory)
    #[arg(long = "work-dir", value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Layer the command-line overrides on top of `base`.
    pub fn config(&self, base: RunnerConfig) -> RunnerConfig {
        let mut config = base;
        if let Some(compiler) = &self.compiler {
            config = config.with_compiler(compiler.clone());
        }
        if !self.cflags.is_empty() {
            config = config.with_cflags(self.cflags.clone());
        }
        if let Some(work_dir) = &self.work_dir {
            config = config.with_work_dir(work_dir.clone());
        }
        config
    }
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Parse the command line, run, and exit with the outcome. The only `process::exit` in the crate.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

fn execute(cli: Cli) -> CliResult<ExitCode> {
    let config = cli.config(RunnerConfig::from_env());
    tracing::debug!(?config, "resolved configuration");
    test_runner::run_tests(&cli.dir.to_string_lossy(), &config, cli.verbose)
}

// ============================================================================
// Tests
// ============================================================================
