#![deny(unsafe_code)]
//! ctester: a minimal C test runner
//!
//! Finds `void Test<Name>()` functions in `*_test.c` files, generates a C harness that calls each of them,
//! compiles the harness into a shared module, loads it and runs it. The first failing test stops the run.
//!
//! - `ctester_syntax` (re-exported as [`naming`] and [`scanner`]) - which files and functions are tests
//! - [`backend`] - harness generation, compilation, loading
//! - [`cli`] - collaborator traits, the pipeline and the command line
//! - [`config`] - compiler and work-directory settings
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! ## Unsafe Policy
//!
//! Unsafe code is denied crate-wide and allowed only in `backend::loader`, which opens the compiled module and
//! calls its entry point.

pub mod backend;
pub mod cli;
pub mod config;

pub use ctester_syntax::{TestName, naming, scanner};

pub use backend::harness::{ENTRY_SYMBOL, HarnessDocument, TestUnit, generate};
pub use cli::test_interfaces::{EntryPoint, LoadedModule, ModuleLoader, NativeLoader, TestError, Toolchain};
pub use cli::test_runner::{execute, run_pipeline};
pub use config::RunnerConfig;
