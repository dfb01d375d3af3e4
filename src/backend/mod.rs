//! ctester backend
//!
//! Everything between discovered test names and a finished run:
//! 1. Test names → harness C source (`harness`, `c_emitter`)
//! 2. Harness written next to its support header and compiled (`project`)
//! 3. Compiled module loaded and its entry point called (`loader`, `runtime`)
//!
//! ## Module Organization
//!
//! - `c_emitter.rs` - Low-level C code string builder
//! - `harness.rs` - Harness generation and the embedded `testing.h`
//! - `project.rs` - Temporary file layout and compiler invocation
//! - `loader.rs` - `libloading`-backed module loading (the only unsafe code)
//! - `runtime.rs` - Run context, failures and outcomes

pub mod c_emitter;
pub mod harness;
#[allow(unsafe_code)]
pub mod loader;
pub mod project;
pub mod runtime;

pub use harness::{ENTRY_SYMBOL, HarnessDocument, HarnessError, TestUnit};
pub use loader::{LoaderError, NativeModule};
pub use project::{BuildRequest, CcToolchain, HarnessProject};
pub use runtime::{RunContext, RunOutcome, TestFailure};
