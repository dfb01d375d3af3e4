//! Harness generator - turns discovered test names into one C driver
//!
//! The driver `#include`s every test file that contributed a test, then defines the entry point
//! [`ENTRY_SYMBOL`], which calls each test in discovery order:
//!
//! ```c
//! int RunTests(struct ctester_context *ctx) {
//! 	int nTests = 0;
//! 	...
//! 	ctx->current_test = "TestOne";
//! 	TestOne();
//! 	nTests++;
//! 	...
//! 	printf("ok (%d tests)\n", nTests);
//! }
//! ```
//!
//! Output is a pure function of the input order.

use ctester_syntax::TestName;
use miette::Diagnostic;
use thiserror::Error;

use super::c_emitter::{CEmitter, string_literal};

/// Symbol the execution engine resolves in the compiled harness.
pub const ENTRY_SYMBOL: &str = "RunTests";

/// Header providing `Failf` and `struct ctester_context` to test files.
pub const SUPPORT_HEADER_NAME: &str = "testing.h";

/// Contents of [`SUPPORT_HEADER_NAME`], embedded at compile time from assets/testing.h
pub const SUPPORT_HEADER: &str = include_str!("../../assets/testing.h");

/// One scanned test file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestUnit {
    /// Directory entry name, used verbatim in the generated `#include`.
    pub name: String,
    pub tests: Vec<TestName>,
}

impl TestUnit {
    pub fn new(name: impl Into<String>, tests: Vec<TestName>) -> Self {
        Self {
            name: name.into(),
            tests,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum HarnessError {
    #[error("no test signatures found in {units} test file(s)")]
    #[diagnostic(
        code(ctester::harness::empty_test_set),
        help("test functions must be declared as `void TestName(...)` outside comments and directives")
    )]
    EmptyTestSet { units: usize },
}

/// The synthesized driver source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessDocument {
    source: String,
    test_count: usize,
}

impl HarnessDocument {
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Number of test calls in the entry point.
    pub fn test_count(&self) -> usize {
        self.test_count
    }

    pub fn into_string(self) -> String {
        self.source
    }
}

/// Generate the driver for `units`.
///
/// Units without tests contribute nothing. Fails with [`HarnessError::EmptyTestSet`] when no unit has a test.
#[tracing::instrument(skip_all, fields(unit_count = units.len()))]
pub fn generate(units: &[TestUnit]) -> Result<HarnessDocument, HarnessError> {
    let test_count: usize = units.iter().map(|u| u.tests.len()).sum();
    if test_count == 0 {
        return Err(HarnessError::EmptyTestSet { units: units.len() });
    }

    let mut e = CEmitter::new();
    e.line("// Generated by ctester. Do not edit.");
    e.include(SUPPORT_HEADER_NAME);
    for unit in units.iter().filter(|u| !u.tests.is_empty()) {
        e.include(&unit.name);
    }
    e.blank_line();

    e.block(&format!("int {ENTRY_SYMBOL}(struct ctester_context *ctx)"), |e| {
        e.line("int nTests = 0;");
        e.line("ctester_begin(ctx);");
        e.block("if (setjmp(ctester_abort) != 0)", |e| {
            e.line("ctester_end();");
            e.line("return 1;");
        });
        for test in units.iter().flat_map(|u| &u.tests) {
            emit_test_call(e, test);
        }
        e.line("ctx->executed = nTests;");
        e.linef(format_args!(
            "printf({}, nTests);",
            string_literal("ok (%d tests)\n")
        ));
        e.line("fflush(stdout);");
        e.line("ctester_end();");
        e.line("return 0;");
    });

    tracing::debug!(test_count, "generated test harness");
    Ok(HarnessDocument {
        source: e.finish(),
        test_count,
    })
}

fn emit_test_call(e: &mut CEmitter, test: &TestName) {
    let function = test.function();
    e.linef(format_args!("ctx->current_test = {};", string_literal(&function)));
    e.linef(format_args!("{function}();"));
    e.line("nTests++;");
}
