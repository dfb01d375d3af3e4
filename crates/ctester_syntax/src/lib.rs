//! Syntax-level discovery for the ctester runner: which files are test files, and which functions inside them
//! are tests.
//!
//! This crate is intentionally dependency-light and performs no I/O beyond reading the stream it is handed. It
//! does not parse C: it recognizes one fixed textual pattern (`void Test<Name>(`) and skips comments, directives
//! and brace-delimited blocks on the way.
//!
//! ## Examples
//! ```rust
//! use ctester_syntax::{naming, scanner};
//!
//! assert!(naming::is_test_file("array_test.c"));
//!
//! let names = scanner::scan_str("void TestCreate() { }\n// void TestHidden() {}\n");
//! assert_eq!(names.len(), 1);
//! assert_eq!(names[0].as_str(), "Create");
//! ```

pub mod naming;
pub mod scanner;
pub mod test_name;

pub use scanner::{Scanner, scan_reader, scan_str};
pub use test_name::{TestName, TestNameError};
