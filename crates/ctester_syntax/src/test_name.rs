//! Discovered test names.

use std::fmt;

use thiserror::Error;

/// Upper bound on the length of a single test name, in bytes.
pub const TEST_NAME_LENGTH_MAX: usize = 100;

/// Prefix shared by every test function; the scanner strips it, `TestName::function` puts it back.
pub const TEST_FUNCTION_PREFIX: &str = "Test";

/// Reasons a candidate is not a usable test name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TestNameError {
    #[error("test name is {len} bytes long, the limit is {max}", max = TEST_NAME_LENGTH_MAX)]
    TooLong { len: usize },

    #[error("test name contains {0:?}, which cannot appear in a C identifier")]
    InvalidByte(char),
}

/// The identifier text between `void Test` and `(`.
///
/// `void TestFoo()` yields the name `Foo`; the callable C function is `TestFoo`. The empty name is valid
/// (`void Test()` declares a function called `Test`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TestName(String);

impl TestName {
    /// Validate and wrap a candidate name.
    pub fn new(name: impl Into<String>) -> Result<Self, TestNameError> {
        let name = name.into();
        if name.len() > TEST_NAME_LENGTH_MAX {
            return Err(TestNameError::TooLong { len: name.len() });
        }
        if let Some(bad) = name.chars().find(|&c| !is_name_char(c)) {
            return Err(TestNameError::InvalidByte(bad));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The full C function name, e.g. `TestFoo`.
    pub fn function(&self) -> String {
        format!("{TEST_FUNCTION_PREFIX}{}", self.0)
    }
}

impl fmt::Display for TestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TestName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Bytes allowed after the `Test` prefix (ASCII-only identifier continuation).
pub(crate) fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii() && is_name_byte(c as u8)
}
