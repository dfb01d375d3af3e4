//! Test-file naming rule.

/// Marker a directory entry name must contain to be treated as a test file (case-sensitive).
pub const TEST_FILE_MARKER: &str = "_test.c";

/// Returns true if `name` matches the test-file naming rule.
pub fn is_test_file(name: &str) -> bool {
    name.contains(TEST_FILE_MARKER)
}
