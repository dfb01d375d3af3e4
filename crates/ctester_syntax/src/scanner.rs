//! Signature scanner for C test files
//!
//! Finds `void Test<Name>(` occurrences in a byte stream, one byte at a time, without backtracking.
//!
//! ## Known limitations
//!
//! Both are kept on purpose; callers and tests rely on the exact behavior.
//!
//! - **NestedBraceLimitation**: a `{` skips to the *first* following `}`, not the matching one. Text after an
//!   inner block but still inside the outer body is scanned again.
//! - **PatternRestartLimitation**: on a mismatch the pattern cursor resets to zero and the mismatching byte is
//!   dropped, so `vvoid TestA(` is not recognized.

use std::io::{self, BufReader, Read};

use crate::test_name::{TEST_NAME_LENGTH_MAX, TestName, is_name_byte};

/// The literal declaration prefix every test signature starts with.
pub const TEST_PATTERN: &[u8] = b"void Test";

// ============================================================================
// SCAN STATE
// ----------------------------------------------------------------------------
//
// [matching] -- full pattern --> [accumulating] -- '(' --> emit, [matching]
//      |                              |
//      +---- '{' / '#' / '/' ---------+--> [skipping until '}' or '\n'] --> back
// ============================================================================

/// Transient state for one stream.
#[derive(Debug, Default)]
struct ScanState {
    /// Number of pattern bytes matched so far.
    cursor: usize,
    /// Bytes seen after a full pattern match.
    candidate: Vec<u8>,
    /// Whitespace followed the candidate; only `(` may come next.
    trailing_space: bool,
    /// When set, bytes are discarded up to and including this one.
    skip_until: Option<u8>,
}

impl ScanState {
    fn accumulating(&self) -> bool {
        self.cursor == TEST_PATTERN.len()
    }

    fn abandon(&mut self) {
        self.cursor = 0;
        self.candidate.clear();
        self.trailing_space = false;
    }

    /// Feed one byte; returns a name when a signature completes.
    fn step(&mut self, byte: u8) -> Option<TestName> {
        if let Some(marker) = self.skip_until {
            if byte == marker {
                self.skip_until = None;
            }
            return None;
        }

        match byte {
            b'{' => {
                self.skip_until = Some(b'}');
                return None;
            }
            b'#' | b'/' => {
                self.skip_until = Some(b'\n');
                return None;
            }
            _ => {}
        }

        if !self.accumulating() {
            if byte == TEST_PATTERN[self.cursor] {
                self.cursor += 1;
            } else {
                self.cursor = 0;
            }
            return None;
        }

        if byte != b'(' {
            if byte.is_ascii_whitespace() {
                self.trailing_space = true;
            } else if !is_name_byte(byte) || self.trailing_space || self.candidate.len() == TEST_NAME_LENGTH_MAX {
                tracing::trace!(byte, "abandoning test signature candidate");
                self.abandon();
            } else {
                self.candidate.push(byte);
            }
            return None;
        }

        let candidate = std::mem::take(&mut self.candidate);
        self.cursor = 0;
        self.trailing_space = false;
        // Only name bytes were accumulated, so this is ASCII and within bounds.
        let name = String::from_utf8(candidate).ok().and_then(|s| TestName::new(s).ok());
        if let Some(name) = &name {
            tracing::debug!(test = %name, "found test signature");
        }
        name
    }
}

// ============================================================================
// SCANNER
// ============================================================================

/// Iterator over the test names in a stream, in file order.
///
/// The scanner reads one byte per step, so hand it a buffered reader. A read error ends the sequence (the
/// stream is treated as holding no further tests); a candidate still being accumulated when the stream ends is
/// discarded.
pub struct Scanner<R> {
    bytes: io::Bytes<R>,
    state: ScanState,
    done: bool,
}

impl<R: Read> Scanner<R> {
    pub fn new(reader: R) -> Self {
        Self {
            bytes: reader.bytes(),
            state: ScanState::default(),
            done: false,
        }
    }
}

impl<R: Read> Iterator for Scanner<R> {
    type Item = TestName;

    fn next(&mut self) -> Option<TestName> {
        if self.done {
            return None;
        }
        loop {
            match self.bytes.next() {
                Some(Ok(byte)) => {
                    if let Some(name) = self.state.step(byte) {
                        return Some(name);
                    }
                }
                Some(Err(err)) => {
                    tracing::warn!(error = %err, "stopped scanning unreadable stream");
                    self.done = true;
                    return None;
                }
                None => {
                    self.done = true;
                    return None;
                }
            }
        }
    }
}

/// Scan a reader to completion.
#[tracing::instrument(skip_all)]
pub fn scan_reader<R: Read>(reader: R) -> Vec<TestName> {
    Scanner::new(BufReader::new(reader)).collect()
}

/// Scan an in-memory source string.
pub fn scan_str(source: &str) -> Vec<TestName> {
    Scanner::new(source.as_bytes()).collect()
}

// ============================================================================
// TESTS
// ============================================================================
