//! Runner configuration
//!
//! Resolution order: built-in defaults, then the environment (`CC`, `CTESTER_CFLAGS`), then CLI flags.

use std::path::PathBuf;

pub const DEFAULT_COMPILER: &str = "cc";
pub const DEFAULT_CFLAGS: &[&str] = &["-fpic", "-std=c11", "-Wall", "-Werror"];

/// Environment variable naming the C compiler.
pub const COMPILER_ENV: &str = "CC";
/// Environment variable holding whitespace-separated compiler flags.
pub const CFLAGS_ENV: &str = "CTESTER_CFLAGS";

/// Settings for one test run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Directory receiving the generated harness, support header and module
    pub work_dir: PathBuf,
    /// C compiler program
    pub compiler: String,
    /// Flags passed before `-shared`
    pub cflags: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            compiler: DEFAULT_COMPILER.to_string(),
            cflags: DEFAULT_CFLAGS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl RunnerConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `CC` and `CTESTER_CFLAGS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the environment keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(cc) = lookup(COMPILER_ENV).filter(|v| !v.trim().is_empty()) {
            config.compiler = cc.trim().to_string();
        }
        if let Some(flags) = lookup(CFLAGS_ENV) {
            config.cflags = flags.split_whitespace().map(str::to_string).collect();
        }
        config
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn with_compiler(mut self, compiler: impl Into<String>) -> Self {
        self.compiler = compiler.into();
        self
    }

    pub fn with_cflags(mut self, cflags: Vec<String>) -> Self {
        self.cflags = cflags;
        self
    }
}
