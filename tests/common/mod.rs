//! Fake collaborators for pipeline tests.
//!
//! `FakeToolchain` "compiles" a harness by recording the test calls it contains into the artifact file;
//! `FakeLoader` reads them back and replays them, failing the tests named in `failures`.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use ctester::backend::project::{BuildRequest, HarnessProject};
use ctester::backend::runtime::{RunContext, TestFailure};
use ctester::{ENTRY_SYMBOL, EntryPoint, LoadedModule, ModuleLoader, TestError, Toolchain};

#[derive(Default)]
pub struct FakeToolchain {
    /// Fail every compilation with this message.
    pub fail_with: Option<String>,
    /// Build modules that do not export the entry point.
    pub omit_entry: bool,
    /// Last harness source seen.
    pub harness: RefCell<Option<String>>,
    /// Include path of the last compilation.
    pub include_dirs: RefCell<Vec<PathBuf>>,
}

impl FakeToolchain {
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn harness(&self) -> Option<String> {
        self.harness.borrow().clone()
    }
}

impl Toolchain for FakeToolchain {
    fn compile(&self, request: &BuildRequest) -> Result<PathBuf, TestError> {
        let source = fs::read_to_string(&request.source).map_err(|e| TestError::Compile {
            message: e.to_string(),
        })?;
        *self.harness.borrow_mut() = Some(source.clone());
        *self.include_dirs.borrow_mut() = request.include_dirs.clone();

        if let Some(message) = &self.fail_with {
            return Err(TestError::Compile {
                message: message.clone(),
            });
        }

        let mut artifact = Vec::new();
        if !self.omit_entry && source.contains(&format!("int {ENTRY_SYMBOL}(")) {
            artifact.push(format!("entry {ENTRY_SYMBOL}"));
        }
        artifact.extend(
            source
                .lines()
                .map(str::trim)
                .filter_map(|line| line.strip_suffix("();"))
                .filter(|call| call.starts_with("Test"))
                .map(|call| format!("call {call}")),
        );
        fs::write(&request.artifact, artifact.join("\n")).map_err(|e| TestError::Compile {
            message: e.to_string(),
        })?;
        Ok(request.artifact.clone())
    }
}

#[derive(Default)]
pub struct FakeLoader {
    /// Test function name -> failure message.
    pub failures: HashMap<String, String>,
    pub refuse_load: bool,
    /// Every test function invoked, in order.
    pub calls: Rc<RefCell<Vec<String>>>,
    /// Modules currently loaded.
    pub live: Rc<Cell<usize>>,
    /// Exit cleanup paths carried by the last run context.
    pub exit_cleanup: Rc<RefCell<Vec<PathBuf>>>,
}

impl FakeLoader {
    pub fn failing(test: &str, message: &str) -> Self {
        let mut loader = Self::default();
        loader.failures.insert(test.to_string(), message.to_string());
        loader
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl ModuleLoader for FakeLoader {
    fn load(&self, artifact: &Path) -> Result<Box<dyn LoadedModule>, TestError> {
        if self.refuse_load {
            return Err(TestError::Load {
                path: artifact.to_path_buf(),
                reason: "wrong module format".to_string(),
            });
        }
        let contents = fs::read_to_string(artifact).map_err(|e| TestError::Load {
            path: artifact.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut symbols = Vec::new();
        let mut tests = Vec::new();
        for line in contents.lines() {
            if let Some(symbol) = line.strip_prefix("entry ") {
                symbols.push(symbol.to_string());
            } else if let Some(test) = line.strip_prefix("call ") {
                tests.push(test.to_string());
            }
        }

        self.live.set(self.live.get() + 1);
        Ok(Box::new(FakeModule {
            symbols,
            tests,
            failures: self.failures.clone(),
            calls: Rc::clone(&self.calls),
            live: Rc::clone(&self.live),
            exit_cleanup: Rc::clone(&self.exit_cleanup),
        }))
    }
}

struct FakeModule {
    symbols: Vec<String>,
    tests: Vec<String>,
    failures: HashMap<String, String>,
    calls: Rc<RefCell<Vec<String>>>,
    live: Rc<Cell<usize>>,
    exit_cleanup: Rc<RefCell<Vec<PathBuf>>>,
}

impl Drop for FakeModule {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

impl LoadedModule for FakeModule {
    fn resolve(&self, symbol: &str) -> Result<Box<dyn EntryPoint + '_>, TestError> {
        if !self.symbols.iter().any(|s| s == symbol) {
            return Err(TestError::Symbol {
                symbol: symbol.to_string(),
                reason: "undefined symbol".to_string(),
            });
        }
        Ok(Box::new(FakeEntry { module: self }))
    }
}

struct FakeEntry<'m> {
    module: &'m FakeModule,
}

impl EntryPoint for FakeEntry<'_> {
    fn invoke(&self, ctx: &mut RunContext) -> Result<(), TestFailure> {
        *self.module.exit_cleanup.borrow_mut() = ctx.exit_cleanup().paths().map(Path::to_path_buf).collect();
        for test in &self.module.tests {
            ctx.enter(test.clone());
            self.module.calls.borrow_mut().push(test.clone());
            if let Some(message) = self.module.failures.get(test) {
                return Err(ctx.fail(message.clone()));
            }
            ctx.complete();
        }
        Ok(())
    }
}

/// Write `files` (name, contents) into `dir`.
pub fn write_files(dir: &Path, files: &[(&str, &str)]) {
    for (name, contents) in files {
        fs::write(dir.join(name), contents).unwrap();
    }
}

/// Assert that no generated file is left in `work_dir`.
pub fn assert_clean(work_dir: &Path) {
    let project = HarnessProject::new(work_dir);
    for path in [project.source_path(), project.artifact_path(), project.support_dir()] {
        assert!(!path.exists(), "{} was not cleaned up", path.display());
    }
}
