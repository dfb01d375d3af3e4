//! Harness project - the temporary files of one run and the compiler that builds them
//!
//! Lays out, under the work directory:
//! - `_generated_test_runner.c` - the harness source
//! - `_generated_test_support/testing.h` - the support header
//! - `_generated_test_runner.<so|dylib|dll>` - the compiled module
//!
//! and invokes the C compiler to turn the first two into the third.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::harness::{HarnessDocument, SUPPORT_HEADER, SUPPORT_HEADER_NAME};
use crate::config::RunnerConfig;

pub const HARNESS_STEM: &str = "_generated_test_runner";
pub const SUPPORT_DIR_NAME: &str = "_generated_test_support";

/// Fixed paths of the generated files for one work directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessProject {
    work_dir: PathBuf,
}

impl HarnessProject {
    pub fn new(work_dir: impl AsRef<Path>) -> Self {
        Self {
            work_dir: work_dir.as_ref().to_path_buf(),
        }
    }

    pub fn source_path(&self) -> PathBuf {
        self.work_dir.join(format!("{HARNESS_STEM}.c"))
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.work_dir
            .join(format!("{HARNESS_STEM}.{}", std::env::consts::DLL_EXTENSION))
    }

    pub fn support_dir(&self) -> PathBuf {
        self.work_dir.join(SUPPORT_DIR_NAME)
    }

    /// Write the harness source and the support header.
    pub fn generate(&self, harness: &HarnessDocument) -> io::Result<()> {
        fs::create_dir_all(self.support_dir())?;
        fs::write(self.support_dir().join(SUPPORT_HEADER_NAME), SUPPORT_HEADER)?;
        fs::write(self.source_path(), harness.as_str())?;
        Ok(())
    }

    /// Every generated path, for removal.
    pub fn temp_artifacts(&self) -> TempArtifacts {
        TempArtifacts {
            files: vec![self.source_path(), self.artifact_path()],
            dirs: vec![self.support_dir()],
        }
    }

    /// Compilation request for a harness over the test files in `test_dir`.
    ///
    /// The support directory comes first on the include path so `<testing.h>` resolves to ours.
    pub fn build_request(&self, test_dir: &Path) -> BuildRequest {
        BuildRequest {
            source: self.source_path(),
            include_dirs: vec![self.support_dir(), test_dir.to_path_buf()],
            artifact: self.artifact_path(),
        }
    }
}

/// The generated files and directories of one run.
///
/// Removed by the runner's guard when the pipeline returns, and by the exit hook when test code ends the
/// process instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TempArtifacts {
    files: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
}

impl TempArtifacts {
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().chain(&self.dirs).map(PathBuf::as_path)
    }

    /// Remove everything that exists; missing paths are fine.
    pub fn remove_all(&self) {
        for file in &self.files {
            report_removal(file, fs::remove_file(file));
        }
        for dir in &self.dirs {
            report_removal(dir, fs::remove_dir_all(dir));
        }
    }
}

fn report_removal(path: &Path, result: io::Result<()>) {
    match result {
        Ok(()) => tracing::trace!(path = %path.display(), "removed temporary file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "did not remove temporary file"),
    }
}

/// Inputs to one compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub source: PathBuf,
    pub include_dirs: Vec<PathBuf>,
    pub artifact: PathBuf,
}

/// The system C compiler, driven through its command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CcToolchain {
    program: String,
    flags: Vec<String>,
}

impl CcToolchain {
    pub fn new(program: impl Into<String>, flags: Vec<String>) -> Self {
        Self {
            program: program.into(),
            flags,
        }
    }

    pub fn from_config(config: &RunnerConfig) -> Self {
        Self::new(config.compiler.clone(), config.cflags.clone())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// `<cc> <flags> -shared -I<dir>... -o <artifact> <source>`
    pub fn command(&self, request: &BuildRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.flags).arg("-shared");
        for dir in &request.include_dirs {
            cmd.arg("-I").arg(dir);
        }
        cmd.arg("-o").arg(&request.artifact).arg(&request.source);
        cmd
    }

    /// Build the module, capturing the compiler's output
    #[tracing::instrument(skip_all, fields(program = %self.program, source = %request.source.display()))]
    pub fn build(&self, request: &BuildRequest) -> io::Result<BuildResult> {
        let output = self.command(request).output()?;

        Ok(BuildResult {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
        })
    }
}

/// Result of a compiler invocation
#[derive(Debug)]
pub struct BuildResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}
