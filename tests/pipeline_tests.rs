//! End-to-end pipeline tests with fake compiler and loader.

mod common;

use std::fs;
use std::path::Path;

use common::{FakeLoader, FakeToolchain, assert_clean, write_files};
use ctester::backend::project::HarnessProject;
use ctester::backend::runtime::RunOutcome;
use ctester::cli::test_runner::{SilentReporter, TestReporter};
use ctester::{RunnerConfig, TestError, TestName, run_pipeline};

fn run(dir: &Path, work: &Path, toolchain: &FakeToolchain, loader: &FakeLoader) -> Result<RunOutcome, TestError> {
    let config = RunnerConfig::new().with_work_dir(work);
    run_pipeline(dir, &config, toolchain, loader, &mut SilentReporter)
}

#[test]
fn test_two_passing_tests() {
    let dir = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    write_files(dir.path(), &[("a_test.c", "void TestOne() {}\nvoid TestTwo() {}\n")]);

    let toolchain = FakeToolchain::default();
    let loader = FakeLoader::default();
    let outcome = run(dir.path(), work.path(), &toolchain, &loader).unwrap();

    assert_eq!(outcome.executed, 2);
    assert_eq!(loader.calls(), vec!["TestOne", "TestTwo"]);
    assert_eq!(loader.live.get(), 0);
    assert_clean(work.path());
}

#[test]
fn test_first_failure_stops_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    write_files(
        dir.path(),
        &[("a_test.c", "void TestOne() {}\nvoid TestTwo() {}\nvoid TestThree() {}\n")],
    );

    let toolchain = FakeToolchain::default();
    let loader = FakeLoader::failing("TestTwo", "expected 3, got 4");
    let err = run(dir.path(), work.path(), &toolchain, &loader).unwrap_err();

    assert!(matches!(err, TestError::TestFailure(_)));
    assert_eq!(err.to_string(), "TestTwo: expected 3, got 4");
    assert_eq!(loader.calls(), vec!["TestOne", "TestTwo"]);
    assert_eq!(loader.live.get(), 0);
    assert_clean(work.path());
}

#[test]
fn test_tests_in_non_test_files_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    write_files(
        dir.path(),
        &[("array.c", "void TestHidden() {}\n"), ("array_test.c", "void TestVisible() {}\n")],
    );

    let toolchain = FakeToolchain::default();
    let loader = FakeLoader::default();
    run(dir.path(), work.path(), &toolchain, &loader).unwrap();

    let harness = toolchain.harness().unwrap();
    assert!(harness.contains("#include <array_test.c>"));
    assert!(!harness.contains("array.c>"));
    assert!(!harness.contains("TestHidden"));
    assert_eq!(loader.calls(), vec!["TestVisible"]);
}

#[test]
fn test_no_test_files() {
    let dir = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    write_files(dir.path(), &[("array.c", "void TestHidden() {}\n")]);

    let toolchain = FakeToolchain::default();
    let loader = FakeLoader::default();
    let err = run(dir.path(), work.path(), &toolchain, &loader).unwrap_err();

    assert!(matches!(err, TestError::NoTestFiles { .. }));
    assert!(toolchain.harness().is_none());
    assert!(loader.calls().is_empty());
    assert_clean(work.path());
}

#[test]
fn test_test_files_without_tests() {
    let dir = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    write_files(
        dir.path(),
        &[("a_test.c", "// void TestCommented() {}\n"), ("b_test.c", "static void helper() {}\n")],
    );

    let toolchain = FakeToolchain::default();
    let err = run(dir.path(), work.path(), &toolchain, &FakeLoader::default()).unwrap_err();

    match err {
        TestError::EmptyTestSet { files, .. } => assert_eq!(files, 2),
        other => panic!("unexpected error: {other}"),
    }
    assert!(toolchain.harness().is_none());
    assert_clean(work.path());
}

#[test]
fn test_compile_error_is_reported_and_cleaned() {
    let dir = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    write_files(dir.path(), &[("a_test.c", "void TestOne() { syntax error }\n")]);

    let toolchain = FakeToolchain::failing("a_test.c:1: expected ';'");
    let loader = FakeLoader::default();
    let err = run(dir.path(), work.path(), &toolchain, &loader).unwrap_err();

    assert_eq!(err.to_string(), "did not compile: a_test.c:1: expected ';'");
    assert!(toolchain.harness().is_some());
    assert!(loader.calls().is_empty());
    assert_clean(work.path());
}

#[test]
fn test_load_error_is_reported_and_cleaned() {
    let dir = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    write_files(dir.path(), &[("a_test.c", "void TestOne() {}\n")]);

    let loader = FakeLoader {
        refuse_load: true,
        ..FakeLoader::default()
    };
    let err = run(dir.path(), work.path(), &FakeToolchain::default(), &loader).unwrap_err();

    assert!(matches!(err, TestError::Load { .. }));
    assert!(err.to_string().ends_with("wrong module format"));
    assert_clean(work.path());
}

#[test]
fn test_missing_entry_point_is_reported_and_cleaned() {
    let dir = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    write_files(dir.path(), &[("a_test.c", "void TestOne() {}\n")]);

    let toolchain = FakeToolchain {
        omit_entry: true,
        ..FakeToolchain::default()
    };
    let loader = FakeLoader::default();
    let err = run(dir.path(), work.path(), &toolchain, &loader).unwrap_err();

    match &err {
        TestError::Symbol { symbol, .. } => assert_eq!(symbol, "RunTests"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().starts_with("did not find entry point `RunTests`"));
    assert!(loader.calls().is_empty());
    assert_eq!(loader.live.get(), 0);
    assert_clean(work.path());
}

#[test]
fn test_run_context_carries_exit_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    write_files(dir.path(), &[("a_test.c", "void TestOne() {}\n")]);

    let loader = FakeLoader::default();
    run(dir.path(), work.path(), &FakeToolchain::default(), &loader).unwrap();

    let project = HarnessProject::new(work.path());
    let mut expected = vec![project.source_path(), project.artifact_path(), project.support_dir()];
    let mut seen = loader.exit_cleanup.borrow().clone();
    expected.sort();
    seen.sort();
    assert_eq!(seen, expected);
}

#[test]
fn test_harness_is_generated_with_support_header() {
    let dir = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    write_files(dir.path(), &[("a_test.c", "void TestOne() {}\n")]);

    let toolchain = FakeToolchain::default();
    run(dir.path(), work.path(), &toolchain, &FakeLoader::default()).unwrap();

    let include_dirs = toolchain.include_dirs.borrow().clone();
    assert_eq!(include_dirs.len(), 2);
    assert!(include_dirs[0].starts_with(work.path()));
    assert_eq!(include_dirs[1], dir.path());

    let harness = toolchain.harness().unwrap();
    assert!(harness.starts_with("// Generated by ctester. Do not edit.\n#include <testing.h>\n"));
    assert!(harness.contains("int RunTests(struct ctester_context *ctx) {"));
}

#[test]
fn test_order_follows_file_names() {
    let dir = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    write_files(
        dir.path(),
        &[
            ("zeta_test.c", "void TestZeta() {}\n"),
            ("alpha_test.c", "void TestAlphaB() {}\nvoid TestAlphaA() {}\n"),
            ("mid_test.c", "void TestMid() {}\n"),
        ],
    );

    let loader = FakeLoader::default();
    run(dir.path(), work.path(), &FakeToolchain::default(), &loader).unwrap();

    assert_eq!(loader.calls(), vec!["TestAlphaB", "TestAlphaA", "TestMid", "TestZeta"]);
}

#[test]
fn test_work_dir_may_be_the_test_dir() {
    let dir = tempfile::tempdir().unwrap();
    write_files(dir.path(), &[("a_test.c", "void TestOne() {}\n")]);

    let loader = FakeLoader::default();
    run(dir.path(), dir.path(), &FakeToolchain::default(), &loader).unwrap();

    assert_eq!(loader.calls(), vec!["TestOne"]);
    assert_clean(dir.path());
    let mut left: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    left.sort();
    assert_eq!(left, vec!["a_test.c"]);
}

#[test]
fn test_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let err = run(&dir.path().join("missing"), work.path(), &FakeToolchain::default(), &FakeLoader::default())
        .unwrap_err();
    assert!(matches!(err, TestError::ListDir { .. }));
    assert_clean(work.path());
}

#[derive(Default)]
struct RecordingReporter {
    events: Vec<String>,
}

impl TestReporter for RecordingReporter {
    fn on_discovery_start(&mut self, _dir: &Path) {
        self.events.push("start".to_string());
    }

    fn on_file_scanned(&mut self, name: &str, tests: &[TestName]) {
        self.events.push(format!("scanned {name} {}", tests.len()));
    }

    fn on_collection_complete(&mut self, file_count: usize, test_count: usize) {
        self.events.push(format!("collected {file_count} {test_count}"));
    }

    fn on_run_failed(&mut self, error: &TestError) {
        self.events.push(format!("failed {error}"));
    }
}

#[test]
fn test_reporter_sees_every_stage() {
    let dir = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    write_files(
        dir.path(),
        &[("a_test.c", "void TestOne() {}\n"), ("b_test.c", "void TestTwo() {}\nvoid TestBad() {}\n")],
    );

    let config = RunnerConfig::new().with_work_dir(work.path());
    let loader = FakeLoader::failing("TestBad", "boom");
    let mut reporter = RecordingReporter::default();
    let result = run_pipeline(dir.path(), &config, &FakeToolchain::default(), &loader, &mut reporter);

    assert!(result.is_err());
    assert_eq!(
        reporter.events,
        vec![
            "start",
            "scanned a_test.c 1",
            "scanned b_test.c 2",
            "collected 2 3",
            "failed TestBad: boom",
        ]
    );
}
