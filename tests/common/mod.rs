#![allow(dead_code)]

use std::path::PathBuf;

use covreport::generate::{GenerateOptions, GenerateSummary};
use tempfile::TempDir;

pub const GREETER_PATH: &str = "app/src/main/kotlin/com/example/Greeter.kt";

pub fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(path)
}

/// Project tree the fixture reports' source roots point into.
pub fn project_dir() -> PathBuf {
    fixture("project")
}

pub fn reports_dir() -> PathBuf {
    fixture("reports")
}

pub fn options(output: &TempDir) -> GenerateOptions {
    let mut options = GenerateOptions::new(vec![reports_dir()], project_dir(), output.path());
    options.name = "Fixture Project".to_string();
    options.timestamp = "2026-01-01 10:00:00".to_string();
    options
}

/// Generate the fixture report into a fresh temp directory. The caller must
/// hold onto `TempDir` to keep the output alive.
pub fn generate_fixture_report() -> (TempDir, GenerateSummary) {
    let dir = tempfile::tempdir().unwrap();
    let summary = covreport::generate::generate(&options(&dir)).unwrap();
    (dir, summary)
}
