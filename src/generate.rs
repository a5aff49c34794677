//! Report generation: find the XML reports, fold them into one aggregation
//! context and write the output directory.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{ReportError, Result};
use crate::output;
use crate::transform::{self, AggregationContext};

pub const DEFAULT_REPORT_NAME: &str = "Coverage Report";

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// XML report files, or directories searched recursively for them.
    pub inputs: Vec<PathBuf>,
    /// Base directory that source roots are resolved against.
    pub project_dir: PathBuf,
    pub output_dir: PathBuf,
    pub name: String,
    pub timestamp: String,
}

impl GenerateOptions {
    pub fn new(inputs: Vec<PathBuf>, project_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            inputs,
            project_dir: project_dir.into(),
            output_dir: output_dir.into(),
            name: DEFAULT_REPORT_NAME.to_string(),
            timestamp: current_timestamp(),
        }
    }
}

pub fn current_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateSummary {
    pub files: usize,
    pub modules: usize,
    pub source_files: usize,
}

/// Every `.xml` file under the inputs, sorted. Files given directly are kept
/// whatever their extension; missing directories are skipped.
pub fn collect_report_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_file() {
            files.push(input.clone());
            continue;
        }
        if !input.is_dir() {
            warn!(input = %input.display(), "report input not found, skipping");
            continue;
        }
        for entry in WalkDir::new(input).follow_links(true) {
            let entry = entry.map_err(std::io::Error::from)?;
            let path = entry.path();
            if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "xml") {
                files.push(path.to_path_buf());
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Fold every report into a fresh context. A failing file aborts the run
/// with its path attached.
pub fn aggregate(files: &[PathBuf], project_dir: &Path, name: &str, timestamp: &str) -> Result<AggregationContext> {
    let mut ctx = AggregationContext::new(name, timestamp);
    for file in files {
        debug!(file = %file.display(), "transforming report");
        transform::transform(file, project_dir, &mut ctx).map_err(|source| ReportError::Transform {
            path: file.clone(),
            source: Box::new(source),
        })?;
    }
    Ok(ctx)
}

pub fn generate(options: &GenerateOptions) -> Result<GenerateSummary> {
    let files = collect_report_files(&options.inputs)?;
    info!(count = files.len(), "found coverage reports");
    let ctx = aggregate(&files, &options.project_dir, &options.name, &options.timestamp)?;
    let report = ctx.coverage.build();
    let source_files = output::write_report(&options.output_dir, &options.project_dir, &report, &ctx.source_files)?;
    Ok(GenerateSummary {
        files: files.len(),
        modules: report.modules.len(),
        source_files,
    })
}
