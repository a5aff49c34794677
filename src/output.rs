//! Writes the report directory: the report data script, one coverage
//! payload per located source file, and the static index page.
//!
//! ```text
//! <output>/
//!   index.html
//!   css/style.css
//!   js/report.js
//!   data/report-data.js
//!   sourcefiles/<flattened path>.json.js
//! ```

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ReportError, Result};
use crate::html;
use crate::model::CoverageReport;
use crate::payload;
use crate::renderer::ReportRenderer;
use crate::source_files::{SourceFileReportBuilder, SourceFileReportsBuilder};

pub const REPORT_DATA_FILE: &str = "data/report-data.js";
pub const SOURCE_FILES_DIR: &str = "sourcefiles";
pub const STYLE_FILE: &str = "css/style.css";
pub const SCRIPT_FILE: &str = "js/report.js";
pub const INDEX_FILE: &str = "index.html";

/// Where the payload for `flattened_path` lives under a report directory.
/// Root, prefix and `..` components are dropped, so a source root outside
/// the project still lands under `sourcefiles/`.
pub fn source_payload_path(output_dir: &Path, flattened_path: &str) -> PathBuf {
    let relative: PathBuf = Path::new(flattened_path)
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();
    output_dir
        .join(SOURCE_FILES_DIR)
        .join(format!("{}.json.js", relative.to_string_lossy()))
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

/// Write every artifact. Returns the number of source payloads written.
pub fn write_report(
    output_dir: &Path,
    project_dir: &Path,
    report: &CoverageReport,
    source_files: &SourceFileReportsBuilder,
) -> Result<usize> {
    write_file(&output_dir.join(REPORT_DATA_FILE), &payload::encode_report(report)?)?;

    for builder in source_files.source_files.values() {
        write_source_file(output_dir, project_dir, builder)?;
    }

    write_file(&output_dir.join(STYLE_FILE), html::STYLE_CSS)?;
    write_file(&output_dir.join(SCRIPT_FILE), html::REPORT_JS)?;
    let frame = ReportRenderer::new(report).render();
    write_file(&output_dir.join(INDEX_FILE), &html::render_index(&frame))?;

    info!(
        output = %output_dir.display(),
        source_files = source_files.len(),
        "report written"
    );
    Ok(source_files.len())
}

/// Read the source text back from the project and write its payload.
pub fn write_source_file(output_dir: &Path, project_dir: &Path, builder: &SourceFileReportBuilder) -> Result<()> {
    let source_path = project_dir.join(&builder.relative_path);
    let bytes = fs::read(&source_path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ReportError::SourceNotFound(source_path.clone()),
        _ => ReportError::Io(e),
    })?;
    let text = String::from_utf8_lossy(&bytes);
    let lines: Vec<&str> = text.lines().collect();

    let report = builder.build(&lines);
    let target = source_payload_path(output_dir, &builder.flattened_path);
    debug!(source = %builder.relative_path, target = %target.display(), "writing source payload");
    write_file(&target, &payload::encode_source_file(&builder.flattened_path, &report)?)
}

/// Load the report tree from a previously generated report directory.
pub fn read_report(output_dir: &Path) -> Result<CoverageReport> {
    let script = fs::read_to_string(output_dir.join(REPORT_DATA_FILE))?;
    payload::decode_report(&script)
}
