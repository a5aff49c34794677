//! Script payloads the static renderer loads: the report tree as a global
//! constant and one lazily loaded coverage payload per source file.

use crate::error::{ReportError, Result};
use crate::model::{CoverageReport, SourceFileCoverageReport};

const REPORT_PREFIX: &str = "const fullReport = ";
const SOURCE_PREAMBLE: &str = "window.coverageData = window.coverageData || {};";
const SOURCE_PREFIX: &str = "window.coverageData[";

pub fn encode_report(report: &CoverageReport) -> Result<String> {
    let json = serde_json::to_string_pretty(report)?;
    Ok(format!("{REPORT_PREFIX}{json};\n"))
}

pub fn decode_report(script: &str) -> Result<CoverageReport> {
    let body = script
        .trim()
        .strip_prefix(REPORT_PREFIX)
        .ok_or_else(|| ReportError::Parse("report data does not define fullReport".to_string()))?;
    let json = body.trim_end().strip_suffix(';').unwrap_or(body);
    Ok(serde_json::from_str(json)?)
}

pub fn encode_source_file(flattened_path: &str, report: &SourceFileCoverageReport) -> Result<String> {
    let key = serde_json::to_string(flattened_path)?;
    let json = serde_json::to_string(report)?;
    Ok(format!("{SOURCE_PREAMBLE}\n{SOURCE_PREFIX}{key}] = {json};\n"))
}

/// Decode a source file payload into its key and coverage report.
pub fn decode_source_file(script: &str) -> Result<(String, SourceFileCoverageReport)> {
    let assignment = script
        .trim()
        .strip_prefix(SOURCE_PREAMBLE)
        .map(str::trim_start)
        .and_then(|rest| rest.strip_prefix(SOURCE_PREFIX))
        .ok_or_else(|| ReportError::Parse("source payload does not assign window.coverageData".to_string()))?;

    // The key is a JSON string literal, so read it with a streaming
    // deserializer to find where it ends.
    let mut stream = serde_json::Deserializer::from_str(assignment).into_iter::<String>();
    let key = match stream.next() {
        Some(key) => key?,
        None => return Err(ReportError::Parse("source payload is missing its key".to_string())),
    };
    let rest = assignment[stream.byte_offset()..]
        .trim_start()
        .strip_prefix(']')
        .map(str::trim_start)
        .and_then(|rest| rest.strip_prefix('='))
        .ok_or_else(|| ReportError::Parse(format!("malformed assignment for {key}")))?;
    let json = rest.trim().strip_suffix(';').unwrap_or(rest.trim());
    Ok((key, serde_json::from_str(json)?))
}
