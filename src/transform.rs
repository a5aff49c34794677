//! Fold parsed JaCoCo reports into the shared aggregation state.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::{debug, warn};

use crate::builders::{CoverageReportBuilder, PackageReportBuilder};
use crate::counter::Counters;
use crate::error::Result;
use crate::locator::resolve_source_file;
use crate::model::{CoverageInfo, VariantCoverage, AGGREGATED_TEST_SUITE, DEFAULT_NAME, UNKNOWN_VARIANT};
use crate::parsers::jacoco::{self, ClassElement, JacocoDocument, PackageElement, SourceFileElement};
use crate::source_files::SourceFileReportsBuilder;

pub const KEY_MODULE_NAME: &str = "moduleName";
pub const KEY_VARIANT_NAME: &str = "variantName";
pub const KEY_TESTED_VARIANT_NAME: &str = "testedVariantName";
pub const KEY_TEST_SUITE_NAME: &str = "testSuiteName";

/// Which aggregation bucket a report file belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportContext {
    pub module_name: String,
    pub variant_name: String,
    pub test_suite_name: String,
}

impl ReportContext {
    pub fn from_document(doc: &JacocoDocument) -> Self {
        let module_name = doc
            .property(KEY_MODULE_NAME)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_NAME);
        let variant_name = doc
            .property(KEY_VARIANT_NAME)
            .or_else(|| doc.property(KEY_TESTED_VARIANT_NAME))
            .unwrap_or(UNKNOWN_VARIANT);
        let test_suite_name = doc
            .property(KEY_TEST_SUITE_NAME)
            .unwrap_or(AGGREGATED_TEST_SUITE);
        Self {
            module_name: module_name.to_string(),
            variant_name: variant_name.to_string(),
            test_suite_name: test_suite_name.to_string(),
        }
    }

    pub fn is_aggregated(&self) -> bool {
        self.test_suite_name == AGGREGATED_TEST_SUITE
    }
}

/// Shared state for one report generation run. Files are folded in
/// sequentially; nothing here is synchronized.
#[derive(Debug, Clone, Default)]
pub struct AggregationContext {
    pub coverage: CoverageReportBuilder,
    pub source_files: SourceFileReportsBuilder,
}

impl AggregationContext {
    pub fn new(name: impl Into<String>, time_stamp: impl Into<String>) -> Self {
        Self {
            coverage: CoverageReportBuilder::new(name, time_stamp),
            source_files: SourceFileReportsBuilder::default(),
        }
    }
}

/// Parse the report at `path` and fold it into `ctx`. A file that does not
/// exist contributes nothing; malformed XML is an error.
pub fn transform(path: &Path, project_dir: &Path, ctx: &mut AggregationContext) -> Result<()> {
    if !path.exists() {
        debug!(path = %path.display(), "report file missing, skipping");
        return Ok(());
    }
    let file = File::open(path)?;
    let doc = jacoco::parse_reader(BufReader::new(file))?;
    debug!(
        path = %path.display(),
        packages = doc.packages.len(),
        "transforming coverage report"
    );
    transform_document(&doc, project_dir, ctx);
    Ok(())
}

pub fn transform_document(doc: &JacocoDocument, project_dir: &Path, ctx: &mut AggregationContext) {
    let context = ReportContext::from_document(doc);
    let coverage = &mut ctx.coverage;

    if !context.is_aggregated() {
        coverage.record_test_suite(&context.test_suite_name, &context.module_name);
    }

    let overall = Counters::from_raw(&doc.counters);
    coverage.add_to_aggregate(&context.variant_name, &overall.instruction, &overall.branch);
    let overall_coverage = VariantCoverage::new(&context.variant_name, overall.instruction, overall.branch);

    let module = coverage.module_mut(&context.module_name);
    if context.is_aggregated() {
        module.variant_coverages.push(overall_coverage);
    } else {
        module
            .test_suite_mut(&context.test_suite_name)
            .variant_coverages
            .push(overall_coverage);
    }

    for package in &doc.packages {
        let package_name = package_display_name(&package.name);
        let builder = if context.is_aggregated() {
            module.package_mut(&package_name, &context.test_suite_name)
        } else {
            module
                .test_suite_mut(&context.test_suite_name)
                .package_mut(&package_name)
        };
        fold_package(
            package,
            &package_name,
            &context,
            builder,
            &doc.source_roots,
            project_dir,
            &mut ctx.source_files,
        );
    }
}

/// `com/example` -> `com.example`; empty names become `default`.
pub fn package_display_name(raw: &str) -> String {
    if raw.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        raw.replace('/', ".")
    }
}

/// Simple class name: the segment after the last `/`.
pub fn class_display_name(raw: &str) -> String {
    let name = raw.rsplit('/').next().unwrap_or(raw);
    if name.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        name.to_string()
    }
}

fn fold_package(
    package: &PackageElement,
    package_name: &str,
    context: &ReportContext,
    builder: &mut PackageReportBuilder,
    source_roots: &[String],
    project_dir: &Path,
    source_files: &mut SourceFileReportsBuilder,
) {
    let counters = Counters::from_raw(&package.counters);
    builder.variant_coverages.push(VariantCoverage::new(
        &context.variant_name,
        counters.instruction,
        counters.branch,
    ));

    for class in &package.classes {
        fold_class(class, &context.variant_name, builder);
    }

    let mut file_paths = BTreeMap::new();
    for source_file in &package.source_files {
        if let Some(flattened) = fold_source_file(
            source_file,
            package_name,
            context,
            source_roots,
            project_dir,
            source_files,
        ) {
            file_paths.insert(source_file.name.clone(), flattened);
        }
    }

    builder.attach_source_paths(&context.variant_name, &file_paths);
}

fn fold_class(class: &ClassElement, variant: &str, package: &mut PackageReportBuilder) {
    let counters = Counters::from_raw(&class.counters);
    let builder = package.class_mut(&class_display_name(&class.name), &class.source_file_name);
    builder
        .variant_coverages
        .push(VariantCoverage::new(variant, counters.instruction, counters.branch));

    for method in &class.methods {
        let key = format!("{}{}", method.name, method.desc);
        let key = if key.is_empty() { DEFAULT_NAME.to_string() } else { key };
        builder.method_mut(&key).add_line(variant, method.line);
    }
}

/// Record line coverage for a located source file and return its flattened
/// path. Files not found under any source root are skipped.
fn fold_source_file(
    source_file: &SourceFileElement,
    package_name: &str,
    context: &ReportContext,
    source_roots: &[String],
    project_dir: &Path,
    source_files: &mut SourceFileReportsBuilder,
) -> Option<String> {
    let Some(located) = resolve_source_file(project_dir, source_roots, package_name, &source_file.name) else {
        warn!(
            file = %source_file.name,
            package = %package_name,
            "source file not found under any source root"
        );
        return None;
    };

    let counters = Counters::from_raw(&source_file.counters);
    let suite = source_files
        .file_mut(&located.relative_path, &located.flattened_path)
        .test_suite_mut(&context.variant_name, &context.test_suite_name, counters.line);
    for line in &source_file.lines {
        suite.set_line(
            line.nr,
            CoverageInfo::from_missed(line.ci, line.mi),
            CoverageInfo::from_missed(line.cb, line.mb),
        );
    }

    Some(located.flattened_path)
}
