//! Command handler functions for the covreport CLI.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::generate::{self, GenerateOptions};
use crate::model::{coverage_for, CoverageInfo, AGGREGATED_TEST_SUITE};
use crate::output;
use crate::renderer::frame::SourceRequest;
use crate::renderer::sort::SortKey;
use crate::renderer::state::{FlatLevel, Selector, ViewMode};
use crate::renderer::{ReportDirFetcher, ReportRenderer, SourceViewer};

pub fn cmd_generate(options: &GenerateOptions) -> Result<String> {
    let summary = generate::generate(options)
        .with_context(|| format!("Failed to generate report into {}", options.output_dir.display()))?;
    Ok(format!(
        "Processed {} report file(s) → {} module(s), {} source file(s) written to {}\n",
        summary.files,
        summary.modules,
        summary.source_files,
        options.output_dir.display(),
    ))
}

fn coverage_text(info: &CoverageInfo) -> String {
    format!("{}/{} ({}%)", info.covered, info.total, info.percent)
}

pub fn cmd_summary(inputs: &[PathBuf], project_dir: &Path) -> Result<String> {
    let files = generate::collect_report_files(inputs)?;
    let ctx = generate::aggregate(&files, project_dir, generate::DEFAULT_REPORT_NAME, "")?;
    let report = ctx.coverage.build();

    let mut out = String::new();
    writeln!(out, "Reports:      {}", files.len()).unwrap();
    writeln!(out, "Modules:      {}", report.modules.len()).unwrap();
    writeln!(out, "Test suites:  {}", report.number_of_test_suites).unwrap();
    if report.variant_coverages.is_empty() {
        out.push_str("No coverage data found.\n");
        return Ok(out);
    }

    out.push('\n');
    for variant in &report.variant_coverages {
        writeln!(
            out,
            "{:<12}  Instructions {}  Branches {}",
            variant.variant_name,
            coverage_text(&variant.instruction),
            coverage_text(&variant.branch)
        )
        .unwrap();
    }

    out.push('\n');
    writeln!(out, "{:<30} {:<12} {:>20} {:>20}", "MODULE", "VARIANT", "INSTRUCTIONS", "BRANCHES").unwrap();
    writeln!(out, "{}", "-".repeat(85)).unwrap();
    for module in &report.modules {
        for variant in report.variant_names() {
            let Some(coverage) = coverage_for(&module.variant_coverages, &variant) else {
                continue;
            };
            writeln!(
                out,
                "{:<30} {:<12} {:>20} {:>20}",
                module.name,
                variant,
                coverage_text(&coverage.instruction),
                coverage_text(&coverage.branch)
            )
            .unwrap();
        }
    }
    Ok(out)
}

/// Renderer state to apply before printing a frame.
#[derive(Debug, Clone)]
pub struct ShowOptions {
    pub view: ViewMode,
    pub level: Option<FlatLevel>,
    pub module: Option<String>,
    pub test_suite: Option<String>,
    pub package: Option<String>,
    pub class: Option<String>,
    /// Empty keeps every variant.
    pub variants: Vec<String>,
    pub search: Option<String>,
    pub sort: Option<SortKey>,
    pub descending: bool,
    /// Tree row ids to expand.
    pub expand: Vec<String>,
}

impl Default for ShowOptions {
    fn default() -> Self {
        Self {
            view: ViewMode::Flat,
            level: None,
            module: None,
            test_suite: None,
            package: None,
            class: None,
            variants: Vec::new(),
            search: None,
            sort: None,
            descending: false,
            expand: Vec::new(),
        }
    }
}

pub fn cmd_show(report_dir: &Path, options: &ShowOptions) -> Result<String> {
    let report = output::read_report(report_dir)
        .with_context(|| format!("Failed to read report from {}", report_dir.display()))?;
    let mut renderer = ReportRenderer::new(&report);

    renderer.set_view_mode(options.view);
    if let Some(level) = options.level {
        if options.view == ViewMode::Tree {
            bail!("--level only applies to the flat view");
        }
        renderer.show_level(level);
    }
    if let Some(suite) = &options.test_suite {
        renderer.select_test_suite(suite);
    }
    renderer.select_module(Selector::from_option(options.module.clone()));
    renderer.select_package(Selector::from_option(options.package.clone()));
    renderer.select_class(Selector::from_option(options.class.clone()));
    if !options.variants.is_empty() {
        renderer.set_all_variants(false);
        for variant in &options.variants {
            renderer.toggle_variant(variant, true);
        }
    }
    if let Some(term) = &options.search {
        renderer.set_search(term);
    }
    if let Some(key) = &options.sort {
        renderer.click_sort(key.clone());
        // a fresh key starts ascending, and name is already the default
        if *key == SortKey::Name {
            renderer.click_sort(key.clone());
        }
        if options.descending {
            renderer.click_sort(key.clone());
        }
    } else if options.descending {
        renderer.click_sort(SortKey::Name);
    }
    for id in &options.expand {
        renderer.toggle_row(id);
    }

    Ok(renderer.render().to_string())
}

pub fn cmd_source(report_dir: &Path, request: &SourceRequest) -> Result<String> {
    let report = output::read_report(report_dir)
        .with_context(|| format!("Failed to read report from {}", report_dir.display()))?;
    let mut viewer = SourceViewer::new(ReportDirFetcher::new(report_dir));
    let Some(view) = viewer.open(&report, request) else {
        bail!(
            "Class {} not found in {} / {}",
            request.class,
            request.module,
            request.package
        );
    };
    Ok(view.to_string())
}

/// Build a source request, treating a missing suite as the aggregate.
pub fn source_request(module: &str, package: &str, class: &str, test_suite: Option<&str>) -> SourceRequest {
    SourceRequest {
        module: module.to_string(),
        package: package.to_string(),
        class: class.to_string(),
        test_suite: test_suite.unwrap_or(AGGREGATED_TEST_SUITE).to_string(),
    }
}
