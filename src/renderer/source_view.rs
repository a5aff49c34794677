//! Per-class source viewer: loads the coverage payload of each variant's
//! source file once and lays out line-by-line coverage panes.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{ReportError, Result};
use crate::model::{
    ClassReport, CoverageInfo, CoverageReport, MethodReport, SourceFileCoverageReport, VariantCoverage,
    VariantCoverageDetails, AGGREGATED_TEST_SUITE,
};
use crate::output::source_payload_path;
use crate::payload;

use super::frame::{CoverageLevel, SourceRequest};

/// Loads the coverage payload for one flattened source path.
pub trait SourceFetcher {
    fn fetch(&mut self, path: &str) -> Result<SourceFileCoverageReport>;
}

/// Reads payloads from a generated report directory.
#[derive(Debug, Clone)]
pub struct ReportDirFetcher {
    root: PathBuf,
}

impl ReportDirFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SourceFetcher for ReportDirFetcher {
    fn fetch(&mut self, path: &str) -> Result<SourceFileCoverageReport> {
        let file = source_payload_path(&self.root, path);
        let script = std::fs::read_to_string(&file).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ReportError::SourceNotFound(file.clone()),
            _ => ReportError::Io(e),
        })?;
        let (key, report) = payload::decode_source_file(&script)?;
        if key != path {
            return Err(ReportError::Parse(format!(
                "{} holds coverage for {key}, expected {path}",
                file.display()
            )));
        }
        Ok(report)
    }
}

/// Line colouring, from the line's instruction counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    /// No instructions on this line.
    None,
    Covered,
    Partial,
    Uncovered,
}

impl LineStatus {
    pub fn from_info(info: &CoverageInfo) -> Self {
        if info.total == 0 {
            LineStatus::None
        } else if info.covered == 0 {
            LineStatus::Uncovered
        } else if info.covered == info.total {
            LineStatus::Covered
        } else {
            LineStatus::Partial
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            LineStatus::None => "",
            LineStatus::Covered => "cell-covered",
            LineStatus::Partial => "cell-partial",
            LineStatus::Uncovered => "cell-uncovered",
        }
    }

    fn marker(&self) -> char {
        match self {
            LineStatus::None => ' ',
            LineStatus::Covered => '+',
            LineStatus::Partial => '~',
            LineStatus::Uncovered => '-',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchColor {
    Green,
    Yellow,
    Red,
}

impl BranchColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchColor::Green => "green",
            BranchColor::Yellow => "yellow",
            BranchColor::Red => "red",
        }
    }
}

/// Diamond shown next to lines that have branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchMarker {
    pub covered: u64,
    pub total: u64,
}

impl BranchMarker {
    pub fn color(&self) -> BranchColor {
        if self.covered == self.total {
            BranchColor::Green
        } else if self.covered > 0 {
            BranchColor::Yellow
        } else {
            BranchColor::Red
        }
    }

    pub fn tooltip(&self) -> String {
        let missed = self.total.saturating_sub(self.covered);
        let noun = if self.total > 1 { "branches" } else { "branch" };
        format!("{missed} of {} {noun} missed", self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub number: u32,
    pub text: String,
    pub status: LineStatus,
    pub branch: Option<BranchMarker>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPane {
    pub variant: String,
    pub path: String,
    /// `variant (suite)`.
    pub title: String,
    pub summary: CoverageInfo,
    pub lines: Vec<SourceLine>,
}

impl LoadedPane {
    /// Header colour: only full coverage is green here.
    pub fn summary_level(&self) -> CoverageLevel {
        match self.summary.percent {
            100 => CoverageLevel::High,
            p if p >= 80 => CoverageLevel::Medium,
            _ => CoverageLevel::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantPane {
    Loaded(LoadedPane),
    /// The payload could not be fetched.
    Failed { variant: String, path: String, message: String },
    /// The payload has no data for this variant.
    NotLoaded { variant: String },
}

impl VariantPane {
    pub fn variant(&self) -> &str {
        match self {
            VariantPane::Loaded(pane) => &pane.variant,
            VariantPane::Failed { variant, .. } | VariantPane::NotLoaded { variant } => variant,
        }
    }
}

/// Where clicking a method should scroll a pane to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollTarget {
    pub variant: String,
    pub line_number: u32,
    pub highlight: bool,
}

/// A class opened in the source viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceView {
    pub module: String,
    pub package: String,
    pub class_name: String,
    pub source_file_name: String,
    pub test_suite: String,
    pub methods: Vec<MethodReport>,
    /// Variants with a source path, in declaration order.
    pub available_variants: Vec<String>,
    pub selected_variants: BTreeSet<String>,
    panes: Vec<VariantPane>,
}

impl SourceView {
    /// `Project / module / [suite /] package / File.kt`.
    pub fn breadcrumbs(&self) -> Vec<String> {
        let mut crumbs = vec!["Project".to_string(), self.module.clone()];
        if self.test_suite != AGGREGATED_TEST_SUITE {
            crumbs.push(self.test_suite.clone());
        }
        crumbs.push(self.package.clone());
        crumbs.push(self.source_file_name.clone());
        crumbs
    }

    /// Panes of the selected variants.
    pub fn panes(&self) -> impl Iterator<Item = &VariantPane> {
        self.panes
            .iter()
            .filter(|pane| self.selected_variants.contains(pane.variant()))
    }

    pub fn toggle_variant(&mut self, variant: &str, checked: bool) {
        if checked {
            if self.available_variants.iter().any(|v| v == variant) {
                self.selected_variants.insert(variant.to_string());
            }
        } else {
            self.selected_variants.remove(variant);
        }
    }

    pub fn set_all_variants(&mut self, checked: bool) {
        self.selected_variants = if checked {
            self.available_variants.iter().cloned().collect()
        } else {
            BTreeSet::new()
        };
    }

    pub fn all_variants_selected(&self) -> bool {
        !self.available_variants.is_empty() && self.selected_variants.len() == self.available_variants.len()
    }

    /// Methods whose names contain `term`, case-insensitively.
    pub fn find_methods(&self, term: &str) -> Vec<&MethodReport> {
        let term = term.to_lowercase();
        self.methods
            .iter()
            .filter(|m| m.name.to_lowercase().contains(&term))
            .collect()
    }

    /// Lines to centre on for a method, one per selected variant that has
    /// a loaded pane containing the line.
    pub fn navigate_to_method(&self, method: &str) -> Vec<ScrollTarget> {
        let Some(method) = self.methods.iter().find(|m| m.name == method) else {
            return Vec::new();
        };
        method
            .variant_line_numbers
            .iter()
            .filter(|mapping| self.selected_variants.contains(&mapping.variant_name))
            .filter(|mapping| {
                self.panes.iter().any(|pane| match pane {
                    VariantPane::Loaded(loaded) => {
                        loaded.variant == mapping.variant_name
                            && loaded.lines.iter().any(|l| l.number == mapping.line_number)
                    }
                    _ => false,
                })
            })
            .map(|mapping| ScrollTarget {
                variant: mapping.variant_name.clone(),
                line_number: mapping.line_number,
                highlight: true,
            })
            .collect()
    }
}

/// Pick coverage for the active suite, else `Aggregated`, else the first
/// suite with data.
pub fn resolve_coverage<'a>(
    details: Option<&'a VariantCoverageDetails>,
    active_suite: &str,
) -> Option<&'a VariantCoverage> {
    let suites = &details?.test_suite_coverages;
    suites
        .iter()
        .find(|s| s.test_suite_name == active_suite)
        .or_else(|| suites.iter().find(|s| s.test_suite_name == AGGREGATED_TEST_SUITE))
        .or_else(|| suites.first())
        .map(|s| &s.variant_coverage)
}

fn details_for<'a>(details: &'a [VariantCoverageDetails], variant: &str) -> Option<&'a VariantCoverageDetails> {
    details.iter().find(|d| d.variant_name == variant)
}

/// Builds source views, fetching each payload at most once.
pub struct SourceViewer<F> {
    fetcher: F,
    loaded: BTreeMap<String, SourceFileCoverageReport>,
}

impl<F: SourceFetcher> SourceViewer<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            loaded: BTreeMap::new(),
        }
    }

    pub fn is_loaded(&self, path: &str) -> bool {
        self.loaded.contains_key(path)
    }

    /// Find the requested class and open it. Suite-scoped classes are looked
    /// up in the suite first, then in the module's aggregated packages.
    pub fn open(&mut self, report: &CoverageReport, request: &SourceRequest) -> Option<SourceView> {
        let module = report.module(&request.module)?;
        let from_suite = module
            .test_suite(&request.test_suite)
            .and_then(|suite| suite.package(&request.package))
            .and_then(|package| package.class(&request.class));
        let class = from_suite.or_else(|| {
            module
                .package(&request.package)
                .and_then(|package| package.class(&request.class))
        })?;
        Some(self.open_class(class, &request.module, &request.test_suite))
    }

    pub fn open_class(&mut self, class: &ClassReport, module: &str, test_suite: &str) -> SourceView {
        let mut available_variants: Vec<String> = Vec::new();
        for entry in &class.variant_source_file_paths {
            if !available_variants.contains(&entry.variant_name) {
                available_variants.push(entry.variant_name.clone());
            }
        }

        let mut failures: BTreeMap<String, String> = BTreeMap::new();
        let paths: BTreeSet<&str> = class
            .variant_source_file_paths
            .iter()
            .map(|entry| entry.path.as_str())
            .collect();
        for path in paths {
            if self.loaded.contains_key(path) {
                continue;
            }
            debug!(path, "fetching source coverage");
            match self.fetcher.fetch(path) {
                Ok(report) => {
                    self.loaded.insert(path.to_string(), report);
                }
                Err(err) => {
                    warn!(path, error = %err, "failed to load source coverage");
                    failures.insert(path.to_string(), err.to_string());
                }
            }
        }

        let panes = available_variants
            .iter()
            .map(|variant| {
                // available_variants was built from these entries
                let path = class
                    .variant_source_file_paths
                    .iter()
                    .find(|entry| &entry.variant_name == variant)
                    .map(|entry| entry.path.clone())
                    .unwrap_or_default();
                if let Some(message) = failures.get(&path) {
                    return VariantPane::Failed {
                        variant: variant.clone(),
                        path,
                        message: message.clone(),
                    };
                }
                match self.loaded.get(&path) {
                    Some(report) => build_pane(report, variant, &path, test_suite),
                    None => VariantPane::NotLoaded {
                        variant: variant.clone(),
                    },
                }
            })
            .collect();

        SourceView {
            module: module.to_string(),
            package: class.package_name.clone(),
            class_name: class.name.clone(),
            source_file_name: class.source_file_name.clone(),
            test_suite: test_suite.to_string(),
            methods: class.methods.clone(),
            selected_variants: available_variants.iter().cloned().collect(),
            available_variants,
            panes,
        }
    }
}

fn build_pane(report: &SourceFileCoverageReport, variant: &str, path: &str, test_suite: &str) -> VariantPane {
    let Some(summary_details) = details_for(&report.variant_coverage_summary, variant) else {
        return VariantPane::NotLoaded {
            variant: variant.to_string(),
        };
    };
    let summary = resolve_coverage(Some(summary_details), test_suite)
        .map(|c| c.instruction)
        .unwrap_or(CoverageInfo::ZERO);

    let lines = report
        .lines_coverages
        .iter()
        .map(|line| {
            let coverage = resolve_coverage(details_for(&line.variant_coverage_details, variant), test_suite);
            let (status, branch) = match coverage {
                Some(c) => (
                    LineStatus::from_info(&c.instruction),
                    (c.branch.total > 0).then_some(BranchMarker {
                        covered: c.branch.covered,
                        total: c.branch.total,
                    }),
                ),
                None => (LineStatus::None, None),
            };
            SourceLine {
                number: line.line_number,
                text: line.line_text.clone(),
                status,
                branch,
            }
        })
        .collect();

    VariantPane::Loaded(LoadedPane {
        variant: variant.to_string(),
        path: path.to_string(),
        title: format!("{variant} ({test_suite})"),
        summary,
        lines,
    })
}

impl fmt::Display for SourceView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.breadcrumbs().join(" / "))?;
        if self.methods.is_empty() {
            writeln!(f, "No methods found")?;
        } else {
            writeln!(f, "Methods:")?;
            for method in &self.methods {
                let lines: Vec<String> = method
                    .variant_line_numbers
                    .iter()
                    .map(|l| format!("{}:{}", l.variant_name, l.line_number))
                    .collect();
                writeln!(f, "  {} [{}]", method.name, lines.join(", "))?;
            }
        }
        for pane in self.panes() {
            writeln!(f)?;
            match pane {
                VariantPane::Loaded(loaded) => {
                    writeln!(
                        f,
                        "== {}  {}%  {}/{} Instructions",
                        loaded.title, loaded.summary.percent, loaded.summary.covered, loaded.summary.total
                    )?;
                    for line in &loaded.lines {
                        let branch = line
                            .branch
                            .map(|b| format!("  <{}: {}>", b.color().as_str(), b.tooltip()))
                            .unwrap_or_default();
                        writeln!(f, "{:>5} {} {}{}", line.number, line.status.marker(), line.text, branch)?;
                    }
                }
                VariantPane::Failed { variant, path, message } => {
                    writeln!(f, "== {variant}")?;
                    writeln!(f, "Error loading source {path}: {message}")?;
                }
                VariantPane::NotLoaded { variant } => {
                    writeln!(f, "== {variant}")?;
                    writeln!(f, "Data not loaded for this variant.")?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LineCoverage, TestSuiteCoverage, VariantLineNumber, VariantSourceFilePath};

    #[derive(Default)]
    struct MapFetcher {
        reports: BTreeMap<String, SourceFileCoverageReport>,
        calls: Vec<String>,
    }

    impl SourceFetcher for MapFetcher {
        fn fetch(&mut self, path: &str) -> Result<SourceFileCoverageReport> {
            self.calls.push(path.to_string());
            self.reports
                .get(path)
                .cloned()
                .ok_or_else(|| ReportError::SourceNotFound(PathBuf::from(path)))
        }
    }

    fn suite(name: &str, variant: &str, covered: u64, total: u64, branch: (u64, u64)) -> TestSuiteCoverage {
        TestSuiteCoverage {
            test_suite_name: name.into(),
            variant_coverage: VariantCoverage::new(
                variant,
                CoverageInfo::new(covered, total),
                CoverageInfo::new(branch.0, branch.1),
            ),
        }
    }

    fn details(variant: &str, suites: Vec<TestSuiteCoverage>) -> VariantCoverageDetails {
        VariantCoverageDetails {
            variant_name: variant.into(),
            test_suite_coverages: suites,
        }
    }

    fn payload() -> SourceFileCoverageReport {
        SourceFileCoverageReport {
            variant_coverage_summary: vec![details(
                "debug",
                vec![suite("Aggregated", "debug", 3, 4, (0, 0)), suite("UnitTest", "debug", 2, 4, (0, 0))],
            )],
            lines_coverages: vec![
                LineCoverage {
                    line_number: 1,
                    line_text: "package com.x".into(),
                    variant_coverage_details: vec![details("debug", Vec::new())],
                },
                LineCoverage {
                    line_number: 2,
                    line_text: "fun run() = if (a) 1 else 2".into(),
                    variant_coverage_details: vec![details(
                        "debug",
                        vec![suite("Aggregated", "debug", 2, 2, (1, 2)), suite("UnitTest", "debug", 0, 2, (0, 2))],
                    )],
                },
                LineCoverage {
                    line_number: 3,
                    line_text: "fun other() = 3".into(),
                    variant_coverage_details: vec![details("debug", vec![suite("AndroidTest", "debug", 1, 2, (0, 0))])],
                },
            ],
        }
    }

    fn class() -> ClassReport {
        ClassReport {
            name: "Foo".into(),
            package_name: "com.x".into(),
            source_file_name: "Foo.kt".into(),
            test_suite_name: "Aggregated".into(),
            variant_coverages: Vec::new(),
            methods: vec![MethodReport {
                name: "run()I".into(),
                variant_line_numbers: vec![
                    VariantLineNumber { variant_name: "debug".into(), line_number: 2 },
                    VariantLineNumber { variant_name: "release".into(), line_number: 2 },
                ],
            }],
            variant_source_file_paths: vec![
                VariantSourceFilePath { variant_name: "debug".into(), path: "src/com/x/Foo.kt".into() },
                VariantSourceFilePath { variant_name: "release".into(), path: "src/release/com/x/Foo.kt".into() },
            ],
        }
    }

    fn viewer() -> SourceViewer<MapFetcher> {
        let mut fetcher = MapFetcher::default();
        fetcher.reports.insert("src/com/x/Foo.kt".into(), payload());
        SourceViewer::new(fetcher)
    }

    fn loaded<'a>(view: &'a SourceView, variant: &str) -> &'a LoadedPane {
        match view.panes().find(|p| p.variant() == variant) {
            Some(VariantPane::Loaded(pane)) => pane,
            other => panic!("expected loaded pane, got {other:?}"),
        }
    }

    #[test]
    fn test_suite_fallback_order() {
        let both = details(
            "debug",
            vec![suite("AndroidTest", "debug", 1, 1, (0, 0)), suite("Aggregated", "debug", 2, 2, (0, 0))],
        );
        let pick = |active: &str| resolve_coverage(Some(&both), active).unwrap().instruction.covered;
        assert_eq!(pick("AndroidTest"), 1);
        assert_eq!(pick("UnitTest"), 2);

        let only = details("debug", vec![suite("AndroidTest", "debug", 1, 1, (0, 0))]);
        assert_eq!(resolve_coverage(Some(&only), "UnitTest").unwrap().instruction.covered, 1);
        assert!(resolve_coverage(None, "UnitTest").is_none());
    }

    #[test]
    fn test_aggregated_pane() {
        let mut viewer = viewer();
        let view = viewer.open_class(&class(), "app", "Aggregated");
        let pane = loaded(&view, "debug");
        assert_eq!(pane.title, "debug (Aggregated)");
        assert_eq!(pane.summary.covered, 3);
        assert_eq!(pane.summary_level(), CoverageLevel::Low);

        assert_eq!(pane.lines[0].status, LineStatus::None);
        assert_eq!(pane.lines[1].status, LineStatus::Covered);
        let branch = pane.lines[1].branch.unwrap();
        assert_eq!(branch.color(), BranchColor::Yellow);
        assert_eq!(branch.tooltip(), "1 of 2 branches missed");
        assert_eq!(pane.lines[2].status, LineStatus::Partial);
        assert!(pane.lines[2].branch.is_none());
    }

    #[test]
    fn test_active_suite_preferred() {
        let mut viewer = viewer();
        let view = viewer.open_class(&class(), "app", "UnitTest");
        let pane = loaded(&view, "debug");
        assert_eq!(pane.title, "debug (UnitTest)");
        assert_eq!(pane.summary.covered, 2);
        assert_eq!(pane.lines[1].status, LineStatus::Uncovered);
        assert_eq!(pane.lines[1].branch.unwrap().color(), BranchColor::Red);
        assert_eq!(view.breadcrumbs(), ["Project", "app", "UnitTest", "com.x", "Foo.kt"]);
    }

    #[test]
    fn test_fetch_failure_is_isolated() {
        let mut viewer = viewer();
        let view = viewer.open_class(&class(), "app", "Aggregated");
        assert!(matches!(view.panes().find(|p| p.variant() == "release"), Some(VariantPane::Failed { .. })));
        assert!(matches!(view.panes().find(|p| p.variant() == "debug"), Some(VariantPane::Loaded(_))));
    }

    #[test]
    fn test_fetch_is_idempotent() {
        let mut viewer = viewer();
        viewer.open_class(&class(), "app", "Aggregated");
        viewer.open_class(&class(), "app", "UnitTest");
        let debug_fetches = viewer.fetcher.calls.iter().filter(|p| *p == "src/com/x/Foo.kt").count();
        assert_eq!(debug_fetches, 1);
        assert!(viewer.is_loaded("src/com/x/Foo.kt"));
        assert!(!viewer.is_loaded("src/release/com/x/Foo.kt"));
    }

    #[test]
    fn test_variant_selection_and_navigation() {
        let mut viewer = viewer();
        let mut view = viewer.open_class(&class(), "app", "Aggregated");
        assert!(view.all_variants_selected());

        let targets = view.navigate_to_method("run()I");
        assert_eq!(targets, vec![ScrollTarget { variant: "debug".into(), line_number: 2, highlight: true }]);

        view.toggle_variant("debug", false);
        assert!(!view.all_variants_selected());
        assert!(view.navigate_to_method("run()I").is_empty());
        assert_eq!(view.panes().count(), 1);

        view.set_all_variants(true);
        assert_eq!(view.panes().count(), 2);
        assert_eq!(view.find_methods("RUN").len(), 1);
        assert!(view.find_methods("missing").is_empty());
    }

    #[test]
    fn test_variant_missing_from_payload() {
        let mut fetcher = MapFetcher::default();
        fetcher.reports.insert("src/com/x/Foo.kt".into(), payload());
        fetcher.reports.insert("src/release/com/x/Foo.kt".into(), payload());
        let mut viewer = SourceViewer::new(fetcher);
        let view = viewer.open_class(&class(), "app", "Aggregated");
        assert!(matches!(
            view.panes().find(|p| p.variant() == "release"),
            Some(VariantPane::NotLoaded { .. })
        ));
    }

    #[test]
    fn test_line_status() {
        assert_eq!(LineStatus::from_info(&CoverageInfo::ZERO), LineStatus::None);
        assert_eq!(LineStatus::from_info(&CoverageInfo::new(0, 3)), LineStatus::Uncovered);
        assert_eq!(LineStatus::from_info(&CoverageInfo::new(3, 3)), LineStatus::Covered);
        assert_eq!(LineStatus::from_info(&CoverageInfo::new(1, 3)), LineStatus::Partial);
        assert_eq!(BranchMarker { covered: 0, total: 1 }.tooltip(), "1 of 1 branch missed");
    }

    #[test]
    fn test_branch_tooltip_with_covered_above_total() {
        let marker = BranchMarker { covered: 3, total: 2 };
        assert_eq!(marker.tooltip(), "0 of 2 branches missed");
    }
}
