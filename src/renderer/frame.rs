//! The rendered output of one renderer pass: everything a page (or the
//! terminal) needs to draw the current state.

use std::collections::BTreeSet;
use std::fmt::{self, Write as _};

use crate::model::{coverage_for, CoverageInfo, VariantCoverage};

use super::entity::EntityKind;
use super::sort::{SortKey, SortState};
use super::state::{FlatLevel, ViewMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageLevel {
    High,
    Medium,
    Low,
    Missing,
}

impl CoverageLevel {
    /// Table cells: 80 and above is high, 60 and above medium.
    pub fn from_percent(percent: u32) -> Self {
        if percent >= 80 {
            CoverageLevel::High
        } else if percent >= 60 {
            CoverageLevel::Medium
        } else {
            CoverageLevel::Low
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            CoverageLevel::High => "coverage-high",
            CoverageLevel::Medium => "coverage-medium",
            CoverageLevel::Low => "coverage-low",
            CoverageLevel::Missing => "coverage-missing",
        }
    }
}

/// One counter of one variant, or a placeholder when the entity has no data
/// for that variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellValue {
    pub info: Option<CoverageInfo>,
}

impl CellValue {
    pub fn level(&self) -> CoverageLevel {
        self.info
            .map_or(CoverageLevel::Missing, |info| CoverageLevel::from_percent(info.percent))
    }

    pub fn percent_text(&self) -> String {
        self.info
            .map_or_else(|| "--".to_string(), |info| format!("{}%", info.percent))
    }

    pub fn ratio_text(&self) -> String {
        self.info
            .map_or_else(|| "0/0".to_string(), |info| format!("{}/{}", info.covered, info.total))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageCell {
    pub variant: String,
    pub instruction: CellValue,
    pub branch: CellValue,
}

impl CoverageCell {
    pub fn for_variant(coverages: &[VariantCoverage], variant: &str) -> Self {
        let found = coverage_for(coverages, variant);
        Self {
            variant: variant.to_string(),
            instruction: CellValue { info: found.map(|c| c.instruction) },
            branch: CellValue { info: found.map(|c| c.branch) },
        }
    }
}

/// Per-variant column group with the project-wide figure shown in the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnHeader {
    pub project: CoverageCell,
    pub instruction_key: SortKey,
    pub branch_key: SortKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreadcrumbTarget {
    Project,
    Module(String),
}

/// `target` is `None` for the current (last) crumb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub label: String,
    pub target: Option<BreadcrumbTarget>,
}

/// What opening a class asks the source viewer for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRequest {
    pub module: String,
    pub package: String,
    pub class: String,
    pub test_suite: String,
}

/// What clicking a row acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowTarget {
    Module { module: String },
    TestSuite { module: String, suite: String },
    Package { module: String, package: String },
    Class(SourceRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: String,
    pub parent_id: Option<String>,
    pub depth: usize,
    pub kind: EntityKind,
    pub name: String,
    /// Extra columns in flat package/class/suite tables (package, module).
    pub context: Vec<String>,
    pub cells: Vec<CoverageCell>,
    pub has_children: bool,
    pub expanded: bool,
    pub visible: bool,
    pub target: RowTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    pub label: String,
    pub value: String,
}

impl FilterOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    pub fn named(name: &str) -> Self {
        Self::new(name, name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantOption {
    pub name: String,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterOptions {
    pub modules: Vec<FilterOption>,
    pub test_suites: Vec<FilterOption>,
    pub packages: Vec<FilterOption>,
    pub classes: Vec<FilterOption>,
    pub variants: Vec<VariantOption>,
    /// Derived: every variant is checked.
    pub all_variants: bool,
}

impl FilterOptions {
    /// Button text for the variant dropdown.
    pub fn variant_label(&self) -> String {
        let checked: Vec<_> = self.variants.iter().filter(|v| v.checked).collect();
        if self.all_variants && !self.variants.is_empty() {
            "All".to_string()
        } else if checked.len() == 1 {
            checked[0].name.clone()
        } else {
            format!("{} Variants", checked.len())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub modules: usize,
    pub classes: usize,
    pub test_suites: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchItem {
    pub kind: EntityKind,
    pub name: String,
    /// Where the item lives, e.g. `app / com.x`.
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub title: String,
    pub time_stamp: String,
    pub mode: ViewMode,
    pub level: Option<FlatLevel>,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub name_header: String,
    pub context_headers: Vec<&'static str>,
    pub columns: Vec<ColumnHeader>,
    pub sort: SortState,
    pub rows: Vec<Row>,
    pub summary: Summary,
    pub filters: FilterOptions,
    pub search: String,
    pub suggestions: Vec<SearchItem>,
}

impl Frame {
    pub fn visible_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(|row| row.visible)
    }

    pub fn row_names(&self) -> Vec<&str> {
        self.visible_rows().map(|row| row.name.as_str()).collect()
    }

    fn indicator(&self, key: &SortKey) -> &'static str {
        if &self.sort.key == key {
            self.sort.order.indicator()
        } else {
            ""
        }
    }

    pub fn name_header_text(&self) -> String {
        format!("{} {}", self.name_header, self.indicator(&SortKey::Name))
            .trim_end()
            .to_string()
    }

    pub fn instruction_header_text(&self, column: &ColumnHeader) -> String {
        format!("Instruction {}", self.indicator(&column.instruction_key))
            .trim_end()
            .to_string()
    }

    pub fn branch_header_text(&self, column: &ColumnHeader) -> String {
        format!("Branch {}", self.indicator(&column.branch_key))
            .trim_end()
            .to_string()
    }

    pub fn variant_names(&self) -> BTreeSet<&str> {
        self.columns.iter().map(|c| c.project.variant.as_str()).collect()
    }
}

fn pad(out: &mut String, text: &str, width: usize) {
    write!(out, "{text:<width$}").unwrap();
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}  ({})", self.title, self.time_stamp)?;
        if !self.breadcrumbs.is_empty() {
            let crumbs: Vec<_> = self.breadcrumbs.iter().map(|b| b.label.as_str()).collect();
            writeln!(f, "{}", crumbs.join(" / "))?;
        }
        writeln!(
            f,
            "Modules: {}  Classes: {}  Test suites: {}",
            self.summary.modules, self.summary.classes, self.summary.test_suites
        )?;
        writeln!(f)?;

        let rows: Vec<&Row> = self.visible_rows().collect();
        let name_width = rows
            .iter()
            .map(|r| r.name.len() + r.depth * 2)
            .chain(std::iter::once(self.name_header_text().len()))
            .max()
            .unwrap_or(0)
            + 2;
        let context_widths: Vec<usize> = self
            .context_headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                rows.iter()
                    .filter_map(|r| r.context.get(i))
                    .map(String::len)
                    .chain(std::iter::once(header.len()))
                    .max()
                    .unwrap_or(0)
                    + 2
            })
            .collect();

        let mut header = String::new();
        pad(&mut header, &self.name_header_text(), name_width);
        for (title, width) in self.context_headers.iter().zip(&context_widths) {
            pad(&mut header, title, *width);
        }
        for column in &self.columns {
            let title = format!("{} {}", column.project.variant, column.project.instruction.percent_text());
            pad(&mut header, &title, 28);
        }
        writeln!(f, "{}", header.trim_end())?;

        let mut sub = String::new();
        pad(&mut sub, "", name_width);
        for width in &context_widths {
            pad(&mut sub, "", *width);
        }
        for column in &self.columns {
            pad(&mut sub, &self.instruction_header_text(column), 14);
            pad(&mut sub, &self.branch_header_text(column), 14);
        }
        writeln!(f, "{}", sub.trim_end())?;

        if rows.is_empty() {
            return writeln!(f, "No results found.");
        }
        for row in rows {
            let mut line = String::new();
            let marker = match (row.has_children, row.expanded) {
                (true, true) => "v ",
                (true, false) => "> ",
                _ => "  ",
            };
            let name = if self.mode == ViewMode::Tree {
                format!("{}{}{}", "  ".repeat(row.depth), marker, row.name)
            } else {
                row.name.clone()
            };
            pad(&mut line, &name, name_width + 2);
            for (value, width) in row.context.iter().zip(&context_widths) {
                pad(&mut line, value, *width);
            }
            for cell in &row.cells {
                let instruction = format!("{} {}", cell.instruction.percent_text(), cell.instruction.ratio_text());
                let branch = format!("{} {}", cell.branch.percent_text(), cell.branch.ratio_text());
                pad(&mut line, &instruction, 14);
                pad(&mut line, &branch, 14);
            }
            writeln!(f, "{}", line.trim_end())?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            writeln!(f, "Suggestions for \"{}\":", self.search)?;
            for item in &self.suggestions {
                writeln!(f, "  {} ({}) {}", item.name, item.kind.as_str(), item.location)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        assert_eq!(CoverageLevel::from_percent(80), CoverageLevel::High);
        assert_eq!(CoverageLevel::from_percent(79), CoverageLevel::Medium);
        assert_eq!(CoverageLevel::from_percent(60), CoverageLevel::Medium);
        assert_eq!(CoverageLevel::from_percent(59), CoverageLevel::Low);
    }

    #[test]
    fn test_missing_cell_placeholders() {
        let cell = CoverageCell::for_variant(&[], "debug");
        assert_eq!(cell.instruction.percent_text(), "--");
        assert_eq!(cell.instruction.ratio_text(), "0/0");
        assert_eq!(cell.branch.level(), CoverageLevel::Missing);

        let coverages = [VariantCoverage::new("debug", CoverageInfo::new(8, 10), CoverageInfo::new(1, 2))];
        let cell = CoverageCell::for_variant(&coverages, "debug");
        assert_eq!(cell.instruction.percent_text(), "80%");
        assert_eq!(cell.branch.ratio_text(), "1/2");
        assert_eq!(cell.branch.level(), CoverageLevel::Low);
    }

    #[test]
    fn test_variant_label() {
        let mut options = FilterOptions {
            variants: vec![
                VariantOption { name: "debug".into(), checked: true },
                VariantOption { name: "release".into(), checked: true },
            ],
            all_variants: true,
            ..Default::default()
        };
        assert_eq!(options.variant_label(), "All");
        options.variants[1].checked = false;
        options.all_variants = false;
        assert_eq!(options.variant_label(), "debug");
        options.variants[0].checked = false;
        assert_eq!(options.variant_label(), "0 Variants");
    }
}
