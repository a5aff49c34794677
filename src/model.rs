//! Immutable report model produced once the aggregation builders are frozen.
//! Everything here is serialized into the generated report artifacts and read
//! back by the renderer, so field names follow the camelCase wire shape.

use serde::{Deserialize, Serialize};

/// Test-suite name used for reports that aggregate every suite of a module.
pub const AGGREGATED_TEST_SUITE: &str = "Aggregated";
/// Module (and package/class) name used when a report leaves it empty.
pub const DEFAULT_NAME: &str = "default";
/// Variant name used when a report carries no variant property.
pub const UNKNOWN_VARIANT: &str = "unknown";

/// Compute an integer coverage percentage, truncating toward zero and
/// returning 0 when the total is zero.
#[must_use]
pub fn calculate_percent(covered: u64, total: u64) -> u32 {
    if total == 0 {
        0
    } else {
        (covered.saturating_mul(100) / total) as u32
    }
}

/// Covered/total figures for one counter kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CoverageInfo {
    pub percent: u32,
    pub covered: u64,
    pub total: u64,
}

impl CoverageInfo {
    pub const ZERO: CoverageInfo = CoverageInfo {
        percent: 0,
        covered: 0,
        total: 0,
    };

    /// Build from covered/total, clamping `covered` so it never exceeds `total`.
    #[must_use]
    pub fn new(covered: u64, total: u64) -> Self {
        let covered = covered.min(total);
        Self {
            percent: calculate_percent(covered, total),
            covered,
            total,
        }
    }

    #[must_use]
    pub fn from_missed(covered: u64, missed: u64) -> Self {
        Self::new(covered, covered.saturating_add(missed))
    }

    #[must_use]
    pub fn missed(&self) -> u64 {
        self.total.saturating_sub(self.covered)
    }

    /// Sum two figures and recompute the percentage from the sums.
    #[must_use]
    pub fn merged(&self, other: &CoverageInfo) -> CoverageInfo {
        CoverageInfo::new(
            self.covered.saturating_add(other.covered),
            self.total.saturating_add(other.total),
        )
    }
}

/// Instruction and branch coverage of one entity for one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantCoverage {
    pub variant_name: String,
    pub instruction: CoverageInfo,
    pub branch: CoverageInfo,
}

impl VariantCoverage {
    pub fn new(variant_name: impl Into<String>, instruction: CoverageInfo, branch: CoverageInfo) -> Self {
        Self {
            variant_name: variant_name.into(),
            instruction,
            branch,
        }
    }

    pub fn empty(variant_name: impl Into<String>) -> Self {
        Self::new(variant_name, CoverageInfo::ZERO, CoverageInfo::ZERO)
    }
}

/// First coverage entry recorded for `variant`, if any.
#[must_use]
pub fn coverage_for<'a>(coverages: &'a [VariantCoverage], variant: &str) -> Option<&'a VariantCoverage> {
    coverages.iter().find(|c| c.variant_name == variant)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantLineNumber {
    pub variant_name: String,
    pub line_number: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantSourceFilePath {
    pub variant_name: String,
    pub path: String,
}

/// Root of the assembled report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    pub name: String,
    pub time_stamp: String,
    pub modules: Vec<ModuleReport>,
    /// Project-wide coverage per variant, summed across every parsed file.
    pub variant_coverages: Vec<VariantCoverage>,
    pub number_of_test_suites: usize,
}

impl CoverageReport {
    pub fn module(&self, name: &str) -> Option<&ModuleReport> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// All variant names, in report order.
    pub fn variant_names(&self) -> Vec<String> {
        self.variant_coverages
            .iter()
            .map(|v| v.variant_name.clone())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleReport {
    pub name: String,
    pub variant_coverages: Vec<VariantCoverage>,
    /// Packages from the module's aggregated reports.
    pub packages: Vec<PackageReport>,
    pub test_suites: Vec<TestSuiteReport>,
}

impl ModuleReport {
    pub fn test_suite(&self, name: &str) -> Option<&TestSuiteReport> {
        self.test_suites.iter().find(|t| t.name == name)
    }

    pub fn package(&self, name: &str) -> Option<&PackageReport> {
        self.packages.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuiteReport {
    pub name: String,
    pub module_name: String,
    pub variant_coverages: Vec<VariantCoverage>,
    pub packages: Vec<PackageReport>,
}

impl TestSuiteReport {
    pub fn package(&self, name: &str) -> Option<&PackageReport> {
        self.packages.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageReport {
    pub name: String,
    pub module_name: String,
    pub test_suite_name: String,
    pub variant_coverages: Vec<VariantCoverage>,
    pub classes: Vec<ClassReport>,
}

impl PackageReport {
    pub fn class(&self, name: &str) -> Option<&ClassReport> {
        self.classes.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassReport {
    pub name: String,
    pub package_name: String,
    pub source_file_name: String,
    pub test_suite_name: String,
    pub variant_coverages: Vec<VariantCoverage>,
    pub methods: Vec<MethodReport>,
    pub variant_source_file_paths: Vec<VariantSourceFilePath>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodReport {
    pub name: String,
    pub variant_line_numbers: Vec<VariantLineNumber>,
}

/// Line-level payload for one source file, fetched lazily by the source viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFileCoverageReport {
    pub variant_coverage_summary: Vec<VariantCoverageDetails>,
    pub lines_coverages: Vec<LineCoverage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineCoverage {
    pub line_number: u32,
    pub line_text: String,
    pub variant_coverage_details: Vec<VariantCoverageDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantCoverageDetails {
    pub variant_name: String,
    pub test_suite_coverages: Vec<TestSuiteCoverage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuiteCoverage {
    pub test_suite_name: String,
    pub variant_coverage: VariantCoverage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_percent_truncates() {
        assert_eq!(calculate_percent(2, 3), 66);
        assert_eq!(calculate_percent(13, 20), 65);
        assert_eq!(calculate_percent(1, 1), 100);
    }

    #[test]
    fn test_calculate_percent_zero_total() {
        assert_eq!(calculate_percent(0, 0), 0);
    }

    #[test]
    fn test_coverage_info_merged_recomputes_percent() {
        let a = CoverageInfo::from_missed(8, 2);
        let b = CoverageInfo::from_missed(5, 5);
        let sum = a.merged(&b);
        assert_eq!(sum, CoverageInfo { percent: 65, covered: 13, total: 20 });
    }

    #[test]
    fn test_coverage_info_clamps_covered() {
        let info = CoverageInfo::new(7, 5);
        assert_eq!(info.covered, 5);
        assert_eq!(info.missed(), 0);
        assert_eq!(info.percent, 100);
    }

    #[test]
    fn test_missed_saturates_on_inconsistent_payload() {
        let info: CoverageInfo = serde_json::from_str(r#"{"percent":100,"covered":9,"total":4}"#).unwrap();
        assert_eq!(info.missed(), 0);
    }

    #[test]
    fn test_serializes_camel_case() {
        let vc = VariantCoverage::new("debug", CoverageInfo::new(1, 2), CoverageInfo::ZERO);
        let json = serde_json::to_string(&vc).unwrap();
        assert!(json.contains("\"variantName\":\"debug\""));
        assert!(json.contains("\"percent\":50"));
    }
}
