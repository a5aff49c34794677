//! Line-level coverage per source file, collected across variants and test
//! suites and turned into one `SourceFileCoverageReport` per file.

use std::collections::BTreeMap;

use crate::model::{
    CoverageInfo, LineCoverage, SourceFileCoverageReport, TestSuiteCoverage, VariantCoverage,
    VariantCoverageDetails,
};

/// Every located source file, keyed by its project-relative path.
#[derive(Debug, Clone, Default)]
pub struct SourceFileReportsBuilder {
    pub source_files: BTreeMap<String, SourceFileReportBuilder>,
}

impl SourceFileReportsBuilder {
    pub fn file_mut(&mut self, relative_path: &str, flattened_path: &str) -> &mut SourceFileReportBuilder {
        self.source_files
            .entry(relative_path.to_string())
            .or_insert_with(|| SourceFileReportBuilder::new(relative_path, flattened_path))
    }

    pub fn len(&self) -> usize {
        self.source_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source_files.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SourceFileReportBuilder {
    pub relative_path: String,
    pub flattened_path: String,
    pub variants: BTreeMap<String, VariantFileCoverageBuilder>,
}

impl SourceFileReportBuilder {
    pub fn new(relative_path: impl Into<String>, flattened_path: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            flattened_path: flattened_path.into(),
            variants: BTreeMap::new(),
        }
    }

    /// Get or create the bucket for `(variant, test_suite)`. `file_coverage`
    /// only applies when the bucket is new.
    pub fn test_suite_mut(
        &mut self,
        variant: &str,
        test_suite: &str,
        file_coverage: CoverageInfo,
    ) -> &mut TestSuiteFileCoverageBuilder {
        self.variants
            .entry(variant.to_string())
            .or_default()
            .test_suites
            .entry(test_suite.to_string())
            .or_insert_with(|| TestSuiteFileCoverageBuilder::new(file_coverage))
    }

    /// Combine the recorded coverage with the file's text, one entry per line.
    pub fn build<S: AsRef<str>>(&self, source_lines: &[S]) -> SourceFileCoverageReport {
        let variant_coverage_summary = self
            .variants
            .iter()
            .map(|(variant, builder)| builder.summary(variant))
            .collect();

        let lines_coverages = source_lines
            .iter()
            .enumerate()
            .map(|(index, text)| {
                let line_number = index as u32 + 1;
                LineCoverage {
                    line_number,
                    line_text: text.as_ref().to_string(),
                    variant_coverage_details: self
                        .variants
                        .iter()
                        .map(|(variant, builder)| builder.line_details(variant, line_number))
                        .collect(),
                }
            })
            .collect();

        SourceFileCoverageReport {
            variant_coverage_summary,
            lines_coverages,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VariantFileCoverageBuilder {
    pub test_suites: BTreeMap<String, TestSuiteFileCoverageBuilder>,
}

impl VariantFileCoverageBuilder {
    fn summary(&self, variant: &str) -> VariantCoverageDetails {
        VariantCoverageDetails {
            variant_name: variant.to_string(),
            test_suite_coverages: self
                .test_suites
                .iter()
                .map(|(suite, builder)| TestSuiteCoverage {
                    test_suite_name: suite.clone(),
                    // sourcefile elements carry no aggregated branch counter
                    variant_coverage: VariantCoverage::new(variant, builder.file_coverage, CoverageInfo::ZERO),
                })
                .collect(),
        }
    }

    fn line_details(&self, variant: &str, line_number: u32) -> VariantCoverageDetails {
        VariantCoverageDetails {
            variant_name: variant.to_string(),
            test_suite_coverages: self
                .test_suites
                .iter()
                .filter_map(|(suite, builder)| {
                    builder.lines.get(&line_number).map(|line| TestSuiteCoverage {
                        test_suite_name: suite.clone(),
                        variant_coverage: VariantCoverage::new(variant, line.instruction, line.branch),
                    })
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TestSuiteFileCoverageBuilder {
    /// The file's LINE counter.
    pub file_coverage: CoverageInfo,
    pub lines: BTreeMap<u32, LineCoverageBuilder>,
}

impl TestSuiteFileCoverageBuilder {
    pub fn new(file_coverage: CoverageInfo) -> Self {
        Self {
            file_coverage,
            lines: BTreeMap::new(),
        }
    }

    /// Record one `<line>`; a later record for the same line replaces it.
    pub fn set_line(&mut self, line_number: u32, instruction: CoverageInfo, branch: CoverageInfo) {
        self.lines
            .insert(line_number, LineCoverageBuilder { instruction, branch });
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineCoverageBuilder {
    pub instruction: CoverageInfo,
    pub branch: CoverageInfo,
}
