//! Mutable aggregation graph filled in by the transformer, one report file
//! at a time, and frozen into the report model with `build()`.
//!
//! Every keyed collection is get-or-create: a second report describing the
//! same module, suite, package, class or method appends to the existing
//! builder. Maps are ordered by name so the assembled report is stable.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{
    ClassReport, CoverageInfo, CoverageReport, MethodReport, ModuleReport, PackageReport,
    TestSuiteReport, VariantCoverage, VariantLineNumber, VariantSourceFilePath,
};

#[derive(Debug, Clone, Default)]
pub struct CoverageReportBuilder {
    pub name: String,
    pub time_stamp: String,
    pub modules: BTreeMap<String, ModuleReportBuilder>,
    /// Project coverage per variant, summed over every transformed file.
    pub aggregated_variant_coverages: BTreeMap<String, VariantCoverage>,
    /// `(test suite, module)` pairs; suites of the same name in different
    /// modules count separately.
    pub all_test_suite_names: BTreeSet<(String, String)>,
}

impl CoverageReportBuilder {
    pub fn new(name: impl Into<String>, time_stamp: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            time_stamp: time_stamp.into(),
            ..Default::default()
        }
    }

    pub fn module_mut(&mut self, name: &str) -> &mut ModuleReportBuilder {
        self.modules
            .entry(name.to_string())
            .or_insert_with(|| ModuleReportBuilder::new(name))
    }

    pub fn record_test_suite(&mut self, test_suite_name: &str, module_name: &str) {
        self.all_test_suite_names
            .insert((test_suite_name.to_string(), module_name.to_string()));
    }

    /// Fold one file's overall counters into the project total for `variant`.
    pub fn add_to_aggregate(&mut self, variant: &str, instruction: &CoverageInfo, branch: &CoverageInfo) {
        let entry = self
            .aggregated_variant_coverages
            .entry(variant.to_string())
            .or_insert_with(|| VariantCoverage::empty(variant));
        entry.instruction = entry.instruction.merged(instruction);
        entry.branch = entry.branch.merged(branch);
    }

    pub fn build(&self) -> CoverageReport {
        CoverageReport {
            name: self.name.clone(),
            time_stamp: self.time_stamp.clone(),
            modules: self.modules.values().map(ModuleReportBuilder::build).collect(),
            variant_coverages: self.aggregated_variant_coverages.values().cloned().collect(),
            number_of_test_suites: self.all_test_suite_names.len(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModuleReportBuilder {
    pub name: String,
    pub variant_coverages: Vec<VariantCoverage>,
    pub packages: BTreeMap<String, PackageReportBuilder>,
    pub test_suites: BTreeMap<String, TestSuiteReportBuilder>,
}

impl ModuleReportBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn test_suite_mut(&mut self, name: &str) -> &mut TestSuiteReportBuilder {
        let module_name = &self.name;
        self.test_suites
            .entry(name.to_string())
            .or_insert_with(|| TestSuiteReportBuilder::new(name, module_name.as_str()))
    }

    pub fn package_mut(&mut self, name: &str, test_suite_name: &str) -> &mut PackageReportBuilder {
        package_entry(&mut self.packages, name, &self.name, test_suite_name)
    }

    pub fn build(&self) -> ModuleReport {
        ModuleReport {
            name: self.name.clone(),
            variant_coverages: self.variant_coverages.clone(),
            packages: self.packages.values().map(PackageReportBuilder::build).collect(),
            test_suites: self.test_suites.values().map(TestSuiteReportBuilder::build).collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TestSuiteReportBuilder {
    pub name: String,
    pub module_name: String,
    pub variant_coverages: Vec<VariantCoverage>,
    pub packages: BTreeMap<String, PackageReportBuilder>,
}

impl TestSuiteReportBuilder {
    pub fn new(name: impl Into<String>, module_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module_name: module_name.into(),
            ..Default::default()
        }
    }

    pub fn package_mut(&mut self, name: &str) -> &mut PackageReportBuilder {
        package_entry(&mut self.packages, name, &self.module_name, &self.name)
    }

    pub fn build(&self) -> TestSuiteReport {
        TestSuiteReport {
            name: self.name.clone(),
            module_name: self.module_name.clone(),
            variant_coverages: self.variant_coverages.clone(),
            packages: self.packages.values().map(PackageReportBuilder::build).collect(),
        }
    }
}

fn package_entry<'a>(
    packages: &'a mut BTreeMap<String, PackageReportBuilder>,
    name: &str,
    module_name: &str,
    test_suite_name: &str,
) -> &'a mut PackageReportBuilder {
    packages
        .entry(name.to_string())
        .or_insert_with(|| PackageReportBuilder::new(name, module_name, test_suite_name))
}

#[derive(Debug, Clone, Default)]
pub struct PackageReportBuilder {
    pub name: String,
    pub module_name: String,
    pub test_suite_name: String,
    pub variant_coverages: Vec<VariantCoverage>,
    pub classes: BTreeMap<String, ClassReportBuilder>,
}

impl PackageReportBuilder {
    pub fn new(
        name: impl Into<String>,
        module_name: impl Into<String>,
        test_suite_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            module_name: module_name.into(),
            test_suite_name: test_suite_name.into(),
            ..Default::default()
        }
    }

    /// Get or create the class builder. The source file name is fixed by
    /// whichever report created the class first.
    pub fn class_mut(&mut self, name: &str, source_file_name: &str) -> &mut ClassReportBuilder {
        let package_name = &self.name;
        let test_suite_name = &self.test_suite_name;
        self.classes.entry(name.to_string()).or_insert_with(|| {
            ClassReportBuilder::new(name, package_name.as_str(), source_file_name, test_suite_name.as_str())
        })
    }

    /// Bind each class to the flattened path of its source file, as found
    /// while processing this package's `<sourcefile>` entries.
    pub fn attach_source_paths(&mut self, variant: &str, paths: &BTreeMap<String, String>) {
        for class in self.classes.values_mut() {
            if let Some(path) = paths.get(&class.source_file_name) {
                class.variant_source_file_paths.push(VariantSourceFilePath {
                    variant_name: variant.to_string(),
                    path: path.clone(),
                });
            }
        }
    }

    pub fn build(&self) -> PackageReport {
        PackageReport {
            name: self.name.clone(),
            module_name: self.module_name.clone(),
            test_suite_name: self.test_suite_name.clone(),
            variant_coverages: self.variant_coverages.clone(),
            classes: self.classes.values().map(ClassReportBuilder::build).collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClassReportBuilder {
    pub name: String,
    pub package_name: String,
    pub source_file_name: String,
    pub test_suite_name: String,
    pub variant_coverages: Vec<VariantCoverage>,
    pub methods: BTreeMap<String, MethodReportBuilder>,
    pub variant_source_file_paths: Vec<VariantSourceFilePath>,
}

impl ClassReportBuilder {
    pub fn new(
        name: impl Into<String>,
        package_name: impl Into<String>,
        source_file_name: impl Into<String>,
        test_suite_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            package_name: package_name.into(),
            source_file_name: source_file_name.into(),
            test_suite_name: test_suite_name.into(),
            ..Default::default()
        }
    }

    pub fn method_mut(&mut self, name: &str) -> &mut MethodReportBuilder {
        self.methods
            .entry(name.to_string())
            .or_insert_with(|| MethodReportBuilder::new(name))
    }

    pub fn build(&self) -> ClassReport {
        ClassReport {
            name: self.name.clone(),
            package_name: self.package_name.clone(),
            source_file_name: self.source_file_name.clone(),
            test_suite_name: self.test_suite_name.clone(),
            variant_coverages: self.variant_coverages.clone(),
            methods: self.methods.values().map(MethodReportBuilder::build).collect(),
            variant_source_file_paths: self.variant_source_file_paths.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MethodReportBuilder {
    pub name: String,
    pub variant_line_numbers: Vec<VariantLineNumber>,
}

impl MethodReportBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variant_line_numbers: Vec::new(),
        }
    }

    pub fn add_line(&mut self, variant: &str, line_number: u32) {
        self.variant_line_numbers.push(VariantLineNumber {
            variant_name: variant.to_string(),
            line_number,
        });
    }

    pub fn build(&self) -> MethodReport {
        MethodReport {
            name: self.name.clone(),
            variant_line_numbers: self.variant_line_numbers.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut report = CoverageReportBuilder::new("Project", "now");
        report.module_mut("app").variant_coverages.push(VariantCoverage::empty("debug"));
        report.module_mut("app").variant_coverages.push(VariantCoverage::empty("debug"));
        assert_eq!(report.modules.len(), 1);
        assert_eq!(report.modules["app"].variant_coverages.len(), 2);

        let module = report.module_mut("app");
        module.package_mut("com.x", "Aggregated").class_mut("Foo", "Foo.kt");
        module.package_mut("com.x", "Aggregated").class_mut("Foo", "Other.kt");
        let class = &module.packages["com.x"].classes["Foo"];
        assert_eq!(class.source_file_name, "Foo.kt");
        assert_eq!(class.package_name, "com.x");
    }

    #[test]
    fn test_aggregate_sums_and_recomputes_percent() {
        let mut report = CoverageReportBuilder::new("Project", "now");
        report.add_to_aggregate("debug", &CoverageInfo::from_missed(8, 2), &CoverageInfo::from_missed(1, 1));
        report.add_to_aggregate("debug", &CoverageInfo::from_missed(5, 5), &CoverageInfo::ZERO);
        let debug = &report.aggregated_variant_coverages["debug"];
        assert_eq!(debug.instruction, CoverageInfo { percent: 65, covered: 13, total: 20 });
        assert_eq!(debug.branch, CoverageInfo { percent: 50, covered: 1, total: 2 });
    }

    #[test]
    fn test_test_suites_counted_per_module() {
        let mut report = CoverageReportBuilder::new("Project", "now");
        report.record_test_suite("UnitTest", "app");
        report.record_test_suite("UnitTest", "lib");
        report.record_test_suite("UnitTest", "app");
        assert_eq!(report.build().number_of_test_suites, 2);
    }

    #[test]
    fn test_suite_packages_carry_suite_context() {
        let mut module = ModuleReportBuilder::new("app");
        let package = module.test_suite_mut("UnitTest").package_mut("com.x");
        assert_eq!(package.module_name, "app");
        assert_eq!(package.test_suite_name, "UnitTest");
        assert!(module.packages.is_empty());
    }

    #[test]
    fn test_attach_source_paths_matches_by_file_name() {
        let mut package = PackageReportBuilder::new("com.x", "app", "Aggregated");
        package.class_mut("Foo", "Foo.kt");
        package.class_mut("Bar", "Bar.kt");
        let paths = BTreeMap::from([("Foo.kt".to_string(), "src/com/x/Foo.kt".to_string())]);
        package.attach_source_paths("debug", &paths);

        assert_eq!(
            package.classes["Foo"].variant_source_file_paths,
            vec![VariantSourceFilePath { variant_name: "debug".into(), path: "src/com/x/Foo.kt".into() }]
        );
        assert!(package.classes["Bar"].variant_source_file_paths.is_empty());
    }

    #[test]
    fn test_build_orders_by_name() {
        let mut report = CoverageReportBuilder::new("Project", "now");
        report.module_mut("lib");
        let app = report.module_mut("app");
        app.package_mut("b.pkg", "Aggregated");
        app.package_mut("a.pkg", "Aggregated");
        let method = app.package_mut("a.pkg", "Aggregated").class_mut("Foo", "Foo.kt").method_mut("run()V");
        method.add_line("debug", 12);

        let built = report.build();
        let names: Vec<_> = built.modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["app", "lib"]);
        let packages: Vec<_> = built.modules[0].packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(packages, ["a.pkg", "b.pkg"]);
        assert_eq!(
            built.modules[0].packages[0].classes[0].methods[0].variant_line_numbers[0].line_number,
            12
        );
    }
}
