mod common;

use std::fs;

use covreport::cli::{cmd_generate, cmd_show, cmd_source, cmd_summary, source_request, ShowOptions};
use covreport::error::ReportError;
use covreport::generate::{generate, GenerateOptions};
use covreport::output::{self, source_payload_path};
use covreport::payload;
use covreport::renderer::sort::SortKey;
use covreport::renderer::state::{FlatLevel, ViewMode};

#[test]
fn writes_report_directory() {
    let (dir, summary) = common::generate_fixture_report();
    assert_eq!(summary.files, 3);
    assert_eq!(summary.modules, 2);
    assert_eq!(summary.source_files, 1);

    let out = dir.path();
    assert!(out.join("index.html").is_file());
    assert!(out.join("css/style.css").is_file());
    assert!(out.join("js/report.js").is_file());

    let data = fs::read_to_string(out.join("data/report-data.js")).unwrap();
    assert!(data.starts_with("const fullReport = "));
    let report = output::read_report(out).unwrap();
    assert_eq!(report.name, "Fixture Project");
    assert_eq!(report.time_stamp, "2026-01-01 10:00:00");

    let script = fs::read_to_string(source_payload_path(out, common::GREETER_PATH)).unwrap();
    assert!(script.starts_with("window.coverageData = window.coverageData || {};"));
    let (key, source) = payload::decode_source_file(&script).unwrap();
    assert_eq!(key, common::GREETER_PATH);
    assert_eq!(source.lines_coverages.len(), 9);
    assert_eq!(source.lines_coverages[0].line_text, "package com.example");

    let line_five = &source.lines_coverages[4].variant_coverage_details[0];
    let suites: Vec<_> = line_five.test_suite_coverages.iter().map(|s| s.test_suite_name.as_str()).collect();
    assert_eq!(suites, ["AndroidTest", "UnitTest"]);
    let line_two = &source.lines_coverages[1].variant_coverage_details[0];
    assert!(line_two.test_suite_coverages.is_empty());
}

#[test]
fn index_lists_modules() {
    let (dir, _) = common::generate_fixture_report();
    let html = fs::read_to_string(dir.path().join("index.html")).unwrap();
    assert!(html.contains("<title>Fixture Project</title>"));
    assert!(html.contains(r#"data-id="app""#));
    assert!(html.contains(r#"data-id="lib""#));
    assert!(html.contains("data/report-data.js"));
}

#[test]
fn malformed_report_aborts_generation() {
    let inputs = tempfile::tempdir().unwrap();
    fs::write(inputs.path().join("broken.xml"), "<report><package name=\"a\"></report>").unwrap();
    let out = tempfile::tempdir().unwrap();
    let options = GenerateOptions::new(vec![inputs.path().to_path_buf()], common::project_dir(), out.path());

    let err = generate(&options).unwrap_err();
    assert!(matches!(err, ReportError::Transform { .. }));
    assert!(err.to_string().contains("broken.xml"));
    assert!(!out.path().join("index.html").exists());
}

#[test]
fn generate_command_reports_counts() {
    let out = tempfile::tempdir().unwrap();
    let text = cmd_generate(&common::options(&out)).unwrap();
    assert!(text.contains("Processed 3 report file(s)"));
    assert!(text.contains("2 module(s), 1 source file(s)"));
}

#[test]
fn summary_command_lists_variants_and_modules() {
    let text = cmd_summary(&[common::reports_dir()], &common::project_dir()).unwrap();
    assert!(text.contains("Reports:      3"));
    assert!(text.contains("Test suites:  2"));
    assert!(text.contains("Instructions 13/20 (65%)"));
    assert!(text.contains("Branches 1/4 (25%)"));
    let lib_line = text.lines().find(|l| l.starts_with("lib")).unwrap();
    assert!(lib_line.contains("release"));
    assert!(lib_line.contains("3/4 (75%)"));
}

#[test]
fn summary_command_without_reports() {
    let empty = tempfile::tempdir().unwrap();
    let text = cmd_summary(&[empty.path().to_path_buf()], empty.path()).unwrap();
    assert!(text.contains("No coverage data found."));
}

#[test]
fn show_command_flat_levels() {
    let (dir, _) = common::generate_fixture_report();

    let modules = cmd_show(dir.path(), &ShowOptions::default()).unwrap();
    assert!(modules.contains("Fixture Project"));
    assert!(modules.contains("Modules: 2"));
    assert!(modules.lines().any(|l| l.starts_with("app")));
    assert!(modules.lines().any(|l| l.starts_with("lib")));

    let options = ShowOptions {
        level: Some(FlatLevel::Classes),
        test_suite: Some("UnitTest".to_string()),
        ..Default::default()
    };
    let classes = cmd_show(dir.path(), &options).unwrap();
    let greeter = classes.lines().find(|l| l.starts_with("Greeter")).unwrap();
    assert!(greeter.contains("80% 8/10"));
    assert!(greeter.contains("50% 1/2"));
    assert!(!classes.contains("Strings"));
}

#[test]
fn show_command_search_and_sort() {
    let (dir, _) = common::generate_fixture_report();

    let options = ShowOptions {
        level: Some(FlatLevel::Classes),
        search: Some("NOTHING".to_string()),
        ..Default::default()
    };
    let text = cmd_show(dir.path(), &options).unwrap();
    assert!(text.contains("No results found."));

    let options = ShowOptions {
        sort: Some(SortKey::Name),
        descending: true,
        ..Default::default()
    };
    let text = cmd_show(dir.path(), &options).unwrap();
    let lib = text.find("\nlib").unwrap();
    let app = text.find("\napp").unwrap();
    assert!(lib < app);
}

#[test]
fn show_command_tree_expansion() {
    let (dir, _) = common::generate_fixture_report();
    let options = ShowOptions {
        view: ViewMode::Tree,
        test_suite: Some("UnitTest".to_string()),
        expand: vec!["app".to_string()],
        ..Default::default()
    };
    let text = cmd_show(dir.path(), &options).unwrap();
    assert!(text.contains("v app"));
    assert!(text.contains("  > com.example"));
    assert!(!text.contains("Greeter"));

    let options = ShowOptions {
        view: ViewMode::Tree,
        level: Some(FlatLevel::Packages),
        ..Default::default()
    };
    assert!(cmd_show(dir.path(), &options).is_err());
}

#[test]
fn source_command_prints_panes() {
    let (dir, _) = common::generate_fixture_report();

    let request = source_request("app", "com.example", "Greeter", Some("UnitTest"));
    let text = cmd_source(dir.path(), &request).unwrap();
    assert!(text.contains("Project / app / UnitTest / com.example / Greeter.kt"));
    assert!(text.contains("== debug (UnitTest)  66%  2/3 Instructions"));
    assert!(text.contains("greet(Z)Ljava/lang/String; [debug:5]"));
    assert!(text.contains("    5 ~ ") || text.contains("    5 + "));
    assert!(text.contains("1 of 2 branches missed"));

    let missing = source_request("app", "com.example", "Nope", None);
    assert!(cmd_source(dir.path(), &missing).is_err());
}

#[test]
fn source_command_reports_unloadable_payload() {
    let (dir, _) = common::generate_fixture_report();
    fs::remove_file(source_payload_path(dir.path(), common::GREETER_PATH)).unwrap();

    let request = source_request("app", "com.example", "Greeter", Some("UnitTest"));
    let text = cmd_source(dir.path(), &request).unwrap();
    assert!(text.contains("Error loading source"));
}

#[test]
fn source_root_outside_project_stays_in_output() {
    let project = tempfile::tempdir().unwrap();
    let sources = tempfile::tempdir().unwrap();
    let inputs = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    fs::create_dir_all(sources.path().join("com/x")).unwrap();
    fs::write(sources.path().join("com/x/Foo.kt"), "package com.x\n\nclass Foo\n").unwrap();
    let xml = format!(
        r#"<report name="app">
  <properties>
    <property name="moduleName" value="app"/>
    <property name="variantName" value="debug"/>
    <property name="testSuiteName" value="UnitTest"/>
  </properties>
  <sources><file path="{}"/></sources>
  <package name="com/x">
    <class name="com/x/Foo" sourcefilename="Foo.kt">
      <counter type="INSTRUCTION" missed="0" covered="3"/>
    </class>
    <sourcefile name="Foo.kt">
      <line nr="3" mi="0" ci="3" mb="0" cb="0"/>
      <counter type="INSTRUCTION" missed="0" covered="3"/>
      <counter type="LINE" missed="0" covered="1"/>
    </sourcefile>
  </package>
</report>"#,
        sources.path().display()
    );
    fs::write(inputs.path().join("unit-test.xml"), xml).unwrap();

    let options = GenerateOptions::new(vec![inputs.path().to_path_buf()], project.path(), out.path());
    let summary = generate(&options).unwrap();
    assert_eq!(summary.source_files, 1);

    assert!(!sources.path().join("com/x/Foo.kt.json.js").exists());
    let flattened = format!("{}/com/x/Foo.kt", sources.path().display());
    let payload_path = source_payload_path(out.path(), &flattened);
    assert!(payload_path.starts_with(out.path().join("sourcefiles")));
    assert!(payload_path.is_file());

    let request = source_request("app", "com.x", "Foo", Some("UnitTest"));
    let text = cmd_source(out.path(), &request).unwrap();
    assert!(text.contains("class Foo"));
    assert!(!text.contains("Error loading source"));
}
