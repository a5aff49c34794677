mod common;

use covreport::output;
use covreport::renderer::frame::{BreadcrumbTarget, RowTarget};
use covreport::renderer::source_view::VariantPane;
use covreport::renderer::state::{FlatLevel, ViewMode};
use covreport::renderer::{ReportDirFetcher, ReportRenderer, SourceViewer};

#[test]
fn drill_down_to_source() {
    let (dir, _) = common::generate_fixture_report();
    let report = output::read_report(dir.path()).unwrap();
    let mut renderer = ReportRenderer::new(&report);

    let frame = renderer.render();
    assert_eq!(frame.row_names(), ["app", "lib"]);
    assert_eq!(frame.summary.test_suites, 2);

    renderer.select_test_suite("UnitTest");
    let frame = renderer.render();
    let app = frame.rows.iter().find(|r| r.name == "app").unwrap();
    assert_eq!(app.cells[0].instruction.percent_text(), "80%");
    renderer.click_row(&app.target.clone());

    let frame = renderer.render();
    assert_eq!(frame.level, Some(FlatLevel::Packages));
    assert_eq!(frame.row_names(), ["com.example"]);
    let labels: Vec<_> = frame.breadcrumbs.iter().map(|b| b.label.as_str()).collect();
    assert_eq!(labels, ["Project", "app"]);

    let package = frame.rows[0].target.clone();
    assert!(renderer.click_row(&package).is_none());
    let frame = renderer.render();
    assert_eq!(frame.row_names(), ["Greeter"]);

    let request = renderer.click_row(&frame.rows[0].target).unwrap();
    assert_eq!(request.test_suite, "UnitTest");
    let mut viewer = SourceViewer::new(ReportDirFetcher::new(dir.path()));
    let view = viewer.open(&report, &request).unwrap();
    match view.panes().next() {
        Some(VariantPane::Loaded(pane)) => {
            assert_eq!(pane.title, "debug (UnitTest)");
            assert_eq!(pane.lines.len(), 9);
        }
        other => panic!("expected a loaded pane, got {other:?}"),
    }
    assert!(viewer.is_loaded(common::GREETER_PATH));

    renderer.click_breadcrumb(&BreadcrumbTarget::Project);
    assert_eq!(renderer.render().level, Some(FlatLevel::Modules));
}

#[test]
fn test_suite_level_scopes_suite_filter() {
    let (dir, _) = common::generate_fixture_report();
    let report = output::read_report(dir.path()).unwrap();
    let mut renderer = ReportRenderer::new(&report);

    renderer.show_level(FlatLevel::TestSuites);
    let frame = renderer.render();
    assert_eq!(frame.row_names(), ["AndroidTest", "UnitTest"]);

    let android = frame.rows[0].target.clone();
    assert!(matches!(android, RowTarget::TestSuite { .. }));
    renderer.click_row(&android);
    assert_eq!(renderer.state().filters.test_suite, "AndroidTest");
    let frame = renderer.render();
    assert_eq!(frame.row_names(), ["com.example"]);
    assert_eq!(frame.rows[0].cells[0].instruction.percent_text(), "50%");
}

#[test]
fn tree_search_expands_matches() {
    let (dir, _) = common::generate_fixture_report();
    let report = output::read_report(dir.path()).unwrap();
    let mut renderer = ReportRenderer::new(&report);

    renderer.set_view_mode(ViewMode::Tree);
    renderer.set_search("strings");
    let frame = renderer.render();
    assert_eq!(frame.row_names(), ["lib", "com.example.util", "Strings"]);
    assert!(frame.suggestions.iter().any(|s| s.name == "Strings"));
}
