//! Static HTML snapshot of a rendered [`Frame`], written as the report's
//! `index.html`. The page loads the generated report data next to it.

use std::fmt::Write;

use crate::renderer::frame::{CellValue, FilterOption, Frame, Row};

pub const STYLE_CSS: &str = r#"body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
    margin: 0;
    color: #1f2328;
    background: #f6f8fa;
}
header {
    padding: 16px 24px;
    background: #24292f;
    color: #ffffff;
}
header .timestamp {
    font-size: 12px;
    color: #afb8c1;
}
main {
    padding: 16px 24px;
}
.breadcrumbs {
    margin-bottom: 12px;
}
.summary span {
    margin-right: 16px;
}
.filters select {
    margin-right: 8px;
}
table {
    border-collapse: collapse;
    width: 100%;
    background: #ffffff;
}
th, td {
    padding: 4px 8px;
    border: 1px solid #d0d7de;
    text-align: left;
}
th.sortable {
    cursor: pointer;
}
td.number {
    text-align: right;
    font-variant-numeric: tabular-nums;
}
tr.hidden {
    display: none;
}
.coverage-high { background: #dafbe1; }
.coverage-medium { background: #fff8c5; }
.coverage-low { background: #ffebe9; }
.coverage-missing { color: #8c959f; }
.cell-covered { background: #dafbe1; }
.cell-partial { background: #fff8c5; }
.cell-uncovered { background: #ffebe9; }
.empty {
    padding: 24px;
    text-align: center;
    color: #57606a;
}
.toolbar button {
    margin: 0 4px 12px 0;
}
.toolbar button.active {
    font-weight: bold;
}
.filters label {
    margin-left: 8px;
}
tr[data-action="row"] {
    cursor: pointer;
}
.methods a {
    margin-right: 12px;
}
.pane {
    margin-top: 16px;
}
table.source pre {
    margin: 0;
}
tr.highlight {
    outline: 2px solid #0969da;
}
.branch-green { color: #1a7f37; }
.branch-yellow { color: #9a6700; }
.branch-red { color: #cf222e; }
.error { color: #cf222e; }
"#;

/// Browser renderer that takes over the page once `fullReport` is loaded.
pub const REPORT_JS: &str = include_str!("assets/report.js");

/// Render a frame as a complete HTML page. The markup is what readers see
/// before `js/report.js` runs, or without scripts at all.
pub fn render_index(frame: &Frame) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link rel="stylesheet" href="css/style.css">
    <script src="data/report-data.js"></script>
    <script src="js/report.js" defer></script>
</head>
<body>
    <header>
        <h1>{title}</h1>
        <div class="timestamp">{time_stamp}</div>
    </header>
    <main>
        {breadcrumbs}
        {summary}
        {filters}
        {table}
    </main>
</body>
</html>
"#,
        title = escape(&frame.title),
        time_stamp = escape(&frame.time_stamp),
        breadcrumbs = render_breadcrumbs(frame),
        summary = render_summary(frame),
        filters = render_filters(frame),
        table = render_table(frame),
    )
}

fn render_breadcrumbs(frame: &Frame) -> String {
    let crumbs: Vec<String> = frame
        .breadcrumbs
        .iter()
        .map(|crumb| match crumb.target {
            Some(_) => format!(r##"<a href="#">{}</a>"##, escape(&crumb.label)),
            None => format!("<span>{}</span>", escape(&crumb.label)),
        })
        .collect();
    format!(r#"<nav class="breadcrumbs">{}</nav>"#, crumbs.join(" / "))
}

fn render_summary(frame: &Frame) -> String {
    format!(
        r#"<div class="summary"><span>Modules: {}</span><span>Classes: {}</span><span>Test suites: {}</span></div>"#,
        frame.summary.modules, frame.summary.classes, frame.summary.test_suites
    )
}

fn render_select(out: &mut String, name: &str, options: &[FilterOption]) {
    write!(out, r#"<select name="{name}">"#).unwrap();
    for option in options {
        write!(
            out,
            r#"<option value="{}">{}</option>"#,
            escape(&option.value),
            escape(&option.label)
        )
        .unwrap();
    }
    out.push_str("</select>");
}

fn render_filters(frame: &Frame) -> String {
    let mut out = String::from(r#"<div class="filters">"#);
    render_select(&mut out, "module", &frame.filters.modules);
    render_select(&mut out, "testSuite", &frame.filters.test_suites);
    render_select(&mut out, "package", &frame.filters.packages);
    render_select(&mut out, "class", &frame.filters.classes);
    write!(
        out,
        r#"<span class="variants">Variants: {}</span>"#,
        escape(&frame.filters.variant_label())
    )
    .unwrap();
    out.push_str("</div>");
    out
}

fn render_cell(out: &mut String, value: &CellValue) {
    write!(
        out,
        r#"<td class="number {}">{} <small>{}</small></td>"#,
        value.level().css_class(),
        value.percent_text(),
        value.ratio_text()
    )
    .unwrap();
}

fn render_row(out: &mut String, row: &Row) {
    let class = if row.visible { "" } else { " class=\"hidden\"" };
    let parent = row
        .parent_id
        .as_deref()
        .map(|id| format!(r#" data-parent="{}""#, escape(id)))
        .unwrap_or_default();
    write!(
        out,
        r#"<tr data-id="{}" data-kind="{}"{parent}{class}>"#,
        escape(&row.id),
        row.kind.as_str()
    )
    .unwrap();
    let toggle = match (row.has_children, row.expanded) {
        (true, true) => "▾ ",
        (true, false) => "▸ ",
        _ => "",
    };
    write!(
        out,
        r#"<td style="padding-left: {}px">{toggle}{}</td>"#,
        8 + row.depth * 16,
        escape(&row.name)
    )
    .unwrap();
    for context in &row.context {
        write!(out, "<td>{}</td>", escape(context)).unwrap();
    }
    for cell in &row.cells {
        render_cell(out, &cell.instruction);
        render_cell(out, &cell.branch);
    }
    out.push_str("</tr>\n");
}

fn render_table(frame: &Frame) -> String {
    let mut out = String::from("<table>\n<thead>\n<tr>");
    write!(
        out,
        r#"<th rowspan="2" class="sortable">{}</th>"#,
        escape(&frame.name_header_text())
    )
    .unwrap();
    for header in &frame.context_headers {
        write!(out, r#"<th rowspan="2">{}</th>"#, escape(header)).unwrap();
    }
    for column in &frame.columns {
        write!(
            out,
            r#"<th colspan="2">{} <span class="{}">{}</span></th>"#,
            escape(&column.project.variant),
            column.project.instruction.level().css_class(),
            column.project.instruction.percent_text()
        )
        .unwrap();
    }
    out.push_str("</tr>\n<tr>");
    for column in &frame.columns {
        write!(
            out,
            r#"<th class="sortable" data-sort="{}">{}</th><th class="sortable" data-sort="{}">{}</th>"#,
            escape(&column.instruction_key.to_string()),
            frame.instruction_header_text(column),
            escape(&column.branch_key.to_string()),
            frame.branch_header_text(column)
        )
        .unwrap();
    }
    out.push_str("</tr>\n</thead>\n<tbody>\n");
    for row in &frame.rows {
        render_row(&mut out, row);
    }
    out.push_str("</tbody>\n</table>");
    if frame.visible_rows().next().is_none() {
        out.push_str(r#"<div class="empty">No results found.</div>"#);
    }
    out
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
