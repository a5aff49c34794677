//! Interactive report renderer: holds the UI state for one loaded report and
//! re-derives a complete [`Frame`] from the immutable report on every call
//! to [`ReportRenderer::render`]. Handlers mutate state only.

pub mod entity;
pub mod frame;
pub mod sort;
pub mod source_view;
pub mod state;

use std::collections::BTreeSet;

use crate::model::{CoverageReport, AGGREGATED_TEST_SUITE};

use entity::{module_tree, prune_all, scoped_packages, test_suite_tree, Entity, EntityKind, TreeNode};
use frame::{
    Breadcrumb, BreadcrumbTarget, ColumnHeader, CoverageCell, FilterOption, FilterOptions, Frame, Row,
    RowTarget, SearchItem, SourceRequest, Summary, VariantOption,
};
use sort::{CoverageCounter, CoverageField, SortKey};
use state::{FlatLevel, PackageSelection, RendererState, Selector, ViewMode, ViewState};

pub use source_view::{ReportDirFetcher, SourceFetcher, SourceView, SourceViewer};

const MAX_SUGGESTIONS: usize = 10;

pub struct ReportRenderer<'r> {
    report: &'r CoverageReport,
    state: RendererState,
    search_index: Vec<SearchItem>,
}

impl<'r> ReportRenderer<'r> {
    /// Starts on the flat module table with every variant selected.
    pub fn new(report: &'r CoverageReport) -> Self {
        Self {
            report,
            state: RendererState::new(report.variant_names()),
            search_index: search_index(report, ViewMode::Flat),
        }
    }

    pub fn state(&self) -> &RendererState {
        &self.state
    }

    pub fn report(&self) -> &'r CoverageReport {
        self.report
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.state.view = match mode {
            ViewMode::Flat => ViewState::FlatModules,
            ViewMode::Tree => ViewState::Tree,
        };
        self.state.expanded.clear();
        self.search_index = search_index(self.report, mode);
    }

    /// Flat level toggle; clears any drill-down selection.
    pub fn show_level(&mut self, level: FlatLevel) {
        if self.state.view.mode() == ViewMode::Tree {
            self.search_index = search_index(self.report, ViewMode::Flat);
            self.state.expanded.clear();
        }
        self.state.view = ViewState::flat(level);
    }

    /// Row click. Drills down in flat mode, toggles expansion in tree mode,
    /// and returns a request when a class should open in the source viewer.
    pub fn click_row(&mut self, target: &RowTarget) -> Option<SourceRequest> {
        if let RowTarget::Class(request) = target {
            return Some(request.clone());
        }
        if self.state.view.mode() == ViewMode::Tree {
            let id = match target {
                RowTarget::Module { module } => module.clone(),
                RowTarget::Package { module, package } => format!("{module}/{package}"),
                RowTarget::TestSuite { module, suite } => format!("{module}/@{suite}"),
                RowTarget::Class(_) => return None,
            };
            self.toggle_row(&id);
            return None;
        }
        self.state.view = match target {
            RowTarget::Module { module } => ViewState::FlatPackages {
                module: Some(module.clone()),
            },
            RowTarget::TestSuite { module, suite } => {
                self.state.filters.test_suite = suite.clone();
                ViewState::FlatPackages {
                    module: Some(module.clone()),
                }
            }
            RowTarget::Package { module, package } => ViewState::FlatClasses {
                selection: Some(PackageSelection {
                    module: module.clone(),
                    package: package.clone(),
                }),
            },
            RowTarget::Class(_) => return None,
        };
        None
    }

    pub fn click_breadcrumb(&mut self, target: &BreadcrumbTarget) {
        self.state.view = match target {
            BreadcrumbTarget::Project => ViewState::FlatModules,
            BreadcrumbTarget::Module(module) => ViewState::FlatPackages {
                module: Some(module.clone()),
            },
        };
    }

    /// Expand a collapsed tree row (children only) or collapse an open one
    /// (with everything below it).
    pub fn toggle_row(&mut self, id: &str) {
        if self.state.is_expanded(id) {
            self.state.collapse(id);
        } else {
            self.state.expand(id);
        }
    }

    pub fn click_sort(&mut self, key: SortKey) {
        self.state.sort.click(key);
    }

    pub fn select_module(&mut self, module: Selector) {
        self.state.filters.module = module;
        self.state.filters.package = Selector::All;
        self.state.filters.class = Selector::All;
    }

    pub fn select_package(&mut self, package: Selector) {
        self.state.filters.package = package;
        self.state.filters.class = Selector::All;
    }

    pub fn select_class(&mut self, class: Selector) {
        self.state.filters.class = class;
    }

    /// `all` and `Aggregated` both clear the suite filter.
    pub fn select_test_suite(&mut self, suite: &str) {
        self.state.filters.test_suite = if suite == "all" || suite.is_empty() {
            AGGREGATED_TEST_SUITE.to_string()
        } else {
            suite.to_string()
        };
    }

    pub fn toggle_variant(&mut self, variant: &str, checked: bool) {
        if checked {
            self.state.filters.variants.insert(variant.to_string());
        } else {
            self.state.filters.variants.remove(variant);
        }
    }

    pub fn set_all_variants(&mut self, checked: bool) {
        self.state.filters.variants = if checked {
            self.report.variant_names().into_iter().collect()
        } else {
            BTreeSet::new()
        };
    }

    pub fn set_search(&mut self, term: &str) {
        self.state.filters.search = term.trim().to_lowercase();
    }

    pub fn render(&self) -> Frame {
        let filters = &self.state.filters;
        let tree = self.filtered_tree();

        let (rows, summary) = match &self.state.view {
            ViewState::Tree => {
                let mut tree = tree;
                sort_tree(&mut tree, self);
                let summary = Summary {
                    modules: tree.len(),
                    classes: tree.iter().map(|n| n.count(EntityKind::Class)).sum(),
                    test_suites: self.report.number_of_test_suites,
                };
                let mut rows = Vec::new();
                for node in &tree {
                    self.push_tree_rows(node, None, 0, true, &mut rows);
                }
                (rows, summary)
            }
            view => {
                let mut nodes = self.flat_nodes(view, tree);
                nodes.sort_by(|a, b| {
                    self.state
                        .sort
                        .compare((a.entity.name(), a.entity.coverages()), (b.entity.name(), b.entity.coverages()))
                });
                let modules: BTreeSet<&str> = nodes.iter().map(|n| n.entity.module_name()).collect();
                let summary = Summary {
                    modules: modules.len(),
                    classes: nodes.iter().map(|n| n.count(EntityKind::Class)).sum(),
                    test_suites: self.report.number_of_test_suites,
                };
                let rows = nodes.iter().map(|n| self.flat_row(&n.entity)).collect();
                (rows, summary)
            }
        };

        Frame {
            title: self.report.name.clone(),
            time_stamp: self.report.time_stamp.clone(),
            mode: self.state.view.mode(),
            level: self.state.view.level(),
            breadcrumbs: self.breadcrumbs(),
            name_header: match self.state.view.level() {
                Some(level) => level.title().to_string(),
                None => "Module".to_string(),
            },
            context_headers: match self.state.view.level() {
                Some(FlatLevel::Packages) | Some(FlatLevel::TestSuites) => vec!["Module"],
                Some(FlatLevel::Classes) => vec!["Package", "Module"],
                _ => Vec::new(),
            },
            columns: filters
                .variants
                .iter()
                .map(|variant| ColumnHeader {
                    project: CoverageCell::for_variant(&self.report.variant_coverages, variant),
                    instruction_key: SortKey::coverage(CoverageCounter::Instruction, variant.as_str(), CoverageField::Percent),
                    branch_key: SortKey::coverage(CoverageCounter::Branch, variant.as_str(), CoverageField::Percent),
                })
                .collect(),
            sort: self.state.sort.clone(),
            rows,
            summary,
            filters: self.filter_options(),
            search: filters.search.clone(),
            suggestions: self.suggestions(),
        }
    }

    /// Searchable items for the current mode whose names contain the term.
    pub fn suggestions(&self) -> Vec<SearchItem> {
        let term = &self.state.filters.search;
        if term.is_empty() {
            return Vec::new();
        }
        self.search_index
            .iter()
            .filter(|item| item.name.to_lowercase().contains(term.as_str()))
            .take(MAX_SUGGESTIONS)
            .cloned()
            .collect()
    }

    /// Module tree after the suite scope, search and selector filters.
    fn filtered_tree(&self) -> Vec<TreeNode<'r>> {
        let filters = &self.state.filters;
        let tree = prune_all(module_tree(self.report, &filters.test_suite), &filters.search);
        tree.into_iter()
            .filter(|module| filters.module.matches(module.entity.name()))
            .filter_map(|module| self.narrow_children(module))
            .collect()
    }

    /// Apply the package and class selectors below a module or suite node.
    fn narrow_children<'a>(&self, mut node: TreeNode<'a>) -> Option<TreeNode<'a>> {
        let filters = &self.state.filters;
        if filters.package == Selector::All && filters.class == Selector::All {
            return Some(node);
        }
        node.children = node
            .children
            .into_iter()
            .filter(|package| filters.package.matches(package.entity.name()))
            .filter_map(|mut package| {
                if filters.class != Selector::All {
                    package
                        .children
                        .retain(|class| filters.class.matches(class.entity.name()));
                    if package.children.is_empty() {
                        return None;
                    }
                }
                Some(package)
            })
            .collect();
        (!node.children.is_empty()).then_some(node)
    }

    fn flat_nodes(&self, view: &ViewState, tree: Vec<TreeNode<'r>>) -> Vec<TreeNode<'r>> {
        let in_module = |node: &TreeNode<'_>, module: &Option<String>| {
            module.as_deref().map_or(true, |m| node.entity.name() == m)
        };
        match view {
            ViewState::FlatModules | ViewState::Tree => tree,
            ViewState::FlatPackages { module } => tree
                .into_iter()
                .filter(|m| in_module(m, module))
                .flat_map(|m| m.children)
                .collect(),
            ViewState::FlatClasses { selection } => tree
                .into_iter()
                .filter(|m| selection.as_ref().map_or(true, |s| m.entity.name() == s.module))
                .flat_map(|m| m.children)
                .filter(|p| selection.as_ref().map_or(true, |s| p.entity.name() == s.package))
                .flat_map(|p| p.children)
                .collect(),
            ViewState::FlatTestSuites { module } => {
                let filters = &self.state.filters;
                self.report
                    .modules
                    .iter()
                    .filter(|m| filters.module.matches(&m.name))
                    .filter(|m| module.as_deref().map_or(true, |name| m.name == name))
                    .flat_map(|m| prune_all(test_suite_tree(m), &filters.search))
                    .filter_map(|suite| self.narrow_children(suite))
                    .collect()
            }
        }
    }

    fn flat_row(&self, entity: &Entity<'r>) -> Row {
        let (context, target) = match *entity {
            Entity::Module { report, .. } => (
                Vec::new(),
                RowTarget::Module {
                    module: report.name.clone(),
                },
            ),
            Entity::TestSuite(suite) => (
                vec![suite.module_name.clone()],
                RowTarget::TestSuite {
                    module: suite.module_name.clone(),
                    suite: suite.name.clone(),
                },
            ),
            Entity::Package { module, report } => (
                vec![module.to_string()],
                RowTarget::Package {
                    module: module.to_string(),
                    package: report.name.clone(),
                },
            ),
            Entity::Class { module, package, report } => (
                vec![package.to_string(), module.to_string()],
                RowTarget::Class(self.source_request(module, package, &report.name)),
            ),
        };
        Row {
            id: entity.id(),
            parent_id: None,
            depth: 0,
            kind: entity.kind(),
            name: entity.name().to_string(),
            context,
            cells: self.cells(entity),
            has_children: false,
            expanded: false,
            visible: true,
            target,
        }
    }

    fn push_tree_rows(
        &self,
        node: &TreeNode<'r>,
        parent_id: Option<&str>,
        depth: usize,
        visible: bool,
        rows: &mut Vec<Row>,
    ) {
        let entity = &node.entity;
        let id = entity.id();
        let has_children = !node.children.is_empty();
        let expanded = has_children && (self.state.filters.is_searching() || self.state.is_expanded(&id));
        let target = match *entity {
            Entity::Module { report, .. } => RowTarget::Module {
                module: report.name.clone(),
            },
            Entity::TestSuite(suite) => RowTarget::TestSuite {
                module: suite.module_name.clone(),
                suite: suite.name.clone(),
            },
            Entity::Package { module, report } => RowTarget::Package {
                module: module.to_string(),
                package: report.name.clone(),
            },
            Entity::Class { module, package, report } => {
                RowTarget::Class(self.source_request(module, package, &report.name))
            }
        };
        rows.push(Row {
            id: id.clone(),
            parent_id: parent_id.map(str::to_string),
            depth,
            kind: entity.kind(),
            name: entity.name().to_string(),
            context: Vec::new(),
            cells: self.cells(entity),
            has_children,
            expanded,
            visible,
            target,
        });
        for child in &node.children {
            self.push_tree_rows(child, Some(&id), depth + 1, visible && expanded, rows);
        }
    }

    fn cells(&self, entity: &Entity<'_>) -> Vec<CoverageCell> {
        self.state
            .filters
            .variants
            .iter()
            .map(|variant| CoverageCell::for_variant(entity.coverages(), variant))
            .collect()
    }

    fn source_request(&self, module: &str, package: &str, class: &str) -> SourceRequest {
        SourceRequest {
            module: module.to_string(),
            package: package.to_string(),
            class: class.to_string(),
            test_suite: self.state.filters.test_suite.clone(),
        }
    }

    fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        if self.state.view.mode() == ViewMode::Tree {
            return Vec::new();
        }
        let module = self.state.view.selected_module();
        let package = self.state.view.selected_package();
        let mut crumbs = vec![Breadcrumb {
            label: "Project".to_string(),
            target: module.map(|_| BreadcrumbTarget::Project),
        }];
        if let Some(module) = module {
            crumbs.push(Breadcrumb {
                label: module.to_string(),
                target: package.map(|_| BreadcrumbTarget::Module(module.to_string())),
            });
        }
        if let Some(package) = package {
            crumbs.push(Breadcrumb {
                label: package.to_string(),
                target: None,
            });
        }
        crumbs
    }

    /// Options for each dropdown, narrowed by the selections upstream of it.
    fn filter_options(&self) -> FilterOptions {
        let filters = &self.state.filters;
        let selected_module = self.state.view.selected_module();
        let selected_package = self.state.view.selected_package();

        let context_modules: Vec<_> = self
            .report
            .modules
            .iter()
            .filter(|m| selected_module.map_or(true, |s| m.name == s))
            .collect();

        let suites: BTreeSet<&str> = context_modules
            .iter()
            .flat_map(|m| m.test_suites.iter().map(|s| s.name.as_str()))
            .filter(|name| *name != AGGREGATED_TEST_SUITE)
            .collect();

        let context_packages: Vec<_> = context_modules
            .iter()
            .filter(|m| filters.module.matches(&m.name))
            .flat_map(|m| scoped_packages(m, &filters.test_suite))
            .filter(|p| selected_package.map_or(true, |s| p.name == s))
            .collect();
        let packages: BTreeSet<&str> = context_packages.iter().map(|p| p.name.as_str()).collect();
        let classes: BTreeSet<&str> = context_packages
            .iter()
            .filter(|p| filters.package.matches(&p.name))
            .flat_map(|p| p.classes.iter().map(|c| c.name.as_str()))
            .collect();

        let all_variants = self.report.variant_names();
        let variants: Vec<VariantOption> = all_variants
            .iter()
            .map(|name| VariantOption {
                name: name.clone(),
                checked: filters.variants.contains(name),
            })
            .collect();

        FilterOptions {
            modules: std::iter::once(FilterOption::new("All", "all"))
                .chain(context_modules.iter().map(|m| FilterOption::named(&m.name)))
                .collect(),
            test_suites: std::iter::once(FilterOption::new("All", AGGREGATED_TEST_SUITE))
                .chain(suites.into_iter().map(FilterOption::named))
                .collect(),
            packages: std::iter::once(FilterOption::new("All", "all"))
                .chain(packages.into_iter().map(FilterOption::named))
                .collect(),
            classes: std::iter::once(FilterOption::new("All", "all"))
                .chain(classes.into_iter().map(FilterOption::named))
                .collect(),
            all_variants: variants.iter().all(|v| v.checked),
            variants,
        }
    }
}

fn sort_tree(nodes: &mut [TreeNode<'_>], renderer: &ReportRenderer<'_>) {
    nodes.sort_by(|a, b| {
        renderer
            .state
            .sort
            .compare((a.entity.name(), a.entity.coverages()), (b.entity.name(), b.entity.coverages()))
    });
    for node in nodes.iter_mut() {
        sort_tree(&mut node.children, renderer);
    }
}

/// Everything the search box can suggest in a given mode.
fn search_index(report: &CoverageReport, mode: ViewMode) -> Vec<SearchItem> {
    let mut items = Vec::new();
    for module in &report.modules {
        items.push(SearchItem {
            kind: EntityKind::Module,
            name: module.name.clone(),
            location: String::new(),
        });
        if mode == ViewMode::Flat {
            for suite in &module.test_suites {
                items.push(SearchItem {
                    kind: EntityKind::TestSuite,
                    name: suite.name.clone(),
                    location: module.name.clone(),
                });
            }
        }
        // suite reports can carry packages the aggregate never saw
        let mut seen_packages = BTreeSet::new();
        let mut seen_classes = BTreeSet::new();
        let packages = module
            .packages
            .iter()
            .chain(module.test_suites.iter().flat_map(|suite| suite.packages.iter()));
        for package in packages {
            if seen_packages.insert(package.name.as_str()) {
                items.push(SearchItem {
                    kind: EntityKind::Package,
                    name: package.name.clone(),
                    location: module.name.clone(),
                });
            }
            for class in &package.classes {
                if !seen_classes.insert((package.name.as_str(), class.name.as_str())) {
                    continue;
                }
                items.push(SearchItem {
                    kind: EntityKind::Class,
                    name: class.name.clone(),
                    location: format!("{} / {}", module.name, package.name),
                });
            }
        }
    }
    items
}
