use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::ReportError;
use crate::model::AGGREGATED_TEST_SUITE;

use super::sort::SortState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Flat,
    Tree,
}

impl FromStr for ViewMode {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(ViewMode::Flat),
            "tree" => Ok(ViewMode::Tree),
            other => Err(ReportError::Other(format!("unknown view mode: {other}"))),
        }
    }
}

/// The entity level a flat table lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlatLevel {
    Modules,
    TestSuites,
    Packages,
    Classes,
}

impl FlatLevel {
    pub fn title(&self) -> &'static str {
        match self {
            FlatLevel::Modules => "Modules",
            FlatLevel::TestSuites => "Test Suites",
            FlatLevel::Packages => "Packages",
            FlatLevel::Classes => "Classes",
        }
    }
}

impl FromStr for FlatLevel {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "modules" => Ok(FlatLevel::Modules),
            "test-suites" => Ok(FlatLevel::TestSuites),
            "packages" => Ok(FlatLevel::Packages),
            "classes" => Ok(FlatLevel::Classes),
            other => Err(ReportError::Other(format!("unknown level: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSelection {
    pub module: String,
    pub package: String,
}

/// Where the user is. Each variant carries only the selection that makes
/// sense at that level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    FlatModules,
    FlatTestSuites { module: Option<String> },
    FlatPackages { module: Option<String> },
    FlatClasses { selection: Option<PackageSelection> },
    Tree,
}

impl ViewState {
    /// Unselected state for a flat level.
    pub fn flat(level: FlatLevel) -> Self {
        match level {
            FlatLevel::Modules => ViewState::FlatModules,
            FlatLevel::TestSuites => ViewState::FlatTestSuites { module: None },
            FlatLevel::Packages => ViewState::FlatPackages { module: None },
            FlatLevel::Classes => ViewState::FlatClasses { selection: None },
        }
    }

    pub fn mode(&self) -> ViewMode {
        match self {
            ViewState::Tree => ViewMode::Tree,
            _ => ViewMode::Flat,
        }
    }

    pub fn level(&self) -> Option<FlatLevel> {
        match self {
            ViewState::FlatModules => Some(FlatLevel::Modules),
            ViewState::FlatTestSuites { .. } => Some(FlatLevel::TestSuites),
            ViewState::FlatPackages { .. } => Some(FlatLevel::Packages),
            ViewState::FlatClasses { .. } => Some(FlatLevel::Classes),
            ViewState::Tree => None,
        }
    }

    pub fn selected_module(&self) -> Option<&str> {
        match self {
            ViewState::FlatTestSuites { module } | ViewState::FlatPackages { module } => module.as_deref(),
            ViewState::FlatClasses { selection } => selection.as_ref().map(|s| s.module.as_str()),
            _ => None,
        }
    }

    pub fn selected_package(&self) -> Option<&str> {
        match self {
            ViewState::FlatClasses { selection } => selection.as_ref().map(|s| s.package.as_str()),
            _ => None,
        }
    }
}

/// A module, package or class filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selector {
    #[default]
    All,
    Named(String),
}

impl Selector {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Selector::All => true,
            Selector::Named(wanted) => wanted == name,
        }
    }

    pub fn from_option(name: Option<String>) -> Self {
        name.map_or(Selector::All, Selector::Named)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::All => f.write_str("All"),
            Selector::Named(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filters {
    pub module: Selector,
    /// `Aggregated` means every suite.
    pub test_suite: String,
    pub package: Selector,
    pub class: Selector,
    pub variants: BTreeSet<String>,
    /// Lower-cased, trimmed search term.
    pub search: String,
}

impl Filters {
    pub fn new(variants: impl IntoIterator<Item = String>) -> Self {
        Self {
            module: Selector::All,
            test_suite: AGGREGATED_TEST_SUITE.to_string(),
            package: Selector::All,
            class: Selector::All,
            variants: variants.into_iter().collect(),
            search: String::new(),
        }
    }

    pub fn is_searching(&self) -> bool {
        !self.search.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererState {
    pub view: ViewState,
    pub filters: Filters,
    pub sort: SortState,
    /// Expanded tree row ids.
    pub expanded: BTreeSet<String>,
}

impl RendererState {
    pub fn new(variants: impl IntoIterator<Item = String>) -> Self {
        Self {
            view: ViewState::FlatModules,
            filters: Filters::new(variants),
            sort: SortState::default(),
            expanded: BTreeSet::new(),
        }
    }

    pub fn expand(&mut self, id: &str) {
        self.expanded.insert(id.to_string());
    }

    /// Collapse a row and, transitively, every row below it.
    pub fn collapse(&mut self, id: &str) {
        let prefix = format!("{id}/");
        self.expanded
            .retain(|open| open != id && !open.starts_with(&prefix));
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_is_recursive() {
        let mut state = RendererState::new(Vec::new());
        for id in ["app", "app/com.x", "app/com.x/Foo", "application", "lib"] {
            state.expand(id);
        }
        state.collapse("app");
        assert!(!state.is_expanded("app"));
        assert!(!state.is_expanded("app/com.x"));
        assert!(!state.is_expanded("app/com.x/Foo"));
        assert!(state.is_expanded("application"));
        assert!(state.is_expanded("lib"));
    }

    #[test]
    fn test_view_state_selection() {
        let view = ViewState::FlatClasses {
            selection: Some(PackageSelection { module: "app".into(), package: "com.x".into() }),
        };
        assert_eq!(view.selected_module(), Some("app"));
        assert_eq!(view.selected_package(), Some("com.x"));
        assert_eq!(view.mode(), ViewMode::Flat);
        assert_eq!(ViewState::Tree.level(), None);
        assert_eq!(ViewState::flat(FlatLevel::Packages), ViewState::FlatPackages { module: None });
    }

    #[test]
    fn test_filter_defaults() {
        let filters = Filters::new(vec!["debug".to_string()]);
        assert_eq!(filters.module, Selector::All);
        assert_eq!(filters.test_suite, "Aggregated");
        assert!(filters.variants.contains("debug"));
        assert!(!filters.is_searching());
    }

    #[test]
    fn test_parse_levels() {
        assert_eq!("test-suites".parse::<FlatLevel>().unwrap(), FlatLevel::TestSuites);
        assert_eq!("tree".parse::<ViewMode>().unwrap(), ViewMode::Tree);
        assert!("grid".parse::<ViewMode>().is_err());
    }
}
