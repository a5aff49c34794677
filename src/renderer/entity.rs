//! Typed view over the report tree, scoped to a test-suite filter, plus the
//! search pruning shared by the flat and tree views.

use crate::model::{
    ClassReport, CoverageReport, ModuleReport, PackageReport, TestSuiteReport, VariantCoverage,
    AGGREGATED_TEST_SUITE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Module,
    TestSuite,
    Package,
    Class,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Module => "module",
            EntityKind::TestSuite => "testSuite",
            EntityKind::Package => "package",
            EntityKind::Class => "class",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Entity<'a> {
    /// `coverages` is the module's coverage under the active suite filter.
    Module {
        report: &'a ModuleReport,
        coverages: &'a [VariantCoverage],
    },
    TestSuite(&'a TestSuiteReport),
    Package {
        module: &'a str,
        report: &'a PackageReport,
    },
    Class {
        module: &'a str,
        package: &'a str,
        report: &'a ClassReport,
    },
}

impl<'a> Entity<'a> {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Module { .. } => EntityKind::Module,
            Entity::TestSuite(_) => EntityKind::TestSuite,
            Entity::Package { .. } => EntityKind::Package,
            Entity::Class { .. } => EntityKind::Class,
        }
    }

    pub fn name(&self) -> &'a str {
        match *self {
            Entity::Module { report, .. } => &report.name,
            Entity::TestSuite(suite) => &suite.name,
            Entity::Package { report, .. } => &report.name,
            Entity::Class { report, .. } => &report.name,
        }
    }

    pub fn coverages(&self) -> &'a [VariantCoverage] {
        match *self {
            Entity::Module { coverages, .. } => coverages,
            Entity::TestSuite(suite) => &suite.variant_coverages,
            Entity::Package { report, .. } => &report.variant_coverages,
            Entity::Class { report, .. } => &report.variant_coverages,
        }
    }

    pub fn module_name(&self) -> &'a str {
        match *self {
            Entity::Module { report, .. } => &report.name,
            Entity::TestSuite(suite) => &suite.module_name,
            Entity::Package { module, .. } | Entity::Class { module, .. } => module,
        }
    }

    pub fn package_name(&self) -> Option<&'a str> {
        match *self {
            Entity::Package { report, .. } => Some(report.name.as_str()),
            Entity::Class { package, .. } => Some(package),
            _ => None,
        }
    }

    /// Path-style id, unique across the tree: `app`, `app/com.x`,
    /// `app/com.x/Foo`. Suites use `app/@UnitTest`.
    pub fn id(&self) -> String {
        match *self {
            Entity::Module { report, .. } => report.name.clone(),
            Entity::TestSuite(suite) => format!("{}/@{}", suite.module_name, suite.name),
            Entity::Package { module, report } => format!("{module}/{}", report.name),
            Entity::Class { module, package, report } => format!("{module}/{package}/{}", report.name),
        }
    }

    pub fn matches(&self, term: &str) -> bool {
        term.is_empty() || self.name().to_lowercase().contains(term)
    }
}

/// Packages visible under a module for the given suite filter.
pub fn scoped_packages<'a>(module: &'a ModuleReport, test_suite: &str) -> &'a [PackageReport] {
    if test_suite == AGGREGATED_TEST_SUITE {
        &module.packages
    } else {
        module
            .test_suite(test_suite)
            .map(|suite| suite.packages.as_slice())
            .unwrap_or(&[])
    }
}

/// A module's own coverage for the given suite filter.
pub fn scoped_coverages<'a>(module: &'a ModuleReport, test_suite: &str) -> &'a [VariantCoverage] {
    if test_suite == AGGREGATED_TEST_SUITE {
        &module.variant_coverages
    } else {
        module
            .test_suite(test_suite)
            .map(|suite| suite.variant_coverages.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone)]
pub struct TreeNode<'a> {
    pub entity: Entity<'a>,
    pub children: Vec<TreeNode<'a>>,
}

impl<'a> TreeNode<'a> {
    pub fn leaf(entity: Entity<'a>) -> Self {
        Self {
            entity,
            children: Vec::new(),
        }
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        let own = usize::from(self.entity.kind() == kind);
        own + self.children.iter().map(|c| c.count(kind)).sum::<usize>()
    }

    /// Depth-first list of every entity in this subtree, self first.
    pub fn flatten(&self) -> Vec<Entity<'a>> {
        let mut out = vec![self.entity];
        for child in &self.children {
            out.extend(child.flatten());
        }
        out
    }
}

fn package_nodes<'a>(module: &'a str, packages: &'a [PackageReport]) -> Vec<TreeNode<'a>> {
    packages
        .iter()
        .map(|package| TreeNode {
            entity: Entity::Package { module, report: package },
            children: package
                .classes
                .iter()
                .map(|class| {
                    TreeNode::leaf(Entity::Class {
                        module,
                        package: &package.name,
                        report: class,
                    })
                })
                .collect(),
        })
        .collect()
}

/// Module → package → class tree for one suite filter.
pub fn module_tree<'a>(report: &'a CoverageReport, test_suite: &str) -> Vec<TreeNode<'a>> {
    report
        .modules
        .iter()
        .map(|module| TreeNode {
            entity: Entity::Module {
                report: module,
                coverages: scoped_coverages(module, test_suite),
            },
            children: package_nodes(&module.name, scoped_packages(module, test_suite)),
        })
        .collect()
}

/// Test suite → package → class trees for one module.
pub fn test_suite_tree(module: &ModuleReport) -> Vec<TreeNode<'_>> {
    module
        .test_suites
        .iter()
        .map(|suite| TreeNode {
            entity: Entity::TestSuite(suite),
            children: package_nodes(&module.name, &suite.packages),
        })
        .collect()
}

/// Keep a node iff its own name matches (with its whole subtree) or some
/// descendant matches (with only the matching branches).
pub fn prune<'a>(node: TreeNode<'a>, term: &str) -> Option<TreeNode<'a>> {
    if node.entity.matches(term) {
        return Some(node);
    }
    let children: Vec<_> = node
        .children
        .into_iter()
        .filter_map(|child| prune(child, term))
        .collect();
    if children.is_empty() {
        None
    } else {
        Some(TreeNode {
            entity: node.entity,
            children,
        })
    }
}

pub fn prune_all<'a>(nodes: Vec<TreeNode<'a>>, term: &str) -> Vec<TreeNode<'a>> {
    if term.is_empty() {
        return nodes;
    }
    nodes.into_iter().filter_map(|node| prune(node, term)).collect()
}
