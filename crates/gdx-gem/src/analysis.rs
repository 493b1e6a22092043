//! Structural model of a gem's source: namespaces and their methods.
//!
//! Extraction itself is done by a [`StructuralAnalyzer`]; this module owns the
//! normalized result and the lookups over it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::GemError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamespaceKind {
    Class,
    Module,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    #[default]
    Instance,
    Class,
}

/// A method declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSpec {
    pub name: String,
    #[serde(default)]
    pub kind: MethodKind,
    /// Qualified name of the declaring namespace; `None` for top-level
    /// methods. Resolved against the owning gem, never held as a reference.
    #[serde(default)]
    pub owner: Option<String>,
}

impl MethodSpec {
    pub fn instance(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MethodKind::Instance,
            owner: None,
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MethodKind::Class,
            owner: None,
        }
    }

    #[must_use]
    pub fn owned_by(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    #[must_use]
    pub fn is_class_method(&self) -> bool {
        self.kind == MethodKind::Class
    }
}

/// A class or module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    /// Fully qualified name, e.g. `Beta::Widget`.
    pub qualified_name: String,
    pub kind: NamespaceKind,
    /// Qualified name of the enclosing namespace; `None` at top level.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Declared superclass, classes only.
    #[serde(default)]
    pub superclass: Option<String>,
    #[serde(default)]
    pub methods: Vec<MethodSpec>,
}

impl Namespace {
    /// A namespace named `qualified_name`, enclosed by everything before the
    /// last `::`.
    pub fn new(kind: NamespaceKind, qualified_name: impl Into<String>) -> Self {
        let qualified_name = qualified_name.into();
        let namespace = qualified_name
            .rsplit_once("::")
            .map(|(parent, _)| parent.to_string())
            .filter(|parent| !parent.is_empty());
        Self {
            qualified_name,
            kind,
            namespace,
            superclass: None,
            methods: Vec::new(),
        }
    }

    pub fn class(qualified_name: impl Into<String>) -> Self {
        Self::new(NamespaceKind::Class, qualified_name)
    }

    pub fn module(qualified_name: impl Into<String>) -> Self {
        Self::new(NamespaceKind::Module, qualified_name)
    }

    #[must_use]
    pub fn with_superclass(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: MethodSpec) -> Self {
        let owner = self.qualified_name.clone();
        self.methods.push(method.owned_by(owner));
        self
    }

    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.namespace.as_deref().is_none_or(str::is_empty)
    }

    /// First path segment of the qualified name.
    #[must_use]
    pub fn root_constant(&self) -> &str {
        self.qualified_name
            .split("::")
            .next()
            .unwrap_or(&self.qualified_name)
    }

    /// Method named `name`. Instance methods shadow class methods of the same
    /// name.
    #[must_use]
    pub fn find_method(&self, name: &str) -> Option<&MethodSpec> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.kind == MethodKind::Instance)
            .or_else(|| self.methods.iter().find(|m| m.name == name))
    }
}

/// Analyzer output for one gem version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Analysis {
    pub classes: Vec<Namespace>,
    pub modules: Vec<Namespace>,
    /// Instance methods defined outside any namespace.
    pub instance_methods: Vec<MethodSpec>,
    /// Class methods defined outside any namespace.
    pub class_methods: Vec<MethodSpec>,
}

impl Analysis {
    /// Sort namespaces by qualified name and methods by name, merging
    /// reopened namespaces and dropping duplicate methods.
    #[must_use]
    pub fn normalize(self) -> Self {
        Self {
            classes: merge_namespaces(self.classes),
            modules: merge_namespaces(self.modules),
            instance_methods: sort_methods(self.instance_methods),
            class_methods: sort_methods(self.class_methods),
        }
    }

    /// Classes then modules, each in qualified-name order.
    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.classes.iter().chain(&self.modules)
    }

    /// Exact-name class lookup. Expects a normalized analysis.
    #[must_use]
    pub fn find_class(&self, qualified_name: &str) -> Option<&Namespace> {
        find_sorted(&self.classes, qualified_name)
    }

    /// Exact-name module lookup. Expects a normalized analysis.
    #[must_use]
    pub fn find_module(&self, qualified_name: &str) -> Option<&Namespace> {
        find_sorted(&self.modules, qualified_name)
    }

    /// Module first, then class.
    #[must_use]
    pub fn find_namespace(&self, qualified_name: &str) -> Option<&Namespace> {
        self.find_module(qualified_name)
            .or_else(|| self.find_class(qualified_name))
    }

    /// Root methods plus every namespace's methods.
    #[must_use]
    pub fn methods_count(&self) -> usize {
        self.instance_methods.len()
            + self.class_methods.len()
            + self
                .namespaces()
                .map(|ns| ns.methods.len())
                .sum::<usize>()
    }
}

fn find_sorted<'a>(namespaces: &'a [Namespace], qualified_name: &str) -> Option<&'a Namespace> {
    namespaces
        .binary_search_by(|ns| ns.qualified_name.as_str().cmp(qualified_name))
        .ok()
        .map(|index| &namespaces[index])
}

fn merge_namespaces(namespaces: Vec<Namespace>) -> Vec<Namespace> {
    let mut merged: BTreeMap<String, Namespace> = BTreeMap::new();
    for ns in namespaces {
        match merged.get_mut(&ns.qualified_name) {
            Some(existing) => {
                existing.methods.extend(ns.methods);
                if existing.superclass.is_none() {
                    existing.superclass = ns.superclass;
                }
            }
            None => {
                merged.insert(ns.qualified_name.clone(), ns);
            }
        }
    }
    merged
        .into_values()
        .map(|mut ns| {
            let owner = ns.qualified_name.clone();
            ns.methods = sort_methods(ns.methods)
                .into_iter()
                .map(|m| m.owned_by(owner.clone()))
                .collect();
            ns
        })
        .collect()
}

fn sort_methods(mut methods: Vec<MethodSpec>) -> Vec<MethodSpec> {
    methods.sort_by(|a, b| a.name.cmp(&b.name).then(a.kind.cmp(&b.kind)));
    methods.dedup_by(|a, b| a.name == b.name && a.kind == b.kind);
    methods
}

// ── Analyzers ──────────────────────────────────────────────────────

/// The unpacked payload an analyzer runs over.
#[derive(Debug, Clone, Copy)]
pub struct SourceTree<'a> {
    pub name: &'a str,
    pub version: &'a str,
    /// Root of the unpacked payload (`data/`).
    pub root: &'a Path,
    /// Library source files, relative to `root`.
    pub files: &'a [String],
}

/// Extracts namespaces and methods from unpacked source.
pub trait StructuralAnalyzer: Send + Sync {
    /// # Errors
    ///
    /// Returns [`GemError::Analyzer`] if the tree cannot be analyzed.
    fn analyze(&self, tree: &SourceTree<'_>) -> Result<Analysis, GemError>;
}

/// Returns the same analysis for every gem. Useful when the structure is
/// already known.
#[derive(Debug, Clone, Default)]
pub struct StaticAnalyzer {
    analysis: Analysis,
}

impl StaticAnalyzer {
    #[must_use]
    pub fn new(analysis: Analysis) -> Self {
        Self { analysis }
    }
}

impl StructuralAnalyzer for StaticAnalyzer {
    fn analyze(&self, _tree: &SourceTree<'_>) -> Result<Analysis, GemError> {
        Ok(self.analysis.clone())
    }
}

/// Loads an analysis exported as JSON by an external analyzer.
#[derive(Debug, Clone)]
pub struct JsonAnalyzer {
    path: PathBuf,
}

impl JsonAnalyzer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StructuralAnalyzer for JsonAnalyzer {
    fn analyze(&self, tree: &SourceTree<'_>) -> Result<Analysis, GemError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            GemError::Analyzer(format!("failed to read {}: {e}", self.path.display()))
        })?;
        let analysis: Analysis = serde_json::from_str(&raw).map_err(|e| {
            GemError::Analyzer(format!("invalid analysis {}: {e}", self.path.display()))
        })?;
        tracing::debug!(
            gem = tree.name,
            version = tree.version,
            classes = analysis.classes.len(),
            modules = analysis.modules.len(),
            "loaded exported analysis"
        );
        Ok(analysis)
    }
}
