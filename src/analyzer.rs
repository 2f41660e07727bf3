// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::descriptors::{PackageRef, TypeRef};

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

/// The `uses:` directive key of an export clause.
pub const USES_DIRECTIVE: &str = "uses:";

/// Placeholder token inside an authored `uses:` directive that stands for
/// the computed value.
pub const USES_PLACEHOLDER: &str = "<<USES>>";

/// Attributes and directives of one header clause.
pub type Attrs = BTreeMap<String, String>;

/// A set of packages with their clause attributes, e.g. the export or import
/// map of a bundle.
pub type Packages = BTreeMap<PackageRef, Attrs>;

/// A parsed class: its own type, the set of types it structurally references
/// (supertypes, interfaces, field and method signature types, thrown
/// exceptions, annotations) and the classfile format version. Produced once
/// by the external classfile parser, immutable afterwards.
#[derive(Debug, Clone)]
pub struct ClassInfo {
    type_ref: TypeRef,
    references: BTreeSet<TypeRef>,
    format: u16,
}

impl ClassInfo {
    pub fn new(type_ref: TypeRef) -> ClassInfo {
        ClassInfo {
            type_ref,
            references: BTreeSet::new(),
            format: 52,
        }
    }

    /// Set the classfile format major version (e.g. 52 for Java 8).
    pub fn with_format(mut self, format: u16) -> ClassInfo {
        self.format = format;
        self
    }

    pub fn with_reference(mut self, reference: TypeRef) -> ClassInfo {
        self.references.insert(reference);
        self
    }

    pub fn with_references(mut self, references: impl IntoIterator<Item = TypeRef>) -> ClassInfo {
        self.references.extend(references);
        self
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    pub fn package_ref(&self) -> &PackageRef {
        self.type_ref.package_ref()
    }

    pub fn references(&self) -> &BTreeSet<TypeRef> {
        &self.references
    }

    pub fn format(&self) -> u16 {
        self.format
    }

    /// The Java release this classfile format targets.
    pub fn java_release(&self) -> u16 {
        self.format.saturating_sub(44)
    }
}

/// Directed package-to-package reference graph. Not transitively closed;
/// cycles are possible and all traversals terminate on them. Iteration is in
/// package-name order, so repeated analyses render identically.
#[derive(Debug, Default, Clone)]
pub struct UsesGraph {
    edges: BTreeMap<PackageRef, BTreeSet<PackageRef>>,
}

impl UsesGraph {
    /// The direct referenced-package set of `package`, when it was analyzed.
    pub fn get(&self, package: &PackageRef) -> Option<&BTreeSet<PackageRef>> {
        self.edges.get(package)
    }

    pub fn contains(&self, package: &PackageRef) -> bool {
        self.edges.contains_key(package)
    }

    pub fn packages(&self) -> impl Iterator<Item = &PackageRef> {
        self.edges.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PackageRef, &BTreeSet<PackageRef>)> {
        self.edges.iter()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// All packages reachable from `root` through uses edges, `root`
    /// included. Safe on cyclic graphs.
    pub fn reachable_from(&self, root: &PackageRef) -> BTreeSet<PackageRef> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![root.clone()];
        while let Some(package) = stack.pop() {
            if !seen.insert(package.clone()) {
                continue;
            }
            if let Some(targets) = self.edges.get(&package) {
                for target in targets {
                    if !seen.contains(target) {
                        stack.push(target.clone());
                    }
                }
            }
        }
        seen
    }
}

/// Build the uses graph for the packages in `exported` from the known class
/// set. Each analyzed package maps to the packages of every type its classes
/// reference, minus the package itself and primitives. References to types
/// without a [`ClassInfo`] are tolerated (open-world classpath): the package
/// is still recorded and a warning is returned per missing type.
pub fn compute_uses(
    exported: &BTreeSet<PackageRef>,
    classes: &BTreeMap<TypeRef, ClassInfo>,
) -> (UsesGraph, Vec<String>) {
    let mut edges: BTreeMap<PackageRef, BTreeSet<PackageRef>> = BTreeMap::new();
    let mut gaps = BTreeSet::new();

    for class in classes.values() {
        let source = class.package_ref();
        if !exported.contains(source) {
            continue;
        }
        let used = edges.entry(source.clone()).or_default();
        for reference in class.references() {
            if !reference.is_primitive() && !classes.contains_key(reference) {
                gaps.insert(format!(
                    "no class found on the classpath for reference {} (from {})",
                    reference,
                    class.type_ref()
                ));
            }
            let package = reference.package_ref();
            if package == source || package.is_primitives() {
                continue;
            }
            used.insert(package.clone());
        }
    }

    debug!("computed uses for {} packages", edges.len());
    let warnings: Vec<String> = gaps.into_iter().collect();
    for warning in &warnings {
        warn!("{warning}");
    }
    (UsesGraph { edges }, warnings)
}

/// Apply computed uses to the `uses:` directives of the export clauses.
///
/// The computed value of an exported package is its graph entry restricted
/// to packages that are themselves imported or exported, minus the package
/// itself and `java.*`, in name order. The authored directive (default: the
/// bare placeholder) is expanded as a parsed comma list: tokens are trimmed,
/// empty tokens dropped, the placeholder token splices in the computed list,
/// and the result is re-joined, so no stray separators survive. An empty
/// expansion removes the directive.
///
/// With `suppress` set the computed value is empty everywhere: explicit
/// directive values survive and placeholders expand to nothing. Explicit
/// directives always win over computed values.
pub fn apply_uses_directives(
    exports: &mut Packages,
    imports: &Packages,
    graph: &UsesGraph,
    suppress: bool,
) {
    let exported: BTreeSet<PackageRef> = exports.keys().cloned().collect();

    for (package, attrs) in exports.iter_mut() {
        let computed: Vec<&str> = if suppress {
            vec![]
        } else {
            match graph.get(package) {
                None => vec![],
                Some(used) => used
                    .iter()
                    .filter(|u| imports.contains_key(*u) || exported.contains(*u))
                    .filter(|u| *u != package && !u.is_java())
                    .map(|u| u.fqn())
                    .collect(),
            }
        };

        let authored = attrs
            .get(USES_DIRECTIVE)
            .cloned()
            .unwrap_or_else(|| USES_PLACEHOLDER.to_string());
        let expanded = expand_uses(&authored, &computed);
        if expanded.is_empty() {
            attrs.remove(USES_DIRECTIVE);
        } else {
            attrs.insert(USES_DIRECTIVE.to_string(), expanded);
        }
    }
}

// Expand the placeholder over a parsed token list; separator cleanup falls
// out of the final join.
fn expand_uses(directive: &str, computed: &[&str]) -> String {
    let mut tokens: Vec<&str> = vec![];
    for token in directive.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if token == USES_PLACEHOLDER {
            tokens.extend(computed);
        } else {
            tokens.push(token);
        }
    }
    tokens.join(",")
}
