// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::analyzer;
use crate::analyzer::{ClassInfo, Packages, UsesGraph};
use crate::descriptors::{Descriptors, PackageRef, TypeRef};

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

/// Property suppressing computed uses globally. Explicit `uses:` directive
/// values still survive.
pub const NOUSES: &str = "-nouses";

/// One analysis session: the interning arena, the known classes, the
/// configuration properties supplied by the surrounding build, and the
/// warnings collected along the way.
pub struct Engine {
    descriptors: Descriptors,
    classes: BTreeMap<TypeRef, ClassInfo>,
    properties: BTreeMap<String, String>,
    warnings: Vec<String>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Engine {
        Engine {
            descriptors: Descriptors::new(),
            classes: BTreeMap::new(),
            properties: BTreeMap::new(),
            warnings: vec![],
        }
    }

    pub fn descriptors(&self) -> &Descriptors {
        &self.descriptors
    }

    pub fn descriptors_mut(&mut self) -> &mut Descriptors {
        &mut self.descriptors
    }

    /// Add a parsed class to the session.
    pub fn add_class(&mut self, class: ClassInfo) {
        self.classes.insert(class.type_ref().clone(), class);
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Set a configuration property supplied by the surrounding build.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn get_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Property truthiness: set, non-empty and not `false`.
    pub fn is_true(&self, key: &str) -> bool {
        matches!(self.get_property(key), Some(v) if !v.is_empty() && v != "false")
    }

    /// Compute the uses graph for the exported packages from the session's
    /// classes. Resolution gaps are collected as session warnings.
    pub fn compute_uses(&mut self, exported: &BTreeSet<PackageRef>) -> UsesGraph {
        debug!(
            "analyzing {} classes for {} exported packages",
            self.classes.len(),
            exported.len()
        );
        let (graph, warnings) = analyzer::compute_uses(exported, &self.classes);
        self.warnings.extend(warnings);
        graph
    }

    /// Expand the `uses:` directives of the export clauses from the computed
    /// graph, honoring the `-nouses` suppression property.
    pub fn apply_uses_directives(
        &self,
        exports: &mut Packages,
        imports: &Packages,
        graph: &UsesGraph,
    ) {
        analyzer::apply_uses_directives(exports, imports, graph, self.is_true(NOUSES));
    }

    /// Warnings collected by analysis operations, in collection order.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}
