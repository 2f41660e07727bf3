// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use std::collections::BTreeMap;
use std::sync::Arc;

// The synthetic package owning primitive type refs. `<` cannot appear in a
// real package name, so the sentinel cannot collide.
const PRIMITIVES_FQN: &str = "<primitives>";

#[derive(Debug)]
struct PackageData {
    fqn: Arc<str>,
    binary: Arc<str>,
}

/// Canonical identifier for a package. The dotted (`fqn`) and slash-separated
/// (`binary`) spellings are two views of one identity. Refs are interned per
/// [`Descriptors`] arena: equal names yield pointer-identical handles within
/// one arena. Ordering and hashing go by fqn, so ordered sets of packages
/// iterate in name order.
#[derive(Clone)]
pub struct PackageRef(Arc<PackageData>);

impl PackageRef {
    fn new(fqn: &str) -> PackageRef {
        PackageRef(Arc::new(PackageData {
            fqn: fqn.into(),
            binary: fqn.replace('.', "/").into(),
        }))
    }

    /// Dotted form, e.g. `com.acme.api`.
    pub fn fqn(&self) -> &str {
        &self.0.fqn
    }

    /// Slash-separated form, e.g. `com/acme/api`.
    pub fn binary(&self) -> &str {
        &self.0.binary
    }

    /// The unnamed default package.
    pub fn is_default(&self) -> bool {
        self.0.fqn.is_empty()
    }

    /// The synthetic package owning primitive types.
    pub fn is_primitives(&self) -> bool {
        self.0.fqn.as_ref() == PRIMITIVES_FQN
    }

    /// `java` or any `java.*` package.
    pub fn is_java(&self) -> bool {
        self.0.fqn.as_ref() == "java" || self.0.fqn.starts_with("java.")
    }
}

impl PartialEq for PackageRef {
    fn eq(&self, other: &PackageRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.fqn == other.0.fqn
    }
}

impl Eq for PackageRef {}

impl Ord for PackageRef {
    fn cmp(&self, other: &PackageRef) -> Ordering {
        self.0.fqn.cmp(&other.0.fqn)
    }
}

impl PartialOrd for PackageRef {
    fn partial_cmp(&self, other: &PackageRef) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for PackageRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.fqn.hash(state)
    }
}

impl fmt::Debug for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fqn.fmt(f)
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.fqn)
    }
}

#[derive(Debug)]
struct TypeData {
    fqn: Arc<str>,
    binary: Arc<str>,
    package: PackageRef,
}

/// Canonical identifier for a class, owned by exactly one [`PackageRef`].
/// The package fqn is always the prefix of the type fqn up to the last `.`.
#[derive(Clone)]
pub struct TypeRef(Arc<TypeData>);

impl TypeRef {
    pub fn fqn(&self) -> &str {
        &self.0.fqn
    }

    pub fn binary(&self) -> &str {
        &self.0.binary
    }

    /// The simple name after the last `.`.
    pub fn short_name(&self) -> &str {
        match self.0.fqn.rfind('.') {
            Some(idx) => &self.0.fqn[idx + 1..],
            None => &self.0.fqn,
        }
    }

    pub fn package_ref(&self) -> &PackageRef {
        &self.0.package
    }

    pub fn is_primitive(&self) -> bool {
        self.0.package.is_primitives()
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &TypeRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.fqn == other.0.fqn
    }
}

impl Eq for TypeRef {}

impl Ord for TypeRef {
    fn cmp(&self, other: &TypeRef) -> Ordering {
        self.0.fqn.cmp(&other.0.fqn)
    }
}

impl PartialOrd for TypeRef {
    fn partial_cmp(&self, other: &TypeRef) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.fqn.hash(state)
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fqn.fmt(f)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.fqn)
    }
}

/// Interning arena for package and type identities, owned by one analysis
/// session. All components minting or resolving refs receive the arena
/// explicitly; there is no ambient global pool.
pub struct Descriptors {
    packages: BTreeMap<Arc<str>, PackageRef>,
    types: BTreeMap<Arc<str>, TypeRef>,
    default_package: PackageRef,
    primitives: PackageRef,
}

impl Default for Descriptors {
    fn default() -> Self {
        Self::new()
    }
}

impl Descriptors {
    pub fn new() -> Descriptors {
        let default_package = PackageRef::new("");
        let primitives = PackageRef::new(PRIMITIVES_FQN);
        let mut packages = BTreeMap::new();
        packages.insert(default_package.0.fqn.clone(), default_package.clone());
        packages.insert(primitives.0.fqn.clone(), primitives.clone());
        Descriptors {
            packages,
            types: BTreeMap::new(),
            default_package,
            primitives,
        }
    }

    pub fn default_package(&self) -> &PackageRef {
        &self.default_package
    }

    pub fn primitives_package(&self) -> &PackageRef {
        &self.primitives
    }

    /// Intern a package by dotted or slash-separated name.
    pub fn package_ref(&mut self, name: &str) -> PackageRef {
        let dotted = name.trim().replace('/', ".");
        if let Some(package) = self.packages.get(dotted.as_str()) {
            return package.clone();
        }
        let package = PackageRef::new(&dotted);
        self.packages
            .insert(package.0.fqn.clone(), package.clone());
        package
    }

    /// Intern a type by dotted or binary name. Array descriptors collapse to
    /// their element type; primitive element codes (`[I`, `[[Z`, ...)
    /// resolve to primitive type refs in the `<primitives>` package. A bare
    /// one-letter name is a class in the default package, not a primitive.
    pub fn type_ref(&mut self, name: &str) -> TypeRef {
        let mut stripped = name.trim();
        let mut dims = 0usize;
        while let Some(rest) = stripped.strip_prefix('[') {
            stripped = rest;
            dims += 1;
        }
        if let Some(rest) = stripped.strip_prefix('L') {
            if let Some(object) = rest.strip_suffix(';') {
                stripped = object;
            }
        }
        if dims > 0 {
            if let Some(primitive) = primitive_name(stripped) {
                return self.intern_type(primitive, self.primitives.clone());
            }
        }

        let dotted = stripped.replace('/', ".");
        if let Some(type_ref) = self.types.get(dotted.as_str()) {
            return type_ref.clone();
        }
        let package = match dotted.rfind('.') {
            Some(idx) => self.package_ref(&dotted[..idx]),
            None => self.default_package.clone(),
        };
        self.intern_type(&dotted, package)
    }

    fn intern_type(&mut self, fqn: &str, package: PackageRef) -> TypeRef {
        if let Some(type_ref) = self.types.get(fqn) {
            return type_ref.clone();
        }
        let type_ref = TypeRef(Arc::new(TypeData {
            fqn: fqn.into(),
            binary: fqn.replace('.', "/").into(),
            package,
        }));
        self.types.insert(type_ref.0.fqn.clone(), type_ref.clone());
        type_ref
    }

    /// Number of interned packages, the two well-known ones included.
    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}

fn primitive_name(code: &str) -> Option<&'static str> {
    match code {
        "Z" => Some("boolean"),
        "B" => Some("byte"),
        "C" => Some("char"),
        "S" => Some("short"),
        "I" => Some("int"),
        "J" => Some("long"),
        "F" => Some("float"),
        "D" => Some("double"),
        "V" => Some("void"),
        _ => None,
    }
}
