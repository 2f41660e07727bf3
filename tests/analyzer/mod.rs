// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use osgirus::{Attrs, ClassInfo, Engine, Packages, NOUSES, USES_DIRECTIVE, USES_PLACEHOLDER};
use std::collections::BTreeSet;

// A bundle with an api package referencing a util and an impl package, all
// alongside a java.util reference and a primitive array.
fn sample_engine() -> Engine {
    let mut engine = Engine::new();

    let widget = engine.descriptors_mut().type_ref("com/acme/api/Widget");
    let strings = engine.descriptors_mut().type_ref("com/acme/util/Strings");
    let helper = engine.descriptors_mut().type_ref("com/acme/impl/Helper");
    let list = engine.descriptors_mut().type_ref("java/util/List");
    let ints = engine.descriptors_mut().type_ref("[I");

    engine.add_class(
        ClassInfo::new(widget.clone())
            .with_format(55)
            .with_references([strings.clone(), helper.clone(), list, ints]),
    );
    engine.add_class(ClassInfo::new(strings));
    engine.add_class(ClassInfo::new(helper));

    engine
}

fn exported(engine: &mut Engine, names: &[&str]) -> BTreeSet<osgirus::PackageRef> {
    names
        .iter()
        .map(|n| engine.descriptors_mut().package_ref(n))
        .collect()
}

fn export_map(engine: &mut Engine, names: &[&str]) -> Packages {
    names
        .iter()
        .map(|n| (engine.descriptors_mut().package_ref(n), Attrs::new()))
        .collect()
}

#[test]
fn direct_uses_exclude_self_and_primitives() {
    let mut engine = sample_engine();
    let roots = exported(&mut engine, &["com.acme.api"]);
    let graph = engine.compute_uses(&roots);

    let api = engine.descriptors_mut().package_ref("com.acme.api");
    let used = graph.get(&api).expect("api package analyzed");
    let names: Vec<&str> = used.iter().map(|p| p.fqn()).collect();
    // the graph holds every referenced package except self and primitives;
    // java.* is only dropped later, when directives are rendered
    assert_eq!(names, ["com.acme.impl", "com.acme.util", "java.util"]);
}

#[test]
fn uses_directive_joins_shared_packages_in_name_order() {
    let mut engine = sample_engine();
    let roots = exported(&mut engine, &["com.acme.api"]);
    let graph = engine.compute_uses(&roots);

    let mut exports = export_map(&mut engine, &["com.acme.api"]);
    let imports = export_map(&mut engine, &["com.acme.util", "com.acme.impl", "java.util"]);
    engine.apply_uses_directives(&mut exports, &imports, &graph);

    let api = engine.descriptors_mut().package_ref("com.acme.api");
    let attrs = &exports[&api];
    // java.util is shared but never listed in uses
    assert_eq!(
        attrs.get(USES_DIRECTIVE).map(String::as_str),
        Some("com.acme.impl,com.acme.util")
    );
}

#[test]
fn uses_directive_only_lists_imported_or_exported_packages() {
    let mut engine = sample_engine();
    let roots = exported(&mut engine, &["com.acme.api"]);
    let graph = engine.compute_uses(&roots);

    let mut exports = export_map(&mut engine, &["com.acme.api"]);
    // com.acme.impl is private: neither imported nor exported
    let imports = export_map(&mut engine, &["com.acme.util"]);
    engine.apply_uses_directives(&mut exports, &imports, &graph);

    let api = engine.descriptors_mut().package_ref("com.acme.api");
    assert_eq!(
        exports[&api].get(USES_DIRECTIVE).map(String::as_str),
        Some("com.acme.util")
    );
}

#[test]
fn repeated_computation_is_deterministic() {
    let mut rendered = BTreeSet::new();
    for _ in 0..10 {
        let mut engine = sample_engine();
        let roots = exported(&mut engine, &["com.acme.api"]);
        let graph = engine.compute_uses(&roots);

        let mut exports = export_map(&mut engine, &["com.acme.api"]);
        let imports = export_map(&mut engine, &["com.acme.util", "com.acme.impl"]);
        engine.apply_uses_directives(&mut exports, &imports, &graph);

        let api = engine.descriptors_mut().package_ref("com.acme.api");
        rendered.insert(exports[&api][USES_DIRECTIVE].clone());
    }
    // ten runs, one distinct rendering
    assert_eq!(rendered.len(), 1);
    assert!(rendered.contains("com.acme.impl,com.acme.util"));
}

#[test]
fn placeholder_with_no_computed_uses_leaves_no_stray_separator() {
    let mut engine = Engine::new();
    let lonely = engine.descriptors_mut().type_ref("com/acme/solo/Alone");
    engine.add_class(ClassInfo::new(lonely));

    let roots = exported(&mut engine, &["com.acme.solo"]);
    let graph = engine.compute_uses(&roots);

    let mut exports = export_map(&mut engine, &["com.acme.solo"]);
    let solo = engine.descriptors_mut().package_ref("com.acme.solo");
    exports.get_mut(&solo).unwrap().insert(
        USES_DIRECTIVE.to_string(),
        format!("{USES_PLACEHOLDER},not.used"),
    );

    engine.apply_uses_directives(&mut exports, &Packages::new(), &graph);
    assert_eq!(
        exports[&solo].get(USES_DIRECTIVE).map(String::as_str),
        Some("not.used")
    );
}

#[test]
fn placeholder_splices_into_an_authored_directive() {
    let mut engine = sample_engine();
    let roots = exported(&mut engine, &["com.acme.api"]);
    let graph = engine.compute_uses(&roots);

    let mut exports = export_map(&mut engine, &["com.acme.api"]);
    let imports = export_map(&mut engine, &["com.acme.util", "com.acme.impl"]);
    let api = engine.descriptors_mut().package_ref("com.acme.api");
    exports.get_mut(&api).unwrap().insert(
        USES_DIRECTIVE.to_string(),
        format!("first.extra,{USES_PLACEHOLDER},last.extra"),
    );

    engine.apply_uses_directives(&mut exports, &imports, &graph);
    assert_eq!(
        exports[&api].get(USES_DIRECTIVE).map(String::as_str),
        Some("first.extra,com.acme.impl,com.acme.util,last.extra")
    );
}

#[test]
fn empty_expansion_removes_the_directive() {
    let mut engine = Engine::new();
    let lonely = engine.descriptors_mut().type_ref("com/acme/solo/Alone");
    engine.add_class(ClassInfo::new(lonely));

    let roots = exported(&mut engine, &["com.acme.solo"]);
    let graph = engine.compute_uses(&roots);

    let mut exports = export_map(&mut engine, &["com.acme.solo"]);
    engine.apply_uses_directives(&mut exports, &Packages::new(), &graph);

    let solo = engine.descriptors_mut().package_ref("com.acme.solo");
    assert_eq!(exports[&solo].get(USES_DIRECTIVE), None);
}

#[test]
fn nouses_suppresses_computed_values_but_keeps_explicit_ones() {
    let mut engine = sample_engine();
    engine.set_property(NOUSES, "true");

    let roots = exported(&mut engine, &["com.acme.api"]);
    let graph = engine.compute_uses(&roots);

    let mut exports = export_map(&mut engine, &["com.acme.api", "com.acme.extra"]);
    let imports = export_map(&mut engine, &["com.acme.util", "com.acme.impl"]);

    let api = engine.descriptors_mut().package_ref("com.acme.api");
    let extra = engine.descriptors_mut().package_ref("com.acme.extra");
    exports.get_mut(&extra).unwrap().insert(
        USES_DIRECTIVE.to_string(),
        format!("explicit.pkg,{USES_PLACEHOLDER}"),
    );

    engine.apply_uses_directives(&mut exports, &imports, &graph);

    // computed value suppressed entirely
    assert_eq!(exports[&api].get(USES_DIRECTIVE), None);
    // explicit value survives, the placeholder expands to nothing
    assert_eq!(
        exports[&extra].get(USES_DIRECTIVE).map(String::as_str),
        Some("explicit.pkg")
    );
}

#[test]
fn missing_classes_are_tolerated_with_a_warning() {
    let mut engine = Engine::new();
    let widget = engine.descriptors_mut().type_ref("com/acme/api/Widget");
    let ghost = engine.descriptors_mut().type_ref("com/acme/gone/Ghost");
    engine.add_class(ClassInfo::new(widget).with_reference(ghost));

    let roots = exported(&mut engine, &["com.acme.api"]);
    let graph = engine.compute_uses(&roots);

    // the reference is still recorded under the open-world assumption
    let api = engine.descriptors_mut().package_ref("com.acme.api");
    let gone = engine.descriptors_mut().package_ref("com.acme.gone");
    assert!(graph.get(&api).unwrap().contains(&gone));

    // and reported as a warning, not an error
    assert_eq!(engine.warnings().len(), 1);
    assert!(engine.warnings()[0].contains("com.acme.gone.Ghost"));
}

#[test]
fn cyclic_graphs_terminate() {
    let mut engine = Engine::new();
    let a = engine.descriptors_mut().type_ref("pkg/a/A");
    let b = engine.descriptors_mut().type_ref("pkg/b/B");
    engine.add_class(ClassInfo::new(a.clone()).with_reference(b.clone()));
    engine.add_class(ClassInfo::new(b).with_reference(a));

    let roots = exported(&mut engine, &["pkg.a", "pkg.b"]);
    let graph = engine.compute_uses(&roots);

    let pkg_a = engine.descriptors_mut().package_ref("pkg.a");
    let reachable = graph.reachable_from(&pkg_a);
    assert_eq!(reachable.len(), 2);
    assert!(reachable.contains(&pkg_a));
    assert!(reachable.contains(&engine.descriptors_mut().package_ref("pkg.b")));
}

#[test]
fn class_metadata_is_exposed() {
    let mut engine = Engine::new();
    let widget = engine.descriptors_mut().type_ref("com/acme/api/Widget");
    let class = ClassInfo::new(widget.clone()).with_format(55);

    assert_eq!(class.type_ref(), &widget);
    assert_eq!(class.package_ref().fqn(), "com.acme.api");
    assert_eq!(class.format(), 55);
    assert_eq!(class.java_release(), 11);

    engine.add_class(class);
    assert_eq!(engine.class_count(), 1);
}
