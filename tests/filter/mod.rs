// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use anyhow::{bail, Result};
use osgirus::{conventions, Attributes, FilterParser, Value};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use test_generator::test_resources;

#[derive(Serialize, Deserialize, Debug)]
struct TestCase {
    note: String,
    filter: String,

    // attribute map to match against; values on a registered version
    // attribute are typed as versions
    #[serde(default)]
    attributes: Option<Attributes>,
    #[serde(default)]
    matches: Option<bool>,

    // expected canonical range string of the folded range expression
    #[serde(default)]
    range: Option<String>,

    // substring expected in the parse error
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
struct YamlTest {
    cases: Vec<TestCase>,
}

// Version-attribute entries arrive from yaml as plain strings; retype them
// the way a capability map would carry them.
fn process_attributes(attrs: Attributes) -> Result<Attributes> {
    let mut processed = Attributes::new();
    for (key, value) in attrs {
        let value = if conventions::is_version_attr(&key) {
            Value::Version(value.as_str()?.parse()?)
        } else {
            value
        };
        processed.insert(key, value);
    }
    Ok(processed)
}

fn yaml_test_impl(file: &str) -> Result<()> {
    println!("\nrunning {file}");
    let yaml = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml)?;

    let parser = FilterParser::new();
    for case in &test.cases {
        print!("case {} ", &case.note);

        let parsed = parser.parse(&case.filter);
        if let Some(fragment) = &case.error {
            match &parsed {
                Ok(_) => bail!("expected parse failure for {}", case.filter),
                Err(e) => {
                    let message = format!("{e}");
                    if !message.contains(fragment.as_str()) {
                        bail!("error for {} does not mention {fragment}: {message}", case.filter);
                    }
                }
            }
            println!("passed");
            continue;
        }

        let expr = parsed?;

        if let Some(range) = &case.range {
            match expr.range_expression() {
                Some(re) => {
                    if re.range_string() != *range {
                        bail!(
                            "range mismatch for {}: {} != {}",
                            case.filter,
                            re.range_string(),
                            range
                        );
                    }
                }
                None => bail!("no range expression folded out of {}", case.filter),
            }
        }

        if let Some(expected) = case.matches {
            let attrs = process_attributes(case.attributes.clone().unwrap_or_default())?;
            if expr.matches(&attrs) != expected {
                bail!("match mismatch for {} against {attrs:?}", case.filter);
            }
        }

        println!("passed");
    }

    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(()) => Ok(()),
        Err(e) => {
            // If Err is returned, it doesn't always get printed by cargo test.
            // Therefore, panic with the error.
            panic!("{}", e);
        }
    }
}

#[test_resources("tests/filter/**/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}

#[test]
fn whitespace_is_insignificant() -> Result<()> {
    let parser = FilterParser::new();
    let compact = parser.parse("(|(a=b)(b=c))")?;
    let spaced = parser.parse("(| (a=b) (b=c) )")?;
    // structurally equivalent trees, cached independently
    assert_eq!(*compact, *spaced);
    assert!(!Arc::ptr_eq(&compact, &spaced));
    assert_eq!(parser.cached_len(), 2);
    Ok(())
}

#[test]
fn cache_returns_the_canonical_tree() -> Result<()> {
    let parser = FilterParser::new();
    let first = parser.parse("(&(a>=1)(b<=2))")?;
    let second = parser.parse("(&(a>=1)(b<=2))")?;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(parser.cached_len(), 1);
    Ok(())
}

#[test]
fn cache_is_shared_across_threads() -> Result<()> {
    let parser = FilterParser::new();
    let text = "(&(osgi.wiring.package=com.acme.api)(version>=1.0.0)(!(version>=2.0.0)))";

    let trees: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| parser.parse(text).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // at most one canonical entry per exact string
    assert_eq!(parser.cached_len(), 1);
    for tree in &trees[1..] {
        assert!(Arc::ptr_eq(&trees[0], tree));
    }
    Ok(())
}

#[test]
fn nothing_is_cached_on_parse_failure() {
    let parser = FilterParser::new();
    assert!(parser.parse("(a=b").is_err());
    assert!(parser.parse("(a=b").is_err());
    assert_eq!(parser.cached_len(), 0);
}

#[test]
fn malformed_filters_identify_the_offending_fragment() {
    let parser = FilterParser::new();

    let unbalanced = parser.parse("(&(a=b)(c=d)").unwrap_err();
    assert!(format!("{unbalanced}").contains("expecting `)`"));

    let bad_operator = parser.parse("(a>b)").unwrap_err();
    assert!(format!("{bad_operator}").contains("expecting `=`"));

    let empty_key = parser.parse("(=b)").unwrap_err();
    assert!(format!("{empty_key}").contains("missing attribute name"));

    let trailing = parser.parse("(a=b))").unwrap_err();
    assert!(format!("{trailing}").contains("unexpected text after filter"));

    let wildcard = parser.parse("(a=*b)").unwrap_err();
    assert!(format!("{wildcard}").contains("trailing position"));
}

#[test]
fn escapes_in_values() -> Result<()> {
    let parser = FilterParser::new();
    let mut attrs = Attributes::new();
    attrs.insert("path".to_string(), Value::from("a(b)c"));

    assert!(parser.parse(r"(path=a\(b\)c)")?.matches(&attrs));

    // an escaped `*` is a literal, not a wildcard
    let mut star = Attributes::new();
    star.insert("name".to_string(), Value::from("*"));
    assert!(parser.parse(r"(name=\*)")?.matches(&star));
    Ok(())
}

#[test]
fn bundle_convention_folds_on_bundle_version() -> Result<()> {
    let parser = FilterParser::new();
    let expr = parser.parse(
        "(&(osgi.wiring.bundle=com.acme)(bundle-version>=1.2.0)(!(bundle-version>=2.0.0)))",
    )?;
    let range = expr.range_expression().expect("range folded");
    assert_eq!(range.key(), "bundle-version");
    assert_eq!(range.range_string(), "[1.2.0,2.0.0)");

    let mut attrs = Attributes::new();
    attrs.insert(
        "osgi.wiring.bundle".to_string(),
        Value::from("com.acme"),
    );
    attrs.insert(
        "bundle-version".to_string(),
        Value::Version("1.5.0".parse()?),
    );
    assert!(expr.matches(&attrs));

    attrs.insert(
        "bundle-version".to_string(),
        Value::Version("2.0.0".parse()?),
    );
    assert!(!expr.matches(&attrs));
    Ok(())
}

#[test]
fn lone_lower_bound_folds_to_an_unbounded_range() -> Result<()> {
    let parser = FilterParser::new();
    let expr = parser.parse("(&(osgi.wiring.package=com.acme.api)(version>=1.0.0))")?;
    let range = expr.range_expression().expect("range folded");
    assert_eq!(range.range_string(), "1.0.0");
    assert_eq!(range.to_version_range()?.to_string(), "1.0.0");
    Ok(())
}

#[test]
fn folded_range_converts_to_a_version_range() -> Result<()> {
    let parser = FilterParser::new();
    let expr =
        parser.parse("(&(osgi.wiring.package=com.acme.api)(version>=1.0.0)(!(version>=2.0.0)))")?;
    let range = expr.range_expression().expect("range folded");
    let version_range = range.to_version_range()?;
    assert_eq!(version_range.to_string(), "[1.0.0,2.0.0)");
    assert!(version_range.includes(&"1.5.0".parse()?));
    assert!(!version_range.includes(&"2.0.0".parse()?));
    Ok(())
}

#[test]
fn inverted_bounds_fold_to_false() -> Result<()> {
    let parser = FilterParser::new();
    let expr = parser.parse("(&(version>=2.0.0)(!(version>=1.0.0)))")?;
    let mut attrs = Attributes::new();
    attrs.insert("version".to_string(), Value::Version("1.5.0".parse()?));
    assert!(!expr.matches(&attrs));
    Ok(())
}
