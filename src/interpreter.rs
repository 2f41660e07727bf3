// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{Expression, Op, RangeExpression};
use crate::value::{Attributes, Value};
use crate::version::Version;

use core::cmp::Ordering;

fn compare(ordering: Ordering, op: Op) -> bool {
    match op {
        Op::Equal => ordering == Ordering::Equal,
        Op::NotEqual => ordering != Ordering::Equal,
        Op::Greater => ordering == Ordering::Greater,
        Op::GreaterOrEqual => ordering != Ordering::Less,
        Op::Less => ordering == Ordering::Less,
        Op::LessOrEqual => ordering != Ordering::Greater,
    }
}

// Compare one attribute value against a literal, coercing the literal to the
// value's type. A literal that does not parse as the attribute's type fails
// the comparison. List values match when any element matches.
fn eval_value(value: &Value, op: Op, literal: &str) -> bool {
    match value {
        Value::List(items) => items.iter().any(|item| eval_value(item, op, literal)),
        Value::String(s) => compare(s.as_ref().cmp(literal), op),
        Value::Version(version) => match literal.trim().parse::<Version>() {
            Ok(bound) => compare(version.cmp(&bound), op),
            Err(_) => false,
        },
        Value::Number(n) => match literal.trim().parse::<i64>() {
            Ok(bound) => compare(n.cmp(&bound), op),
            Err(_) => false,
        },
        Value::Bool(b) => match literal.trim().parse::<bool>() {
            Ok(bound) => compare(b.cmp(&bound), op),
            Err(_) => false,
        },
    }
}

fn eval_entry(attrs: &Attributes, key: &str, op: Op, literal: &str) -> bool {
    match attrs.get(key) {
        Some(value) => eval_value(value, op, literal),
        None => false,
    }
}

fn string_any(attrs: &Attributes, key: &str, pred: impl Fn(&str) -> bool + Copy) -> bool {
    fn check(value: &Value, pred: impl Fn(&str) -> bool + Copy) -> bool {
        match value {
            Value::String(s) => pred(s.as_ref()),
            Value::List(items) => items.iter().any(|item| check(item, pred)),
            _ => false,
        }
    }
    attrs.get(key).is_some_and(|value| check(value, pred))
}

impl RangeExpression {
    /// True when the attribute the bounds were folded on lies inside the
    /// interval.
    pub fn matches(&self, attrs: &Attributes) -> bool {
        match attrs.get(self.key()) {
            Some(value) => self.matches_value(value),
            None => false,
        }
    }

    fn matches_value(&self, value: &Value) -> bool {
        let low = self.low();
        if !eval_value(value, low.op, &low.value) {
            return false;
        }
        match self.high() {
            Some(high) => eval_value(value, high.op, &high.value),
            None => true,
        }
    }
}

impl Expression {
    /// Evaluate the expression against a capability's attribute map.
    pub fn matches(&self, attrs: &Attributes) -> bool {
        match self {
            Expression::True => true,
            Expression::False => false,
            Expression::And(exprs) => exprs.iter().all(|e| e.matches(attrs)),
            Expression::Or(exprs) => exprs.iter().any(|e| e.matches(attrs)),
            Expression::Not(inner) => !inner.matches(attrs),
            Expression::Simple { key, op, value } => eval_entry(attrs, key, *op, value),
            Expression::Pattern { key, prefix } => {
                string_any(attrs, key, |s| s.starts_with(prefix.as_ref()))
            }
            Expression::Approx { key, value } => {
                let wanted = value.trim();
                string_any(attrs, key, |s| s.trim().eq_ignore_ascii_case(wanted))
            }
            Expression::Present { key } => attrs.contains_key(key.as_ref()),
            Expression::Range(range) => range.matches(attrs),
            Expression::Capability {
                convention,
                name,
                range,
            } => {
                let named = matches!(attrs.get(convention.namespace.as_ref()),
                                     Some(Value::String(s)) if s == name);
                named && range.as_ref().map_or(true, |r| r.matches(attrs))
            }
        }
    }

    /// A short searchable summary of the expression: capability terms render
    /// with their convention's query prefix (`p:com.acme.api`,
    /// `bsn:com.acme`), plain comparisons render their value.
    pub fn query(&self) -> Option<String> {
        match self {
            Expression::Capability {
                convention, name, ..
            } => Some(format!("{}{}", convention.query_prefix, name)),
            Expression::And(exprs) | Expression::Or(exprs) => {
                let words: Vec<String> = exprs.iter().filter_map(|e| e.query()).collect();
                if words.is_empty() {
                    None
                } else {
                    Some(words.join(" "))
                }
            }
            Expression::Simple { value, .. } => Some(value.to_string()),
            Expression::Pattern { prefix, .. } => Some(prefix.to_string()),
            _ => None,
        }
    }
}
