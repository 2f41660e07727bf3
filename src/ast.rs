// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::registry::{conventions, Convention};
use crate::version::{Version, VersionError, VersionRange};

use core::fmt;
use std::sync::Arc;

/// Comparison operators appearing in filter expressions. The filter grammar
/// itself only writes `=`, `>=` and `<=`; the strict variants arise from
/// negation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl Op {
    /// The operator accepting exactly the complement set of values.
    pub fn not(self) -> Op {
        match self {
            Op::Equal => Op::NotEqual,
            Op::NotEqual => Op::Equal,
            Op::Greater => Op::LessOrEqual,
            Op::GreaterOrEqual => Op::Less,
            Op::Less => Op::GreaterOrEqual,
            Op::LessOrEqual => Op::Greater,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Op::Equal => "==",
            Op::NotEqual => "!=",
            Op::Greater => ">",
            Op::GreaterOrEqual => ">=",
            Op::Less => "<",
            Op::LessOrEqual => "<=",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One side of a folded version range: the comparison operator and the
/// literal version text it was written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub op: Op,
    pub value: Arc<str>,
}

/// A pair of version bounds folded out of a conjunction, exposing the
/// equivalent interval. The high side is absent for a lone lower bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeExpression {
    key: Arc<str>,
    low: Bound,
    high: Option<Bound>,
}

impl RangeExpression {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn low(&self) -> &Bound {
        &self.low
    }

    pub fn high(&self) -> Option<&Bound> {
        self.high.as_ref()
    }

    /// The interval in canonical `[low,high)` string form; a lone lower
    /// bound renders as the bare version.
    pub fn range_string(&self) -> String {
        match &self.high {
            None => self.low.value.to_string(),
            Some(high) => format!(
                "{}{},{}{}",
                if self.low.op == Op::Greater { '(' } else { '[' },
                self.low.value,
                high.value,
                if high.op == Op::Less { ')' } else { ']' }
            ),
        }
    }

    /// Convert the folded bounds into a [`VersionRange`].
    pub fn to_version_range(&self) -> Result<VersionRange, VersionError> {
        let low: Version = self.low.value.parse()?;
        match &self.high {
            None => Ok(VersionRange::at_least(low)),
            Some(high) => VersionRange::new(
                low,
                Some(high.value.parse()?),
                self.low.op != Op::Greater,
                high.op != Op::Less,
            ),
        }
    }

    // Fold two bounds into a range, or `False` when the bounds are versions
    // in inverted order.
    fn make(key: Arc<str>, low: Bound, high: Option<Bound>) -> Expression {
        if let Some(h) = &high {
            if let (Ok(a), Ok(b)) = (
                low.value.parse::<Version>(),
                h.value.parse::<Version>(),
            ) {
                if a > b {
                    return Expression::False;
                }
            }
        }
        Expression::Range(RangeExpression { key, low, high })
    }
}

impl fmt::Display for RangeExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.range_string())
    }
}

/// An immutable filter expression tree. Trees carry no source positions, so
/// two parses differing only in whitespace compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    True,
    False,
    And(Vec<Expression>),
    Or(Vec<Expression>),
    Not(Box<Expression>),
    /// Plain attribute comparison.
    Simple {
        key: Arc<str>,
        op: Op,
        value: Arc<str>,
    },
    /// Prefix match written with a trailing `*`.
    Pattern {
        key: Arc<str>,
        prefix: Arc<str>,
    },
    /// Approximate (case-insensitive, whitespace-trimmed) equality.
    Approx {
        key: Arc<str>,
        value: Arc<str>,
    },
    /// Attribute presence test (`=*`).
    Present {
        key: Arc<str>,
    },
    /// A folded version interval.
    Range(RangeExpression),
    /// Equality on a registered capability namespace, with the sibling
    /// version bounds folded in.
    Capability {
        convention: Arc<Convention>,
        name: Arc<str>,
        range: Option<RangeExpression>,
    },
}

impl Expression {
    /// Build an equality/comparison node. Equality on a registered capability
    /// namespace becomes a [`Expression::Capability`] node.
    pub fn simple(key: Arc<str>, op: Op, value: Arc<str>) -> Expression {
        if op == Op::Equal {
            if let Some(convention) = conventions::find(&key) {
                return Expression::Capability {
                    convention,
                    name: value,
                    range: None,
                };
            }
        }
        Expression::Simple { key, op, value }
    }

    /// Negate an expression, flipping comparison operators where possible
    /// instead of wrapping.
    pub fn negate(self) -> Expression {
        match self {
            Expression::True => Expression::False,
            Expression::False => Expression::True,
            Expression::Not(inner) => *inner,
            Expression::Simple { key, op, value } => Expression::Simple {
                key,
                op: op.not(),
                value,
            },
            other => Expression::Not(Box::new(other)),
        }
    }

    /// Build a conjunction, folding sibling version bounds into a range
    /// expression attached to the capability term when one is present.
    pub fn and(mut exprs: Vec<Expression>) -> Expression {
        if exprs.iter().any(|e| matches!(e, Expression::False)) {
            return Expression::False;
        }
        exprs.retain(|e| !matches!(e, Expression::True));
        if exprs.is_empty() {
            return Expression::True;
        }

        // The capability term, when present, decides which attribute the
        // version bounds live on; otherwise any registered version attribute
        // is eligible.
        let fold_attr: Option<Arc<str>> = exprs.iter().find_map(|e| match e {
            Expression::Capability { convention, .. } => Some(convention.version_attr.clone()),
            _ => None,
        });

        let mut low_idx = None;
        let mut high_idx = None;
        for (idx, e) in exprs.iter().enumerate() {
            if let Expression::Simple { key, op, .. } = e {
                let eligible = match &fold_attr {
                    Some(attr) => key == attr,
                    None => conventions::is_version_attr(key),
                };
                if !eligible {
                    continue;
                }
                match op {
                    Op::Greater | Op::GreaterOrEqual if low_idx.is_none() => low_idx = Some(idx),
                    Op::Less | Op::LessOrEqual if high_idx.is_none() => high_idx = Some(idx),
                    _ => {}
                }
            }
        }

        // Bounds only pair up on one and the same attribute.
        if let (Some(l), Some(h)) = (low_idx, high_idx) {
            let same_key = match (&exprs[l], &exprs[h]) {
                (
                    Expression::Simple { key: kl, .. },
                    Expression::Simple { key: kh, .. },
                ) => kl == kh,
                _ => false,
            };
            if !same_key {
                high_idx = None;
            }
        }

        let folded = match (low_idx, high_idx) {
            (Some(l), Some(h)) => {
                // remove the higher index first so the lower stays valid
                let (first, second) = if l > h { (l, h) } else { (h, l) };
                let e1 = exprs.remove(first);
                let e2 = exprs.remove(second);
                let (low, high) = if l > h { (e1, e2) } else { (e2, e1) };
                match (low, high) {
                    (
                        Expression::Simple { key, op, value },
                        Expression::Simple {
                            op: high_op,
                            value: high_value,
                            ..
                        },
                    ) => Some(RangeExpression::make(
                        key,
                        Bound { op, value },
                        Some(Bound {
                            op: high_op,
                            value: high_value,
                        }),
                    )),
                    _ => None,
                }
            }
            (Some(l), None) => {
                let lone_at_least = matches!(
                    &exprs[l],
                    Expression::Simple {
                        op: Op::GreaterOrEqual,
                        ..
                    }
                );
                if lone_at_least {
                    if let Expression::Simple { key, op, value } = exprs.remove(l) {
                        Some(RangeExpression::make(key, Bound { op, value }, None))
                    } else {
                        None
                    }
                } else {
                    None
                }
            }
            _ => None,
        };

        if let Some(folded) = folded {
            match folded {
                Expression::False => return Expression::False,
                Expression::Range(range) => {
                    let capability_range = exprs.iter_mut().find_map(|e| match e {
                        Expression::Capability { range, .. } => Some(range),
                        _ => None,
                    });
                    match capability_range {
                        Some(slot) => *slot = Some(range),
                        None => exprs.push(Expression::Range(range)),
                    }
                }
                other => exprs.push(other),
            }
        }

        match exprs.len() {
            1 => exprs.remove(0),
            _ => Expression::And(exprs),
        }
    }

    /// Build a disjunction with True/False absorption.
    pub fn or(mut exprs: Vec<Expression>) -> Expression {
        if exprs.iter().any(|e| matches!(e, Expression::True)) {
            return Expression::True;
        }
        exprs.retain(|e| !matches!(e, Expression::False));
        if exprs.is_empty() {
            return Expression::False;
        }
        match exprs.len() {
            1 => exprs.remove(0),
            _ => Expression::Or(exprs),
        }
    }

    /// The folded range carried by this expression, if any.
    pub fn range_expression(&self) -> Option<&RangeExpression> {
        match self {
            Expression::Range(r) => Some(r),
            Expression::Capability { range, .. } => range.as_ref(),
            Expression::And(exprs) => exprs.iter().find_map(|e| e.range_expression()),
            _ => None,
        }
    }
}

fn fmt_operands(f: &mut fmt::Formatter<'_>, exprs: &[Expression]) -> fmt::Result {
    for e in exprs {
        write!(f, "({e})")?;
    }
    Ok(())
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::True => f.write_str("true"),
            Expression::False => f.write_str("false"),
            Expression::And(exprs) => {
                f.write_str("&")?;
                fmt_operands(f, exprs)
            }
            Expression::Or(exprs) => {
                f.write_str("|")?;
                fmt_operands(f, exprs)
            }
            Expression::Not(inner) => write!(f, "!({inner})"),
            Expression::Simple { key, op, value } => write!(f, "{key}{op}{value}"),
            Expression::Pattern { key, prefix } => write!(f, "{key}=={prefix}*"),
            Expression::Approx { key, value } => write!(f, "{key}~={value}"),
            Expression::Present { key } => write!(f, "{key}=*"),
            Expression::Range(range) => write!(f, "{range}"),
            Expression::Capability { name, range, .. } => {
                write!(f, "{name}")?;
                if let Some(range) = range {
                    write!(f, "; {range}")?;
                }
                Ok(())
            }
        }
    }
}
