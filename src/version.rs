// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;
use std::sync::Arc;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors raised while constructing versions and version ranges.
/// No partial value is ever produced on failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("invalid syntax for version: {0}")]
    InvalidVersion(String),

    #[error("invalid syntax for version range: {0}")]
    InvalidRange(String),

    #[error("reversed bounds in version range: {0}")]
    ReversedRange(String),
}

/// An OSGi version: three numeric fields and an optional free-text qualifier.
///
/// Ordering compares the numeric fields first; an absent qualifier sorts
/// before any non-empty qualifier, and qualifiers compare lexicographically.
/// An empty qualifier is normalized to absent at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    major: u32,
    minor: u32,
    micro: u32,
    qualifier: Option<Arc<str>>,
}

impl Version {
    pub const LOWEST: Version = Version::new(0, 0, 0);

    pub const fn new(major: u32, minor: u32, micro: u32) -> Version {
        Version {
            major,
            minor,
            micro,
            qualifier: None,
        }
    }

    pub fn with_qualifier(
        major: u32,
        minor: u32,
        micro: u32,
        qualifier: &str,
    ) -> Result<Version, VersionError> {
        if qualifier.is_empty() {
            return Ok(Version::new(major, minor, micro));
        }
        if !qualifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(VersionError::InvalidVersion(format!(
                "{major}.{minor}.{micro}.{qualifier}"
            )));
        }
        Ok(Version {
            major,
            minor,
            micro,
            qualifier: Some(qualifier.into()),
        })
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn micro(&self) -> u32 {
        self.micro
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    pub fn without_qualifier(&self) -> Version {
        Version::new(self.major, self.minor, self.micro)
    }

    /// True when the qualifier marks a snapshot build: the qualifier is
    /// exactly `SNAPSHOT` or its final `-`-separated segment is `SNAPSHOT`.
    /// The check is case-sensitive; qualifiers that merely contain the word
    /// (`SNAPSHOTX`) do not count.
    pub fn is_snapshot(&self) -> bool {
        matches!(self.qualifier.as_deref(),
                 Some(q) if q == "SNAPSHOT" || q.ends_with("-SNAPSHOT"))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Version) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.micro.cmp(&other.micro))
            .then_with(|| match (&self.qualifier, &other.qualifier) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Version) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if let Some(q) = &self.qualifier {
            write!(f, ".{q}")?;
        }
        Ok(())
    }
}

fn parse_numeric(part: &str, whole: &str) -> Result<u32, VersionError> {
    if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
        return Err(VersionError::InvalidVersion(whole.to_string()));
    }
    part.parse::<u32>()
        .map_err(|_| VersionError::InvalidVersion(whole.to_string()))
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Version, VersionError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(VersionError::InvalidVersion(s.to_string()));
        }
        let mut parts = trimmed.splitn(4, '.');
        let major = parse_numeric(parts.next().unwrap_or_default(), trimmed)?;
        let minor = match parts.next() {
            Some(p) => parse_numeric(p, trimmed)?,
            None => 0,
        };
        let micro = match parts.next() {
            Some(p) => parse_numeric(p, trimmed)?,
            None => 0,
        };
        match parts.next() {
            Some(q) if !q.is_empty() => Version::with_qualifier(major, minor, micro, q),
            Some(_) => Err(VersionError::InvalidVersion(s.to_string())),
            None => Ok(Version::new(major, minor, micro)),
        }
    }
}

impl Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

struct VersionVisitor;

impl Visitor<'_> for VersionVisitor {
    type Value = Version;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a version string")
    }

    fn visit_str<E>(self, v: &str) -> Result<Version, E>
    where
        E: de::Error,
    {
        v.parse().map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> Result<Version, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(VersionVisitor)
    }
}

/// An interval over [`Version`]s with per-side inclusivity. The high side may
/// be unbounded. Intervals that denote the empty set normalize to one
/// canonical empty range, `(0.0.0,0.0.0)`, so the algebra below is total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    low: Version,
    high: Option<Version>,
    low_inclusive: bool,
    high_inclusive: bool,
}

impl VersionRange {
    /// Create a bounded or unbounded range. Bounds with `high < low` are
    /// rejected; `high == low` with an exclusive side is a valid spelling of
    /// the empty set and collapses to the canonical empty range.
    pub fn new(
        low: Version,
        high: Option<Version>,
        low_inclusive: bool,
        high_inclusive: bool,
    ) -> Result<VersionRange, VersionError> {
        if let Some(h) = &high {
            if *h < low {
                return Err(VersionError::ReversedRange(format!("high {h} < low {low}")));
            }
        }
        let range = VersionRange {
            low,
            high,
            low_inclusive,
            high_inclusive,
        };
        if range.denotes_empty() {
            Ok(VersionRange::empty())
        } else {
            Ok(range)
        }
    }

    /// The range containing `low` and everything above it.
    pub fn at_least(low: Version) -> VersionRange {
        VersionRange {
            low,
            high: None,
            low_inclusive: true,
            high_inclusive: false,
        }
    }

    /// The canonical empty range.
    pub fn empty() -> VersionRange {
        VersionRange {
            low: Version::LOWEST,
            high: Some(Version::LOWEST),
            low_inclusive: false,
            high_inclusive: false,
        }
    }

    fn denotes_empty(&self) -> bool {
        match &self.high {
            None => false,
            Some(h) => match self.low.cmp(h) {
                Ordering::Greater => true,
                Ordering::Equal => !(self.low_inclusive && self.high_inclusive),
                Ordering::Less => false,
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.denotes_empty()
    }

    pub fn low(&self) -> &Version {
        &self.low
    }

    pub fn high(&self) -> Option<&Version> {
        self.high.as_ref()
    }

    pub fn low_inclusive(&self) -> bool {
        self.low_inclusive
    }

    pub fn high_inclusive(&self) -> bool {
        self.high_inclusive
    }

    /// True iff `version` passes both bound tests. An unbounded high side
    /// always passes.
    pub fn includes(&self, version: &Version) -> bool {
        let low_ok = if self.low_inclusive {
            *version >= self.low
        } else {
            *version > self.low
        };
        if !low_ok {
            return false;
        }
        match &self.high {
            None => true,
            Some(h) => {
                if self.high_inclusive {
                    *version <= *h
                } else {
                    *version < *h
                }
            }
        }
    }

    /// Intersection of two ranges: the greater low bound and the lesser high
    /// bound win, each carrying its own inclusivity flag; on a tie both sides
    /// must be inclusive for the result to be inclusive. Empty results
    /// collapse to the canonical empty range.
    pub fn intersect(&self, other: &VersionRange) -> VersionRange {
        let (low, low_inclusive) = match self.low.cmp(&other.low) {
            Ordering::Greater => (self.low.clone(), self.low_inclusive),
            Ordering::Less => (other.low.clone(), other.low_inclusive),
            Ordering::Equal => (self.low.clone(), self.low_inclusive && other.low_inclusive),
        };
        let (high, high_inclusive) = match (&self.high, &other.high) {
            (None, None) => (None, false),
            (Some(h), None) => (Some(h.clone()), self.high_inclusive),
            (None, Some(h)) => (Some(h.clone()), other.high_inclusive),
            (Some(a), Some(b)) => match a.cmp(b) {
                Ordering::Less => (Some(a.clone()), self.high_inclusive),
                Ordering::Greater => (Some(b.clone()), other.high_inclusive),
                Ordering::Equal => {
                    (Some(a.clone()), self.high_inclusive && other.high_inclusive)
                }
            },
        };
        let range = VersionRange {
            low,
            high,
            low_inclusive,
            high_inclusive,
        };
        if range.denotes_empty() {
            VersionRange::empty()
        } else {
            range
        }
    }

    /// Render the range as an LDAP filter fragment over `attr`. The filter
    /// grammar has no exclusive or `<` operators, so exclusive bounds are
    /// expressed by negating the opposite inclusive comparison.
    pub fn to_filter(&self, attr: &str) -> String {
        let low = &self.low;
        let low_part = if self.low_inclusive {
            format!("({attr}>={low})")
        } else {
            format!("(!({attr}<={low}))")
        };
        match &self.high {
            None => low_part,
            Some(h) => {
                let high_part = if self.high_inclusive {
                    format!("({attr}<={h})")
                } else {
                    format!("(!({attr}>={h}))")
                };
                format!("(&{low_part}{high_part})")
            }
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.high {
            None => write!(f, "{}", self.low),
            Some(h) => write!(
                f,
                "{}{},{}{}",
                if self.low_inclusive { '[' } else { '(' },
                self.low,
                h,
                if self.high_inclusive { ']' } else { ')' }
            ),
        }
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<VersionRange, VersionError> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let first = chars
            .next()
            .ok_or_else(|| VersionError::InvalidRange(s.to_string()))?;
        if first != '[' && first != '(' {
            return Ok(VersionRange::at_least(trimmed.parse()?));
        }
        let high_inclusive = match chars.last() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(VersionError::InvalidRange(s.to_string())),
        };
        let inner = &trimmed[1..trimmed.len() - 1];
        let (lo, hi) = inner
            .split_once(',')
            .ok_or_else(|| VersionError::InvalidRange(s.to_string()))?;
        VersionRange::new(
            lo.trim().parse()?,
            Some(hi.trim().parse()?),
            first == '[',
            high_inclusive,
        )
    }
}

impl Serialize for VersionRange {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

struct VersionRangeVisitor;

impl Visitor<'_> for VersionRangeVisitor {
    type Value = VersionRange;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a version range string")
    }

    fn visit_str<E>(self, v: &str) -> Result<VersionRange, E>
    where
        E: de::Error,
    {
        v.parse().map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for VersionRange {
    fn deserialize<D>(deserializer: D) -> Result<VersionRange, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(VersionRangeVisitor)
    }
}
