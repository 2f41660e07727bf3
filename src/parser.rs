// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{Expression, Op};
use crate::lexer::{Cursor, Source};

use std::sync::Arc;

use anyhow::Result;
use dashmap::DashMap;

// A value character and whether it was written behind a `\` escape.
type ValueChar = (char, bool);

/// Recursive-descent parser for RFC 1960 style filter strings.
///
/// Parsed trees are cached keyed by the exact input string: requesting the
/// same string again returns the canonical shared tree without re-parsing,
/// while syntactically different spellings of the same filter get
/// independent entries. The cache is safe to share across threads and keeps
/// at most one canonical entry per string. Nothing is cached for inputs that
/// fail to parse.
pub struct FilterParser {
    cache: DashMap<String, Arc<Expression>>,
}

impl Default for FilterParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterParser {
    pub fn new() -> Self {
        Self {
            cache: DashMap::new(),
        }
    }

    /// Parse a filter string into an expression tree, consulting the cache
    /// first.
    pub fn parse(&self, text: &str) -> Result<Arc<Expression>> {
        if let Some(cached) = self.cache.get(text) {
            return Ok(Arc::clone(cached.value()));
        }

        let expr = Arc::new(Self::parse_root(text)?);

        // The entry API keeps one canonical tree per string even when
        // several threads parsed the same input concurrently.
        let canonical = {
            let entry = self.cache.entry(text.to_string()).or_insert(expr);
            Arc::clone(entry.value())
        };
        Ok(canonical)
    }

    /// Number of distinct filter strings parsed so far.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    fn parse_root(text: &str) -> Result<Expression> {
        let source = Source::new("<filter>", text);
        let mut cursor = Cursor::new(&source);
        cursor.skip_whitespace();
        let expr = Self::parse_filter(&mut cursor)?;
        cursor.skip_whitespace();
        if !cursor.at_eof() {
            return Err(cursor.error("unexpected text after filter"));
        }
        Ok(expr)
    }

    fn parse_filter(cursor: &mut Cursor) -> Result<Expression> {
        cursor.skip_whitespace();
        cursor.expect('(', "at start of filter")?;
        cursor.skip_whitespace();
        let expr = match cursor.peek().1 {
            '&' => {
                cursor.advance();
                Expression::and(Self::parse_operands(cursor)?)
            }
            '|' => {
                cursor.advance();
                Expression::or(Self::parse_operands(cursor)?)
            }
            '!' => {
                cursor.advance();
                Self::parse_filter(cursor)?.negate()
            }
            _ => Self::parse_simple(cursor)?,
        };
        cursor.skip_whitespace();
        cursor.expect(')', "at end of filter")?;
        Ok(expr)
    }

    fn parse_operands(cursor: &mut Cursor) -> Result<Vec<Expression>> {
        let mut operands = vec![];
        loop {
            cursor.skip_whitespace();
            if cursor.peek().1 == '(' && !cursor.at_eof() {
                operands.push(Self::parse_filter(cursor)?);
            } else {
                break;
            }
        }
        if operands.is_empty() {
            return Err(cursor.error("expecting at least one operand filter"));
        }
        Ok(operands)
    }

    fn parse_simple(cursor: &mut Cursor) -> Result<Expression> {
        let key = Self::parse_key(cursor)?;
        match cursor.peek().1 {
            '=' => {
                cursor.advance();
                let value = Self::parse_value(cursor)?;
                Self::finish_equality(cursor, key, value)
            }
            '>' => {
                cursor.advance();
                cursor.skip_whitespace();
                cursor.expect('=', "after `>`")?;
                let value = Self::parse_value(cursor)?;
                Ok(Expression::simple(
                    key.into(),
                    Op::GreaterOrEqual,
                    Self::literal(cursor, value)?.into(),
                ))
            }
            '<' => {
                cursor.advance();
                cursor.skip_whitespace();
                cursor.expect('=', "after `<`")?;
                let value = Self::parse_value(cursor)?;
                Ok(Expression::simple(
                    key.into(),
                    Op::LessOrEqual,
                    Self::literal(cursor, value)?.into(),
                ))
            }
            '~' => {
                cursor.advance();
                cursor.skip_whitespace();
                cursor.expect('=', "after `~`")?;
                let value = Self::parse_value(cursor)?;
                Ok(Expression::Approx {
                    key: key.into(),
                    value: Self::literal(cursor, value)?.into(),
                })
            }
            _ => Err(cursor.error("expecting an operator (`=`, `>=`, `<=` or `~=`)")),
        }
    }

    // Attribute name: everything up to an operator character, trimmed.
    fn parse_key(cursor: &mut Cursor) -> Result<String> {
        let mut key = String::new();
        loop {
            if cursor.at_eof() {
                return Err(cursor.error("unexpected end of filter"));
            }
            match cursor.peek().1 {
                '=' | '<' | '>' | '~' | '(' | ')' => break,
                c => {
                    cursor.advance();
                    key.push(c);
                }
            }
        }
        let key = key.trim().to_string();
        if key.is_empty() {
            return Err(cursor.error("missing attribute name in filter"));
        }
        Ok(key)
    }

    // Value: everything up to the closing `)`, with `\` escaping the next
    // character. Unescaped leading/trailing whitespace is insignificant.
    fn parse_value(cursor: &mut Cursor) -> Result<Vec<ValueChar>> {
        let mut chars: Vec<ValueChar> = vec![];
        loop {
            if cursor.at_eof() {
                return Err(cursor.error("unexpected end of filter in value"));
            }
            match cursor.peek().1 {
                ')' => break,
                '\\' => {
                    cursor.advance();
                    if cursor.at_eof() {
                        return Err(cursor.error("dangling escape in value"));
                    }
                    let (_, escaped) = cursor.advance();
                    chars.push((escaped, true));
                }
                c => {
                    cursor.advance();
                    chars.push((c, false));
                }
            }
        }
        while matches!(chars.first(), Some((c, false)) if c.is_whitespace()) {
            chars.remove(0);
        }
        while matches!(chars.last(), Some((c, false)) if c.is_whitespace()) {
            chars.pop();
        }
        Ok(chars)
    }

    // A value in which wildcards carry no meaning.
    fn literal(cursor: &mut Cursor, chars: Vec<ValueChar>) -> Result<String> {
        if chars.iter().any(|(c, escaped)| *c == '*' && !escaped) {
            return Err(cursor.error("`*` is not allowed in a comparison value"));
        }
        Ok(chars.into_iter().map(|(c, _)| c).collect())
    }

    // Equality values distinguish presence tests (`=*`) and trailing-wildcard
    // prefix patterns from plain equality.
    fn finish_equality(
        cursor: &mut Cursor,
        key: String,
        chars: Vec<ValueChar>,
    ) -> Result<Expression> {
        let wildcards: Vec<usize> = chars
            .iter()
            .enumerate()
            .filter_map(|(idx, (c, escaped))| (*c == '*' && !escaped).then_some(idx))
            .collect();

        if wildcards.is_empty() {
            let value: String = chars.into_iter().map(|(c, _)| c).collect();
            return Ok(Expression::simple(key.into(), Op::Equal, value.into()));
        }

        if chars.len() == 1 {
            return Ok(Expression::Present { key: key.into() });
        }

        if wildcards == [chars.len() - 1] {
            let prefix: String = chars[..chars.len() - 1].iter().map(|(c, _)| c).collect();
            return Ok(Expression::Pattern {
                key: key.into(),
                prefix: prefix.into(),
            });
        }

        Err(cursor.error("`*` is only allowed in the trailing position of a value"))
    }
}
