// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt::{self, Debug, Formatter};
use core::iter::Peekable;
use core::str::CharIndices;
use std::sync::Arc;

use anyhow::anyhow;

struct SourceInternal {
    pub file: String,
    pub contents: String,
    pub lines: Vec<(u32, u32)>,
}

/// A piece of filter text together with its line table, used to produce
/// caret-annotated diagnostics.
#[derive(Clone)]
pub struct Source {
    src: Arc<SourceInternal>,
}

impl Debug for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        self.src.file.fmt(f)
    }
}

impl Source {
    pub fn new(file: impl Into<String>, contents: impl Into<String>) -> Source {
        let file = file.into();
        let contents = contents.into();
        let mut lines = vec![];
        let mut prev_ch = ' ';
        let mut prev_pos = 0u32;
        let mut start = 0u32;
        for (i, ch) in contents.char_indices() {
            if ch == '\n' {
                let end = match prev_ch {
                    '\r' => prev_pos,
                    _ => i as u32,
                };
                lines.push((start, end));
                start = i as u32 + 1;
            }
            prev_ch = ch;
            prev_pos = i as u32;
        }

        if (start as usize) < contents.len() {
            lines.push((start, contents.len() as u32));
        } else if contents.is_empty() {
            lines.push((0, 0));
        } else {
            let s = (contents.len() - 1) as u32;
            lines.push((s, s));
        }
        Self {
            src: Arc::new(SourceInternal {
                file,
                contents,
                lines,
            }),
        }
    }

    pub fn file(&self) -> &str {
        &self.src.file
    }

    pub fn contents(&self) -> &String {
        &self.src.contents
    }

    pub fn line(&self, idx: u32) -> &str {
        let idx = idx as usize;
        if idx < self.src.lines.len() {
            let (start, end) = self.src.lines[idx];
            &self.src.contents[start as usize..end as usize]
        } else {
            ""
        }
    }

    pub fn message(&self, line: u32, col: u32, kind: &str, msg: &str) -> String {
        if line as usize > self.src.lines.len() {
            return format!("{}: invalid line {} specified", self.src.file, line);
        }

        let line_str = format!("{line}");
        let line_num_width = line_str.len() + 1;
        let col_spaces = col as usize - 1;

        format!(
            "\n--> {}:{}:{}\n{:<line_num_width$}|\n\
	     {:<line_num_width$}| {}\n\
	     {:<line_num_width$}| {:<col_spaces$}^\n\
	     {}: {}",
            self.src.file,
            line,
            col,
            "",
            line,
            self.line(line - 1),
            "",
            "",
            kind,
            msg
        )
    }

    pub fn error(&self, line: u32, col: u32, msg: &str) -> anyhow::Error {
        anyhow!(self.message(line, col, "error", msg))
    }
}

/// Character-level scanner over a [`Source`] tracking line and column.
#[derive(Clone)]
pub struct Cursor<'source> {
    source: Source,
    iter: Peekable<CharIndices<'source>>,
    line: u32,
    col: u32,
}

impl<'source> Cursor<'source> {
    pub fn new(source: &'source Source) -> Self {
        Self {
            source: source.clone(),
            iter: source.contents().char_indices().peekable(),
            line: 1,
            col: 1,
        }
    }

    /// Byte offset and character at the current position. At end of input the
    /// offset is the input length and the character is `'\x00'`.
    pub fn peek(&mut self) -> (usize, char) {
        match self.iter.peek() {
            Some((index, chr)) => (*index, *chr),
            _ => (self.source.contents().len(), '\x00'),
        }
    }

    pub fn advance(&mut self) -> (usize, char) {
        match self.iter.next() {
            Some((index, chr)) => {
                if chr == '\n' {
                    self.line += 1;
                    self.col = 1;
                } else {
                    self.col += 1;
                }
                (index, chr)
            }
            _ => (self.source.contents().len(), '\x00'),
        }
    }

    pub fn at_eof(&mut self) -> bool {
        self.iter.peek().is_none()
    }

    pub fn skip_whitespace(&mut self) {
        while !self.at_eof() && self.peek().1.is_whitespace() {
            self.advance();
        }
    }

    pub fn expect(&mut self, chr: char, context: &str) -> anyhow::Result<()> {
        if self.peek().1 == chr && !self.at_eof() {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!("expecting `{chr}` {context}")))
        }
    }

    pub fn error(&mut self, msg: &str) -> anyhow::Error {
        self.source.error(self.line, self.col, msg)
    }
}
