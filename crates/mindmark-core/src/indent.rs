//! Indentation management
//!
//! Maps tree depth to leading whitespace and back. Reading is tolerant of
//! mixed tabs and spaces: a tab advances to the next level boundary, so a
//! tab and one unit of spaces always mean the same depth.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Whitespace emitted for one level of depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndentUnit {
    /// A fixed number of spaces per level
    Spaces(usize),
    /// One tab per level
    Tab,
}

impl Default for IndentUnit {
    fn default() -> Self {
        IndentUnit::Spaces(4)
    }
}

/// How to treat indentation that is not a whole number of levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndentMode {
    /// Reject with a structure error
    #[default]
    Strict,
    /// Round down to the enclosing level
    Lenient,
}

/// Options for [`IndentManager`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndentOptions {
    /// Unit used when writing indentation
    pub unit: IndentUnit,

    /// Strict or lenient reading
    pub mode: IndentMode,

    /// Spaces per level when reading space-indented lines under [`IndentUnit::Tab`]
    pub tab_width: usize,
}

impl Default for IndentOptions {
    fn default() -> Self {
        Self {
            unit: IndentUnit::default(),
            mode: IndentMode::default(),
            tab_width: 4,
        }
    }
}

/// Converts between depth and indentation
#[derive(Debug, Clone, Default)]
pub struct IndentManager {
    options: IndentOptions,
}

impl IndentManager {
    pub fn new(options: IndentOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &IndentOptions {
        &self.options
    }

    /// Columns that make up one level
    fn level_width(&self) -> usize {
        match self.options.unit {
            IndentUnit::Spaces(n) => n.max(1),
            IndentUnit::Tab => self.options.tab_width.max(1),
        }
    }

    /// Leading whitespace for a line at `depth`
    pub fn depth_to_indent(&self, depth: usize) -> String {
        match self.options.unit {
            IndentUnit::Spaces(n) => " ".repeat(n.max(1) * depth),
            IndentUnit::Tab => "\t".repeat(depth),
        }
    }

    /// Split a line into its leading whitespace and the rest
    pub fn split_indent<'a>(&self, line: &'a str) -> (&'a str, &'a str) {
        let rest = line.trim_start_matches([' ', '\t']);
        (&line[..line.len() - rest.len()], rest)
    }

    /// Width of leading whitespace in columns, with tabs advancing to the
    /// next level boundary
    pub fn columns(&self, indent: &str) -> usize {
        let width = self.level_width();
        indent.chars().fold(0, |col, c| match c {
            '\t' => (col / width + 1) * width,
            _ => col + 1,
        })
    }

    /// Depth implied by a line's leading whitespace.
    ///
    /// `line_number` is only used for error reporting.
    pub fn indent_to_depth(&self, line: &str, line_number: usize) -> Result<usize> {
        let (indent, _) = self.split_indent(line);
        let columns = self.columns(indent);
        let width = self.level_width();

        if columns % width != 0 && self.options.mode == IndentMode::Strict {
            return Err(Error::Structure {
                line: line_number,
                reason: format!(
                    "indentation of {columns} columns is not a multiple of {width}"
                ),
            });
        }

        Ok(columns / width)
    }
}
