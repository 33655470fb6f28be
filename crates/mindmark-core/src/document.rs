//! Line-level view of a Markdown document
//!
//! Classifies every line of the input as blank, structural (fence
//! boundaries, fence bodies, thematic breaks) or content, and records the
//! depth implied by each content line's indentation.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::indent::IndentManager;
use crate::{Error, Result};

static FENCE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]*(`{3,}|~{3,})(.*)$").expect("valid fence regex"));

/// Classification of a [`Line`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Empty or whitespace-only
    Blank,
    /// Opening fence of a code block
    FenceOpen,
    /// Line inside a fenced code block
    FenceBody,
    /// Closing fence of a code block
    FenceClose,
    /// Thematic break (`---`, `***`, `___`)
    Break,
    /// Heading, list item or paragraph text
    Content,
}

impl LineKind {
    /// Structural lines must survive a round trip verbatim
    pub fn is_structural(self) -> bool {
        !matches!(self, LineKind::Content)
    }
}

/// A single line of a Markdown document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based line number in the source
    pub number: usize,
    /// Text without the line terminator
    pub raw: String,
    /// Depth implied by indentation; zero for lines whose indentation is
    /// not meaningful (blank lines, fence bodies and closing fences)
    pub depth: usize,
    pub kind: LineKind,
}

impl Line {
    /// Info string of an opening fence line
    pub fn fence_info(&self) -> Option<String> {
        if self.kind != LineKind::FenceOpen {
            return None;
        }
        fence_info(&self.raw)
    }
}

/// A Markdown document split into classified lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownDocument {
    lines: Vec<Line>,
    trailing_newline: bool,
}

impl MarkdownDocument {
    /// Split and classify `text`.
    ///
    /// Fails when a fenced code block is never closed, or when a content
    /// line's indentation is rejected by `indent`.
    pub fn parse(text: &str, indent: &IndentManager) -> Result<Self> {
        let trailing_newline = text.ends_with('\n');
        let body = text.strip_suffix('\n').unwrap_or(text);

        let mut lines = Vec::new();
        // (line number, fence char, fence length) of the open code block
        let mut fence: Option<(usize, char, usize)> = None;

        if !text.is_empty() {
            for (i, raw) in body.split('\n').enumerate() {
                let number = i + 1;
                let raw = raw.strip_suffix('\r').unwrap_or(raw);

                let (kind, depth) = match fence {
                    Some((_, ch, len)) if is_fence_close(raw, ch, len) => {
                        fence = None;
                        (LineKind::FenceClose, 0)
                    }
                    Some(_) => (LineKind::FenceBody, 0),
                    None if raw.trim().is_empty() => (LineKind::Blank, 0),
                    None => {
                        if let Some((ch, len)) = fence_open(raw) {
                            fence = Some((number, ch, len));
                            (LineKind::FenceOpen, indent.indent_to_depth(raw, number)?)
                        } else if is_thematic_break(raw) {
                            (LineKind::Break, 0)
                        } else {
                            (LineKind::Content, indent.indent_to_depth(raw, number)?)
                        }
                    }
                };

                lines.push(Line {
                    number,
                    raw: raw.to_string(),
                    depth,
                    kind,
                });
            }
        }

        if let Some((number, ..)) = fence {
            return Err(Error::Structure {
                line: number,
                reason: "fenced code block is never closed".to_string(),
            });
        }

        Ok(Self {
            lines,
            trailing_newline,
        })
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Content-bearing lines in order
    pub fn content_lines(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter().filter(|l| l.kind == LineKind::Content)
    }

    /// Whether the source ended with a line terminator
    pub fn trailing_newline(&self) -> bool {
        self.trailing_newline
    }
}

/// Fence character and length of an opening fence line
fn fence_open(raw: &str) -> Option<(char, usize)> {
    let caps = FENCE_OPEN.captures(raw)?;
    let marker = caps.get(1)?.as_str();
    let info = caps.get(2).map_or("", |m| m.as_str());
    let ch = marker.chars().next()?;

    // Backtick fences cannot carry backticks in their info string
    if ch == '`' && info.contains('`') {
        return None;
    }

    Some((ch, marker.len()))
}

fn is_fence_close(raw: &str, ch: char, len: usize) -> bool {
    let trimmed = raw.trim();
    trimmed.len() >= len && trimmed.chars().all(|c| c == ch)
}

fn is_thematic_break(raw: &str) -> bool {
    let mut marks = raw.chars().filter(|c| !c.is_whitespace());
    let Some(first) = marks.next() else {
        return false;
    };
    matches!(first, '-' | '*' | '_') && marks.clone().all(|c| c == first) && marks.count() >= 2
}

fn fence_info(raw: &str) -> Option<String> {
    let caps = FENCE_OPEN.captures(raw)?;
    Some(caps.get(2).map_or("", |m| m.as_str()).trim().to_string())
}
