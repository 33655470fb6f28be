//! Structural line preservation
//!
//! [`LinePreserver`] takes a snapshot of where the structural lines of a
//! document sit (blank lines, fenced code blocks, thematic breaks) so that a
//! transformation touching only content lines can be written back without
//! reflowing anything else.

use crate::document::{Line, LineKind, MarkdownDocument};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    /// Kept verbatim
    Structural(String),
    /// Replaced by the next transformed line; holds the source line number
    Content(usize),
}

/// A fenced code block captured during [`LinePreserver::record`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock {
    /// Line number of the opening fence
    pub open: usize,
    /// Body lines between the fences, verbatim
    pub body: Vec<String>,
}

/// Positions of structural and content lines in a document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineLayout {
    slots: Vec<Slot>,
    blocks: Vec<FencedBlock>,
    trailing_newline: bool,
}

impl LineLayout {
    /// Number of content lines expected by [`LinePreserver::restore`]
    pub fn content_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Content(_)))
            .count()
    }

    /// Fenced code blocks in document order
    pub fn fenced_blocks(&self) -> &[FencedBlock] {
        &self.blocks
    }

    /// The fenced block opened on `line`
    pub fn block_at(&self, line: usize) -> Option<&FencedBlock> {
        self.blocks.iter().find(|b| b.open == line)
    }

    /// Join restored lines, keeping the source's final line terminator
    pub fn join(&self, lines: &[String]) -> String {
        let mut out = lines.join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }
}

/// Records and restores structural lines
#[derive(Debug, Clone, Copy, Default)]
pub struct LinePreserver;

impl LinePreserver {
    pub fn new() -> Self {
        Self
    }

    /// Snapshot the layout of `lines`
    pub fn record(&self, lines: &[Line]) -> LineLayout {
        let mut layout = LineLayout::default();
        let mut block: Option<FencedBlock> = None;

        for line in lines {
            match line.kind {
                LineKind::Content => layout.slots.push(Slot::Content(line.number)),
                kind => {
                    match kind {
                        LineKind::FenceOpen => {
                            block = Some(FencedBlock {
                                open: line.number,
                                body: Vec::new(),
                            })
                        }
                        LineKind::FenceBody => {
                            if let Some(block) = block.as_mut() {
                                block.body.push(line.raw.clone());
                            }
                        }
                        LineKind::FenceClose => layout.blocks.extend(block.take()),
                        _ => {}
                    }
                    layout.slots.push(Slot::Structural(line.raw.clone()));
                }
            }
        }

        layout
    }

    /// Snapshot a whole document, including its final line terminator
    pub fn record_document(&self, document: &MarkdownDocument) -> LineLayout {
        let mut layout = self.record(document.lines());
        layout.trailing_newline = document.trailing_newline();
        layout
    }

    /// Merge transformed content lines back between the recorded structural
    /// lines. `transformed` must hold exactly one line per recorded content
    /// line, in order.
    pub fn restore(&self, layout: &LineLayout, transformed: Vec<String>) -> Result<Vec<String>> {
        let expected = layout.content_count();
        if transformed.len() != expected {
            let line = layout
                .slots
                .iter()
                .filter_map(|s| match s {
                    Slot::Content(number) => Some(*number),
                    Slot::Structural(_) => None,
                })
                .nth(transformed.len())
                .unwrap_or(layout.slots.len());
            return Err(Error::Structure {
                line,
                reason: format!(
                    "expected {expected} content lines, got {}",
                    transformed.len()
                ),
            });
        }

        let mut content = transformed.into_iter();
        let mut restored = Vec::with_capacity(layout.slots.len());

        for slot in &layout.slots {
            match slot {
                Slot::Structural(raw) => restored.push(raw.clone()),
                Slot::Content(_) => restored.extend(content.next()),
            }
        }

        Ok(restored)
    }
}
