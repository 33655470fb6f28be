//! mindmark-core - document model and Markdown normalizers
//!
//! This crate provides the pieces shared by both conversion directions of
//! `mindmark`: the internal node tree, the inline rich-text formatter, the
//! indentation manager and the line preserver used when reading Markdown.
//!
//! # Architecture
//!
//! ```text
//!                  ┌───────────────────┐
//! Runs ──render──▶ │ RichTextFormatter │ ──fix──▶ inline Markdown
//!      ◀──parse─── │                   │
//!                  └───────────────────┘
//!                  ┌───────────────────┐
//! depth ─────────▶ │   IndentManager   │ ──────▶ leading whitespace
//!       ◀───────── │                   │ ◀──────
//!                  └───────────────────┘
//!                  ┌───────────────────┐
//! Lines ─record──▶ │   LinePreserver   │ ──restore──▶ Lines
//!                  └───────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use mindmark_core::RichTextFormatter;
//!
//! let formatter = RichTextFormatter::new();
//! assert_eq!(formatter.fix("**a****b**"), "**a** **b**");
//! ```

mod document;
mod formatter;
mod indent;
mod model;
mod preserve;

pub use document::{Line, LineKind, MarkdownDocument};
pub use formatter::{strip_markers, RichTextFormatter};
pub use indent::{IndentManager, IndentMode, IndentOptions, IndentUnit};
pub use model::{merge_runs, Node, Run, Style, Walk};
pub use preserve::{FencedBlock, LineLayout, LinePreserver};

/// Error type for the normalizers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Markdown lines that cannot be mapped to a valid tree
    #[error("structure error on line {line}: {reason}")]
    Structure { line: usize, reason: String },

    /// A repair pass that does not settle on a fixed point
    #[error("formatting repair did not settle on line {line}: `{text}`")]
    FormattingRepair { line: usize, text: String },
}

pub type Result<T> = std::result::Result<T, Error>;
