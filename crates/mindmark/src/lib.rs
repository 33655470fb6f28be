//! # mindmark
//!
//! Convert mind-map node trees to Markdown and back.
//!
//! A mind map arrives as a flat table of nodes that reference their children
//! by id ([`NativeTree`]). [`QqMindMapParser`] validates it into an owned
//! [`Node`] tree, [`QqToMarkdownConverter`] writes that tree as headings and
//! nested list items, and [`MarkdownToQqConverter`] reads such Markdown back.
//!
//! Both directions share the inline codec and normalizers from
//! [`mindmark_core`]: bold spans written next to each other are separated
//! (`**a****b**` becomes `**a** **b**`) so Markdown renderers do not merge
//! them.
//!
//! ## Example
//!
//! ```rust
//! use mindmark::MindmarkService;
//!
//! let service = MindmarkService::new();
//!
//! let json = r#"{
//!     "root": "r",
//!     "nodes": {
//!         "r": { "title": "Plan", "children": ["a"] },
//!         "a": { "title": [{ "text": "Step", "bold": true }], "children": ["b"] },
//!         "b": { "title": "detail", "children": [] }
//!     }
//! }"#;
//!
//! let markdown = service.markdown_from_json(json).unwrap();
//! assert_eq!(markdown, "# Plan\n\n## **Step**\n- detail\n");
//!
//! let tree = service.convert_to_native(&markdown).unwrap();
//! assert_eq!(tree.len(), 3);
//! ```

#[cfg(feature = "html")]
pub mod html;
pub mod native;
mod options;
mod parser;
mod service;
mod to_markdown;
mod to_native;

#[cfg(feature = "html")]
pub use html::{extract_payload, wrap_payload};
pub use native::{NativeNode, NativeSpan, NativeTitle, NativeTree};
pub use options::{ConvertOptions, HostEnvironment, IdPolicy, MAX_HEADING_LEVELS};
pub use parser::QqMindMapParser;
pub use service::MindmarkService;
pub use to_markdown::QqToMarkdownConverter;
pub use to_native::MarkdownToQqConverter;

pub use mindmark_core::{
    IndentManager, IndentMode, IndentOptions, IndentUnit, LinePreserver, Node, RichTextFormatter,
    Run, Style,
};

/// Error type for mindmark operations
#[derive(Debug, thiserror::Error)]
pub enum MindmarkError {
    /// The native payload does not describe a tree
    #[error("malformed tree at node `{node}`: {reason}")]
    MalformedTree { node: String, reason: String },

    /// Markdown lines that cannot be mapped to a tree
    #[error("structure error on line {line}: {reason}")]
    Structure { line: usize, reason: String },

    /// The inline repair pass did not settle
    #[error("formatting repair did not settle on line {line}: `{text}`")]
    FormattingRepair { line: usize, text: String },

    /// Invalid JSON payload
    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// No usable payload inside clipboard HTML
    #[cfg(feature = "html")]
    #[error("invalid HTML envelope: {0}")]
    Envelope(String),
}

impl From<mindmark_core::Error> for MindmarkError {
    fn from(err: mindmark_core::Error) -> Self {
        match err {
            mindmark_core::Error::Structure { line, reason } => {
                MindmarkError::Structure { line, reason }
            }
            mindmark_core::Error::FormattingRepair { line, text } => {
                MindmarkError::FormattingRepair { line, text }
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, MindmarkError>;

/// Convert a native payload to Markdown
pub fn convert_to_markdown(tree: &NativeTree, options: &ConvertOptions) -> Result<String> {
    MindmarkService::with_options(options.clone()).convert_to_markdown(tree)
}

/// Convert Markdown to a native payload
pub fn convert_to_native(markdown: &str, options: &ConvertOptions) -> Result<NativeTree> {
    MindmarkService::with_options(options.clone()).convert_to_native(markdown)
}
