//! MindmarkService - the main entry point for conversions in both directions.

use mindmark_core::{IndentManager, LinePreserver, RichTextFormatter};

use crate::native::NativeTree;
use crate::options::ConvertOptions;
use crate::parser::QqMindMapParser;
use crate::to_markdown::QqToMarkdownConverter;
use crate::to_native::MarkdownToQqConverter;
use crate::Result;

/// Converts between native mind-map payloads and Markdown
#[derive(Debug, Clone, Default)]
pub struct MindmarkService {
    options: ConvertOptions,
    formatter: RichTextFormatter,
}

impl MindmarkService {
    /// Create a new MindmarkService with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a MindmarkService with custom options
    pub fn with_options(options: ConvertOptions) -> Self {
        Self {
            options,
            formatter: RichTextFormatter::new(),
        }
    }

    /// Get the current options
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Get mutable access to options
    pub fn options_mut(&mut self) -> &mut ConvertOptions {
        &mut self.options
    }

    /// Convert a native payload to Markdown
    pub fn convert_to_markdown(&self, tree: &NativeTree) -> Result<String> {
        let root = QqMindMapParser::new().parse(tree)?;
        self.to_markdown().convert(&root)
    }

    /// Convert Markdown to a native payload
    pub fn convert_to_native(&self, markdown: &str) -> Result<NativeTree> {
        self.to_native().convert(markdown)
    }

    /// Repair inline markers of every content line, leaving the rest of the
    /// document untouched
    pub fn normalize_markdown(&self, markdown: &str) -> Result<String> {
        self.to_native().normalize(markdown)
    }

    /// Convert a JSON payload to Markdown
    pub fn markdown_from_json(&self, json: &str) -> Result<String> {
        let tree: NativeTree = serde_json::from_str(json)?;
        self.convert_to_markdown(&tree)
    }

    /// Convert Markdown to a JSON payload
    pub fn json_from_markdown(&self, markdown: &str) -> Result<String> {
        let tree = self.convert_to_native(markdown)?;
        Ok(serde_json::to_string(&tree)?)
    }

    /// Convert a mind map copied as HTML to Markdown
    #[cfg(feature = "html")]
    pub fn markdown_from_html(&self, html: &str) -> Result<String> {
        let tree = crate::html::extract_payload(html)?;
        self.convert_to_markdown(&tree)
    }

    fn indent(&self) -> IndentManager {
        IndentManager::new(self.options.indent.clone())
    }

    fn to_markdown(&self) -> QqToMarkdownConverter {
        QqToMarkdownConverter::new(self.formatter, self.indent(), self.options.clone())
    }

    fn to_native(&self) -> MarkdownToQqConverter {
        MarkdownToQqConverter::new(
            self.formatter,
            self.indent(),
            LinePreserver::new(),
            self.options.clone(),
        )
    }
}
