//! Conversion options

use serde::{Deserialize, Serialize};

use mindmark_core::IndentOptions;

/// Highest ATX heading level
pub const MAX_HEADING_LEVELS: usize = 6;

/// How node identifiers are handled across a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdPolicy {
    /// Assign fresh ids (`n1`, `n2`, ...) in pre-order on every import
    #[default]
    Regenerate,
    /// Write ids as ` ^id` block anchors and read them back on import
    Embed,
}

/// Where the produced Markdown is going
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostEnvironment {
    /// Inserted into an existing note; no final line terminator
    Embedded,
    /// Written as a file of its own; ends with a line terminator
    #[default]
    Standalone,
}

/// Options shared by both conversion directions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Indentation unit and strict/lenient reading
    pub indent: IndentOptions,

    /// Number of tree levels written as headings, at most 6
    pub heading_levels: usize,

    /// Bullet list marker (`-`, `*` or `+`)
    pub bullet_marker: char,

    /// Identifier policy
    pub id_policy: IdPolicy,

    /// Target environment
    pub host: HostEnvironment,

    /// Title of the root created when a document has several top-level nodes
    pub root_title: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            indent: IndentOptions::default(),
            heading_levels: 2,
            bullet_marker: '-',
            id_policy: IdPolicy::default(),
            host: HostEnvironment::default(),
            root_title: "Root".to_string(),
        }
    }
}

impl ConvertOptions {
    /// Heading levels clamped to what ATX syntax allows
    pub fn heading_levels(&self) -> usize {
        self.heading_levels.min(MAX_HEADING_LEVELS)
    }

    /// Bullet marker, falling back to `-` for characters that do not start a list item
    pub fn bullet_marker(&self) -> char {
        match self.bullet_marker {
            c @ ('-' | '*' | '+') => c,
            _ => '-',
        }
    }
}
