//! Internal document model
//!
//! A mind map is an ordered tree of [`Node`]s. Each node owns its children
//! outright; depth is a property of the position in the tree and is never
//! stored on the node itself.

/// Inline style set of a [`Run`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Style {
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
}

impl Style {
    pub const PLAIN: Style = Style {
        bold: false,
        italic: false,
        code: false,
    };

    pub const BOLD: Style = Style {
        bold: true,
        italic: false,
        code: false,
    };

    pub const ITALIC: Style = Style {
        bold: false,
        italic: true,
        code: false,
    };

    pub const CODE: Style = Style {
        bold: false,
        italic: false,
        code: true,
    };

    /// Check if no style is applied
    pub fn is_plain(&self) -> bool {
        *self == Style::PLAIN
    }

    pub fn with_bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn with_italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn with_code(mut self) -> Self {
        self.code = true;
        self
    }
}

/// A contiguous span of text sharing one style set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub style: Style,
}

impl Run {
    pub fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Style::PLAIN)
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self::new(text, Style::BOLD)
    }

    pub fn italic(text: impl Into<String>) -> Self {
        Self::new(text, Style::ITALIC)
    }

    pub fn code(text: impl Into<String>) -> Self {
        Self::new(text, Style::CODE)
    }
}

/// Join adjacent runs of the same style and drop empty ones.
///
/// The concatenated text of the result is identical to the input's.
pub fn merge_runs(runs: impl IntoIterator<Item = Run>) -> Vec<Run> {
    let mut merged: Vec<Run> = Vec::new();

    for run in runs {
        if run.text.is_empty() {
            continue;
        }
        match merged.last_mut() {
            Some(last) if last.style == run.style => last.text.push_str(&run.text),
            _ => merged.push(run),
        }
    }

    merged
}

/// A node of the mind map
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Node {
    /// Document-local identifier
    pub id: String,

    /// Styled text content
    pub runs: Vec<Run>,

    /// Ordered children
    pub children: Vec<Node>,

    /// Info string when the node holds a fenced code block.
    /// The code body is stored as a single plain run.
    pub fence: Option<String>,
}

impl Node {
    /// Create an empty node
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Create a node from styled runs
    pub fn with_runs(id: impl Into<String>, runs: Vec<Run>) -> Self {
        Self {
            id: id.into(),
            runs: merge_runs(runs),
            ..Default::default()
        }
    }

    /// Create a node holding plain text
    pub fn text(id: impl Into<String>, text: &str) -> Self {
        Self::with_runs(id, vec![Run::plain(text)])
    }

    /// Create a node holding a fenced code block
    pub fn code_block(id: impl Into<String>, info: impl Into<String>, code: &str) -> Self {
        Self {
            id: id.into(),
            runs: merge_runs(vec![Run::plain(code)]),
            children: Vec::new(),
            fence: Some(info.into()),
        }
    }

    /// Add a child node
    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Builder form of [`Node::add_child`]
    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Check if this node holds a fenced code block
    pub fn is_fenced(&self) -> bool {
        self.fence.is_some()
    }

    /// Concatenated text of all runs, without style markers
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// Number of nodes in this subtree, including this one
    pub fn count(&self) -> usize {
        self.walk().count()
    }

    /// Pre-order traversal yielding each node with its depth relative to `self`
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![(0, self)],
        }
    }

    /// Pre-order traversal with mutable access, used to assign identifiers
    pub fn for_each_mut(&mut self, f: &mut impl FnMut(&mut Node)) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            f(&mut *node);
            stack.extend(node.children.iter_mut().rev());
        }
    }
}

/// Pre-order iterator over a node tree, see [`Node::walk`]
pub struct Walk<'a> {
    stack: Vec<(usize, &'a Node)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        for child in node.children.iter().rev() {
            self.stack.push((depth + 1, child));
        }
        Some((depth, node))
    }
}
