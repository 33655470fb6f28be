//! Markdown to node tree
//!
//! Headings open tree levels by their ATX level; list items and paragraphs
//! nest below the most recent heading according to their indentation. A
//! heading may sit at most one level below the previous heading, never below
//! a list item. Fenced code blocks become code block nodes at the depth of
//! their opening fence, or at the heading level named by a `{level=N}`
//! attribute after the info string. The flat sequence of `(depth, node)` pairs is folded into a tree
//! with an explicit stack of open ancestors.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use mindmark_core::{
    IndentManager, Line, LineKind, LineLayout, LinePreserver, MarkdownDocument, Node,
    RichTextFormatter,
};

use crate::native::NativeTree;
use crate::options::{ConvertOptions, IdPolicy};
use crate::{MindmarkError, Result};

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})(?:[ \t]+(.*?))?[ \t]*$").expect("valid heading regex"));

static LIST_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[-*+]|\d{1,9}[.)])(?:[ \t]+(.*))?$").expect("valid list item regex")
});

static ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)\^([A-Za-z0-9-]+)$").expect("valid anchor regex"));

static FENCE_LEVEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)\{level=([1-6])\}$").expect("valid fence level regex"));

/// Reads Markdown back into a node tree
#[derive(Debug, Clone)]
pub struct MarkdownToQqConverter {
    formatter: RichTextFormatter,
    indent: IndentManager,
    preserver: LinePreserver,
    options: ConvertOptions,
}

/// What a content line turned out to be
enum Entry<'a> {
    Heading { level: usize, text: &'a str },
    Item { text: &'a str },
}

impl MarkdownToQqConverter {
    pub fn new(
        formatter: RichTextFormatter,
        indent: IndentManager,
        preserver: LinePreserver,
        options: ConvertOptions,
    ) -> Self {
        Self {
            formatter,
            indent,
            preserver,
            options,
        }
    }

    /// Build the node tree described by `markdown`
    pub fn parse(&self, markdown: &str) -> Result<Node> {
        let document = MarkdownDocument::parse(markdown, &self.indent)?;
        let layout = self.preserver.record_document(&document);

        let shallowest = document
            .lines()
            .iter()
            .filter_map(|line| match line.kind {
                LineKind::Content => match self.classify(line) {
                    Entry::Heading { level, .. } => Some(level),
                    Entry::Item { .. } => None,
                },
                LineKind::FenceOpen => self.fence_level(line),
                _ => None,
            })
            .min()
            .unwrap_or(1);

        let mut anchors = Anchors::new(self.options.id_policy);
        let mut builder = TreeBuilder::default();
        let mut heading_depth: Option<usize> = None;

        for line in document.lines() {
            let base = heading_depth.map_or(0, |h| h + 1);

            let (depth, node) = match line.kind {
                LineKind::Content => match self.classify(line) {
                    Entry::Heading { level, text } => {
                        let depth =
                            heading_entry_depth(level - shallowest, heading_depth, line.number)?;
                        heading_depth = Some(depth);
                        (depth, self.content_node(text, line.number, &mut anchors)?)
                    }
                    Entry::Item { text } => (
                        base + line.depth,
                        self.content_node(text, line.number, &mut anchors)?,
                    ),
                },
                LineKind::FenceOpen => match self.fence_node(line, &layout, &mut anchors) {
                    (node, Some(level)) => {
                        let depth =
                            heading_entry_depth(level - shallowest, heading_depth, line.number)?;
                        heading_depth = Some(depth);
                        (depth, node)
                    }
                    (node, None) => (base + line.depth, node),
                },
                _ => continue,
            };

            builder.push(depth, node, line.number)?;
        }

        let mut root = match builder.finish() {
            Some(root) => root,
            None => {
                tracing::trace!(title = %self.options.root_title, "adding synthetic root");
                let mut root = Node::text("", &self.options.root_title);
                root.children = builder.take_tops();
                root
            }
        };

        anchors.assign(&mut root);

        tracing::debug!(
            lines = document.lines().len(),
            nodes = root.count(),
            "parsed markdown into tree"
        );

        Ok(root)
    }

    /// Convert `markdown` to a native payload
    pub fn convert(&self, markdown: &str) -> Result<NativeTree> {
        let root = self.parse(markdown)?;
        Ok(NativeTree::from_node(&root))
    }

    /// Repair every content line of `markdown`, keeping blank lines, fenced
    /// blocks and thematic breaks exactly as they are
    pub fn normalize(&self, markdown: &str) -> Result<String> {
        let document = MarkdownDocument::parse(markdown, &self.indent)?;
        let layout = self.preserver.record_document(&document);

        let repaired = document
            .content_lines()
            .map(|line| self.formatter.fix_checked(&line.raw, line.number))
            .collect::<mindmark_core::Result<Vec<_>>>()?;

        let restored = self.preserver.restore(&layout, repaired)?;
        Ok(layout.join(&restored))
    }

    fn classify<'a>(&self, line: &'a Line) -> Entry<'a> {
        let (_, rest) = self.indent.split_indent(&line.raw);

        if let Some(caps) = HEADING.captures(rest) {
            let level = caps.get(1).map_or(1, |m| m.as_str().len());
            let text = caps.get(2).map_or("", |m| m.as_str());
            return Entry::Heading { level, text };
        }

        let text = match LIST_ITEM.captures(rest) {
            Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
            None => rest,
        };
        Entry::Item {
            text: text.trim_end(),
        }
    }

    fn content_node(&self, text: &str, number: usize, anchors: &mut Anchors) -> Result<Node> {
        let (text, id) = anchors.split(text, number);
        let fixed = self.formatter.fix_checked(text, number)?;
        Ok(Node::with_runs(id, self.formatter.parse(&fixed)))
    }

    /// Heading level attribute of a fence line, read the way
    /// [`fence_node`](Self::fence_node) reads it
    fn fence_level(&self, line: &Line) -> Option<usize> {
        let info = line.fence_info()?;
        let info = match self.options.id_policy {
            IdPolicy::Embed => ANCHOR.find(&info).map_or(info.as_str(), |m| &info[..m.start()]),
            IdPolicy::Regenerate => info.as_str(),
        };
        split_fence_level(info.trim_end()).1
    }

    fn fence_node(
        &self,
        line: &Line,
        layout: &LineLayout,
        anchors: &mut Anchors,
    ) -> (Node, Option<usize>) {
        let info = line.fence_info().unwrap_or_default();
        let (info, id) = anchors.split(&info, line.number);
        let (info, level) = split_fence_level(info);

        let (indent, _) = self.indent.split_indent(&line.raw);
        let body: Vec<&str> = layout
            .block_at(line.number)
            .map(|block| {
                block
                    .body
                    .iter()
                    .map(|l| l.strip_prefix(indent).unwrap_or(l.as_str()))
                    .collect()
            })
            .unwrap_or_default();

        (Node::code_block(id, info, &body.join("\n")), level)
    }
}

/// Depth of a heading or heading-level fence. It may open at most one level
/// below the previous heading, so it never nests under a list item.
fn heading_entry_depth(depth: usize, previous: Option<usize>, line: usize) -> Result<usize> {
    let limit = previous.map_or(0, |h| h + 1);
    if depth > limit {
        return Err(MindmarkError::Structure {
            line,
            reason: format!(
                "heading at depth {depth} is more than one level below the previous heading"
            ),
        });
    }
    Ok(depth)
}

/// Split a trailing `{level=N}` off a fence info string
fn split_fence_level(info: &str) -> (&str, Option<usize>) {
    let Some(caps) = FENCE_LEVEL.captures(info) else {
        return (info, None);
    };
    match (caps.get(0), caps.get(1)) {
        (Some(whole), Some(level)) => (
            info[..whole.start()].trim_end(),
            level.as_str().parse().ok(),
        ),
        _ => (info, None),
    }
}

/// Folds `(depth, node)` pairs in document order into a forest
#[derive(Default)]
struct TreeBuilder {
    /// Open ancestors; `stack[i]` sits at depth `i`
    stack: Vec<Node>,
    tops: Vec<Node>,
}

impl TreeBuilder {
    fn push(&mut self, depth: usize, node: Node, line: usize) -> Result<()> {
        if depth > self.stack.len() {
            return Err(MindmarkError::Structure {
                line,
                reason: format!(
                    "depth {depth} is more than one level below the enclosing entry"
                ),
            });
        }
        self.close_to(depth);
        self.stack.push(node);
        Ok(())
    }

    /// Close open nodes until `depth` nodes remain
    fn close_to(&mut self, depth: usize) {
        while self.stack.len() > depth {
            if let Some(done) = self.stack.pop() {
                match self.stack.last_mut() {
                    Some(parent) => parent.add_child(done),
                    None => self.tops.push(done),
                }
            }
        }
    }

    /// The single top-level node, if the document has exactly one
    fn finish(&mut self) -> Option<Node> {
        self.close_to(0);
        if self.tops.len() == 1 {
            self.tops.pop()
        } else {
            None
        }
    }

    fn take_tops(&mut self) -> Vec<Node> {
        std::mem::take(&mut self.tops)
    }
}

/// Block anchor bookkeeping for one conversion
struct Anchors {
    policy: IdPolicy,
    used: HashSet<String>,
}

impl Anchors {
    fn new(policy: IdPolicy) -> Self {
        Self {
            policy,
            used: HashSet::new(),
        }
    }

    /// Split a trailing ` ^id` off `text`. Returns an empty id when there is
    /// none, the policy ignores anchors, or the id was already taken.
    fn split<'a>(&mut self, text: &'a str, line: usize) -> (&'a str, String) {
        if self.policy != IdPolicy::Embed {
            return (text, String::new());
        }
        let Some(caps) = ANCHOR.captures(text) else {
            return (text, String::new());
        };
        let (Some(whole), Some(id)) = (caps.get(0), caps.get(1)) else {
            return (text, String::new());
        };

        let rest = text[..whole.start()].trim_end();
        if self.used.insert(id.as_str().to_string()) {
            (rest, id.as_str().to_string())
        } else {
            tracing::warn!(id = id.as_str(), line, "duplicate block anchor, assigning a new id");
            (rest, String::new())
        }
    }

    /// Give every node without an id a fresh `n<k>` in pre-order
    fn assign(&mut self, root: &mut Node) {
        let mut next = 0usize;
        let used = &mut self.used;
        root.for_each_mut(&mut |node: &mut Node| {
            if !node.id.is_empty() {
                return;
            }
            let id = loop {
                next += 1;
                let candidate = format!("n{next}");
                if !used.contains(&candidate) {
                    break candidate;
                }
            };
            used.insert(id.clone());
            node.id = id;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindmark_core::{IndentMode, IndentOptions, Run};

    fn converter(options: ConvertOptions) -> MarkdownToQqConverter {
        MarkdownToQqConverter::new(
            RichTextFormatter::new(),
            IndentManager::new(options.indent.clone()),
            LinePreserver::new(),
            options,
        )
    }

    fn outline(root: &Node) -> Vec<(usize, String)> {
        root.walk().map(|(d, n)| (d, n.plain_text())).collect()
    }

    fn pairs(items: &[(usize, &str)]) -> Vec<(usize, String)> {
        items.iter().map(|(d, t)| (*d, t.to_string())).collect()
    }

    #[test]
    fn test_headings_and_lists() {
        let md = "# Root\n\n## A\n- A1\n    - A11\n- A2\n\n## B\n";
        let root = converter(ConvertOptions::default()).parse(md).unwrap();
        assert_eq!(
            outline(&root),
            pairs(&[(0, "Root"), (1, "A"), (2, "A1"), (3, "A11"), (2, "A2"), (1, "B")])
        );
    }

    #[test]
    fn test_shallowest_heading_is_depth_zero() {
        let md = "## Top\n### Sub\nplain paragraph\n";
        let root = converter(ConvertOptions::default()).parse(md).unwrap();
        assert_eq!(
            outline(&root),
            pairs(&[(0, "Top"), (1, "Sub"), (2, "plain paragraph")])
        );
    }

    #[test]
    fn test_inline_styles_are_parsed() {
        let root = converter(ConvertOptions::default())
            .parse("- **a****`b`** and *c*")
            .unwrap();
        assert_eq!(
            root.runs,
            vec![
                Run::bold("a"),
                Run::plain(" "),
                Run::new("b", mindmark_core::Style::BOLD.with_code()),
                Run::plain(" and "),
                Run::italic("c"),
            ]
        );
    }

    #[test]
    fn test_orphaned_indent_jump() {
        let err = converter(ConvertOptions::default())
            .parse("- a\n        - b\n")
            .unwrap_err();
        assert!(matches!(err, MindmarkError::Structure { line: 2, .. }));
    }

    #[test]
    fn test_heading_level_jump() {
        let err = converter(ConvertOptions::default())
            .parse("# A\n\n### C\n")
            .unwrap_err();
        assert!(matches!(err, MindmarkError::Structure { line: 3, .. }));
    }

    #[test]
    fn test_indented_first_line() {
        let err = converter(ConvertOptions::default())
            .parse("    - a\n")
            .unwrap_err();
        assert!(matches!(err, MindmarkError::Structure { line: 1, .. }));
    }

    #[test]
    fn test_unclosed_fence() {
        let err = converter(ConvertOptions::default())
            .parse("- a\n- b\n```rust\nfn x() {}\n")
            .unwrap_err();
        assert!(matches!(err, MindmarkError::Structure { line: 3, .. }));
    }

    #[test]
    fn test_strict_and_lenient_indentation() {
        let md = "- a\n  - b\n";
        let err = converter(ConvertOptions::default()).parse(md).unwrap_err();
        assert!(matches!(err, MindmarkError::Structure { line: 2, .. }));

        let lenient = ConvertOptions {
            indent: IndentOptions {
                mode: IndentMode::Lenient,
                ..Default::default()
            },
            ..Default::default()
        };
        let root = converter(lenient).parse(md).unwrap();
        assert_eq!(root.plain_text(), "Root");
        assert_eq!(root.children.len(), 2);
    }

    #[test]
    fn test_synthetic_root_and_regenerated_ids() {
        let options = ConvertOptions {
            root_title: "Notes".to_string(),
            ..Default::default()
        };
        let root = converter(options).parse("- a\n    - a1\n- b").unwrap();

        assert_eq!(root.plain_text(), "Notes");
        let ids: Vec<&str> = root.walk().map(|(_, n)| n.id.as_str()).collect();
        assert_eq!(ids, vec!["n1", "n2", "n3", "n4"]);
    }

    #[test]
    fn test_empty_document_is_a_bare_root() {
        let root = converter(ConvertOptions::default()).parse("").unwrap();
        assert_eq!(root.plain_text(), "Root");
        assert!(root.children.is_empty());
    }

    #[test]
    fn test_fenced_block_node() {
        let md = "# Root\n- A\n    ```rust\n    fn main() {\n\n        x();\n    }\n    ```\n- B\n";
        let root = converter(ConvertOptions {
            heading_levels: 1,
            ..Default::default()
        })
        .parse(md)
        .unwrap();

        let code = &root.children[0].children[0];
        assert_eq!(code.fence.as_deref(), Some("rust"));
        assert_eq!(code.plain_text(), "fn main() {\n\n    x();\n}");
        assert_eq!(root.children[1].plain_text(), "B");
    }

    #[test]
    fn test_fence_with_heading_level() {
        let md = "# Root\n\n## A\n\n```sh {level=2}\nls\n```\n";
        let root = converter(ConvertOptions::default()).parse(md).unwrap();
        assert_eq!(outline(&root), pairs(&[(0, "Root"), (1, "A"), (1, "ls")]));
        assert_eq!(root.children[1].fence.as_deref(), Some("sh"));
    }

    #[test]
    fn test_fence_level_counts_toward_shallowest() {
        let md = "``` {level=1} ^r\nls\n```\n\n## A ^a\n- B ^b\n";
        let root = converter(ConvertOptions {
            id_policy: IdPolicy::Embed,
            ..Default::default()
        })
        .parse(md)
        .unwrap();
        assert_eq!(outline(&root), pairs(&[(0, "ls"), (1, "A"), (2, "B")]));
        assert_eq!(root.id, "r");
        assert_eq!(root.fence.as_deref(), Some(""));
    }

    #[test]
    fn test_heading_below_list_item_is_rejected() {
        let err = converter(ConvertOptions::default())
            .parse("# A\n- x\n### C\n")
            .unwrap_err();
        assert!(matches!(err, MindmarkError::Structure { line: 3, .. }));

        let root = converter(ConvertOptions::default())
            .parse("# A\n- x\n## C\n")
            .unwrap();
        assert_eq!(outline(&root), pairs(&[(0, "A"), (1, "x"), (1, "C")]));
    }

    #[test]
    fn test_embedded_anchors() {
        let options = ConvertOptions {
            id_policy: IdPolicy::Embed,
            ..Default::default()
        };
        let md = "# Root ^r\n- n1\n- A ^x-1\n- B ^x-1\n``` ^c1\nls\n```\n";
        let root = converter(options).parse(md).unwrap();

        let ids: Vec<(&str, String)> = root
            .walk()
            .map(|(_, n)| (n.id.as_str(), n.plain_text()))
            .collect();
        assert_eq!(
            ids,
            vec![
                ("r", "Root".to_string()),
                ("n1", "n1".to_string()),
                ("x-1", "A".to_string()),
                ("n2", "B".to_string()),
                ("c1", "ls".to_string()),
            ]
        );
    }

    #[test]
    fn test_anchor_ids_are_not_reused() {
        let options = ConvertOptions {
            id_policy: IdPolicy::Embed,
            ..Default::default()
        };
        let root = converter(options).parse("- a\n- b ^n1").unwrap();
        let ids: Vec<&str> = root.walk().map(|(_, n)| n.id.as_str()).collect();
        assert_eq!(ids, vec!["n2", "n3", "n1"]);
    }

    #[test]
    fn test_anchors_ignored_when_regenerating() {
        let root = converter(ConvertOptions::default())
            .parse("# Root ^keep")
            .unwrap();
        assert_eq!(root.id, "n1");
        assert_eq!(root.plain_text(), "Root ^keep");
    }

    #[test]
    fn test_escaped_break_text() {
        let root = converter(ConvertOptions::default())
            .parse("# Root\n- \\---\n")
            .unwrap();
        assert_eq!(root.children[0].plain_text(), "---");
    }

    #[test]
    fn test_normalize_keeps_structure() {
        let md = "# **a****b**\n\n\n```\n**x****y**\n```\n---\n- **c****`d`**\n";
        let out = converter(ConvertOptions::default()).normalize(md).unwrap();
        assert_eq!(
            out,
            "# **a** **b**\n\n\n```\n**x****y**\n```\n---\n- **c** **`d`**\n"
        );
    }

    #[test]
    fn test_normalize_is_noop_on_clean_text() {
        let md = "plain text\n\n- **bold** and `code`";
        let out = converter(ConvertOptions::default()).normalize(md).unwrap();
        assert_eq!(out, md);
    }
}
