//! Node tree to Markdown
//!
//! The upper levels of the tree become ATX headings, everything below them
//! becomes nested bullet list items. Code block nodes are written as fenced
//! blocks at the indentation of the list level they sit on. A code block at
//! heading depth has no indentation to carry its depth, so its opening fence
//! names the heading level instead (```` ```sh {level=2} ````).

use once_cell::sync::Lazy;
use regex::Regex;

use mindmark_core::{IndentManager, Node, RichTextFormatter};

use crate::options::{ConvertOptions, HostEnvironment, IdPolicy};
use crate::Result;

/// Ids that can be written as a block anchor
static ANCHOR_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9-]+$").expect("valid anchor id regex"));

/// Writes a node tree as Markdown
#[derive(Debug, Clone)]
pub struct QqToMarkdownConverter {
    formatter: RichTextFormatter,
    indent: IndentManager,
    options: ConvertOptions,
}

impl QqToMarkdownConverter {
    pub fn new(formatter: RichTextFormatter, indent: IndentManager, options: ConvertOptions) -> Self {
        Self {
            formatter,
            indent,
            options,
        }
    }

    /// Render `root` and all of its descendants
    pub fn convert(&self, root: &Node) -> Result<String> {
        let levels = self.options.heading_levels();
        let mut lines: Vec<String> = Vec::with_capacity(root.count() * 2);

        for (depth, node) in root.walk() {
            let heading = depth < levels;
            if heading && !lines.is_empty() {
                lines.push(String::new());
            }

            let indent = if heading {
                String::new()
            } else {
                self.indent.depth_to_indent(depth - levels)
            };

            if node.is_fenced() {
                let level = heading.then_some(depth + 1);
                self.push_fence(node, &indent, level, &mut lines);
                continue;
            }

            let mut text = self.formatter.render(&node.runs);
            if looks_like_break(&text) {
                text.insert(0, '\\');
            }
            text.push_str(&self.anchor(node));

            let line = if heading {
                format!("{} {}", "#".repeat(depth + 1), text)
            } else {
                format!("{}{} {}", indent, self.options.bullet_marker(), text)
            };

            let fixed = self.formatter.fix_checked(line.trim_end(), lines.len() + 1)?;
            lines.push(fixed);
        }

        let mut out = lines.join("\n");
        if self.options.host == HostEnvironment::Standalone {
            out.push('\n');
        }

        tracing::debug!(
            nodes = root.count(),
            lines = lines.len(),
            "converted tree to markdown"
        );

        Ok(out)
    }

    fn push_fence(
        &self,
        node: &Node,
        indent: &str,
        level: Option<usize>,
        lines: &mut Vec<String>,
    ) {
        let code = node.plain_text();
        let info = node.fence.as_deref().unwrap_or("");
        let fence = fence_for(&code, info);
        let level = level.map(|l| format!(" {{level={l}}}")).unwrap_or_default();

        lines.push(format!("{indent}{fence}{info}{level}{}", self.anchor(node)));

        if !code.is_empty() {
            for line in code.split('\n') {
                if line.is_empty() {
                    lines.push(String::new());
                } else {
                    lines.push(format!("{indent}{line}"));
                }
            }
        }

        lines.push(format!("{indent}{fence}"));
    }

    /// ` ^id` suffix for the embed policy
    fn anchor(&self, node: &Node) -> String {
        if self.options.id_policy != IdPolicy::Embed {
            return String::new();
        }
        if ANCHOR_ID.is_match(&node.id) {
            format!(" ^{}", node.id)
        } else {
            tracing::warn!(id = %node.id, "node id cannot be written as a block anchor");
            String::new()
        }
    }
}

/// A fence longer than any backtick run in the code. Info strings holding a
/// backtick need a tilde fence.
fn fence_for(code: &str, info: &str) -> String {
    let ch = if info.contains('`') { '~' } else { '`' };
    let longest = code
        .split(|c: char| c != ch)
        .map(|run| run.chars().count())
        .max()
        .unwrap_or(0);
    ch.to_string().repeat((longest + 1).max(3))
}

/// Text that would turn its line into a thematic break
fn looks_like_break(text: &str) -> bool {
    let marks: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    marks.len() >= 2 && marks.iter().all(|&c| matches!(c, '-' | '_'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindmark_core::{IndentOptions, IndentUnit, Run, Style};

    fn converter(options: ConvertOptions) -> QqToMarkdownConverter {
        QqToMarkdownConverter::new(
            RichTextFormatter::new(),
            IndentManager::new(options.indent.clone()),
            options,
        )
    }

    fn sample() -> Node {
        Node::text("r", "Root")
            .child(
                Node::text("a", "A")
                    .child(Node::text("a1", "A1").child(Node::text("a11", "A11")))
                    .child(Node::text("a2", "A2")),
            )
            .child(Node::text("b", "B"))
    }

    #[test]
    fn test_headings_then_lists() {
        let markdown = converter(ConvertOptions::default())
            .convert(&sample())
            .unwrap();
        assert_eq!(
            markdown,
            "# Root\n\n## A\n- A1\n    - A11\n- A2\n\n## B\n"
        );
    }

    #[test]
    fn test_heading_levels_zero_is_all_lists() {
        let options = ConvertOptions {
            heading_levels: 0,
            bullet_marker: '*',
            indent: IndentOptions {
                unit: IndentUnit::Spaces(2),
                ..Default::default()
            },
            host: HostEnvironment::Embedded,
            ..Default::default()
        };
        let markdown = converter(options).convert(&sample()).unwrap();
        assert_eq!(
            markdown,
            "* Root\n  * A\n    * A1\n      * A11\n    * A2\n  * B"
        );
    }

    #[test]
    fn test_lines_are_repaired() {
        let root = Node::with_runs("r", vec![Run::bold("a"), Run::new("b", Style::BOLD.with_code())]);
        let markdown = converter(ConvertOptions::default()).convert(&root).unwrap();
        assert_eq!(markdown, "# **a** **`b`**\n");
    }

    #[test]
    fn test_fenced_node() {
        let root = Node::text("r", "Root").child(
            Node::text("a", "A").child(Node::code_block("c", "rust", "fn main() {\n\n    x();\n}")),
        );
        let markdown = converter(ConvertOptions {
            heading_levels: 1,
            ..Default::default()
        })
        .convert(&root)
        .unwrap();
        assert_eq!(
            markdown,
            "# Root\n- A\n    ```rust\n    fn main() {\n\n        x();\n    }\n    ```\n"
        );
    }

    #[test]
    fn test_code_block_at_heading_depth_names_its_level() {
        let root = Node::text("r", "Root")
            .child(Node::text("a", "A"))
            .child(Node::code_block("c", "sh", "ls"));
        let markdown = converter(ConvertOptions::default()).convert(&root).unwrap();
        assert_eq!(markdown, "# Root\n\n## A\n\n```sh {level=2}\nls\n```\n");
    }

    #[test]
    fn test_code_block_root_with_heading_children() {
        let root = Node::code_block("r", "", "ls")
            .child(Node::text("a", "A").child(Node::text("b", "B")));
        let markdown = converter(ConvertOptions {
            id_policy: IdPolicy::Embed,
            ..Default::default()
        })
        .convert(&root)
        .unwrap();
        assert_eq!(markdown, "``` {level=1} ^r\nls\n```\n\n## A ^a\n- B ^b\n");
    }

    #[test]
    fn test_fence_outgrows_backticks_in_code() {
        assert_eq!(fence_for("a ```` b", ""), "`````");
        assert_eq!(fence_for("plain", ""), "```");
        assert_eq!(fence_for("x", "a`b"), "~~~");
    }

    #[test]
    fn test_embedded_anchors() {
        let root = Node::text("r", "Root")
            .child(Node::text("x-1", "A"))
            .child(Node::text("bad id", "B"))
            .child(Node::code_block("c1", "", "ls"));
        let markdown = converter(ConvertOptions {
            id_policy: IdPolicy::Embed,
            heading_levels: 1,
            ..Default::default()
        })
        .convert(&root)
        .unwrap();
        assert_eq!(
            markdown,
            "# Root ^r\n- A ^x-1\n- B\n``` ^c1\nls\n```\n"
        );
    }

    #[test]
    fn test_break_like_text_is_escaped() {
        let root = Node::text("r", "Root").child(Node::text("a", "---"));
        let markdown = converter(ConvertOptions {
            heading_levels: 1,
            ..Default::default()
        })
        .convert(&root)
        .unwrap();
        assert_eq!(markdown, "# Root\n- \\---\n");
    }

    #[test]
    fn test_multiline_text_uses_br() {
        let root = Node::text("r", "one\ntwo");
        let markdown = converter(ConvertOptions::default()).convert(&root).unwrap();
        assert_eq!(markdown, "# one<br>two\n");
    }
}
