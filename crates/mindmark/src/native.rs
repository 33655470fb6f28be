//! Native mind-map payload
//!
//! The mind-mapping tool exports its document as a flat table of nodes that
//! reference their children by id. These types mirror that JSON shape; they
//! are validated and turned into a [`Node`] tree by
//! [`QqMindMapParser`](crate::QqMindMapParser).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use mindmark_core::{Node, Run, Style};

/// A whole mind-map document
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NativeTree {
    /// Id of the root node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    /// Nodes keyed by id, in export order
    #[serde(default)]
    pub nodes: IndexMap<String, NativeNode>,
}

/// A node entry of a [`NativeTree`]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NativeNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<NativeTitle>,

    /// Child ids in order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<String>>,

    /// Info string of a code block node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fence: Option<String>,
}

/// Node title: plain text or styled spans
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NativeTitle {
    Plain(String),
    Rich(Vec<NativeSpan>),
}

/// A styled span of a rich title
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NativeSpan {
    pub text: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub code: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl NativeTitle {
    /// Styled runs of this title
    pub fn to_runs(&self) -> Vec<Run> {
        match self {
            NativeTitle::Plain(text) => vec![Run::plain(text.as_str())],
            NativeTitle::Rich(spans) => spans
                .iter()
                .map(|span| {
                    Run::new(
                        span.text.as_str(),
                        Style {
                            bold: span.bold,
                            italic: span.italic,
                            code: span.code,
                        },
                    )
                })
                .collect(),
        }
    }

    /// Title for `runs`, using the plain form when no styling is present
    pub fn from_runs(runs: &[Run]) -> Self {
        if runs.iter().all(|r| r.style.is_plain()) {
            return NativeTitle::Plain(runs.iter().map(|r| r.text.as_str()).collect());
        }
        NativeTitle::Rich(
            runs.iter()
                .map(|r| NativeSpan {
                    text: r.text.clone(),
                    bold: r.style.bold,
                    italic: r.style.italic,
                    code: r.style.code,
                })
                .collect(),
        )
    }
}

impl NativeTree {
    /// Flatten a node tree into a payload. Nodes are listed in pre-order.
    pub fn from_node(root: &Node) -> Self {
        let nodes = root
            .walk()
            .map(|(_, node)| {
                let entry = NativeNode {
                    title: Some(NativeTitle::from_runs(&node.runs)),
                    children: Some(node.children.iter().map(|c| c.id.clone()).collect()),
                    fence: node.fence.clone(),
                };
                (node.id.clone(), entry)
            })
            .collect();

        Self {
            root: Some(root.id.clone()),
            nodes,
        }
    }

    /// Number of node entries
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
