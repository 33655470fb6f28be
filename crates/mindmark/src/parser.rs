//! Native payload validation
//!
//! [`QqMindMapParser`] checks that a [`NativeTree`] describes a proper tree
//! and builds the owned [`Node`] tree from it. Validation walks the payload
//! with an explicit stack and visited set, so a cyclic payload is rejected
//! instead of looping. The resulting tree still drops, clones and compares
//! recursively, so very deep payloads are bounded by the thread stack.

use std::collections::HashSet;

use mindmark_core::Node;

use crate::native::{NativeNode, NativeTree};
use crate::{MindmarkError, Result};

/// Builds the internal tree from a native payload
#[derive(Debug, Clone, Copy, Default)]
pub struct QqMindMapParser;

/// A node on the build stack whose children are still being attached
struct Frame<'a> {
    node: Node,
    children: &'a [String],
    next: usize,
}

impl QqMindMapParser {
    pub fn new() -> Self {
        Self
    }

    /// Validate `tree` and build its node tree.
    ///
    /// Every node needs a title and a child list; every child reference must
    /// resolve; each node is reached exactly once from the root.
    pub fn parse(&self, tree: &NativeTree) -> Result<Node> {
        let root_id = tree
            .root
            .as_deref()
            .ok_or_else(|| malformed("", "payload has no root"))?;
        let root = lookup(tree, root_id, None)?;

        let mut visited: HashSet<&str> = HashSet::with_capacity(tree.nodes.len());
        let mut on_path: HashSet<&str> = HashSet::new();
        visited.insert(root_id);
        on_path.insert(root_id);

        let mut stack = vec![frame(root_id, root)?];

        while let Some(top) = stack.last_mut() {
            if top.next == top.children.len() {
                let done = stack.pop().map(|f| f.node);
                if let Some(done) = done {
                    on_path.remove(done.id.as_str());
                    match stack.last_mut() {
                        Some(parent) => parent.node.add_child(done),
                        None => {
                            check_reachable(tree, &visited)?;
                            return Ok(done);
                        }
                    }
                }
                continue;
            }

            let children = top.children;
            let child_id = children[top.next].as_str();
            top.next += 1;
            let parent_id = top.node.id.clone();

            let child = lookup(tree, child_id, Some(&parent_id))?;
            if on_path.contains(child_id) {
                return Err(malformed(
                    child_id,
                    format!("cycle through child reference from `{parent_id}`"),
                ));
            }
            if !visited.insert(child_id) {
                return Err(malformed(child_id, "node has more than one parent"));
            }
            on_path.insert(child_id);
            stack.push(frame(child_id, child)?);
        }

        Err(malformed(root_id, "empty build stack"))
    }

    /// Deserialize and validate a JSON payload
    pub fn parse_json(&self, json: &str) -> Result<Node> {
        let tree: NativeTree = serde_json::from_str(json)?;
        self.parse(&tree)
    }
}

fn malformed(node: &str, reason: impl Into<String>) -> MindmarkError {
    MindmarkError::MalformedTree {
        node: node.to_string(),
        reason: reason.into(),
    }
}

fn lookup<'a>(tree: &'a NativeTree, id: &str, parent: Option<&str>) -> Result<&'a NativeNode> {
    tree.nodes.get(id).ok_or_else(|| match parent {
        Some(parent) => malformed(id, format!("dangling child reference from `{parent}`")),
        None => malformed(id, "root id does not name a node"),
    })
}

fn frame<'a>(id: &str, entry: &'a NativeNode) -> Result<Frame<'a>> {
    let title = entry
        .title
        .as_ref()
        .ok_or_else(|| malformed(id, "missing title"))?;
    let children = entry
        .children
        .as_deref()
        .ok_or_else(|| malformed(id, "missing children"))?;

    let mut node = Node::with_runs(id, title.to_runs());
    node.fence = entry.fence.clone();

    Ok(Frame {
        node,
        children,
        next: 0,
    })
}

fn check_reachable(tree: &NativeTree, visited: &HashSet<&str>) -> Result<()> {
    match tree.nodes.keys().find(|id| !visited.contains(id.as_str())) {
        Some(id) => Err(malformed(id, "node is unreachable from the root")),
        None => Ok(()),
    }
}
