//! Document
//!
//! The root object handed to consumers: the ordered node list, the source it
//! came from and the fragment flag, plus the rule hand-off slots.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::Ruleset;
use crate::error::WalkError;
use crate::node::{Node, NodeData, NodeId, NodeKind};
use crate::walker::{sync_walk_nodes, walk_nodes, walk_nodes_with, Walker};

/// A rule that can be attached to a document for the duration of a pass
pub trait Rule: fmt::Debug {
    fn name(&self) -> &str;
}

const DEBUG_RAW_LIMIT: usize = 40;

#[derive(Debug)]
pub struct Document {
    raw: String,
    nodes: Vec<Node>,
    is_fragment: bool,
    ruleset: Option<Ruleset>,
    current_rule: Option<Arc<dyn Rule>>,
}

impl Document {
    pub fn new(nodes: Vec<Node>, raw: impl Into<String>, is_fragment: bool, ruleset: Option<Ruleset>) -> Self {
        Document {
            raw: raw.into(),
            nodes,
            is_fragment,
            ruleset,
            current_rule: None,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// All nodes in pre-order, end tags and ghosts included
    pub fn list(&self) -> &[Node] {
        &self.nodes
    }

    pub fn is_fragment(&self) -> bool {
        self.is_fragment
    }

    pub fn get_node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn parent_of(&self, node: &Node) -> Option<&Node> {
        node.parent.and_then(|id| self.node(id))
    }

    pub fn children_of<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = &'a Node> + 'a {
        node.children().iter().filter_map(move |&id| self.node(id))
    }

    /// Top-level nodes that are part of the tree
    pub fn roots(&self) -> impl Iterator<Item = &Node> {
        self.nodes
            .iter()
            .filter(|node| node.parent.is_none() && !matches!(node.data, NodeData::EndTag(_) | NodeData::Ghost { .. }))
    }

    pub fn ruleset(&self) -> Option<&Ruleset> {
        self.ruleset.as_ref()
    }

    pub fn set_ruleset(&mut self, ruleset: Option<Ruleset>) {
        self.ruleset = ruleset;
    }

    /// Attaches (or with `None` detaches) the rule currently being run
    pub fn set_rule(&mut self, rule: Option<Arc<dyn Rule>>) {
        self.current_rule = rule;
    }

    pub fn rule(&self) -> Option<&Arc<dyn Rule>> {
        self.current_rule.as_ref()
    }

    /// Visits every node in order, awaiting each visit before the next
    pub async fn walk<W: Walker + ?Sized>(&self, walker: &mut W) -> Result<(), WalkError> {
        walk_nodes(&self.nodes, None, walker).await
    }

    /// Like [`Document::walk`], restricted to nodes of `kind`
    pub async fn walk_on<W: Walker + ?Sized>(&self, kind: NodeKind, walker: &mut W) -> Result<(), WalkError> {
        walk_nodes(&self.nodes, Some(kind), walker).await
    }

    /// Walks with an async closure
    pub async fn walk_fn<'a, F, Fut>(&'a self, kind: Option<NodeKind>, visit: F) -> Result<(), WalkError>
    where
        F: FnMut(&'a Node) -> Fut,
        Fut: Future<Output = anyhow::Result<()>> + 'a,
    {
        walk_nodes_with(&self.nodes, kind, visit).await
    }

    pub fn sync_walk<F>(&self, visit: F) -> Result<(), WalkError>
    where
        F: FnMut(&Node) -> anyhow::Result<()>,
    {
        sync_walk_nodes(&self.nodes, None, visit)
    }

    pub fn sync_walk_on<F>(&self, kind: NodeKind, visit: F) -> Result<(), WalkError>
    where
        F: FnMut(&Node) -> anyhow::Result<()>,
    {
        sync_walk_nodes(&self.nodes, Some(kind), visit)
    }

    pub fn to_json(&self) -> Value {
        json!({
            "raw": self.raw,
            "isFragment": self.is_fragment,
            "nodeList": self.nodes.iter().map(Node::to_json).collect::<Vec<_>>(),
        })
    }

    /// One line per node: location, offsets, indented name, visible raw
    ///
    /// ```text
    /// [1:1]>[1:6](0,5)div: <div>
    /// [1:6]>[1:9](5,8)  #text: abc
    /// [1:9]>[1:15](8,14)/div: </div>
    /// ```
    pub fn to_debug_map(&self) -> Vec<String> {
        self.nodes
            .iter()
            .map(|node| {
                let t = &node.token;
                let name = match &node.data {
                    NodeData::EndTag(end) => format!("/{}", end.node_name),
                    _ => node.node_name().to_string(),
                };
                format!(
                    "[{}:{}]>[{}:{}]({},{}){}{}{}: {}",
                    t.start_line,
                    t.start_col,
                    t.end_line,
                    t.end_col,
                    t.start_offset,
                    t.end_offset,
                    "  ".repeat(node.depth),
                    name,
                    if node.is_ghost() { "(👻)" } else { "" },
                    visible_raw(&t.raw),
                )
            })
            .collect()
    }
}

/// Serializes the node list back to source
impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.nodes.iter().try_for_each(|node| f.write_str(node.raw()))
    }
}

fn visible_raw(raw: &str) -> String {
    let mut visible: String = raw
        .chars()
        .take(DEBUG_RAW_LIMIT)
        .map(|ch| match ch {
            '\n' => '⏎',
            '\t' => '→',
            ' ' => '␣',
            other => other,
        })
        .collect();
    if raw.chars().count() > DEBUG_RAW_LIMIT {
        visible.push('…');
    }
    visible
}
