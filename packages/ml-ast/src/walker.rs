//! Ordered document traversal
//!
//! Both walkers visit nodes in node-list order. The async walker awaits each
//! visitor call before starting the next one; the first failure aborts the
//! walk.

use std::future::Future;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::error::WalkError;
use crate::node::{Node, NodeKind};

/// An asynchronous node visitor
#[async_trait(?Send)]
pub trait Walker {
    async fn visit(&mut self, node: &Node) -> anyhow::Result<()>;
}

fn selected(node: &Node, kind: Option<NodeKind>) -> bool {
    kind.map_or(true, |kind| node.kind() == kind)
}

fn visitor_failed(index: usize, node: &Node, source: anyhow::Error) -> WalkError {
    debug!(index, kind = ?node.kind(), error = %source, "walk aborted by visitor");
    WalkError::Visitor {
        index,
        kind: node.kind(),
        source,
    }
}

pub(crate) async fn walk_nodes<W>(nodes: &[Node], kind: Option<NodeKind>, walker: &mut W) -> Result<(), WalkError>
where
    W: Walker + ?Sized,
{
    for (index, node) in nodes.iter().enumerate().filter(|(_, node)| selected(node, kind)) {
        trace!(index, kind = ?node.kind(), "visiting node");
        walker
            .visit(node)
            .await
            .map_err(|source| visitor_failed(index, node, source))?;
    }
    Ok(())
}

/// Like [`walk_nodes`] with a closure; the returned futures may borrow the node
pub(crate) async fn walk_nodes_with<'a, F, Fut>(nodes: &'a [Node], kind: Option<NodeKind>, mut visit: F) -> Result<(), WalkError>
where
    F: FnMut(&'a Node) -> Fut,
    Fut: Future<Output = anyhow::Result<()>> + 'a,
{
    for (index, node) in nodes.iter().enumerate().filter(|(_, node)| selected(node, kind)) {
        trace!(index, kind = ?node.kind(), "visiting node");
        visit(node)
            .await
            .map_err(|source| visitor_failed(index, node, source))?;
    }
    Ok(())
}

pub(crate) fn sync_walk_nodes<F>(nodes: &[Node], kind: Option<NodeKind>, mut visit: F) -> Result<(), WalkError>
where
    F: FnMut(&Node) -> anyhow::Result<()>,
{
    for (index, node) in nodes.iter().enumerate().filter(|(_, node)| selected(node, kind)) {
        trace!(index, kind = ?node.kind(), "visiting node");
        visit(node).map_err(|source| visitor_failed(index, node, source))?;
    }
    Ok(())
}
