//! Pure tree rebuilding.
//!
//! A [`NodeProcessor`] maps each node to a replacement or prunes it. The
//! walkers rebuild composites from their processed children and drop any
//! composite left without children, so pruning always closes upward.

use crate::ast::{Block, Node};

/// Per-node transformation used by [`process_blocks`] and [`process_nodes`].
pub trait NodeProcessor {
    /// Transform `node`; `None` prunes it.
    ///
    /// `depth` is 0 for nodes directly on a line or in a table cell and grows
    /// by one for each enclosing composite. Composites are processed before
    /// their children.
    fn process(&mut self, node: Node, depth: usize) -> Option<Node>;
}

impl<F> NodeProcessor for F
where
    F: FnMut(Node, usize) -> Option<Node>,
{
    fn process(&mut self, node: Node, depth: usize) -> Option<Node> {
        self(node, depth)
    }
}

/// Rebuild every line and table cell of `blocks` through `processor`.
///
/// Code blocks are carried over unchanged; lines stay even when all their
/// nodes were pruned.
pub fn process_blocks<P: NodeProcessor + ?Sized>(
    blocks: Vec<Block>,
    processor: &mut P,
) -> Vec<Block> {
    blocks
        .into_iter()
        .map(|block| match block {
            Block::Line { indent, nodes } => Block::Line {
                indent,
                nodes: process_nodes(nodes, processor, 0),
            },
            Block::Table {
                file_name,
                cells,
                indent,
            } => Block::Table {
                file_name,
                cells: cells
                    .into_iter()
                    .map(|row| {
                        row.into_iter()
                            .map(|cell| process_nodes(cell, processor, 0))
                            .collect::<Vec<_>>()
                    })
                    .collect(),
                indent,
            },
            code @ Block::CodeBlock { .. } => code,
        })
        .collect()
}

/// Rebuild `nodes` at nesting `depth` through `processor`.
pub fn process_nodes<P: NodeProcessor + ?Sized>(
    nodes: Vec<Node>,
    processor: &mut P,
    depth: usize,
) -> Vec<Node> {
    nodes
        .into_iter()
        .filter_map(|node| {
            let node = processor.process(node, depth)?;
            rebuild_children(node, processor, depth + 1)
        })
        .collect()
}

/// Process a composite's children, dropping the composite when none survive.
fn rebuild_children<P: NodeProcessor + ?Sized>(
    node: Node,
    processor: &mut P,
    depth: usize,
) -> Option<Node> {
    let rebuilt = match node {
        Node::NumberList { raw, number, nodes } => Node::NumberList {
            raw,
            number,
            nodes: process_nodes(nodes, processor, depth),
        },
        Node::Quote { raw, nodes } => Node::Quote {
            raw,
            nodes: process_nodes(nodes, processor, depth),
        },
        Node::Strong { raw, nodes } => Node::Strong {
            raw,
            nodes: process_nodes(nodes, processor, depth),
        },
        Node::Decoration {
            raw,
            decos,
            nodes,
            anchor,
        } => Node::Decoration {
            raw,
            decos,
            nodes: process_nodes(nodes, processor, depth),
            anchor,
        },
        leaf => return Some(leaf),
    };

    if rebuilt.children().is_some_and(<[Node]>::is_empty) {
        None
    } else {
        Some(rebuilt)
    }
}
