//! Node tree → plain text, for descriptions and feed summaries.

use crate::ast::{Block, Node};
use crate::parser::{ParserOptions, parse};

/// Flatten `nodes` into trimmed plain text.
pub fn nodes_to_text(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        push_node(&mut out, node);
    }
    out.trim().to_string()
}

fn push_node(out: &mut String, node: &Node) {
    match node {
        Node::Plain { text, .. }
        | Node::Code { text, .. }
        | Node::Helpfeel { text, .. } => out.push_str(text),
        Node::CommandLine { symbol, text, .. } => {
            out.push_str(symbol);
            out.push(' ');
            out.push_str(text);
        }
        Node::Formula { formula, .. } => out.push_str(formula),
        Node::GoogleMap { place, .. } => out.push_str(place.as_deref().unwrap_or_default()),
        Node::HashTag { content, .. } => {
            out.push('#');
            out.push_str(content);
        }
        Node::Link { href, content, .. } => {
            out.push_str(if content.is_empty() { href } else { content });
        }
        Node::Blank { .. }
        | Node::Icon { .. }
        | Node::StrongIcon { .. }
        | Node::Image { .. }
        | Node::StrongImage { .. } => {}
        Node::NumberList { nodes, .. }
        | Node::Quote { nodes, .. }
        | Node::Strong { nodes, .. }
        | Node::Decoration { nodes, .. } => {
            for child in nodes {
                push_node(out, child);
            }
        }
    }
}

/// Flatten one block: lines by their nodes, code blocks by their content,
/// tables by their concatenated cells.
pub fn block_to_text(block: &Block) -> String {
    match block {
        Block::Line { nodes, .. } => nodes_to_text(nodes),
        Block::CodeBlock { content, .. } => content.trim().to_string(),
        Block::Table { cells, .. } => {
            let joined: String = cells
                .iter()
                .flatten()
                .map(|cell| nodes_to_text(cell))
                .collect();
            joined.trim().to_string()
        }
    }
}

/// Plain-text summary of a page's `descriptions`.
///
/// The entries are joined with newlines and parsed once without a title line,
/// so a code block or table may span several entries. Every block is
/// flattened, empty results are dropped and the rest are joined with single
/// spaces.
pub fn descriptions_to_text(descriptions: &[String]) -> String {
    let parts: Vec<String> = parse(&descriptions.join("\n"), ParserOptions::default())
        .into_iter()
        .filter_map(|block| block.into_content())
        .map(|block| block_to_text(&block))
        .filter(|text| !text.is_empty())
        .collect();
    parts.join(" ").trim().to_string()
}
