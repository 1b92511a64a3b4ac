//! Page text → block/node tree.
//!
//! Parsing is pure and deterministic. Block structure is decided by
//! indentation: `code:` and `table:` lines capture every following line that
//! is indented deeper than themselves.

mod inline;

pub use inline::is_image_url;

use tracing::trace;

use crate::ast::{Block, Node, ParsedBlock};

/// Parser switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParserOptions {
    /// Treat the first line as the page title.
    pub has_title: bool,
}

/// Parse `input` (lines separated by `\n`) into blocks.
pub fn parse(input: &str, opts: ParserOptions) -> Vec<ParsedBlock> {
    if input.is_empty() {
        return Vec::new();
    }

    let lines: Vec<&str> = input.split('\n').collect();
    let mut blocks = Vec::new();
    let mut i = 0;

    if opts.has_title {
        blocks.push(ParsedBlock::Title {
            text: lines[0].trim().to_string(),
        });
        i = 1;
    }

    while i < lines.len() {
        let line = lines[i];
        let (indent, rest) = split_indent(line);
        i += 1;

        if let Some(file_name) = rest.strip_prefix("code:") {
            let body = take_nested(&lines, &mut i, indent);
            let content = body
                .iter()
                .map(|l| dedent(l, indent + 1))
                .collect::<Vec<_>>()
                .join("\n");
            trace!(file_name, lines = body.len(), "code block");
            blocks.push(ParsedBlock::Content(Block::CodeBlock {
                file_name: file_name.to_string(),
                content,
                indent,
            }));
        } else if let Some(file_name) = rest.strip_prefix("table:") {
            let cells: Vec<Vec<Vec<Node>>> = take_nested(&lines, &mut i, indent)
                .iter()
                .map(|row| {
                    dedent(row, indent + 1)
                        .split('\t')
                        .map(inline::parse_fragment)
                        .collect::<Vec<_>>()
                })
                .collect();
            trace!(file_name, rows = cells.len(), "table");
            blocks.push(ParsedBlock::Content(Block::Table {
                file_name: file_name.to_string(),
                cells,
                indent,
            }));
        } else {
            blocks.push(ParsedBlock::Content(Block::Line {
                indent,
                nodes: inline::parse_line(rest),
            }));
        }
    }

    blocks
}

/// Parse stored page lines, dropping the title line.
pub fn parse_lines(lines: &[String]) -> Vec<Block> {
    parse(&lines.join("\n"), ParserOptions { has_title: true })
        .into_iter()
        .filter_map(ParsedBlock::into_content)
        .collect()
}

/// Nodes of the first line block of a page's `descriptions`.
pub fn parse_description_nodes(descriptions: &[String]) -> Vec<Node> {
    parse(&descriptions.join("\n"), ParserOptions::default())
        .into_iter()
        .find_map(|block| match block {
            ParsedBlock::Content(Block::Line { nodes, .. }) => Some(nodes),
            _ => None,
        })
        .unwrap_or_default()
}

fn is_indent_char(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\u{3000}')
}

/// Indent width in characters and the text after it.
fn split_indent(line: &str) -> (usize, &str) {
    let rest = line.trim_start_matches(is_indent_char);
    let indent = line[..line.len() - rest.len()].chars().count();
    (indent, rest)
}

/// Consume lines indented deeper than `indent`, starting at `*i`.
fn take_nested<'a>(lines: &[&'a str], i: &mut usize, indent: usize) -> Vec<&'a str> {
    let start = *i;
    while *i < lines.len() && split_indent(lines[*i]).0 > indent {
        *i += 1;
    }
    lines[start..*i].to_vec()
}

/// Strip up to `width` leading indent characters.
fn dedent(line: &str, width: usize) -> &str {
    let mut rest = line;
    for _ in 0..width {
        match rest.chars().next() {
            Some(c) if is_indent_char(c) => rest = &rest[c.len_utf8()..],
            _ => break,
        }
    }
    rest
}
