//! Node tree produced by the parser and rewritten by tree processors.
//!
//! Every node keeps its `raw` source text. Serialization uses a `type` tag
//! and camelCase field names, which is the shape the site renderer consumes.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// Parser output for one logical line group.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBlock {
    /// First line of a page parsed with a title. Never published.
    Title { text: String },
    Content(Block),
}

impl ParsedBlock {
    /// The content block, `None` for the title line.
    pub fn into_content(self) -> Option<Block> {
        match self {
            Self::Title { .. } => None,
            Self::Content(block) => Some(block),
        }
    }
}

/// A publishable block of a page body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Block {
    Line {
        indent: usize,
        nodes: Vec<Node>,
    },
    CodeBlock {
        file_name: String,
        content: String,
        indent: usize,
    },
    Table {
        file_name: String,
        /// Rows of cells of nodes.
        cells: Vec<Vec<Vec<Node>>>,
        indent: usize,
    },
}

// ---------------------------------------------------------------------------
// Path types
// ---------------------------------------------------------------------------

/// How a link target is interpreted.
///
/// The parser only produces `Relative`, `Root` and `Absolute`; the classifier
/// replaces them with `Internal` or `External`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PathType {
    /// A title in the same project: `[title]`, `#title`.
    Relative,
    /// A path on the origin host: `[/project/title]`.
    Root,
    /// A full URL.
    Absolute,
    /// Points at a page published on the site.
    Internal,
    /// Points away from the site.
    External,
}

impl PathType {
    pub fn is_classified(self) -> bool {
        matches!(self, Self::Internal | Self::External)
    }
}

// ---------------------------------------------------------------------------
// Decorations
// ---------------------------------------------------------------------------

/// One decoration code of `[*-/ text]`.
///
/// Serialized like the origin's own notation: `*-N` for N asterisks and the
/// bare symbol for everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Deco {
    /// `*` repeated N times (1..=10), rendered as heading-like emphasis.
    Emphasis(u8),
    /// Any other decoration symbol, e.g. `/` italic, `-` strike, `_` underline.
    Symbol(char),
}

/// Characters allowed in a decoration prefix.
pub const DECO_SYMBOLS: &str = "*!\"#%&'()+,-./{|}<>_~";

/// Upper bound on the `*` emphasis level.
const MAX_EMPHASIS: usize = 10;

impl Deco {
    /// Parse a decoration prefix such as `**/` into its codes.
    ///
    /// Asterisks collapse into a single [`Deco::Emphasis`]; other symbols are
    /// kept once each, in first-occurrence order.
    pub fn parse_prefix(prefix: &str) -> Vec<Deco> {
        let stars = prefix.chars().filter(|c| *c == '*').count();
        let mut decos = Vec::new();
        if stars > 0 {
            decos.push(Deco::Emphasis(stars.min(MAX_EMPHASIS) as u8));
        }
        for c in prefix.chars().filter(|c| *c != '*') {
            let deco = Deco::Symbol(c);
            if !decos.contains(&deco) {
                decos.push(deco);
            }
        }
        decos
    }
}

impl fmt::Display for Deco {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Emphasis(level) => write!(f, "*-{level}"),
            Self::Symbol(c) => write!(f, "{c}"),
        }
    }
}

impl From<Deco> for String {
    fn from(deco: Deco) -> Self {
        deco.to_string()
    }
}

impl TryFrom<String> for Deco {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if let Some(level) = value.strip_prefix("*-") {
            return match level.parse::<u8>() {
                Ok(n) if (1..=MAX_EMPHASIS as u8).contains(&n) => Ok(Self::Emphasis(n)),
                _ => Err(format!("invalid emphasis level: {value}")),
            };
        }
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c != '*' && DECO_SYMBOLS.contains(c) => Ok(Self::Symbol(c)),
            _ => Err(format!("invalid decoration: {value}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// An inline node.
///
/// `Decoration`, `NumberList`, `Quote` and `Strong` are composites: they own
/// their children and disappear when a transformation removes all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Node {
    Plain {
        raw: String,
        text: String,
    },
    Blank {
        raw: String,
        text: String,
    },
    Code {
        raw: String,
        text: String,
    },
    CommandLine {
        raw: String,
        symbol: String,
        text: String,
    },
    Formula {
        raw: String,
        formula: String,
    },
    GoogleMap {
        raw: String,
        latitude: f64,
        longitude: f64,
        zoom: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        place: Option<String>,
        url: String,
    },
    HashTag {
        raw: String,
        path_type: PathType,
        /// Target before classification, site or browse URL after.
        href: String,
        /// Tag name without `#`.
        content: String,
    },
    Helpfeel {
        raw: String,
        text: String,
    },
    Icon {
        raw: String,
        path: String,
        path_type: PathType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        src: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        href: Option<String>,
    },
    StrongIcon {
        raw: String,
        path: String,
        path_type: PathType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        src: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        href: Option<String>,
    },
    Image {
        raw: String,
        src: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        link: Option<String>,
    },
    StrongImage {
        raw: String,
        src: String,
    },
    Link {
        raw: String,
        path_type: PathType,
        href: String,
        /// Label; empty until classification fills it with the target.
        content: String,
    },
    NumberList {
        raw: String,
        number: u32,
        nodes: Vec<Node>,
    },
    Quote {
        raw: String,
        nodes: Vec<Node>,
    },
    Strong {
        raw: String,
        nodes: Vec<Node>,
    },
    Decoration {
        raw: String,
        decos: Vec<Deco>,
        nodes: Vec<Node>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        anchor: Option<String>,
    },
}

impl Node {
    pub(crate) fn plain(text: &str) -> Self {
        Self::Plain {
            raw: text.to_string(),
            text: text.to_string(),
        }
    }

    pub fn raw(&self) -> &str {
        match self {
            Self::Plain { raw, .. }
            | Self::Blank { raw, .. }
            | Self::Code { raw, .. }
            | Self::CommandLine { raw, .. }
            | Self::Formula { raw, .. }
            | Self::GoogleMap { raw, .. }
            | Self::HashTag { raw, .. }
            | Self::Helpfeel { raw, .. }
            | Self::Icon { raw, .. }
            | Self::StrongIcon { raw, .. }
            | Self::Image { raw, .. }
            | Self::StrongImage { raw, .. }
            | Self::Link { raw, .. }
            | Self::NumberList { raw, .. }
            | Self::Quote { raw, .. }
            | Self::Strong { raw, .. }
            | Self::Decoration { raw, .. } => raw,
        }
    }

    /// Children of a composite node, `None` for leaves.
    pub fn children(&self) -> Option<&[Node]> {
        match self {
            Self::NumberList { nodes, .. }
            | Self::Quote { nodes, .. }
            | Self::Strong { nodes, .. }
            | Self::Decoration { nodes, .. } => Some(nodes),
            _ => None,
        }
    }
}

/// Visit every node of `nodes` depth-first, parents before children.
pub fn walk_nodes<'a>(nodes: &'a [Node], visit: &mut impl FnMut(&'a Node)) {
    for node in nodes {
        visit(node);
        if let Some(children) = node.children() {
            walk_nodes(children, visit);
        }
    }
}

/// Visit every node of every line and table cell in `blocks`.
pub fn walk_blocks<'a>(blocks: &'a [Block], visit: &mut impl FnMut(&'a Node)) {
    for block in blocks {
        match block {
            Block::Line { nodes, .. } => walk_nodes(nodes, visit),
            Block::Table { cells, .. } => {
                for cell in cells.iter().flatten() {
                    walk_nodes(cell, visit);
                }
            }
            Block::CodeBlock { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deco_prefix_collapses_stars() {
        assert_eq!(
            Deco::parse_prefix("**/*"),
            vec![Deco::Emphasis(3), Deco::Symbol('/')]
        );
        assert_eq!(Deco::parse_prefix("--"), vec![Deco::Symbol('-')]);
        assert_eq!(Deco::parse_prefix(&"*".repeat(15)), vec![Deco::Emphasis(10)]);
    }

    #[test]
    fn deco_serializes_as_origin_notation() {
        let json = serde_json::to_string(&vec![Deco::Emphasis(2), Deco::Symbol('_')]).unwrap();
        assert_eq!(json, r#"["*-2","_"]"#);
        let back: Vec<Deco> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![Deco::Emphasis(2), Deco::Symbol('_')]);
        assert!(serde_json::from_str::<Deco>(r#""*-0""#).is_err());
        assert!(serde_json::from_str::<Deco>(r#""ab""#).is_err());
    }

    #[test]
    fn node_serializes_with_type_tag() {
        let node = Node::Link {
            raw: "[A]".into(),
            path_type: PathType::Internal,
            href: "/A".into(),
            content: "A".into(),
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "link");
        assert_eq!(json["pathType"], "internal");

        let block = Block::CodeBlock {
            file_name: "a.rs".into(),
            content: "fn main() {}".into(),
            indent: 0,
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "codeBlock");
        assert_eq!(json["fileName"], "a.rs");
    }

    #[test]
    fn walk_visits_nested_children() {
        let tree = vec![Node::Strong {
            raw: "[[a [b]]]".into(),
            nodes: vec![
                Node::plain("a "),
                Node::Link {
                    raw: "[b]".into(),
                    path_type: PathType::Relative,
                    href: "b".into(),
                    content: String::new(),
                },
            ],
        }];
        let mut seen = Vec::new();
        walk_nodes(&tree, &mut |n| seen.push(n.raw().to_string()));
        assert_eq!(seen, vec!["[[a [b]]]", "a ", "[b]"]);
    }
}
