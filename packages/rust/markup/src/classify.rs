//! Resolution of link-like nodes against the visible title set.
//!
//! After classification every `link`, `hashTag`, `icon` and `strongIcon`
//! carries [`PathType::Internal`] or [`PathType::External`] and a final href.

use sha2::{Digest, Sha256};

use wikimirror_shared::{OriginUrls, TitleIndex};

use crate::ast::{Node, PathType};
use crate::process::NodeProcessor;

/// Anchor id of a root-level decoration: hex SHA-256 of its raw text.
pub fn anchor_id(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Classifies nodes for one render of the site.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    titles: &'a TitleIndex,
    urls: &'a OriginUrls,
}

impl<'a> Classifier<'a> {
    /// `titles` must be the visible set: titles that survived the
    /// title-level visibility filter.
    pub fn new(titles: &'a TitleIndex, urls: &'a OriginUrls) -> Self {
        Self { titles, urls }
    }

    /// Path type and href for a title in this project.
    fn resolve_title(&self, title: &str) -> (PathType, String) {
        if self.titles.contains(title) {
            (PathType::Internal, format!("/{title}"))
        } else {
            (PathType::External, self.urls.browse(title))
        }
    }

    /// Path type and href for a raw link target.
    fn resolve(&self, path_type: PathType, target: &str) -> (PathType, String) {
        match path_type {
            PathType::Relative => self.resolve_title(target),
            PathType::Root => (PathType::External, self.urls.browse_root(target)),
            PathType::Absolute => (PathType::External, target.to_string()),
            classified @ (PathType::Internal | PathType::External) => {
                (classified, target.to_string())
            }
        }
    }

    /// Icon image: the page thumbnail when known, else the icon endpoint.
    fn icon_src(&self, path_type: PathType, path: &str) -> String {
        match path_type {
            PathType::Root => self.urls.icon_root(path),
            _ => self
                .titles
                .image_of(path)
                .map(String::from)
                .unwrap_or_else(|| self.urls.icon(path)),
        }
    }
}

impl NodeProcessor for Classifier<'_> {
    fn process(&mut self, node: Node, depth: usize) -> Option<Node> {
        let classified = match node {
            Node::Link {
                raw,
                path_type,
                href,
                content,
            } if !path_type.is_classified() => {
                let (path_type, resolved) = self.resolve(path_type, &href);
                let content = if content.is_empty() { href } else { content };
                Node::Link {
                    raw,
                    path_type,
                    href: resolved,
                    content,
                }
            }
            Node::HashTag {
                raw,
                path_type,
                content,
                ..
            } if !path_type.is_classified() => {
                let (path_type, href) = self.resolve_title(&content);
                Node::HashTag {
                    raw,
                    path_type,
                    href,
                    content,
                }
            }
            Node::Icon {
                raw,
                path,
                path_type,
                ..
            } if !path_type.is_classified() => {
                let src = self.icon_src(path_type, &path);
                let (path_type, href) = self.resolve(path_type, &path);
                Node::Icon {
                    raw,
                    path,
                    path_type,
                    src: Some(src),
                    href: Some(href),
                }
            }
            Node::StrongIcon {
                raw,
                path,
                path_type,
                ..
            } if !path_type.is_classified() => {
                let src = self.icon_src(path_type, &path);
                let (path_type, href) = self.resolve(path_type, &path);
                Node::StrongIcon {
                    raw,
                    path,
                    path_type,
                    src: Some(src),
                    href: Some(href),
                }
            }
            Node::Decoration {
                raw,
                decos,
                nodes,
                anchor: None,
            } if depth == 0 => Node::Decoration {
                anchor: Some(anchor_id(&raw)),
                raw,
                decos,
                nodes,
            },
            other => other,
        };
        Some(classified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Block;
    use crate::parser::parse_lines;
    use crate::process::{process_blocks, process_nodes};
    use url::Url;
    use wikimirror_shared::{PageInfo, from_unix_seconds};

    fn index(titles: &[(&str, Option<&str>)]) -> TitleIndex {
        TitleIndex::new(titles.iter().map(|(t, image)| PageInfo {
            id: format!("id-{t}"),
            title: t.to_string(),
            links: vec![],
            updated: from_unix_seconds(0),
            image: image.map(String::from),
        }))
    }

    fn urls() -> OriginUrls {
        OriginUrls::new(&Url::parse("https://scrapbox.io/").unwrap(), "project")
    }

    fn classify_line(line: &str, titles: &TitleIndex) -> Vec<Node> {
        let urls = urls();
        let blocks = parse_lines(&["Title".into(), line.into()]);
        let blocks = process_blocks(blocks, &mut Classifier::new(titles, &urls));
        match blocks.into_iter().next() {
            Some(Block::Line { nodes, .. }) => nodes,
            other => panic!("expected a line, got {other:?}"),
        }
    }

    #[test]
    fn links_resolve_against_visible_titles() {
        let titles = index(&[("Visible", None)]);
        let nodes = classify_line(
            "[Visible] [Hidden] [/help/Links] [https://e.example x]",
            &titles,
        );
        let links: Vec<(PathType, &str, &str)> = nodes
            .iter()
            .filter_map(|n| match n {
                Node::Link { path_type, href, content, .. } => {
                    Some((*path_type, href.as_str(), content.as_str()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            links,
            vec![
                (PathType::Internal, "/Visible", "Visible"),
                (PathType::External, "https://scrapbox.io/project/Hidden", "Hidden"),
                (PathType::External, "https://scrapbox.io/help/Links", "/help/Links"),
                (PathType::External, "https://e.example", "x"),
            ]
        );
    }

    #[test]
    fn every_link_like_node_is_classified() {
        let titles = index(&[("A", None)]);
        let nodes = classify_line(
            "[A] #A #B [B.icon] [[A.icon]] [/p/q] [* [A]] https://x.example",
            &titles,
        );
        let mut checked = 0;
        crate::ast::walk_nodes(&nodes, &mut |n| match n {
            Node::Link { path_type, .. }
            | Node::HashTag { path_type, .. }
            | Node::Icon { path_type, .. }
            | Node::StrongIcon { path_type, .. } => {
                assert!(path_type.is_classified(), "unclassified node {n:?}");
                checked += 1;
            }
            _ => {}
        });
        assert_eq!(checked, 8);
    }

    #[test]
    fn hash_tags_keep_their_name() {
        let titles = index(&[("rust", None)]);
        let nodes = classify_line("#rust #go", &titles);
        assert!(matches!(
            &nodes[0],
            Node::HashTag { path_type: PathType::Internal, href, content, .. }
                if href == "/rust" && content == "rust"
        ));
        assert!(matches!(
            &nodes[2],
            Node::HashTag { path_type: PathType::External, href, .. }
                if href == "https://scrapbox.io/project/go"
        ));
    }

    #[test]
    fn icon_prefers_page_thumbnail() {
        let titles = index(&[("me", Some("https://i.example/me.png"))]);
        let nodes = classify_line("[me.icon][you.icon][/icons/hr.icon]", &titles);
        let srcs: Vec<(&str, &str)> = nodes
            .iter()
            .filter_map(|n| match n {
                Node::Icon { src: Some(src), href: Some(href), .. } => {
                    Some((src.as_str(), href.as_str()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            srcs,
            vec![
                ("https://i.example/me.png", "/me"),
                (
                    "https://scrapbox.io/api/pages/project/you/icon",
                    "https://scrapbox.io/project/you"
                ),
                (
                    "https://scrapbox.io/api/pages/icons/hr/icon",
                    "https://scrapbox.io/icons/hr"
                ),
            ]
        );
    }

    #[test]
    fn only_root_decorations_get_anchors() {
        let titles = index(&[]);
        let nodes = classify_line("[[x [* nested]]] [** Heading]", &titles);
        let mut anchors = Vec::new();
        crate::ast::walk_nodes(&nodes, &mut |n| {
            if let Node::Decoration { raw, anchor, .. } = n {
                anchors.push((raw.clone(), anchor.clone()));
            }
        });
        assert_eq!(
            anchors,
            vec![
                ("[* nested]".to_string(), None),
                ("[** Heading]".to_string(), Some(anchor_id("[** Heading]"))),
            ]
        );
    }

    #[test]
    fn anchors_are_deterministic() {
        let titles = index(&[]);
        let first = classify_line("[* Section]", &titles);
        let second = classify_line("[* Section]", &titles);
        assert_eq!(first, second);
        assert_eq!(anchor_id("[* Section]").len(), 64);
        assert_ne!(anchor_id("[* Section]"), anchor_id("[* Other]"));
    }

    #[test]
    fn classification_is_idempotent() {
        let titles = index(&[("A", None)]);
        let urls = urls();
        let once = classify_line("[A] [B] #A [A.icon] [* x]", &titles);
        let twice = process_nodes(once.clone(), &mut Classifier::new(&titles, &urls), 0);
        assert_eq!(once, twice);
    }
}
