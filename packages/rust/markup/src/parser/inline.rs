//! Inline grammar.
//!
//! The leftmost rule match splits the text into left, node and right, with
//! ties broken by rule priority; left and right are parsed again with the
//! line-start rules disabled. Text no rule matches becomes a plain node.

use std::ops::Range;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::ast::{Deco, Node, PathType};

/// Zoom level used when a map notation has none.
const DEFAULT_MAP_ZOOM: u32 = 14;

/// Upper bound for `*N` icon repetition.
const MAX_ICON_REPEAT: usize = 100;

/// A rule match: the byte range it consumed and the nodes it produced.
struct Found {
    range: Range<usize>,
    nodes: Vec<Node>,
}

impl Found {
    fn new(range: Range<usize>, node: Node) -> Self {
        Self {
            range,
            nodes: vec![node],
        }
    }
}

type Rule = fn(&str) -> Option<Found>;

/// Rules that only apply to the whole text of a line.
const LINE_START_RULES: &[Rule] = &[quote, helpfeel, command_line, number_list];

const INLINE_RULES: &[Rule] = &[
    formula,
    code,
    blank,
    strong_image,
    strong_icon,
    strong,
    decoration,
    image,
    google_map,
    icon,
    external_link,
    internal_link,
    hash_tag,
];

/// Parse the text of a line (after its indent).
pub(crate) fn parse_line(text: &str) -> Vec<Node> {
    parse_with(text, true)
}

/// Parse text that does not start a line: rule remainders, composite bodies
/// and table cells.
pub(crate) fn parse_fragment(text: &str) -> Vec<Node> {
    parse_with(text, false)
}

fn parse_with(text: &str, line_start: bool) -> Vec<Node> {
    if text.is_empty() {
        return Vec::new();
    }

    let found = line_start
        .then(|| LINE_START_RULES.iter().find_map(|rule| rule(text)))
        .flatten()
        .or_else(|| leftmost(text));

    let Some(Found { range, nodes: matched }) = found else {
        return vec![Node::plain(text)];
    };

    let mut nodes = parse_fragment(&text[..range.start]);
    nodes.extend(matched);
    nodes.extend(parse_fragment(&text[range.end..]));
    nodes
}

/// The inline match starting earliest; `min_by_key` keeps the first of equal
/// keys, so ties go to the higher-priority rule.
fn leftmost(text: &str) -> Option<Found> {
    INLINE_RULES
        .iter()
        .filter_map(|rule| rule(text))
        .min_by_key(|found| found.range.start)
}

fn whole(caps: &Captures<'_>) -> Range<usize> {
    caps.get(0).map_or(0..0, |m| m.range())
}

fn group<'t>(caps: &Captures<'t>, i: usize) -> &'t str {
    caps.get(i).map_or("", |m| m.as_str())
}

fn path_type_of(path: &str) -> PathType {
    if path.starts_with('/') {
        PathType::Root
    } else {
        PathType::Relative
    }
}

fn is_url(text: &str) -> bool {
    text.starts_with("http://") || text.starts_with("https://")
}

/// Whether `url` points at an image the site can embed directly.
pub fn is_image_url(url: &str) -> bool {
    static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(concat!(
            r"(?i)^https?://[^\s\]]+",
            r"\.(?:png|jpe?g|gif|svg|webp|avif|apng|heic|heif)(?:\?[^\s\]]*)?$",
        ))
        .expect("valid regex")
    });
    static GYAZO_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^https?://(?:[0-9a-z-]+\.)?gyazo\.com/[0-9a-f]{32}(?:/raw)?$")
            .expect("valid regex")
    });

    IMAGE_RE.is_match(url) || GYAZO_RE.is_match(url)
}

// ---------------------------------------------------------------------------
// Line-start rules
// ---------------------------------------------------------------------------

fn quote(text: &str) -> Option<Found> {
    let inner = text.strip_prefix('>')?;
    Some(Found::new(
        0..text.len(),
        Node::Quote {
            raw: text.to_string(),
            nodes: parse_fragment(inner),
        },
    ))
}

fn helpfeel(text: &str) -> Option<Found> {
    let inner = text.strip_prefix("? ").filter(|t| !t.is_empty())?;
    Some(Found::new(
        0..text.len(),
        Node::Helpfeel {
            raw: text.to_string(),
            text: inner.to_string(),
        },
    ))
}

fn command_line(text: &str) -> Option<Found> {
    static CMD_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^([$%]) (.+)$").expect("valid regex"));

    let caps = CMD_RE.captures(text)?;
    Some(Found::new(
        whole(&caps),
        Node::CommandLine {
            raw: text.to_string(),
            symbol: group(&caps, 1).to_string(),
            text: group(&caps, 2).to_string(),
        },
    ))
}

fn number_list(text: &str) -> Option<Found> {
    static LIST_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^(\d+)\. (.*)$").expect("valid regex"));

    let caps = LIST_RE.captures(text)?;
    let number = group(&caps, 1).parse().ok()?;
    Some(Found::new(
        whole(&caps),
        Node::NumberList {
            raw: text.to_string(),
            number,
            nodes: parse_fragment(group(&caps, 2)),
        },
    ))
}

// ---------------------------------------------------------------------------
// Inline rules
// ---------------------------------------------------------------------------

fn formula(text: &str) -> Option<Found> {
    static FORMULA_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\[\$ (.+?) \]|\[\$ ([^\]]+)\]").expect("valid regex")
    });

    let caps = FORMULA_RE.captures(text)?;
    let expr = caps.get(1).or_else(|| caps.get(2))?.as_str();
    Some(Found::new(
        whole(&caps),
        Node::Formula {
            raw: group(&caps, 0).to_string(),
            formula: expr.to_string(),
        },
    ))
}

fn code(text: &str) -> Option<Found> {
    static CODE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"`([^`]*)`").expect("valid regex"));

    let caps = CODE_RE.captures(text)?;
    Some(Found::new(
        whole(&caps),
        Node::Code {
            raw: group(&caps, 0).to_string(),
            text: group(&caps, 1).to_string(),
        },
    ))
}

fn blank(text: &str) -> Option<Found> {
    static BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[(\s+)\]").expect("valid regex"));

    let caps = BLANK_RE.captures(text)?;
    Some(Found::new(
        whole(&caps),
        Node::Blank {
            raw: group(&caps, 0).to_string(),
            text: group(&caps, 1).to_string(),
        },
    ))
}

fn strong_image(text: &str) -> Option<Found> {
    static STRONG_IMAGE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[\[([^\[\]\s]+)\]\]").expect("valid regex"));

    STRONG_IMAGE_RE
        .captures_iter(text)
        .find(|caps| is_image_url(group(caps, 1)))
        .map(|caps| {
            Found::new(
                whole(&caps),
                Node::StrongImage {
                    raw: group(&caps, 0).to_string(),
                    src: group(&caps, 1).to_string(),
                },
            )
        })
}

fn strong_icon(text: &str) -> Option<Found> {
    static STRONG_ICON_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\[\[([^\[\]]+)\.icon(?:\*([1-9]\d*))?\]\]").expect("valid regex")
    });

    let caps = STRONG_ICON_RE.captures(text)?;
    let path = group(&caps, 1);
    let node = Node::StrongIcon {
        raw: group(&caps, 0).to_string(),
        path: path.to_string(),
        path_type: path_type_of(path),
        src: None,
        href: None,
    };
    Some(Found {
        range: whole(&caps),
        nodes: vec![node; repeat_count(group(&caps, 2))],
    })
}

fn strong(text: &str) -> Option<Found> {
    static STRONG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[\[((?:\[[^\[\]]*\]|[^\[\]])+)\]\]").expect("valid regex"));

    let caps = STRONG_RE.captures(text)?;
    Some(Found::new(
        whole(&caps),
        Node::Strong {
            raw: group(&caps, 0).to_string(),
            nodes: parse_fragment(group(&caps, 1)),
        },
    ))
}

fn decoration(text: &str) -> Option<Found> {
    // The body may contain single-level brackets such as `[* see [Page]]`.
    static DECORATION_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r##"\[([*!"#%&'()+,\-./{|}<>_~]+)\s((?:\[[^\[\]]+\]|[^\[\]])+)\]"##)
            .expect("valid regex")
    });

    let caps = DECORATION_RE.captures(text)?;
    Some(Found::new(
        whole(&caps),
        Node::Decoration {
            raw: group(&caps, 0).to_string(),
            decos: Deco::parse_prefix(group(&caps, 1)),
            nodes: parse_fragment(group(&caps, 2)),
            anchor: None,
        },
    ))
}

fn image(text: &str) -> Option<Found> {
    static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\[([^\[\]\s]+)(?:\s+([^\[\]\s]+))?\]").expect("valid regex")
    });

    IMAGE_RE.captures_iter(text).find_map(|caps| {
        let first = group(&caps, 1);
        let second = caps.get(2).map(|m| m.as_str());
        let (src, link) = match second {
            None if is_image_url(first) => (first, None),
            Some(s) if is_image_url(first) && is_url(s) => (first, Some(s)),
            Some(s) if is_url(first) && is_image_url(s) => (s, Some(first)),
            _ => return None,
        };
        Some(Found::new(
            whole(&caps),
            Node::Image {
                raw: group(&caps, 0).to_string(),
                src: src.to_string(),
                link: link.map(String::from),
            },
        ))
    })
}

fn google_map(text: &str) -> Option<Found> {
    const COORDS: &str = r"([NS])(\d+(?:\.\d+)?),([EW])(\d+(?:\.\d+)?)(?:,Z(\d+))?";
    static MAP_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(&format!(r"\[{COORDS}(?:\s+([^\[\]]*[^\s\[\]]))?\]")).expect("valid regex")
    });
    static PLACE_FIRST_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(&format!(r"\[([^\[\]]*[^\s\[\]])\s+{COORDS}\]")).expect("valid regex")
    });

    let (caps, offset, place) = if let Some(caps) = MAP_RE.captures(text) {
        let place = caps.get(6).map(|m| m.as_str().to_string());
        (caps, 1, place)
    } else {
        let caps = PLACE_FIRST_RE.captures(text)?;
        let place = Some(group(&caps, 1).to_string());
        (caps, 2, place)
    };

    let coordinate = |sign: &str, value: &str, negative: &str| -> Option<f64> {
        let v: f64 = value.parse().ok()?;
        Some(if sign == negative { -v } else { v })
    };
    let latitude = coordinate(group(&caps, offset), group(&caps, offset + 1), "S")?;
    let longitude = coordinate(group(&caps, offset + 2), group(&caps, offset + 3), "W")?;
    let zoom = caps
        .get(offset + 4)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(DEFAULT_MAP_ZOOM);

    let target = match &place {
        Some(p) => urlencoding::encode(p).into_owned(),
        None => format!("{latitude},{longitude}"),
    };
    let url = format!("https://www.google.com/maps/place/{target}/@{latitude},{longitude},{zoom}z");

    Some(Found::new(
        whole(&caps),
        Node::GoogleMap {
            raw: group(&caps, 0).to_string(),
            latitude,
            longitude,
            zoom,
            place,
            url,
        },
    ))
}

fn icon(text: &str) -> Option<Found> {
    static ICON_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\[([^\[\]]+)\.icon(?:\*([1-9]\d*))?\]").expect("valid regex")
    });

    let caps = ICON_RE.captures(text)?;
    let path = group(&caps, 1);
    let node = Node::Icon {
        raw: group(&caps, 0).to_string(),
        path: path.to_string(),
        path_type: path_type_of(path),
        src: None,
        href: None,
    };
    Some(Found {
        range: whole(&caps),
        nodes: vec![node; repeat_count(group(&caps, 2))],
    })
}

/// `*N` icon repetition; absent means once, capped at [`MAX_ICON_REPEAT`].
fn repeat_count(digits: &str) -> usize {
    match digits.parse::<usize>() {
        Ok(n) => n.min(MAX_ICON_REPEAT),
        Err(_) if digits.is_empty() => 1,
        Err(_) => MAX_ICON_REPEAT,
    }
}

fn external_link(text: &str) -> Option<Found> {
    static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(concat!(
            r"\[(?P<u1>https?://[^\s\]]+)\s+(?P<l1>[^\]]*[^\s\]])\]",
            r"|\[(?P<l2>[^\[\]]*[^\s\[\]])\s+(?P<u2>https?://[^\s\]]+)\]",
            r"|\[(?P<u3>https?://[^\s\]]+)\]",
            r"|(?P<u4>https?://\S+)",
        ))
        .expect("valid regex")
    });

    let caps = LINK_RE.captures(text)?;
    let href = ["u1", "u2", "u3", "u4"]
        .iter()
        .find_map(|name| caps.name(name))?
        .as_str();
    let content = caps
        .name("l1")
        .or_else(|| caps.name("l2"))
        .map_or("", |m| m.as_str());

    Some(Found::new(
        whole(&caps),
        Node::Link {
            raw: group(&caps, 0).to_string(),
            path_type: PathType::Absolute,
            href: href.to_string(),
            content: content.to_string(),
        },
    ))
}

fn internal_link(text: &str) -> Option<Found> {
    static INTERNAL_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[([^\[\]`]+)\]").expect("valid regex"));

    let caps = INTERNAL_RE.captures(text)?;
    let target = group(&caps, 1);
    Some(Found::new(
        whole(&caps),
        Node::Link {
            raw: group(&caps, 0).to_string(),
            path_type: path_type_of(target),
            href: target.to_string(),
            content: String::new(),
        },
    ))
}

fn hash_tag(text: &str) -> Option<Found> {
    static TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?:^|\s)(#(\S+))").expect("valid regex"));

    let caps = TAG_RE.captures(text)?;
    let tag = caps.get(1)?;
    let name = group(&caps, 2);
    Some(Found::new(
        tag.range(),
        Node::HashTag {
            raw: tag.as_str().to_string(),
            path_type: PathType::Relative,
            href: name.to_string(),
            content: name.to_string(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(raw: &str, path_type: PathType, href: &str, content: &str) -> Node {
        Node::Link {
            raw: raw.into(),
            path_type,
            href: href.into(),
            content: content.into(),
        }
    }

    #[test]
    fn plain_text_is_one_node() {
        assert_eq!(parse_line("just text"), vec![Node::plain("just text")]);
        assert!(parse_line("").is_empty());
    }

    #[test]
    fn internal_and_root_links() {
        assert_eq!(
            parse_line("see [Rust] and [/help/Links]"),
            vec![
                Node::plain("see "),
                link("[Rust]", PathType::Relative, "Rust", ""),
                Node::plain(" and "),
                link("[/help/Links]", PathType::Root, "/help/Links", ""),
            ]
        );
    }

    #[test]
    fn external_link_forms() {
        assert_eq!(
            parse_line("[https://a.example Label]"),
            vec![link(
                "[https://a.example Label]",
                PathType::Absolute,
                "https://a.example",
                "Label"
            )]
        );
        assert_eq!(
            parse_line("[Label https://a.example]"),
            vec![link(
                "[Label https://a.example]",
                PathType::Absolute,
                "https://a.example",
                "Label"
            )]
        );
        assert_eq!(
            parse_line("[https://a.example]"),
            vec![link("[https://a.example]", PathType::Absolute, "https://a.example", "")]
        );
        assert_eq!(
            parse_line("go https://a.example now"),
            vec![
                Node::plain("go "),
                link("https://a.example", PathType::Absolute, "https://a.example", ""),
                Node::plain(" now"),
            ]
        );
    }

    #[test]
    fn hash_tag_needs_start_or_whitespace() {
        let nodes = parse_line("#rust and c#sharp");
        assert_eq!(
            nodes,
            vec![
                Node::HashTag {
                    raw: "#rust".into(),
                    path_type: PathType::Relative,
                    href: "rust".into(),
                    content: "rust".into(),
                },
                Node::plain(" and c#sharp"),
            ]
        );
    }

    #[test]
    fn decoration_with_nested_link() {
        let nodes = parse_line("[*/ see [Page]]");
        let [Node::Decoration { decos, nodes, anchor, .. }] = nodes.as_slice() else {
            panic!("expected one decoration, got {nodes:?}");
        };
        assert_eq!(decos, &vec![Deco::Emphasis(1), Deco::Symbol('/')]);
        assert!(anchor.is_none());
        assert_eq!(
            nodes,
            &vec![Node::plain("see "), link("[Page]", PathType::Relative, "Page", "")]
        );
    }

    #[test]
    fn strong_variants() {
        assert!(matches!(
            parse_line("[[https://i.example/a.png]]").as_slice(),
            [Node::StrongImage { src, .. }] if src == "https://i.example/a.png"
        ));
        assert!(matches!(
            parse_line("[[me.icon]]").as_slice(),
            [Node::StrongIcon { path, .. }] if path == "me"
        ));
        let nodes = parse_line("[[bold [A]]]");
        let [Node::Strong { nodes, .. }] = nodes.as_slice() else {
            panic!("expected strong, got {nodes:?}");
        };
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn icons_repeat() {
        let nodes = parse_line("[/icons/hr.icon*3]");
        assert_eq!(nodes.len(), 3);
        assert!(nodes.iter().all(|n| matches!(
            n,
            Node::Icon { path, path_type: PathType::Root, .. } if path == "/icons/hr"
        )));
    }

    #[test]
    fn icon_repeat_is_capped() {
        assert_eq!(parse_line("[a.icon*2000000]").len(), MAX_ICON_REPEAT);
        assert_eq!(parse_line("[[a.icon*99999999999999999999999]]").len(), MAX_ICON_REPEAT);
        assert_eq!(parse_line("[a.icon*100]").len(), 100);
    }

    #[test]
    fn code_span_keeps_brackets() {
        assert_eq!(
            parse_line("`[$ x ]`"),
            vec![Node::Code { raw: "`[$ x ]`".into(), text: "[$ x ]".into() }]
        );
        assert_eq!(
            parse_line("[A] then `[B]`"),
            vec![
                link("[A]", PathType::Relative, "A", ""),
                Node::plain(" then "),
                Node::Code { raw: "`[B]`".into(), text: "[B]".into() },
            ]
        );
    }

    #[test]
    fn decoration_wraps_code() {
        let nodes = parse_line("[* `x`]");
        let [Node::Decoration { nodes, .. }] = nodes.as_slice() else {
            panic!("expected one decoration, got {nodes:?}");
        };
        assert_eq!(nodes, &vec![Node::Code { raw: "`x`".into(), text: "x".into() }]);
    }

    #[test]
    fn images_with_and_without_links() {
        assert!(matches!(
            parse_line("[https://i.example/a.jpg]").as_slice(),
            [Node::Image { link: None, .. }]
        ));
        assert!(matches!(
            parse_line("[https://site.example https://i.example/a.jpg]").as_slice(),
            [Node::Image { src, link: Some(l), .. }]
                if src == "https://i.example/a.jpg" && l == "https://site.example"
        ));
        assert!(is_image_url("https://gyazo.com/0123456789abcdef0123456789abcdef"));
        assert!(!is_image_url("https://example.com/page"));
    }

    #[test]
    fn line_start_rules_only_at_start() {
        assert!(matches!(
            parse_line("> quoted [A]").as_slice(),
            [Node::Quote { nodes, .. }] if nodes.len() == 2
        ));
        assert!(matches!(
            parse_line("? how to").as_slice(),
            [Node::Helpfeel { text, .. }] if text == "how to"
        ));
        assert!(matches!(
            parse_line("$ cargo run").as_slice(),
            [Node::CommandLine { symbol, text, .. }] if symbol == "$" && text == "cargo run"
        ));
        assert!(matches!(parse_line("2. second").as_slice(), [Node::NumberList { number: 2, .. }]));

        // Inside a fragment the same text stays inline.
        assert_eq!(parse_fragment("> not a quote"), vec![Node::plain("> not a quote")]);
    }

    #[test]
    fn code_formula_blank() {
        assert_eq!(
            parse_line("run `ls` [$ x^2 ] [ ]"),
            vec![
                Node::plain("run "),
                Node::Code { raw: "`ls`".into(), text: "ls".into() },
                Node::plain(" "),
                Node::Formula { raw: "[$ x^2 ]".into(), formula: "x^2".into() },
                Node::plain(" "),
                Node::Blank { raw: "[ ]".into(), text: " ".into() },
            ]
        );
    }

    #[test]
    fn google_map_forms() {
        let nodes = parse_line("[N35.6812,E139.7671,Z16 Tokyo Station]");
        let [Node::GoogleMap { latitude, longitude, zoom, place, url, .. }] = nodes.as_slice()
        else {
            panic!("expected map, got {nodes:?}");
        };
        assert_eq!((*latitude, *longitude, *zoom), (35.6812, 139.7671, 16));
        assert_eq!(place.as_deref(), Some("Tokyo Station"));
        assert_eq!(
            url,
            "https://www.google.com/maps/place/Tokyo%20Station/@35.6812,139.7671,16z"
        );

        let nodes = parse_line("[S10,W20]");
        let [Node::GoogleMap { latitude, longitude, zoom, place, url, .. }] = nodes.as_slice()
        else {
            panic!("expected map, got {nodes:?}");
        };
        assert_eq!((*latitude, *longitude, *zoom), (-10.0, -20.0, DEFAULT_MAP_ZOOM));
        assert!(place.is_none());
        assert_eq!(url, "https://www.google.com/maps/place/-10,-20/@-10,-20,14z");
    }
}
