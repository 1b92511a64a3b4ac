//! Core domain types shared by the origin client, the markup layer and the pipeline.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Host whose thumbnail URLs carry a `/raw` suffix that must be stripped.
const GYAZO_PREFIX: &str = "https://i.gyazo.com";

// ---------------------------------------------------------------------------
// PageInfo
// ---------------------------------------------------------------------------

/// Title-search summary of a single origin page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Origin page id.
    pub id: String,
    /// Page title (unique within the project).
    pub title: String,
    /// Outgoing link titles, deduplicated, first occurrence order.
    pub links: Vec<String>,
    /// Last update time.
    pub updated: DateTime<Utc>,
    /// Thumbnail image URL, if the page has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

// ---------------------------------------------------------------------------
// TitleIndex
// ---------------------------------------------------------------------------

/// Lookup table of page titles, keyed case-sensitively.
///
/// Used both as the title universe (every title the origin knows) and as the
/// visible set (titles that survived the title-level visibility filter).
#[derive(Debug, Clone, Default)]
pub struct TitleIndex {
    pages: HashMap<String, PageInfo>,
}

impl TitleIndex {
    /// Build an index from page summaries. Later duplicates replace earlier ones.
    pub fn new(pages: impl IntoIterator<Item = PageInfo>) -> Self {
        Self {
            pages: pages.into_iter().map(|p| (p.title.clone(), p)).collect(),
        }
    }

    /// Whether `title` is part of the index.
    pub fn contains(&self, title: &str) -> bool {
        self.pages.contains_key(title)
    }

    /// Summary for `title`, if indexed.
    pub fn get(&self, title: &str) -> Option<&PageInfo> {
        self.pages.get(title)
    }

    /// Thumbnail image of `title`, if indexed and set.
    pub fn image_of(&self, title: &str) -> Option<&str> {
        self.pages.get(title).and_then(|p| p.image.as_deref())
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Escape a page title for use as a single URL path segment on the site.
///
/// Only the characters that would otherwise change the meaning of the path
/// are replaced: `/`, `?` and `#`.
pub fn escape_title(title: &str) -> String {
    title
        .replace('/', "%2F")
        .replace('?', "%3F")
        .replace('#', "%23")
}

/// Normalize a thumbnail URL (Gyazo `/raw` suffixes point at the raw file).
pub fn normalize_image(image: Option<String>) -> Option<String> {
    image.map(|url| match url.strip_suffix("/raw") {
        Some(stripped) if url.starts_with(GYAZO_PREFIX) => stripped.to_string(),
        _ => url,
    })
}

/// Convert origin Unix seconds to a UTC timestamp (out-of-range → epoch).
pub fn from_unix_seconds(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Deduplicate titles, keeping first-occurrence order.
pub fn dedup_titles(links: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    links
        .into_iter()
        .filter(|l| seen.insert(l.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(title: &str, image: Option<&str>) -> PageInfo {
        PageInfo {
            id: format!("id-{title}"),
            title: title.into(),
            links: vec![],
            updated: from_unix_seconds(1_700_000_000),
            image: image.map(String::from),
        }
    }

    #[test]
    fn escape_title_reserved_chars() {
        assert_eq!(escape_title("Top/Title"), "Top%2FTitle");
        assert_eq!(escape_title("what?#1"), "what%3F%231");
        assert_eq!(escape_title("plain title"), "plain title");
    }

    #[test]
    fn normalize_gyazo_raw() {
        assert_eq!(
            normalize_image(Some("https://i.gyazo.com/abc/raw".into())).as_deref(),
            Some("https://i.gyazo.com/abc")
        );
        assert_eq!(
            normalize_image(Some("https://example.com/abc/raw".into())).as_deref(),
            Some("https://example.com/abc/raw")
        );
        assert_eq!(normalize_image(None), None);
    }

    #[test]
    fn title_index_is_case_sensitive() {
        let index = TitleIndex::new(vec![info("Rust", Some("https://img/rust.png"))]);
        assert!(index.contains("Rust"));
        assert!(!index.contains("rust"));
        assert_eq!(index.image_of("Rust"), Some("https://img/rust.png"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let links = dedup_titles(vec!["b".into(), "a".into(), "b".into()]);
        assert_eq!(links, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn page_info_serializes_camel_case() {
        let json = serde_json::to_value(info("A", None)).expect("serialize");
        assert_eq!(json["title"], "A");
        assert!(json.get("image").is_none());
    }
}
