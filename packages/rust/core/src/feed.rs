//! JSON Feed 1.1 document of the published titles.

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use url::Url;

use wikimirror_shared::{PageInfo, Result, SiteSection, WikiMirrorError};

const JSON_FEED_VERSION: &str = "https://jsonfeed.org/version/1.1";

/// Date component of every item's `tag:` URI. Must never change once
/// published, or readers see every item as new.
const TAG_DATE: &str = "2024-11-09";

/// Public identity of the generated site.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSite {
    pub name: String,
    pub base_url: Url,
    pub lang: Option<String>,
}

impl FeedSite {
    /// Validate the `[site]` section: `base_url` must be an absolute URL with a host.
    pub fn from_section(section: &SiteSection) -> Result<Self> {
        let raw = section.base_url.trim();
        let base_url = Url::parse(raw).map_err(|e| {
            WikiMirrorError::config(format!("site.base_url is not a valid URL ({raw}): {e}"))
        })?;
        if base_url.host_str().is_none() {
            return Err(WikiMirrorError::config(format!("site.base_url has no host: {raw}")));
        }
        Ok(Self {
            name: section.name.trim().to_string(),
            base_url,
            lang: section.lang.clone().filter(|l| !l.trim().is_empty()),
        })
    }

    /// Base URL without a trailing slash, for appending paths.
    fn root(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonFeed {
    pub version: String,
    pub title: String,
    pub home_page_url: String,
    pub feed_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: String,
    pub url: String,
    pub title: String,
    pub content_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub date_modified: String,
    pub tags: Vec<String>,
}

/// Build the feed. `icon` is the index page's thumbnail; `pages` are the
/// publishable titles, in feed order.
pub fn build_feed(site: &FeedSite, icon: Option<String>, pages: &[PageInfo]) -> JsonFeed {
    let host = site.base_url.host_str().unwrap_or_default();
    let root = site.root();

    let items = pages
        .iter()
        .map(|page| FeedItem {
            id: format!("tag:{host},{TAG_DATE}:{}", page.id),
            url: format!("{root}/{}", urlencoding::encode(&page.title)),
            title: page.title.clone(),
            content_text: page.links.join(" "),
            image: page.image.clone(),
            date_modified: page.updated.to_rfc3339_opts(SecondsFormat::Millis, true),
            tags: page.links.clone(),
        })
        .collect();

    JsonFeed {
        version: JSON_FEED_VERSION.to_string(),
        title: site.name.clone(),
        home_page_url: site.base_url.to_string(),
        feed_url: format!("{root}/api/feed"),
        icon,
        language: site.lang.clone(),
        items,
    }
}
