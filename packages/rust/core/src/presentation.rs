//! Consumer-facing page shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wikimirror_markup::{Block, nodes_to_text};
use wikimirror_shared::{PageInfo, escape_title};

use crate::domain::{PageAggregate, RelatedPage};

/// A fully processed page, ready to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub id: String,
    pub title: String,
    pub escaped_title: String,
    pub image: Option<String>,
    pub description: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub persistent: bool,
    pub blocks: Vec<Block>,
    pub links: Vec<String>,
    /// Direct neighbors followed by indirect ones.
    pub related_pages: Vec<RelatedPageResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedPageResponse {
    pub id: String,
    pub title: String,
    pub escaped_title: String,
    pub image: Option<String>,
    pub description: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub links: Vec<String>,
}

/// Title-search summary as exposed to consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfoResponse {
    pub id: String,
    pub title: String,
    pub links: Vec<String>,
    pub updated: DateTime<Utc>,
    pub image: Option<String>,
}

impl From<PageAggregate> for PageResponse {
    fn from(page: PageAggregate) -> Self {
        let related_pages = page
            .related_pages
            .direct
            .into_iter()
            .chain(page.related_pages.indirect)
            .map(RelatedPageResponse::from)
            .collect();

        Self {
            escaped_title: escape_title(&page.title),
            description: nodes_to_text(&page.description_nodes),
            id: page.id,
            title: page.title,
            image: page.image,
            created: page.created,
            updated: page.updated,
            persistent: page.persistent,
            blocks: page.blocks,
            links: page.links,
            related_pages,
        }
    }
}

impl From<RelatedPage> for RelatedPageResponse {
    fn from(page: RelatedPage) -> Self {
        Self {
            escaped_title: escape_title(&page.title),
            description: nodes_to_text(&page.description_nodes),
            id: page.id,
            title: page.title,
            image: page.image,
            created: page.created,
            updated: page.updated,
            links: page.links,
        }
    }
}

impl From<PageInfo> for PageInfoResponse {
    fn from(info: PageInfo) -> Self {
        Self {
            id: info.id,
            title: info.title,
            links: info.links,
            updated: info.updated,
            image: info.image,
        }
    }
}
