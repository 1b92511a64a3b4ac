//! Page aggregate assembled from origin records.

use chrono::{DateTime, Utc};

use wikimirror_markup::{Block, Node, parse_description_nodes, parse_lines};
use wikimirror_origin::PageRecord;
use wikimirror_shared::{dedup_titles, from_unix_seconds, normalize_image};

/// A page with its parsed body and its related-page graph.
#[derive(Debug, Clone, PartialEq)]
pub struct PageAggregate {
    pub id: String,
    pub title: String,
    pub image: Option<String>,
    pub description_nodes: Vec<Node>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub persistent: bool,
    pub blocks: Vec<Block>,
    pub links: Vec<String>,
    pub related_pages: RelatedPages,
}

/// Neighbors of a page: `direct` are 1-hop, `indirect` are 2-hop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelatedPages {
    pub direct: Vec<RelatedPage>,
    pub indirect: Vec<RelatedPage>,
}

/// Summary of a neighbor page.
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedPage {
    pub id: String,
    pub title: String,
    pub image: Option<String>,
    pub description_nodes: Vec<Node>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub links: Vec<String>,
}

impl PageAggregate {
    /// Parse `record`; `direct` and `indirect` are the fetched neighbor records.
    pub fn from_records(
        record: &PageRecord,
        direct: &[impl AsRef<PageRecord>],
        indirect: &[impl AsRef<PageRecord>],
    ) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            image: normalize_image(record.image.clone()),
            description_nodes: parse_description_nodes(&record.descriptions),
            created: from_unix_seconds(record.created),
            updated: from_unix_seconds(record.updated),
            persistent: record.persistent,
            blocks: parse_lines(&record.line_texts()),
            links: dedup_titles(record.links.iter().cloned()),
            related_pages: RelatedPages {
                direct: direct.iter().map(|r| RelatedPage::from_record(r.as_ref())).collect(),
                indirect: indirect
                    .iter()
                    .map(|r| RelatedPage::from_record(r.as_ref()))
                    .collect(),
            },
        }
    }
}

impl RelatedPage {
    pub fn from_record(record: &PageRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            image: normalize_image(record.image.clone()),
            description_nodes: parse_description_nodes(&record.descriptions),
            created: from_unix_seconds(record.created),
            updated: from_unix_seconds(record.updated),
            links: dedup_titles(record.links.iter().cloned()),
        }
    }
}
