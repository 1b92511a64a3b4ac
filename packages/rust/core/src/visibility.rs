//! Publication rules.
//!
//! Two separate stages, applied in this order:
//! 1. title-level ([`VisibilityPolicy::is_publishable`]): decides which pages
//!    are fetched and published at all;
//! 2. body-level ([`VisibilityPolicy::sanitize`]): scrubs a fetched page of
//!    references to the collection page and to unpublished pages, then
//!    re-checks that every indirect neighbor is still reachable.
//!
//! Without a collection page everything is published unchanged.

use tracing::debug;

use wikimirror_markup::{Node, PathType, process_blocks, process_nodes};
use wikimirror_shared::{PageInfo, SiteConfig, TitleIndex};

use crate::domain::{PageAggregate, RelatedPage, RelatedPages};

/// Publication rules of one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityPolicy {
    collection_page: Option<String>,
    index_page: String,
}

impl VisibilityPolicy {
    pub fn new(collection_page: Option<String>, index_page: impl Into<String>) -> Self {
        Self {
            collection_page,
            index_page: index_page.into(),
        }
    }

    pub fn from_site(site: &SiteConfig) -> Self {
        Self::new(site.collection_page.clone(), site.index_page.clone())
    }

    /// `true` when no collection page is configured.
    pub fn is_full_publish(&self) -> bool {
        self.collection_page.is_none()
    }

    pub fn collection_page(&self) -> Option<&str> {
        self.collection_page.as_deref()
    }

    // -----------------------------------------------------------------------
    // Title level
    // -----------------------------------------------------------------------

    /// Whether a page with `title` and outgoing `links` is published.
    ///
    /// The index page always is, even when it is also the collection page.
    /// The collection page otherwise never is. Any other page is published
    /// when it links to the collection page.
    pub fn is_publishable(&self, title: &str, links: &[String]) -> bool {
        let Some(collection) = self.collection_page.as_deref() else {
            return true;
        };
        if title == self.index_page {
            return true;
        }
        if title == collection {
            return false;
        }
        links.iter().any(|l| l == collection)
    }

    /// Keep the publishable pages, preserving order.
    pub fn filter_titles(&self, pages: &[PageInfo]) -> Vec<PageInfo> {
        pages
            .iter()
            .filter(|p| self.is_publishable(&p.title, &p.links))
            .cloned()
            .collect()
    }

    /// Drop links to the collection page and to unpublished titles from
    /// `pages`, which must already be the publishable set.
    pub fn scrub_titles(&self, pages: Vec<PageInfo>) -> Vec<PageInfo> {
        let Some(collection) = self.collection_page.as_deref() else {
            return pages;
        };
        let visible = TitleIndex::new(pages.iter().cloned());
        let scrub = BodyScrub {
            collection,
            visible: &visible,
        };
        pages
            .into_iter()
            .map(|page| PageInfo {
                links: scrub.links(page.links),
                ..page
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Body level
    // -----------------------------------------------------------------------

    /// Scrub `page` for publication. `visible` holds the titles that passed
    /// the title-level stage.
    pub fn sanitize(&self, page: PageAggregate, visible: &TitleIndex) -> PageAggregate {
        let Some(collection) = self.collection_page.as_deref() else {
            return page;
        };

        let scrub = BodyScrub {
            collection,
            visible,
        };

        let direct: Vec<RelatedPage> = page
            .related_pages
            .direct
            .into_iter()
            .filter(|r| scrub.is_visible(&r.title))
            .map(|r| scrub.related(r))
            .collect();

        let before = page.related_pages.indirect.len();
        let indirect: Vec<RelatedPage> = page
            .related_pages
            .indirect
            .into_iter()
            .filter(|r| scrub.is_visible(&r.title))
            .map(|r| scrub.related(r))
            .filter(|r| {
                r.links
                    .iter()
                    .any(|link| direct.iter().any(|d| &d.title == link))
            })
            .collect();
        debug!(
            title = %page.title,
            direct = direct.len(),
            indirect = indirect.len(),
            dropped_indirect = before - indirect.len(),
            "page sanitized"
        );

        PageAggregate {
            description_nodes: scrub.nodes(page.description_nodes),
            blocks: process_blocks(page.blocks, &mut |node: Node, _: usize| scrub.keep(node)),
            links: scrub.links(page.links),
            related_pages: RelatedPages { direct, indirect },
            ..page
        }
    }
}

/// Body-level rules for one partial-publish run.
struct BodyScrub<'a> {
    collection: &'a str,
    visible: &'a TitleIndex,
}

impl BodyScrub<'_> {
    fn is_visible(&self, title: &str) -> bool {
        title != self.collection && self.visible.contains(title)
    }

    fn links(&self, links: Vec<String>) -> Vec<String> {
        links.into_iter().filter(|l| self.is_visible(l)).collect()
    }

    /// Prune relative links and hashtags that target the collection page.
    fn keep(&self, node: Node) -> Option<Node> {
        let targets_collection = match &node {
            Node::Link {
                path_type: PathType::Relative,
                href,
                ..
            } => href == self.collection,
            Node::HashTag { content, .. } => content == self.collection,
            _ => false,
        };
        (!targets_collection).then_some(node)
    }

    fn nodes(&self, nodes: Vec<Node>) -> Vec<Node> {
        process_nodes(nodes, &mut |node: Node, _: usize| self.keep(node), 0)
    }

    fn related(&self, page: RelatedPage) -> RelatedPage {
        RelatedPage {
            description_nodes: self.nodes(page.description_nodes),
            links: self.links(page.links),
            ..page
        }
    }
}
