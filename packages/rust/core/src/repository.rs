//! Origin-backed repositories: the title catalog and page aggregates.
//!
//! Both repositories memoize per origin request, so a page that shows up as
//! the neighbor of many others is fetched once per run.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument};

use wikimirror_origin::{OriginClient, PageRecord, RelatedRecord, RequestKey, TitleRecord};
use wikimirror_shared::{
    PageInfo, Result, TitleIndex, WikiMirrorError, dedup_titles, from_unix_seconds,
    normalize_image,
};

use crate::cache::Memo;
use crate::domain::PageAggregate;

// ---------------------------------------------------------------------------
// Title catalog
// ---------------------------------------------------------------------------

/// Every title the origin surfaced, as a newest-first list plus a lookup index.
#[derive(Debug, Clone, Default)]
pub struct TitleCatalog {
    /// Sorted by `updated`, newest first.
    pub pages: Vec<PageInfo>,
    pub index: TitleIndex,
}

impl TitleCatalog {
    /// Build a catalog, sorting `pages` newest first. Ties keep their order.
    pub fn new(mut pages: Vec<PageInfo>) -> Self {
        pages.sort_by(|a, b| b.updated.cmp(&a.updated));
        let index = TitleIndex::new(pages.iter().cloned());
        Self { pages, index }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Title-search record → summary: links deduplicated, thumbnail normalized.
fn page_info(record: TitleRecord) -> PageInfo {
    PageInfo {
        id: record.id,
        title: record.title,
        links: dedup_titles(record.links),
        updated: from_unix_seconds(record.updated),
        image: normalize_image(record.image),
    }
}

/// Title universe of the project, fetched once per run.
#[derive(Debug)]
pub struct PageInfoRepository {
    client: Arc<OriginClient>,
    catalogs: Memo<RequestKey, Arc<TitleCatalog>>,
}

impl PageInfoRepository {
    pub fn new(client: Arc<OriginClient>) -> Self {
        Self {
            client,
            catalogs: Memo::new("titles"),
        }
    }

    /// The full title catalog.
    #[instrument(skip_all)]
    pub async fn catalog(&self) -> Result<Arc<TitleCatalog>> {
        let key = self.client.search_titles_request(None)?.key;
        self.catalogs
            .get_or_fetch(key, || async {
                let records = self.client.search_titles().await?;
                let catalog = TitleCatalog::new(records.into_iter().map(page_info).collect());
                info!(titles = catalog.len(), "title catalog built");
                Ok(Arc::new(catalog))
            })
            .await
    }

    /// Every title, newest updated first.
    pub async fn find_many(&self) -> Result<Vec<PageInfo>> {
        Ok(self.catalog().await?.pages.clone())
    }
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

/// Page aggregates with their resolved 1-hop and 2-hop neighbors.
#[derive(Debug)]
pub struct PageRepository {
    client: Arc<OriginClient>,
    infos: Arc<PageInfoRepository>,
    records: Memo<RequestKey, Option<Arc<PageRecord>>>,
    concurrency: usize,
}

impl PageRepository {
    /// `concurrency` bounds the neighbor requests in flight per page.
    pub fn new(
        client: Arc<OriginClient>,
        infos: Arc<PageInfoRepository>,
        concurrency: usize,
    ) -> Self {
        Self {
            client,
            infos,
            records: Memo::new("pages"),
            concurrency: concurrency.max(1),
        }
    }

    /// The raw origin record for `title`. `Ok(None)` when the origin has no such page.
    pub async fn find_record(&self, title: &str) -> Result<Option<Arc<PageRecord>>> {
        let key = self.client.page_request(title)?.key;
        self.records
            .get_or_fetch(key, || async {
                Ok(self.client.fetch_page(title).await?.map(Arc::new))
            })
            .await
    }

    /// The parsed page with its neighbors. `Ok(None)` when the origin has no such page.
    ///
    /// Every neighbor must be known to the title catalog and must resolve to
    /// a page; anything else is a [`WikiMirrorError::GraphInconsistency`].
    #[instrument(skip_all, fields(title = %title))]
    pub async fn find_by_title(&self, title: &str) -> Result<Option<PageAggregate>> {
        debug!(state = "fetching");
        let Some(record) = self.find_record(title).await? else {
            debug!(state = "not_found");
            return Ok(None);
        };

        let catalog = self.infos.catalog().await?;
        let related = &record.related_pages;
        let (direct, indirect) = futures::try_join!(
            self.neighbors(&record.title, &related.links_1hop, &catalog),
            self.neighbors(&record.title, &related.links_2hop, &catalog),
        )?;

        let page = PageAggregate::from_records(&record, &direct, &indirect);
        debug!(
            state = "parsed",
            blocks = page.blocks.len(),
            direct = direct.len(),
            indirect = indirect.len()
        );
        Ok(Some(page))
    }

    async fn neighbors(
        &self,
        page: &str,
        related: &[RelatedRecord],
        catalog: &TitleCatalog,
    ) -> Result<Vec<Arc<PageRecord>>> {
        if let Some(unknown) = related.iter().find(|r| !catalog.index.contains(&r.title)) {
            return Err(WikiMirrorError::graph(page, &unknown.title));
        }

        let fetched: Vec<(&str, Result<Option<Arc<PageRecord>>>)> = stream::iter(related)
            .map(|r| async move { (r.title.as_str(), self.find_record(&r.title).await) })
            .buffered(self.concurrency)
            .collect()
            .await;

        fetched
            .into_iter()
            .map(|(title, result)| result?.ok_or_else(|| WikiMirrorError::graph(page, title)))
            .collect()
    }
}
