//! Publication use cases: visibility applied over the repositories.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use wikimirror_markup::{Classifier, process_blocks, process_nodes};
use wikimirror_shared::{OriginUrls, PageInfo, Result, WikiMirrorError, dedup_titles};

use crate::cache::Memo;
use crate::domain::{PageAggregate, RelatedPage, RelatedPages};
use crate::presentation::PageResponse;
use crate::repository::{PageInfoRepository, PageRepository, TitleCatalog};
use crate::visibility::VisibilityPolicy;

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for batch runs.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once the batch size is known.
    fn total(&self, total: usize);
    /// Called when one item of the batch finished, successfully or not.
    fn item_done(&self, name: &str, current: usize, total: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn total(&self, _total: usize) {}
    fn item_done(&self, _name: &str, _current: usize, _total: usize) {}
}

// ---------------------------------------------------------------------------
// Page infos
// ---------------------------------------------------------------------------

/// Title-level visibility over the title catalog.
#[derive(Debug)]
pub struct PageInfoUseCase {
    infos: Arc<PageInfoRepository>,
    policy: VisibilityPolicy,
    visible: Memo<(), Arc<TitleCatalog>>,
}

impl PageInfoUseCase {
    pub fn new(infos: Arc<PageInfoRepository>, policy: VisibilityPolicy) -> Self {
        Self {
            infos,
            policy,
            visible: Memo::new("visible-titles"),
        }
    }

    /// The publishable part of the title catalog.
    pub async fn catalog(&self) -> Result<Arc<TitleCatalog>> {
        self.visible
            .get_or_fetch((), || async {
                let all = self.infos.catalog().await?;
                let publishable = self.policy.filter_titles(&all.pages);
                let visible = TitleCatalog::new(self.policy.scrub_titles(publishable));
                info!(
                    total = all.len(),
                    visible = visible.len(),
                    full_publish = self.policy.is_full_publish(),
                    "title-level filter applied"
                );
                Ok(Arc::new(visible))
            })
            .await
    }

    /// Publishable titles, newest updated first, linking only to each other.
    pub async fn find_many(&self) -> Result<Vec<PageInfo>> {
        Ok(self.catalog().await?.pages.clone())
    }
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

/// Fully processed pages: sanitized, classified and presented.
#[derive(Debug)]
pub struct PageUseCase {
    pages: Arc<PageRepository>,
    infos: Arc<PageInfoUseCase>,
    policy: VisibilityPolicy,
    urls: OriginUrls,
    concurrency: usize,
}

impl PageUseCase {
    /// `concurrency` bounds the pages processed at once by [`Self::find_many`].
    pub fn new(
        pages: Arc<PageRepository>,
        infos: Arc<PageInfoUseCase>,
        policy: VisibilityPolicy,
        urls: OriginUrls,
        concurrency: usize,
    ) -> Self {
        Self {
            pages,
            infos,
            policy,
            urls,
            concurrency: concurrency.max(1),
        }
    }

    /// One publishable page. `Ok(None)` when the origin has no such page or,
    /// under partial publication, when the page is not published.
    #[instrument(skip_all, fields(title = %title))]
    pub async fn find_by_title(&self, title: &str) -> Result<Option<PageResponse>> {
        let visible = self.infos.catalog().await?;
        if !self.policy.is_full_publish() && !visible.index.contains(title) {
            debug!(state = "not_published");
            return Ok(None);
        }

        let Some(page) = self.pages.find_by_title(title).await? else {
            return Ok(None);
        };

        let page = self.policy.sanitize(page, &visible.index);
        debug!(state = "filtered", links = page.links.len());

        let page = classify(page, &mut Classifier::new(&visible.index, &self.urls));
        debug!(state = "classified");

        Ok(Some(PageResponse::from(page)))
    }

    /// Every publishable page, newest created first.
    pub async fn find_many(&self) -> Result<Vec<PageResponse>> {
        self.find_many_with_progress(&SilentProgress).await
    }

    /// [`Self::find_many`] reporting each finished title.
    ///
    /// Every title runs to completion. A failed title is logged and the
    /// batch then fails with the first fatal error, or the first error when
    /// none is fatal.
    #[instrument(skip_all)]
    pub async fn find_many_with_progress(
        &self,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<PageResponse>> {
        progress.phase("Fetching titles");
        let visible = self.infos.catalog().await?;
        let titles = dedup_titles(visible.pages.iter().map(|p| p.title.clone()));
        let total = titles.len();
        progress.total(total);

        progress.phase("Fetching pages");
        let done = AtomicUsize::new(0);
        let results: Vec<(String, Result<Option<PageResponse>>)> = stream::iter(titles)
            .map(|title| {
                let done = &done;
                async move {
                    let result = self.find_by_title(&title).await;
                    let current = done.fetch_add(1, Ordering::Relaxed) + 1;
                    progress.item_done(&title, current, total);
                    (title, result)
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut pages = Vec::with_capacity(results.len());
        let mut first_error: Option<WikiMirrorError> = None;
        let mut failed = 0usize;

        for (title, result) in results {
            match result {
                Ok(Some(page)) => pages.push(page),
                Ok(None) => warn!(%title, "title listed by the origin but page not found"),
                Err(e) => {
                    error!(%title, error = %e, fatal = e.is_fatal(), "page failed");
                    failed += 1;
                    let replace = match &first_error {
                        None => true,
                        Some(prev) => !prev.is_fatal() && e.is_fatal(),
                    };
                    if replace {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(e) = first_error {
            error!(failed, total, "page batch failed");
            return Err(e);
        }

        pages.sort_by(|a, b| b.created.cmp(&a.created));
        info!(pages = pages.len(), total, "page batch complete");
        Ok(pages)
    }
}

/// Classify every node tree of `page`: body, description and neighbor descriptions.
fn classify(page: PageAggregate, classifier: &mut Classifier<'_>) -> PageAggregate {
    let mut related = |pages: Vec<RelatedPage>| -> Vec<RelatedPage> {
        pages
            .into_iter()
            .map(|p| RelatedPage {
                description_nodes: process_nodes(p.description_nodes, &mut *classifier, 0),
                ..p
            })
            .collect()
    };
    let direct = related(page.related_pages.direct);
    let indirect = related(page.related_pages.indirect);

    PageAggregate {
        description_nodes: process_nodes(page.description_nodes, &mut *classifier, 0),
        blocks: process_blocks(page.blocks, &mut *classifier),
        related_pages: RelatedPages { direct, indirect },
        ..page
    }
}
