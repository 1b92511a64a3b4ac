//! One mirroring run: the origin client, the repositories and their caches.
//!
//! Everything fetched through a [`Pipeline`] is memoized for the lifetime of
//! that pipeline. Build a new one for a fresh snapshot.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument};

use wikimirror_origin::OriginClient;
use wikimirror_shared::{PageInfo, Result, SiteConfig, WikiMirrorError, normalize_image};

use crate::feed::{FeedSite, JsonFeed, build_feed};
use crate::images::{ImageSummary, ImageUseCase, InternalImage};
use crate::presentation::PageResponse;
use crate::repository::{PageInfoRepository, PageRepository};
use crate::usecase::{PageInfoUseCase, PageUseCase, ProgressReporter, SilentProgress};
use crate::visibility::VisibilityPolicy;

/// Wiring of every use case for one site.
#[derive(Debug)]
pub struct Pipeline {
    site: SiteConfig,
    pages: Arc<PageRepository>,
    page_infos: Arc<PageInfoUseCase>,
    page_use_case: PageUseCase,
    images: ImageUseCase,
}

impl Pipeline {
    pub fn new(site: SiteConfig) -> Result<Self> {
        let client = Arc::new(OriginClient::new(&site)?);
        let policy = VisibilityPolicy::from_site(&site);

        let info_repo = Arc::new(PageInfoRepository::new(Arc::clone(&client)));
        let pages = Arc::new(PageRepository::new(
            Arc::clone(&client),
            Arc::clone(&info_repo),
            site.concurrency,
        ));
        let page_infos = Arc::new(PageInfoUseCase::new(info_repo, policy.clone()));
        let page_use_case = PageUseCase::new(
            Arc::clone(&pages),
            Arc::clone(&page_infos),
            policy,
            client.urls().clone(),
            site.concurrency,
        );
        let images = ImageUseCase::new(
            client,
            Arc::clone(&pages),
            Arc::clone(&page_infos),
            site.concurrency,
        );

        info!(
            project = %site.project,
            index = %site.index_page,
            collection = ?site.collection_page,
            "pipeline ready"
        );

        Ok(Self {
            site,
            pages,
            page_infos,
            page_use_case,
            images,
        })
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    /// Publishable titles, newest updated first.
    pub async fn titles(&self) -> Result<Vec<PageInfo>> {
        self.page_infos.find_many().await
    }

    /// One publishable page.
    pub async fn page(&self, title: &str) -> Result<Option<PageResponse>> {
        self.page_use_case.find_by_title(title).await
    }

    /// Every publishable page, newest created first.
    pub async fn pages(&self) -> Result<Vec<PageResponse>> {
        self.pages_with_progress(&SilentProgress).await
    }

    #[instrument(skip_all, fields(project = %self.site.project))]
    pub async fn pages_with_progress(
        &self,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<PageResponse>> {
        let start = Instant::now();
        let pages = self.page_use_case.find_many_with_progress(progress).await?;
        info!(
            pages = pages.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "pages published"
        );
        Ok(pages)
    }

    /// JSON Feed of the publishable titles, with the index page's image as icon.
    pub async fn feed(&self, site: &FeedSite) -> Result<JsonFeed> {
        let index = self
            .pages
            .find_record(&self.site.index_page)
            .await?
            .ok_or_else(|| {
                WikiMirrorError::validation(format!(
                    "index page not found: {}",
                    self.site.index_page
                ))
            })?;
        let titles = self.titles().await?;
        Ok(build_feed(site, normalize_image(index.image.clone()), &titles))
    }

    pub async fn images(&self) -> Result<Vec<ImageSummary>> {
        self.images.list().await
    }

    pub async fn image(&self, name: &str) -> Result<Option<InternalImage>> {
        self.images.find_by_name(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use url::Url;
    use wikimirror_shared::SiteSection;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_titles(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/pages/proj/search/titles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "i", "title": "Home", "links": ["A"], "updated": 1_700_000_000 },
                { "id": "a", "title": "A", "links": ["Home"], "updated": 1_600_000_000 }
            ])))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn feed_uses_index_image_and_publishable_titles() {
        let server = MockServer::start().await;
        mount_titles(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/pages/proj/Home"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "i",
                "title": "Home",
                "image": "https://i.example/home.png",
                "descriptions": [],
                "created": 1,
                "updated": 1_700_000_000,
                "persistent": true,
                "lines": [{ "id": "l0", "text": "Home" }],
                "links": [],
                "relatedPages": { "links1hop": [], "links2hop": [] }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let site = SiteConfig::new("proj", "Home", Url::parse(&server.uri()).unwrap())
            .with_collection_page("Home");
        let pipeline = Pipeline::new(site).unwrap();
        let feed_site = FeedSite::from_section(&SiteSection {
            name: "Wiki".into(),
            base_url: "https://wiki.example.com/".into(),
            ..SiteSection::default()
        })
        .unwrap();

        let feed = pipeline.feed(&feed_site).await.unwrap();
        assert_eq!(feed.icon.as_deref(), Some("https://i.example/home.png"));
        let titles: Vec<&str> = feed.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Home", "A"]);
    }

    #[tokio::test]
    async fn feed_items_link_only_to_published_titles() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/pages/proj/search/titles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "i", "title": "Home", "links": ["A"], "updated": 3 },
                { "id": "a", "title": "A", "links": ["Collect", "Secret", "Home"], "updated": 2 },
                { "id": "s", "title": "Secret", "links": ["A"], "updated": 1 },
                { "id": "c", "title": "Collect", "links": [], "updated": 0 }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/pages/proj/Home"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "i",
                "title": "Home",
                "image": null,
                "descriptions": [],
                "created": 1,
                "updated": 3,
                "persistent": true,
                "lines": [{ "id": "l0", "text": "Home" }],
                "links": ["A"],
                "relatedPages": { "links1hop": [], "links2hop": [] }
            })))
            .mount(&server)
            .await;

        let site = SiteConfig::new("proj", "Home", Url::parse(&server.uri()).unwrap())
            .with_collection_page("Collect");
        let pipeline = Pipeline::new(site).unwrap();
        let feed_site = FeedSite::from_section(&SiteSection {
            base_url: "https://wiki.example.com/".into(),
            ..SiteSection::default()
        })
        .unwrap();

        let feed = pipeline.feed(&feed_site).await.unwrap();
        let titles: Vec<&str> = feed.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Home", "A"]);
        let a = &feed.items[1];
        assert_eq!(a.tags, vec!["Home".to_string()]);
        assert_eq!(a.content_text, "Home");
        assert!(feed.icon.is_none());
    }

    #[tokio::test]
    async fn feed_requires_index_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/pages/proj/Home"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let site = SiteConfig::new("proj", "Home", Url::parse(&server.uri()).unwrap());
        let pipeline = Pipeline::new(site).unwrap();
        let feed_site = FeedSite::from_section(&SiteSection {
            base_url: "https://wiki.example.com/".into(),
            ..SiteSection::default()
        })
        .unwrap();

        let err = pipeline.feed(&feed_site).await.unwrap_err();
        assert!(matches!(err, WikiMirrorError::Validation { .. }));
    }
}
