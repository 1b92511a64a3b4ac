//! Origin-hosted images referenced by published pages.
//!
//! Icons and images served by the origin itself are not reachable without the
//! session cookie, so they are mirrored under a stable content-addressed name.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use wikimirror_markup::{Node, PathType, parse_lines, walk_blocks};
use wikimirror_origin::{ImageHead, OriginClient};
use wikimirror_shared::{OriginUrls, Result, dedup_titles};

use crate::cache::Memo;
use crate::repository::PageRepository;
use crate::usecase::PageInfoUseCase;

/// A mirrored image: its file name and the origin URL it is fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSummary {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalImage {
    pub name: String,
    pub url: String,
    pub data: Vec<u8>,
}

/// File extension for an image `Content-Type`, ignoring parameters.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    let ext = match mime.to_ascii_lowercase().as_str() {
        "image/apng" => "apng",
        "image/avif" => "avif",
        "image/gif" => "gif",
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/svg+xml" => "svg",
        "image/webp" => "webp",
        "image/heif" => "heif",
        "image/heic" => "heic",
        _ => return None,
    };
    Some(ext)
}

/// `sha256(final_url).ext`, or `None` for content types that are not mirrored.
pub fn image_name(head: &ImageHead) -> Option<String> {
    let ext = extension_for(head.content_type.as_deref()?)?;
    let digest = Sha256::digest(head.final_url.as_bytes());
    Some(format!("{digest:x}.{ext}"))
}

/// Origin-hosted image URLs referenced by `lines`: icon endpoints and images
/// under the origin base URL, in document order, with repeats.
pub fn collect_image_urls(lines: &[String], urls: &OriginUrls) -> Vec<String> {
    let blocks = parse_lines(lines);
    let mut found = Vec::new();
    walk_blocks(&blocks, &mut |node: &Node| match node {
        Node::Icon { path, path_type, .. } | Node::StrongIcon { path, path_type, .. } => {
            found.push(match path_type {
                PathType::Root => urls.icon_root(path),
                _ => urls.icon(path),
            });
        }
        Node::Image { src, .. } | Node::StrongImage { src, .. } if urls.is_origin_hosted(src) => {
            found.push(src.clone());
        }
        _ => {}
    });
    found
}

/// Lists and downloads the images of publishable pages.
#[derive(Debug)]
pub struct ImageUseCase {
    client: Arc<OriginClient>,
    pages: Arc<PageRepository>,
    infos: Arc<PageInfoUseCase>,
    summaries: Memo<(), Arc<Vec<ImageSummary>>>,
    concurrency: usize,
}

impl ImageUseCase {
    pub fn new(
        client: Arc<OriginClient>,
        pages: Arc<PageRepository>,
        infos: Arc<PageInfoUseCase>,
        concurrency: usize,
    ) -> Self {
        Self {
            client,
            pages,
            infos,
            summaries: Memo::new("images"),
            concurrency: concurrency.max(1),
        }
    }

    /// Every mirrorable image of every publishable page, deduplicated by URL.
    pub async fn list(&self) -> Result<Vec<ImageSummary>> {
        let summaries = self
            .summaries
            .get_or_fetch((), || async { self.resolve_all().await.map(Arc::new) })
            .await?;
        Ok(summaries.as_ref().clone())
    }

    #[instrument(skip_all)]
    async fn resolve_all(&self) -> Result<Vec<ImageSummary>> {
        let visible = self.infos.catalog().await?;

        let per_page: Vec<Result<Vec<String>>> = stream::iter(&visible.pages)
            .map(|info| async move {
                let record = self.pages.find_record(&info.title).await?;
                Ok(record
                    .map(|r| collect_image_urls(&r.line_texts(), self.client.urls()))
                    .unwrap_or_default())
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut urls = Vec::new();
        for page in per_page {
            urls.extend(page?);
        }
        let urls = dedup_titles(urls);
        debug!(candidates = urls.len(), "image candidates collected");

        let heads: Vec<(String, Result<Option<ImageHead>>)> = stream::iter(urls)
            .map(|url| async move {
                let head = self.client.head_image(&url).await;
                (url, head)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut summaries = Vec::new();
        for (url, head) in heads {
            let Some(head) = head? else {
                debug!(%url, "image not served");
                continue;
            };
            match image_name(&head) {
                Some(name) => summaries.push(ImageSummary { name, url }),
                None => debug!(%url, content_type = ?head.content_type, "image type not mirrored"),
            }
        }

        info!(images = summaries.len(), "images resolved");
        Ok(summaries)
    }

    /// Download the image listed under `name`. `Ok(None)` when no listed
    /// image has that name or the origin no longer serves it.
    #[instrument(skip_all, fields(name = %name))]
    pub async fn find_by_name(&self, name: &str) -> Result<Option<InternalImage>> {
        let Some(summary) = self.list().await?.into_iter().find(|s| s.name == name) else {
            return Ok(None);
        };
        let Some(data) = self.client.get_image(&summary.url).await? else {
            return Ok(None);
        };
        Ok(Some(InternalImage {
            name: summary.name,
            url: summary.url,
            data,
        }))
    }
}
