//! Publication pipeline for wikimirror.
//!
//! This crate turns origin records into publishable pages:
//! - [`repository`] fetches titles and page graphs through memoized requests
//! - [`visibility`] decides what is published, per title and per page body
//! - [`usecase`] combines both with classification into [`PageResponse`]s
//! - [`feed`] and [`images`] build the site's feed and mirrored image list
//! - [`pipeline`] wires it all for one run

pub mod cache;
pub mod domain;
pub mod feed;
pub mod images;
pub mod pipeline;
pub mod presentation;
pub mod repository;
pub mod usecase;
pub mod visibility;

pub use cache::Memo;
pub use domain::{PageAggregate, RelatedPage, RelatedPages};
pub use feed::{FeedItem, FeedSite, JsonFeed, build_feed};
pub use images::{ImageSummary, ImageUseCase, InternalImage};
pub use pipeline::Pipeline;
pub use presentation::{PageInfoResponse, PageResponse, RelatedPageResponse};
pub use repository::{PageInfoRepository, PageRepository, TitleCatalog};
pub use usecase::{PageInfoUseCase, PageUseCase, ProgressReporter, SilentProgress};
pub use visibility::VisibilityPolicy;
