//! Shared types, error model, and configuration for wikimirror.
//!
//! This crate is the foundation depended on by all other wikimirror crates.
//! It provides:
//! - [`WikiMirrorError`]: the unified error type
//! - Domain types ([`PageInfo`], [`TitleIndex`])
//! - Configuration ([`AppConfig`], [`SiteConfig`], config loading)
//! - Origin URL templates ([`OriginUrls`])

pub mod config;
pub mod error;
pub mod types;
pub mod urls;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DEFAULT_ORIGIN_BASE_URL, FetchConfig, OriginConfig, SiteConfig, SiteSection,
    config_dir, config_file_path, connect_sid_from_env, init_config, load_config,
    load_config_from,
};
pub use error::{Result, WikiMirrorError};
pub use urls::OriginUrls;
pub use types::{
    PageInfo, TitleIndex, dedup_titles, escape_title, from_unix_seconds, normalize_image,
};
