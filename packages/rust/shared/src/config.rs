//! Application configuration for wikimirror.
//!
//! User config lives at `~/.wikimirror/wikimirror.toml`.
//! CLI flags override config file values, which override defaults.
//! The pipeline itself never reads files or the environment: it receives a
//! resolved [`SiteConfig`] built by [`SiteConfig::resolve`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, WikiMirrorError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "wikimirror.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".wikimirror";

/// Public origin host used when no base URL is configured.
pub const DEFAULT_ORIGIN_BASE_URL: &str = "https://scrapbox.io/";

// ---------------------------------------------------------------------------
// Config structs (matching wikimirror.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where pages come from.
    #[serde(default)]
    pub origin: OriginConfig,

    /// What gets published and how the site is described.
    #[serde(default)]
    pub site: SiteSection,

    /// Fetch tuning.
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// `[origin]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginConfig {
    /// Project name on the origin.
    #[serde(default)]
    pub project: String,

    /// Origin base URL, used for API calls and rendered links.
    #[serde(default = "default_origin_base_url")]
    pub base_url: String,

    /// Optional caching proxy in front of the origin API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,

    /// Name of the env var holding the session cookie (never store the cookie itself).
    #[serde(default = "default_connect_sid_env")]
    pub connect_sid_env: String,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            project: String::new(),
            base_url: default_origin_base_url(),
            proxy_url: None,
            connect_sid_env: default_connect_sid_env(),
        }
    }
}

fn default_origin_base_url() -> String {
    DEFAULT_ORIGIN_BASE_URL.into()
}
fn default_connect_sid_env() -> String {
    "WIKIMIRROR_CONNECT_SID".into()
}

/// `[site]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteSection {
    /// Title of the page served at the site root. Always published.
    #[serde(default)]
    pub index_page: String,

    /// Partial-publication boundary. Unset or empty means "publish everything".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_page: Option<String>,

    /// Human-readable site name (feed title).
    #[serde(default)]
    pub name: String,

    /// Public URL of the generated site (feed links).
    #[serde(default)]
    pub base_url: String,

    /// Site language tag (feed `language`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Maximum concurrent origin requests per fan-out.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_concurrency() -> usize {
    8
}
fn default_timeout_secs() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Resolved runtime config
// ---------------------------------------------------------------------------

/// Resolved configuration handed to the pipeline as a plain argument.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Partial-publication boundary page, if any.
    pub collection_page: Option<String>,
    /// Index page title.
    pub index_page: String,
    /// Origin project name.
    pub project: String,
    /// Origin base URL (always ends with `/`).
    pub origin_base_url: Url,
    /// API base URL override (always ends with `/`).
    pub proxy_url: Option<Url>,
    /// Session cookie value for private projects.
    pub connect_sid: Option<String>,
    /// Fan-out bound for concurrent origin requests.
    pub concurrency: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl SiteConfig {
    /// Validate an [`AppConfig`] and turn it into a [`SiteConfig`].
    ///
    /// `connect_sid` comes from the caller (CLI flag or the env var named by
    /// `origin.connect_sid_env`), never from the file.
    pub fn resolve(config: &AppConfig, connect_sid: Option<String>) -> Result<Self> {
        let project = config.origin.project.trim();
        if project.is_empty() {
            return Err(WikiMirrorError::config("origin.project must be set"));
        }

        let index_page = config.site.index_page.trim();
        if index_page.is_empty() {
            return Err(WikiMirrorError::config("site.index_page must be set"));
        }

        let origin_base_url = parse_base_url("origin.base_url", &config.origin.base_url)?;
        let proxy_url = config
            .origin
            .proxy_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .map(|u| parse_base_url("origin.proxy_url", u))
            .transpose()?;

        if config.fetch.concurrency == 0 {
            return Err(WikiMirrorError::config("fetch.concurrency must be at least 1"));
        }

        Ok(Self {
            collection_page: non_empty(config.site.collection_page.as_deref()),
            index_page: index_page.to_string(),
            project: project.to_string(),
            origin_base_url,
            proxy_url,
            connect_sid: non_empty(connect_sid.as_deref()),
            concurrency: config.fetch.concurrency,
            timeout_secs: config.fetch.timeout_secs,
        })
    }

    /// Minimal config for a project, used by tests and embedders.
    pub fn new(
        project: impl Into<String>,
        index_page: impl Into<String>,
        origin_base_url: Url,
    ) -> Self {
        Self {
            collection_page: None,
            index_page: index_page.into(),
            project: project.into(),
            origin_base_url: with_trailing_slash(origin_base_url),
            proxy_url: None,
            connect_sid: None,
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Builder-style setter for the collection page.
    pub fn with_collection_page(mut self, title: impl Into<String>) -> Self {
        self.collection_page = non_empty(Some(&title.into()));
        self
    }

    /// The URL API requests are issued against (proxy when configured).
    pub fn api_base_url(&self) -> &Url {
        self.proxy_url.as_ref().unwrap_or(&self.origin_base_url)
    }
}

/// Parse a URL and normalize it to end with `/` so relative joins keep the path.
fn parse_base_url(field: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| WikiMirrorError::config(format!("{field} is not a valid URL ({raw}): {e}")))?;
    Ok(with_trailing_slash(url))
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.wikimirror/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| WikiMirrorError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.wikimirror/wikimirror.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| WikiMirrorError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        WikiMirrorError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| WikiMirrorError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| WikiMirrorError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| WikiMirrorError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the session cookie from the env var named in the config, if set.
pub fn connect_sid_from_env(config: &AppConfig) -> Option<String> {
    std::env::var(&config.origin.connect_sid_env)
        .ok()
        .filter(|v| !v.is_empty())
}
