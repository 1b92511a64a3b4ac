//! HTTP client for the origin API.
//!
//! The client only transports and validates: it knows nothing about
//! visibility or page graphs. Every response body is decoded through
//! [`crate::schema::decode`], so a malformed payload fails loudly.

use std::time::Duration;

use reqwest::header::{ACCEPT, COOKIE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Method, Response, StatusCode};
use tracing::{debug, info, instrument};
use url::Url;

use wikimirror_shared::{OriginUrls, Result, SiteConfig, WikiMirrorError};

use crate::request::{OriginRequest, RequestKey};
use crate::schema::{self, PageRecord, TitleRecord};

/// User-Agent string for origin requests.
const USER_AGENT_VALUE: &str = concat!("wikimirror/", env!("CARGO_PKG_VERSION"));

/// Response header carrying the title-search continuation cursor.
pub const FOLLOWING_ID_HEADER: &str = "x-following-id";

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

// ---------------------------------------------------------------------------
// OriginClient
// ---------------------------------------------------------------------------

/// Result of probing an origin-hosted image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageHead {
    /// URL the response was finally served from (after redirects).
    pub final_url: String,
    /// `Content-Type` of the response, if present.
    pub content_type: Option<String>,
}

/// Thin, validating client for the origin API.
#[derive(Debug, Clone)]
pub struct OriginClient {
    http: Client,
    api_base: Url,
    project: String,
    headers: HeaderMap,
    urls: OriginUrls,
}

impl OriginClient {
    /// Create a client for the project described by `site`.
    pub fn new(site: &SiteConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(sid) = &site.connect_sid {
            let mut cookie = HeaderValue::from_str(&format!("connect.sid={sid}"))
                .map_err(|e| WikiMirrorError::config(format!("invalid session cookie: {e}")))?;
            cookie.set_sensitive(true);
            headers.insert(COOKIE, cookie);
        }

        let http = Client::builder()
            .default_headers(headers.clone())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(site.timeout_secs))
            .build()
            .map_err(|e| WikiMirrorError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base: site.api_base_url().clone(),
            project: site.project.clone(),
            headers,
            urls: OriginUrls::new(&site.origin_base_url, &site.project),
        })
    }

    /// URL templates for rendered links and icons.
    pub fn urls(&self) -> &OriginUrls {
        &self.urls
    }

    // -----------------------------------------------------------------------
    // Request construction
    // -----------------------------------------------------------------------

    /// Title-search request, optionally continuing after `following_id`.
    pub fn search_titles_request(&self, following_id: Option<&str>) -> Result<OriginRequest> {
        let mut url = self.api_url(&["search", "titles"])?;
        if let Some(id) = following_id {
            url.query_pairs_mut().append_pair("followingId", id);
        }
        Ok(self.request(Method::GET, url))
    }

    /// Page request. The title becomes one path segment, so `/` is sent as `%2F`.
    pub fn page_request(&self, title: &str) -> Result<OriginRequest> {
        let url = self.api_url(&[title])?;
        Ok(self.request(Method::GET, url))
    }

    fn request(&self, method: Method, url: Url) -> OriginRequest {
        let key = RequestKey::new(&method, &url, &self.headers);
        OriginRequest { method, url, key }
    }

    /// `<api base>/api/pages/<project>/<segments...>`, each segment percent-encoded.
    fn api_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                WikiMirrorError::validation(format!(
                    "API base URL cannot be a base: {}",
                    self.api_base
                ))
            })?
            .pop_if_empty()
            .extend(["api", "pages", self.project.as_str()])
            .extend(segments);
        Ok(url)
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Fetch every title of the project, following continuation cursors.
    ///
    /// The first record of each continuation batch repeats the last record of
    /// the previous batch and is skipped.
    #[instrument(skip_all, fields(project = %self.project))]
    pub async fn search_titles(&self) -> Result<Vec<TitleRecord>> {
        let mut records: Vec<TitleRecord> = Vec::new();
        let mut following_id: Option<String> = None;
        let mut batches = 0usize;

        loop {
            let request = self.search_titles_request(following_id.as_deref())?;
            let response = self.send(&request).await?;
            let next = cursor_of(&response);

            let body = read_body(&request, response).await?.ok_or_else(|| {
                WikiMirrorError::schema(request.url.as_str(), "project not found")
            })?;
            let batch: Vec<TitleRecord> = schema::decode(request.url.as_str(), &body)?;

            let skip = usize::from(following_id.is_some());
            debug!(
                batch = batches,
                received = batch.len(),
                skipped = skip.min(batch.len()),
                "title batch received"
            );
            records.extend(batch.into_iter().skip(skip));
            batches += 1;

            match next {
                Some(id) if following_id.as_deref() == Some(id.as_str()) => {
                    return Err(WikiMirrorError::schema(
                        request.url.as_str(),
                        format!("continuation cursor did not advance ({id})"),
                    ));
                }
                Some(id) => following_id = Some(id),
                None => break,
            }
        }

        info!(titles = records.len(), batches, "title search complete");
        Ok(records)
    }

    /// Fetch a single page. `Ok(None)` when the origin has no such title.
    #[instrument(skip_all, fields(title = %title))]
    pub async fn fetch_page(&self, title: &str) -> Result<Option<PageRecord>> {
        let request = self.page_request(title)?;
        let response = self.send(&request).await?;

        match read_body(&request, response).await? {
            Some(body) => {
                let page: PageRecord = schema::decode(request.url.as_str(), &body)?;
                debug!(lines = page.lines.len(), links = page.links.len(), "page fetched");
                Ok(Some(page))
            }
            None => {
                debug!("page not found");
                Ok(None)
            }
        }
    }

    /// Probe an origin-hosted image. `Ok(None)` when the origin does not serve it.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn head_image(&self, url: &str) -> Result<Option<ImageHead>> {
        let request = self.request(Method::HEAD, self.image_url(url)?);
        let response = self.send(&request).await?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "image probe failed");
            return Ok(None);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Ok(Some(ImageHead {
            final_url: response.url().to_string(),
            content_type,
        }))
    }

    /// Download an origin-hosted image. `Ok(None)` when the origin does not serve it.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn get_image(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let request = self.request(Method::GET, self.image_url(url)?);
        let response = self.send(&request).await?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| {
                WikiMirrorError::Network(format!("{}: body read failed: {e}", request.url))
            })?;
        Ok(Some(bytes.to_vec()))
    }

    /// Rewrite an origin-hosted URL so it is fetched through the API base.
    fn image_url(&self, url: &str) -> Result<Url> {
        let relative = url.strip_prefix(self.urls.base()).ok_or_else(|| {
            WikiMirrorError::validation(format!("not an origin-hosted image URL: {url}"))
        })?;
        self.api_base
            .join(relative)
            .map_err(|e| WikiMirrorError::validation(format!("invalid image URL {url}: {e}")))
    }

    async fn send(&self, request: &OriginRequest) -> Result<Response> {
        debug!(method = %request.method, url = %request.url, key = %request.key, "origin request");
        self.http
            .request(request.method.clone(), request.url.clone())
            .send()
            .await
            .map_err(|e| WikiMirrorError::Network(format!("{}: {e}", request.url)))
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// Next continuation cursor, `None` when absent or empty.
fn cursor_of(response: &Response) -> Option<String> {
    response
        .headers()
        .get(FOLLOWING_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Read a response body, mapping HTTP status to the error taxonomy.
///
/// - 404 → `Ok(None)`
/// - 5xx → transient network error
/// - other non-success → schema violation when the body is an origin error
///   payload, network error otherwise
async fn read_body(request: &OriginRequest, response: Response) -> Result<Option<String>> {
    let status = response.status();
    let url = request.url.as_str();

    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if status.is_server_error() {
        return Err(WikiMirrorError::Network(format!("{url}: HTTP {status}")));
    }

    let body = response
        .text()
        .await
        .map_err(|e| WikiMirrorError::Network(format!("{url}: body read failed: {e}")))?;

    if !status.is_success() {
        let origin_error = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .as_ref()
            .and_then(schema::as_error);
        return Err(match origin_error {
            Some(err) => WikiMirrorError::schema(
                url,
                format!("HTTP {status}: origin returned {}: {}", err.name, err.message),
            ),
            None => WikiMirrorError::Network(format!("{url}: HTTP {status}")),
        });
    }

    Ok(Some(body))
}
