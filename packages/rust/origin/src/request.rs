//! Content-addressable request identities.
//!
//! Two requests with the same method, canonical URL and allow-listed headers
//! share a [`RequestKey`]; the memoization cache is keyed on it.

use reqwest::Method;
use reqwest::header::HeaderMap;
use sha2::{Digest, Sha256};
use url::Url;

/// Request headers that take part in a request's identity.
const KEY_HEADERS: &[&str] = &["accept", "cookie", "referer", "user-agent"];

/// SHA-256 digest (lowercase hex) identifying an origin request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey(String);

impl RequestKey {
    /// Compute the key for `method url` sent with `headers`.
    pub fn new(method: &Method, url: &Url, headers: &HeaderMap) -> Self {
        let mut picked: Vec<(String, String)> = headers
            .iter()
            .filter(|(name, _)| KEY_HEADERS.contains(&name.as_str()))
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        picked.sort();

        let canonical = serde_json::json!({
            "method": method.as_str(),
            "url": url.as_str(),
            "headers": picked,
        });

        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string().as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fully-built origin request: what will be sent and its identity.
#[derive(Debug, Clone)]
pub struct OriginRequest {
    pub method: Method,
    pub url: Url,
    pub key: RequestKey,
}
