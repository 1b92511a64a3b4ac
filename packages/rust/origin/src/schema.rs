//! Origin API record shapes.
//!
//! Every response is decoded into one of these strict records. Fields the
//! pipeline does not use are ignored, but every field it does use is
//! required with its exact type: a payload that does not fit is a schema
//! violation, never coerced.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use wikimirror_shared::{Result, WikiMirrorError};

// ---------------------------------------------------------------------------
// Title search
// ---------------------------------------------------------------------------

/// One entry of `GET api/pages/<project>/search/titles`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleRecord {
    pub id: String,
    pub title: String,
    pub links: Vec<String>,
    /// Unix seconds.
    pub updated: i64,
    #[serde(default)]
    pub image: Option<String>,
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// `GET api/pages/<project>/<title>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    pub id: String,
    pub title: String,
    pub image: Option<String>,
    pub descriptions: Vec<String>,
    /// Unix seconds.
    pub created: i64,
    /// Unix seconds.
    pub updated: i64,
    /// `false` for pages the origin only synthesizes from incoming links.
    pub persistent: bool,
    pub lines: Vec<LineRecord>,
    pub links: Vec<String>,
    pub related_pages: RelatedPagesRecord,
}

impl PageRecord {
    /// Raw line texts, first line being the title line.
    pub fn line_texts(&self) -> Vec<String> {
        self.lines.iter().map(|l| l.text.clone()).collect()
    }
}

/// A single stored line of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRecord {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub updated: Option<i64>,
}

/// The origin's precomputed related-page graph for a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedPagesRecord {
    #[serde(rename = "links1hop")]
    pub links_1hop: Vec<RelatedRecord>,
    #[serde(rename = "links2hop")]
    pub links_2hop: Vec<RelatedRecord>,
}

/// Summary of a neighbor page inside [`RelatedPagesRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedRecord {
    pub id: String,
    pub title: String,
    pub image: Option<String>,
    pub descriptions: Vec<String>,
    /// Unix seconds.
    pub updated: i64,
}

// ---------------------------------------------------------------------------
// Error body
// ---------------------------------------------------------------------------

/// Explicit error payload, e.g. `{"name":"NotMemberError","message":"..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorRecord {
    pub name: String,
    pub message: String,
}

/// Decode a JSON body into `T`, turning origin error payloads and shape
/// mismatches into [`WikiMirrorError::SchemaViolation`].
pub fn decode<T: serde::de::DeserializeOwned>(url: &str, body: &str) -> Result<T> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| WikiMirrorError::schema(url, format!("body is not JSON: {e}")))?;

    if let Some(err) = as_error(&value) {
        return Err(WikiMirrorError::schema(
            url,
            format!("origin returned {}: {}", err.name, err.message),
        ));
    }

    serde_json::from_value(value).map_err(|e| WikiMirrorError::schema(url, e.to_string()))
}

/// Interpret a JSON value as an origin error body, if it has that shape.
pub fn as_error(value: &Value) -> Option<ErrorRecord> {
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}
