//! URL templates for links rendered into the published site.
//!
//! These must match the origin's own routing exactly: they end up as
//! `<a href>` and `<img src>` targets. They are always built from the
//! origin base URL, never from the API/proxy URL.

use url::Url;

/// Builds human browse URLs and icon URLs for a project.
#[derive(Debug, Clone)]
pub struct OriginUrls {
    /// Origin base URL, ending with `/`.
    base: String,
    project: String,
}

impl OriginUrls {
    pub fn new(origin_base_url: &Url, project: impl Into<String>) -> Self {
        let mut base = origin_base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Self {
            base,
            project: project.into(),
        }
    }

    /// Origin base URL, ending with `/`.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Browse URL of a page in this project (`[title]`, `#title`).
    pub fn browse(&self, title: &str) -> String {
        format!("{}{}/{}", self.base, self.project, title)
    }

    /// Browse URL of a root path (`[/other-project/title]`).
    pub fn browse_root(&self, path: &str) -> String {
        format!("{}{}", self.base.trim_end_matches('/'), path)
    }

    /// Icon endpoint of a page in this project (`[title.icon]`).
    pub fn icon(&self, path: &str) -> String {
        format!("{}api/pages/{}/{}/icon", self.base, self.project, path)
    }

    /// Icon endpoint of a root path (`[/other-project/title.icon]`).
    pub fn icon_root(&self, path: &str) -> String {
        format!("{}api/pages{}/icon", self.base, path)
    }

    /// Whether `url` is hosted by the origin (and may be fetched through the API base).
    pub fn is_origin_hosted(&self, url: &str) -> bool {
        url.starts_with(&self.base)
    }
}
