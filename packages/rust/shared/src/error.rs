//! Error types for wikimirror.
//!
//! Library crates use [`WikiMirrorError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! A page that the origin does not know is *not* an error: lookups return
//! `Ok(None)` for it.

use std::path::PathBuf;
use std::sync::Arc;

/// Top-level error type for all wikimirror operations.
///
/// The type is `Clone` so that a memoized failure can be handed to every
/// caller waiting on the same origin request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WikiMirrorError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transient network/HTTP failure (timeout, 5xx, connection reset).
    #[error("network error: {0}")]
    Network(String),

    /// The origin answered with a payload that does not match the expected
    /// record shape, or with an explicit error body.
    #[error("schema violation at {url}: {message}")]
    SchemaViolation { url: String, message: String },

    /// A related page referenced by a fetched page cannot be resolved.
    #[error("graph inconsistency: page {page:?} references unresolvable page {related:?}")]
    GraphInconsistency { page: String, related: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: Arc<std::io::Error>,
    },

    /// Input validation error (invalid URL, disallowed host, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, WikiMirrorError>;

impl WikiMirrorError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a schema violation for the response of `url`.
    pub fn schema(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::SchemaViolation {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Create a graph inconsistency between `page` and its neighbor `related`.
    pub fn graph(page: impl Into<String>, related: impl Into<String>) -> Self {
        Self::GraphInconsistency {
            page: page.into(),
            related: related.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    /// Whether this error must abort a whole batch rather than a single page.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SchemaViolation { .. } | Self::GraphInconsistency { .. }
        )
    }
}
