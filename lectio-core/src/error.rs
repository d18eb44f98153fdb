//! Error types for lectio-core

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// The remote text source did not return a chapter.
///
/// `status` is the HTTP status (or the status a fetcher maps a transport
/// failure to). `unauthorized` is set for 401/403 so callers can switch to a
/// version they are licensed for.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Fetch failed with status {status}: {message}")]
pub struct FetchError {
    pub status: u16,
    pub message: String,
    pub unauthorized: bool,
}

impl FetchError {
    /// Create a fetch error; `unauthorized` is derived from the status.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            unauthorized: status == 401 || status == 403,
        }
    }

    /// Create an error for a source that signals "unauthorized" in an
    /// otherwise successful response.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: 401,
            message: message.into(),
            unauthorized: true,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.unauthorized
    }
}

/// The fetch succeeded but produced no usable verses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Parse error: {reason}")]
pub struct ParseError {
    pub reason: String,
}

impl ParseError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Error returned by [`ChapterCache::load`](crate::ChapterCache::load).
///
/// `Clone` because every waiter on a shared in-flight load receives the
/// same error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl Error {
    /// True when the underlying fetch was rejected with 401/403.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Fetch(e) if e.unauthorized)
    }
}

/// Invalid book catalog definition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Catalog has no books")]
    Empty,

    #[error("Book {book} has zero chapters")]
    ZeroChapters { book: String },

    #[error("Book {book} appears more than once")]
    DuplicateBook { book: String },

    #[error("Catalog JSON error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        CatalogError::Json(e.to_string())
    }
}
