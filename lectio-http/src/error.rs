//! Error types for the HTTP fetcher

use lectio_core::FetchError;
use thiserror::Error;

/// Errors from building or driving the HTTP client
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client or transport failure
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        HttpError::Client(e.to_string())
    }
}

/// Transport-level failures reach the cache as status 500, the same code the
/// serverless proxy answers with when its upstream call throws.
impl From<HttpError> for FetchError {
    fn from(e: HttpError) -> Self {
        FetchError::new(500, e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HttpError>;
