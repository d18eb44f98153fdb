//! Chapter source trait
//!
//! The cache never talks to the network itself. Apps provide a
//! `ChapterFetcher` (see `lectio-http` for the API.Bible implementation);
//! tests provide in-memory ones.

use crate::error::FetchError;
use crate::key::ChapterKey;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// Raw, still-nested chapter payload as returned by a fetcher.
pub type RawContent = serde_json::Value;

/// Fetches the raw content of one chapter.
///
/// Implementations map any non-success outcome to [`FetchError`], setting
/// `unauthorized` for 401/403 (or an equivalent in-band signal).
#[async_trait]
pub trait ChapterFetcher: Debug + Send + Sync {
    async fn fetch(&self, key: &ChapterKey) -> Result<RawContent, FetchError>;
}

#[async_trait]
impl<T: ChapterFetcher + ?Sized> ChapterFetcher for Arc<T> {
    async fn fetch(&self, key: &ChapterKey) -> Result<RawContent, FetchError> {
        (**self).fetch(key).await
    }
}

#[async_trait]
impl<T: ChapterFetcher + ?Sized> ChapterFetcher for &T {
    async fn fetch(&self, key: &ChapterKey) -> Result<RawContent, FetchError> {
        (**self).fetch(key).await
    }
}
