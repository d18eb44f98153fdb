//! # Lectio Core
//!
//! Runtime-light core library for the Lectio chapter reader.
//!
//! This crate provides:
//! - Core types: `ChapterKey`, `Verse`, `CachedChapter`
//! - The ordered book catalog with wraparound next/previous navigation
//! - A session chapter cache with single-flight loading
//! - Debounced background prefetch of adjacent chapters
//! - Fetcher and parser trait interfaces, plus the API.Bible JSON parser
//!
//! ## Design Principles
//!
//! 1. **Async at the I/O seam only**: fetchers are async; parsing and
//!    navigation are synchronous
//! 2. **Failures are never cached**: a failed or empty load leaves the key
//!    absent so the next load retries
//! 3. **Prefetch is invisible**: it only warms the cache and never reports
//!    errors
//!
//! ## Example
//!
//! ```ignore
//! use lectio_core::{ApiBibleParser, BookCatalog, ChapterCache, ChapterKey};
//! use std::sync::Arc;
//!
//! let cache = Arc::new(ChapterCache::new());
//! let catalog = BookCatalog::standard();
//! let key = ChapterKey::new("John", 3, "de4e12af7f28f599-02");
//!
//! // Apps provide their own ChapterFetcher implementation
//! let chapter = cache.load(&key, &*fetcher, &ApiBibleParser).await?;
//! cache.schedule_prefetch(key, &catalog, fetcher.clone(), Arc::new(ApiBibleParser));
//! ```

pub mod cache;
pub mod canon;
pub mod catalog;
pub mod error;
pub mod fetcher;
pub mod key;
pub mod parser;
pub mod prefetch;

pub use cache::{CacheStats, ChapterCache};
pub use canon::{chapter_id, usfm_code, CanonBook, CANON};
pub use catalog::{BookCatalog, BookEntry, Testament};
pub use error::{CatalogError, Error, FetchError, ParseError, Result};
pub use fetcher::{ChapterFetcher, RawContent};
pub use key::{CachedChapter, ChapterKey, Verse};
pub use parser::{ApiBibleParser, ContentParser};
pub use prefetch::{prefetch_targets, PrefetchConfig, DEFAULT_PREFETCH_DEBOUNCE};
