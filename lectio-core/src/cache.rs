//! In-memory chapter cache with single-flight loading
//!
//! [`ChapterCache`] maps a [`ChapterKey`] to its parsed [`CachedChapter`]
//! for the lifetime of a reading session.
//!
//! ## Entry states
//!
//! A key is either absent, in flight, or ready:
//!
//! - First arrival for a missing key marks it in flight and does the
//!   fetch + parse.
//! - Later arrivals for the same key wait on the in-flight entry and receive
//!   the same result (or a clone of the same error); no duplicate fetch.
//! - On success the entry becomes ready. On failure nothing is stored, so
//!   the next `load` tries again.
//! - If the fetching future is dropped mid-fetch, its in-flight entry is
//!   removed and waiters retry instead of hanging.
//!
//! Ready and in-flight entries live under one lock, so "check ready, check
//! in flight, mark in flight" is a single atomic step. The lock is never
//! held across an `.await`.
//!
//! ## Growth
//!
//! Entries are never evicted. A session reads a bounded number of chapters
//! (1189 per version in the standard canon), so growth is accepted.

use crate::error::{Error, Result};
use crate::fetcher::ChapterFetcher;
use crate::key::{CachedChapter, ChapterKey};
use crate::parser::ContentParser;
use crate::prefetch::{Debouncer, PrefetchConfig};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

type LoadResult = std::result::Result<Arc<CachedChapter>, Error>;

type InFlightSender = Arc<watch::Sender<Option<LoadResult>>>;

/// Cache statistics snapshot
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// `load` calls answered from a ready entry
    pub hits: u64,
    /// `load` calls that started a fetch
    pub misses: u64,
    /// `load` calls that joined another call's in-flight fetch
    pub inflight_hits: u64,
    /// Fetches that failed
    pub fetch_errors: u64,
    /// Fetches whose content parsed to no valid verse list
    pub parse_errors: u64,
    /// Background loads started by prefetch
    pub prefetch_scheduled: u64,
    /// Background loads that succeeded
    pub prefetch_loaded: u64,
    /// Background loads that failed (and were swallowed)
    pub prefetch_failed: u64,
}

impl CacheStats {
    /// Get hit rate (0.0 - 1.0); in-flight joins count as hits.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits + self.inflight_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Atomic counters behind [`CacheStats`]
#[derive(Debug, Default)]
pub(crate) struct AtomicCacheStats {
    pub(crate) hits: AtomicU64,
    pub(crate) misses: AtomicU64,
    pub(crate) inflight_hits: AtomicU64,
    pub(crate) fetch_errors: AtomicU64,
    pub(crate) parse_errors: AtomicU64,
    pub(crate) prefetch_scheduled: AtomicU64,
    pub(crate) prefetch_loaded: AtomicU64,
    pub(crate) prefetch_failed: AtomicU64,
}

impl AtomicCacheStats {
    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Relaxed),
            misses: self.misses.load(Relaxed),
            inflight_hits: self.inflight_hits.load(Relaxed),
            fetch_errors: self.fetch_errors.load(Relaxed),
            parse_errors: self.parse_errors.load(Relaxed),
            prefetch_scheduled: self.prefetch_scheduled.load(Relaxed),
            prefetch_loaded: self.prefetch_loaded.load(Relaxed),
            prefetch_failed: self.prefetch_failed.load(Relaxed),
        }
    }

    fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.inflight_hits,
            &self.fetch_errors,
            &self.parse_errors,
            &self.prefetch_scheduled,
            &self.prefetch_loaded,
            &self.prefetch_failed,
        ] {
            counter.store(0, Relaxed);
        }
    }
}

#[derive(Default)]
struct CacheState {
    ready: HashMap<ChapterKey, Arc<CachedChapter>>,
    in_flight: HashMap<ChapterKey, InFlightSender>,
}

impl CacheState {
    /// Remove the in-flight entry for `key` only if it is still `tx`'s.
    fn clear_in_flight(&mut self, key: &ChapterKey, tx: &InFlightSender) {
        if self
            .in_flight
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, tx))
        {
            self.in_flight.remove(key);
        }
    }
}

/// RAII guard for the fetching side of an in-flight entry.
///
/// If the fetch future is dropped before `finish`, the guard removes the
/// entry; the sender is dropped with it, waiters observe the closed channel
/// and retry.
struct InFlightGuard<'a> {
    state: &'a Mutex<CacheState>,
    key: &'a ChapterKey,
    tx: InFlightSender,
    finished: bool,
}

impl<'a> InFlightGuard<'a> {
    fn new(state: &'a Mutex<CacheState>, key: &'a ChapterKey, tx: InFlightSender) -> Self {
        Self {
            state,
            key,
            tx,
            finished: false,
        }
    }

    fn finish(mut self, result: LoadResult) {
        {
            let mut state = self.state.lock();
            // Ready before clearing in-flight: a concurrent caller must see
            // one or the other, never neither.
            if let Ok(chapter) = &result {
                state.ready.insert(self.key.clone(), chapter.clone());
            }
            state.clear_in_flight(self.key, &self.tx);
        }
        self.tx.send_replace(Some(result));
        self.finished = true;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.state.lock().clear_in_flight(self.key, &self.tx);
        }
    }
}

enum Action {
    Hit(Arc<CachedChapter>),
    Wait(watch::Receiver<Option<LoadResult>>),
    Fetch(InFlightSender),
}

/// Session-scoped chapter cache.
///
/// Share it as `Arc<ChapterCache>`; prefetch needs the `Arc` to spawn
/// background loads. Dropping the last `Arc` cancels a pending prefetch.
pub struct ChapterCache {
    state: Mutex<CacheState>,
    pub(crate) stats: AtomicCacheStats,
    prefetch: PrefetchConfig,
    pub(crate) debouncer: Debouncer,
}

impl std::fmt::Debug for ChapterCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ChapterCache")
            .field("ready", &state.ready.len())
            .field("in_flight", &state.in_flight.len())
            .field("prefetch", &self.prefetch)
            .finish()
    }
}

impl Default for ChapterCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ChapterCache {
    /// Create an empty cache with the default prefetch configuration.
    pub fn new() -> Self {
        Self::with_prefetch_config(PrefetchConfig::default())
    }

    pub fn with_prefetch_config(prefetch: PrefetchConfig) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            stats: AtomicCacheStats::default(),
            prefetch,
            debouncer: Debouncer::default(),
        }
    }

    pub fn prefetch_config(&self) -> &PrefetchConfig {
        &self.prefetch
    }

    /// Look up a ready chapter. No I/O; in-flight loads count as absent.
    pub fn get(&self, key: &ChapterKey) -> Option<Arc<CachedChapter>> {
        self.state.lock().ready.get(key).cloned()
    }

    pub fn contains(&self, key: &ChapterKey) -> bool {
        self.state.lock().ready.contains_key(key)
    }

    /// Number of ready chapters
    pub fn len(&self) -> usize {
        self.state.lock().ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of loads currently in flight
    pub fn in_flight_len(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Get a chapter, fetching and parsing it on a miss.
    ///
    /// - Ready: returned without touching `fetcher` or `parser`.
    /// - In flight: waits for that load and returns its outcome.
    /// - Missing: fetches, parses, stores, returns.
    ///
    /// Fetch failures and empty parses are returned and nothing is cached.
    pub async fn load<F, P>(&self, key: &ChapterKey, fetcher: &F, parser: &P) -> Result<Arc<CachedChapter>>
    where
        F: ChapterFetcher + ?Sized,
        P: ContentParser + ?Sized,
    {
        self.load_inner(key, fetcher, parser, false).await
    }

    /// Fetch `key` again and replace the stored entry on success.
    ///
    /// Joins an in-flight load if there is one. On failure the previous
    /// entry (if any) is kept.
    pub async fn refresh<F, P>(&self, key: &ChapterKey, fetcher: &F, parser: &P) -> Result<Arc<CachedChapter>>
    where
        F: ChapterFetcher + ?Sized,
        P: ContentParser + ?Sized,
    {
        self.load_inner(key, fetcher, parser, true).await
    }

    async fn load_inner<F, P>(
        &self,
        key: &ChapterKey,
        fetcher: &F,
        parser: &P,
        bypass_ready: bool,
    ) -> Result<Arc<CachedChapter>>
    where
        F: ChapterFetcher + ?Sized,
        P: ContentParser + ?Sized,
    {
        loop {
            let action = {
                let mut state = self.state.lock();
                let ready = state.ready.get(key).filter(|_| !bypass_ready).cloned();
                let waiting = state.in_flight.get(key).map(|tx| tx.subscribe());
                if let Some(chapter) = ready {
                    self.stats.hits.fetch_add(1, Relaxed);
                    Action::Hit(chapter)
                } else if let Some(rx) = waiting {
                    self.stats.inflight_hits.fetch_add(1, Relaxed);
                    Action::Wait(rx)
                } else {
                    self.stats.misses.fetch_add(1, Relaxed);
                    let (tx, _rx) = watch::channel(None);
                    let tx = Arc::new(tx);
                    state.in_flight.insert(key.clone(), tx.clone());
                    Action::Fetch(tx)
                }
            };

            match action {
                Action::Hit(chapter) => return Ok(chapter),
                Action::Wait(mut rx) => {
                    debug!(key = %key, "joining in-flight chapter load");
                    match wait_in_flight(&mut rx).await {
                        Some(result) => return result,
                        None => {
                            debug!(key = %key, "in-flight load abandoned; retrying");
                            continue;
                        }
                    }
                }
                Action::Fetch(tx) => {
                    let guard = InFlightGuard::new(&self.state, key, tx);
                    let result = self.fetch_and_parse(key, fetcher, parser).await;
                    guard.finish(result.clone());
                    return result;
                }
            }
        }
    }

    async fn fetch_and_parse<F, P>(&self, key: &ChapterKey, fetcher: &F, parser: &P) -> LoadResult
    where
        F: ChapterFetcher + ?Sized,
        P: ContentParser + ?Sized,
    {
        debug!(key = %key, "chapter cache miss; fetching");

        let raw = match fetcher.fetch(key).await {
            Ok(raw) => raw,
            Err(e) => {
                self.stats.fetch_errors.fetch_add(1, Relaxed);
                warn!(
                    key = %key,
                    status = e.status,
                    unauthorized = e.unauthorized,
                    error = %e,
                    "chapter fetch failed"
                );
                return Err(e.into());
            }
        };

        let verses = parser.parse(&raw);
        match CachedChapter::new(key.clone(), verses, Utc::now()) {
            Ok(chapter) => {
                debug!(key = %key, verses = chapter.len(), "chapter cached");
                Ok(Arc::new(chapter))
            }
            Err(e) => {
                self.stats.parse_errors.fetch_add(1, Relaxed);
                warn!(key = %key, error = %e, "chapter content rejected");
                Err(e.into())
            }
        }
    }
}

/// Wait for the fetcher to publish. `None` if it went away without a result.
async fn wait_in_flight(rx: &mut watch::Receiver<Option<LoadResult>>) -> Option<LoadResult> {
    loop {
        let current: Option<LoadResult> = (*rx.borrow_and_update()).clone();
        if current.is_some() {
            return current;
        }
        if rx.changed().await.is_err() {
            return (*rx.borrow()).clone();
        }
    }
}
