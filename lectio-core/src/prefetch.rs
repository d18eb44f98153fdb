//! Debounced background prefetch of adjacent chapters
//!
//! Whenever the reading position changes, the reader calls
//! [`ChapterCache::schedule_prefetch`]. After a quiet period the next and
//! previous chapters (same version) are loaded in the background so that
//! "next"/"previous" navigation hits the cache.
//!
//! # Scheduling
//!
//! ```text
//! schedule(A) ──┐
//! schedule(B) ──┼─ each call aborts the pending timer and starts a new one
//! schedule(C) ──┘
//!                  … debounce …  fire(C) ─▶ spawn load(next(C)), load(prev(C))
//! ```
//!
//! - Only the latest position is acted on; superseded timers never fire.
//! - Loads already spawned when a newer call arrives run to completion and
//!   populate the cache.
//! - Loads go through [`ChapterCache::load`], so a prefetch and a foreground
//!   load for the same key share one fetch.
//! - Failures are logged and dropped; nothing reaches the caller.

use crate::cache::ChapterCache;
use crate::catalog::BookCatalog;
use crate::fetcher::ChapterFetcher;
use crate::key::ChapterKey;
use crate::parser::ContentParser;
use parking_lot::Mutex;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default quiet period before a scheduled prefetch fires.
pub const DEFAULT_PREFETCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Environment variable overriding the debounce window (milliseconds).
pub const PREFETCH_DEBOUNCE_ENV: &str = "LECTIO_PREFETCH_DEBOUNCE_MS";

/// Environment variable enabling/disabling prefetch (`true`/`false`/`1`/`0`).
pub const PREFETCH_ENABLED_ENV: &str = "LECTIO_PREFETCH_ENABLED";

/// Configuration for adjacent-chapter prefetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchConfig {
    /// When false, `schedule_prefetch` does nothing.
    pub enabled: bool,

    /// Quiet period: calls closer together than this collapse into one.
    pub debounce: Duration,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce: DEFAULT_PREFETCH_DEBOUNCE,
        }
    }
}

impl PrefetchConfig {
    /// Disable prefetch entirely.
    ///
    /// Useful for tests that want to observe foreground loads only.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Read overrides from `LECTIO_PREFETCH_DEBOUNCE_MS` and
    /// `LECTIO_PREFETCH_ENABLED`. Invalid values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(PREFETCH_DEBOUNCE_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.debounce = Duration::from_millis(ms),
                Err(e) => warn!(var = PREFETCH_DEBOUNCE_ENV, value = %raw, error = %e, "invalid value, using default"),
            }
        }

        if let Some(raw) = lookup(PREFETCH_ENABLED_ENV) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => config.enabled = true,
                "0" | "false" | "no" | "off" => config.enabled = false,
                _ => warn!(var = PREFETCH_ENABLED_ENV, value = %raw, "invalid value, using default"),
            }
        }

        config
    }
}

/// A scheduled prefetch that has not fired yet.
///
/// Superseding or dropping it aborts the timer task. Once the timer has
/// fired, the loads it spawned are independent tasks and are unaffected.
#[derive(Debug)]
struct PendingPrefetch {
    key: ChapterKey,
    timer: JoinHandle<()>,
}

impl PendingPrefetch {
    fn is_pending(&self) -> bool {
        !self.timer.is_finished()
    }
}

impl Drop for PendingPrefetch {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

/// Holds at most one pending prefetch.
#[derive(Debug, Default)]
pub(crate) struct Debouncer {
    pending: Mutex<Option<PendingPrefetch>>,
}

impl Debouncer {
    /// Spawn a timer via `spawn` and make it the pending prefetch. The
    /// previous one (if still waiting) is aborted when dropped.
    ///
    /// `spawn` runs under the lock, so installation order matches call
    /// order even when callers race on several threads.
    fn install(&self, key: ChapterKey, spawn: impl FnOnce() -> JoinHandle<()>) {
        let previous = {
            let mut pending = self.pending.lock();
            let timer = spawn();
            pending.replace(PendingPrefetch { key, timer })
        };
        if let Some(prev) = previous {
            if prev.is_pending() {
                debug!(superseded = %prev.key, "prefetch superseded by newer position");
            }
        }
    }

    pub(crate) fn cancel(&self) -> bool {
        match self.pending.lock().take() {
            Some(prev) => prev.is_pending(),
            None => false,
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(PendingPrefetch::is_pending)
    }
}

/// Keys to prefetch around `current`: next then previous, excluding
/// `current` itself and duplicates (tiny catalogs).
pub fn prefetch_targets(catalog: &BookCatalog, current: &ChapterKey) -> Vec<ChapterKey> {
    let mut targets = Vec::with_capacity(2);
    for key in [catalog.next_key(current), catalog.previous_key(current)]
        .into_iter()
        .flatten()
    {
        if key != *current && !targets.contains(&key) {
            targets.push(key);
        }
    }
    targets
}

impl ChapterCache {
    /// Schedule a background load of the chapters adjacent to `current`.
    ///
    /// Debounced: a later call within the configured window replaces this
    /// one. Never fails and never blocks; outside a Tokio runtime, or when
    /// prefetch is disabled, it does nothing.
    pub fn schedule_prefetch<F, P>(
        self: &Arc<Self>,
        current: ChapterKey,
        catalog: &BookCatalog,
        fetcher: Arc<F>,
        parser: Arc<P>,
    ) where
        F: ChapterFetcher + ?Sized + 'static,
        P: ContentParser + ?Sized + 'static,
    {
        if !self.prefetch_config().enabled {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(key = %current, "no tokio runtime; prefetch skipped");
            return;
        };

        // The latest position always wins, even when it has nothing to
        // prefetch: drop whatever an earlier call left pending.
        if catalog.next_key(&current).is_none() {
            warn!(key = %current, "position not in catalog; nothing to prefetch");
            self.debouncer.cancel();
            return;
        }
        let targets = prefetch_targets(catalog, &current);
        if targets.is_empty() {
            self.debouncer.cancel();
            return;
        }

        let debounce = self.prefetch_config().debounce;
        // The timer must not keep the cache alive; dropping the cache
        // cancels a pending prefetch.
        let weak = Arc::downgrade(self);
        let spawner = runtime.clone();

        self.debouncer.install(current, move || {
            runtime.spawn(async move {
                tokio::time::sleep(debounce).await;

                let Some(cache) = weak.upgrade() else {
                    return;
                };

                for target in targets {
                    if cache.get(&target).is_some() {
                        continue;
                    }

                    cache.stats.prefetch_scheduled.fetch_add(1, Ordering::Relaxed);
                    let cache = cache.clone();
                    let fetcher = fetcher.clone();
                    let parser = parser.clone();

                    spawner.spawn(async move {
                        match cache.load(&target, &*fetcher, &*parser).await {
                            Ok(_) => {
                                cache.stats.prefetch_loaded.fetch_add(1, Ordering::Relaxed);
                                debug!(key = %target, "prefetched chapter");
                            }
                            Err(e) => {
                                // Best-effort: the foreground load will retry.
                                cache.stats.prefetch_failed.fetch_add(1, Ordering::Relaxed);
                                debug!(key = %target, error = %e, "prefetch failed; ignoring");
                            }
                        }
                    });
                }
            })
        });
    }

    /// Abort a prefetch that has not fired yet. Returns true if one was pending.
    pub fn cancel_prefetch(&self) -> bool {
        self.debouncer.cancel()
    }

    /// True while a scheduled prefetch is waiting out its debounce window.
    pub fn has_pending_prefetch(&self) -> bool {
        self.debouncer.is_pending()
    }
}
