//! Shared test harness for lectio-core integration tests.

// Not every integration test crate uses every helper.
#![allow(dead_code)]

pub mod log_capture;

use async_trait::async_trait;
use lectio_core::{ChapterFetcher, ChapterKey, FetchError, RawContent};
use parking_lot::Mutex;
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// API.Bible-shaped payload with `verses` numbered 1..=n.
pub fn chapter_payload(key: &ChapterKey, verses: u32) -> JsonValue {
    let mut items = Vec::new();
    for n in 1..=verses {
        items.push(json!({
            "name": "verse",
            "type": "tag",
            "attrs": { "number": n.to_string(), "style": "v" },
            "items": [ { "text": n.to_string(), "type": "text" } ]
        }));
        items.push(json!({ "text": format!("{} verse {n}. ", key.book), "type": "text" }));
    }
    json!({
        "data": {
            "id": format!("{}.{}", key.book, key.chapter),
            "content": [
                { "name": "para", "type": "tag", "attrs": { "style": "s1" }, "items": [ { "text": "Heading", "type": "text" } ] },
                { "name": "para", "type": "tag", "attrs": { "style": "p" }, "items": items }
            ]
        }
    })
}

/// What a [`MockFetcher`] returns for a key.
#[derive(Debug, Clone)]
pub enum Reply {
    Chapter { verses: u32 },
    Empty,
    Fail(FetchError),
}

/// In-memory fetcher that records every call.
///
/// Keys without an explicit reply get a three-verse chapter.
#[derive(Debug, Default)]
pub struct MockFetcher {
    delay: Option<Duration>,
    replies: Mutex<HashMap<ChapterKey, Reply>>,
    calls: AtomicUsize,
    log: Mutex<Vec<ChapterKey>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch sleeps this long (tokio time) before replying.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn reply(&self, key: &ChapterKey, reply: Reply) {
        self.replies.lock().insert(key.clone(), reply);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, key: &ChapterKey) -> usize {
        self.log.lock().iter().filter(|k| *k == key).count()
    }

    pub fn fetched(&self) -> Vec<ChapterKey> {
        self.log.lock().clone()
    }
}

#[async_trait]
impl ChapterFetcher for MockFetcher {
    async fn fetch(&self, key: &ChapterKey) -> Result<RawContent, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push(key.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .replies
            .lock()
            .get(key)
            .cloned()
            .unwrap_or(Reply::Chapter { verses: 3 });

        match reply {
            Reply::Chapter { verses } => Ok(chapter_payload(key, verses)),
            Reply::Empty => Ok(json!({ "data": { "content": [] } })),
            Reply::Fail(err) => Err(err),
        }
    }
}

/// Fetcher for which every request fails.
#[derive(Debug, Default)]
pub struct FailingFetcher {
    pub calls: AtomicUsize,
}

#[async_trait]
impl ChapterFetcher for FailingFetcher {
    async fn fetch(&self, _key: &ChapterKey) -> Result<RawContent, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(FetchError::new(503, "service unavailable"))
    }
}

pub fn kjv(book: &str, chapter: u32) -> ChapterKey {
    ChapterKey::new(book, chapter, "KJV")
}

/// Let spawned tasks run without advancing a paused clock past `d`.
pub async fn advance(d: Duration) {
    tokio::time::sleep(d).await;
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
