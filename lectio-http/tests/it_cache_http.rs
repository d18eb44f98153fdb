//! ChapterCache driven by the HTTP fetcher against a mock API.Bible.

use lectio_core::{ApiBibleParser, BookCatalog, ChapterCache, ChapterKey, Error, PrefetchConfig};
use lectio_http::{ApiBibleFetcher, ApiConfig};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chapter_body(id: &str, text: &str) -> serde_json::Value {
    json!({
        "data": {
            "id": id,
            "content": [
                { "name": "para", "type": "tag", "attrs": { "style": "p" }, "items": [
                    { "name": "verse", "type": "tag", "attrs": { "number": "1", "style": "v" },
                      "items": [ { "text": "1", "type": "text" } ] },
                    { "text": text, "type": "text" }
                ] }
            ]
        }
    })
}

async fn mount_chapter(server: &MockServer, id: &str, text: &str, hits: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/bibles/KJV/chapters/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(chapter_body(id, text)))
        .expect(hits)
        .mount(server)
        .await;
}

#[tokio::test]
async fn load_parses_and_caches_http_chapter() {
    let server = MockServer::start().await;
    mount_chapter(&server, "PHM.1", "Paul, a prisoner of Jesus Christ.", 1).await;

    let fetcher = ApiBibleFetcher::new(ApiConfig::direct("k").with_base_url(server.uri())).unwrap();
    let cache = ChapterCache::new();
    let key = ChapterKey::new("Philemon", 1, "KJV");

    let chapter = cache.load(&key, &fetcher, &ApiBibleParser).await.unwrap();
    assert_eq!(chapter.verse(1).unwrap().text, "Paul, a prisoner of Jesus Christ.");

    // Served from memory; the mock expects exactly one request.
    cache.load(&key, &fetcher, &ApiBibleParser).await.unwrap();
}

#[tokio::test]
async fn unauthorized_version_is_reported_and_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let fetcher = ApiBibleFetcher::new(ApiConfig::direct("k").with_base_url(server.uri())).unwrap();
    let cache = ChapterCache::new();
    let key = ChapterKey::new("Genesis", 1, "KJV");

    let err = cache.load(&key, &fetcher, &ApiBibleParser).await.unwrap_err();
    assert!(matches!(&err, Error::Fetch(e) if e.status == 403));
    assert!(err.is_unauthorized());
    assert!(cache.get(&key).is_none());
}

#[tokio::test]
async fn prefetched_neighbors_serve_navigation() {
    let server = MockServer::start().await;
    mount_chapter(&server, "RUT.2", "And Naomi had a kinsman of her husband's.", 1).await;
    mount_chapter(&server, "RUT.4", "Then went Boaz up to the gate.", 1).await;

    let fetcher = Arc::new(
        ApiBibleFetcher::new(ApiConfig::direct("k").with_base_url(server.uri())).unwrap(),
    );
    let cache = Arc::new(ChapterCache::with_prefetch_config(
        PrefetchConfig::default().with_debounce(Duration::from_millis(20)),
    ));
    let catalog = BookCatalog::standard();

    cache.schedule_prefetch(
        ChapterKey::new("Ruth", 3, "KJV"),
        &catalog,
        fetcher.clone(),
        Arc::new(ApiBibleParser),
    );

    let next = ChapterKey::new("Ruth", 4, "KJV");
    let prev = ChapterKey::new("Ruth", 2, "KJV");
    for _ in 0..100 {
        if cache.contains(&next) && cache.contains(&prev) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let chapter = cache.load(&next, &*fetcher, &ApiBibleParser).await.unwrap();
    assert_eq!(chapter.verses()[0].text, "Then went Boaz up to the gate.");
    assert!(cache.contains(&prev));
    assert_eq!(cache.stats().prefetch_loaded, 2);
}
