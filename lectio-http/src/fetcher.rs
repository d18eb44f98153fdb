//! HTTP chapter fetcher for API.Bible
//!
//! [`ApiBibleFetcher`] implements [`ChapterFetcher`] in two modes:
//!
//! - direct: `GET {base}/bibles/{version}/chapters/{USFM}.{chapter}` with the
//!   `api-key` header
//! - proxy: `GET {base}/api/bible-chapter?bibleId=&bookId=&chapter=`
//!
//! Both return the same JSON payload, which `lectio_core::ApiBibleParser`
//! flattens into verses.

use crate::config::{ApiConfig, FetchMode};
use crate::error::{HttpError, Result};
use async_trait::async_trait;
use lectio_core::{usfm_code, ChapterFetcher, ChapterKey, FetchError, RawContent};
use reqwest::StatusCode;
use serde_json::Value as JsonValue;
use tracing::debug;

/// Query parameters API.Bible needs to return verse markers in JSON.
const CHAPTER_QUERY: [(&str, &str); 5] = [
    ("content-type", "json"),
    ("include-verse-numbers", "true"),
    ("include-titles", "true"),
    ("include-chapter-numbers", "true"),
    ("include-verse-spans", "true"),
];

/// Fetches chapter JSON from API.Bible or the serverless proxy.
#[derive(Debug, Clone)]
pub struct ApiBibleFetcher {
    config: ApiConfig,
    http: reqwest::Client,
}

impl ApiBibleFetcher {
    /// Build a fetcher with its own client, honoring `config.timeout`.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, http })
    }

    /// Build from [`ApiConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::new(ApiConfig::from_env()?)
    }

    /// Use an existing client (its own timeout applies).
    pub fn with_client(config: ApiConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn request(&self, key: &ChapterKey) -> std::result::Result<reqwest::RequestBuilder, FetchError> {
        let usfm = usfm_code(&key.book)
            .ok_or_else(|| FetchError::new(400, format!("unknown book: {}", key.book)))?;

        let req = match &self.config.mode {
            FetchMode::Direct { base_url, api_key } => {
                let url = format!(
                    "{}/bibles/{}/chapters/{}.{}",
                    base_url,
                    urlencoding::encode(&key.version),
                    usfm,
                    key.chapter,
                );
                debug!(url = %url, key = %key, "fetching chapter from API.Bible");
                self.http
                    .get(url)
                    .header("api-key", api_key)
                    .query(&CHAPTER_QUERY[..])
            }
            FetchMode::Proxy { base_url } => {
                let url = format!("{base_url}/api/bible-chapter");
                let chapter = key.chapter.to_string();
                debug!(url = %url, key = %key, "fetching chapter through proxy");
                self.http.get(url).query(&[
                    ("bibleId", key.version.as_str()),
                    ("bookId", usfm),
                    ("chapter", chapter.as_str()),
                ])
            }
        };
        Ok(req)
    }
}

/// Build the error for a non-2xx response.
///
/// Message preference: JSON `message`, JSON `error`, the raw body, then the
/// canonical reason phrase.
fn status_error(status: StatusCode, body: &str) -> FetchError {
    let json = serde_json::from_str::<JsonValue>(body).ok();
    let field = |name: &str| {
        json.as_ref()
            .and_then(|v| v.get(name))
            .and_then(JsonValue::as_str)
            .map(str::to_string)
    };

    let message = field("message")
        .or_else(|| field("error"))
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    let mut err = FetchError::new(status.as_u16(), message);
    if body_flags_unauthorized(json.as_ref()) {
        err.unauthorized = true;
    }
    err
}

/// The proxy reports permission problems in-band as `"unauthorized": true`.
fn body_flags_unauthorized(json: Option<&JsonValue>) -> bool {
    json.and_then(|v| v.get("unauthorized"))
        .and_then(JsonValue::as_bool)
        .unwrap_or(false)
}

#[async_trait]
impl ChapterFetcher for ApiBibleFetcher {
    async fn fetch(&self, key: &ChapterKey) -> std::result::Result<RawContent, FetchError> {
        let resp = self.request(key)?.send().await.map_err(HttpError::from)?;
        let status = resp.status();
        let body = resp.text().await.map_err(HttpError::from)?;

        if !status.is_success() {
            debug!(key = %key, status = status.as_u16(), "chapter request rejected");
            return Err(status_error(status, &body));
        }

        let json: JsonValue = serde_json::from_str(&body)
            .map_err(|e| FetchError::new(502, format!("invalid chapter payload: {e}")))?;

        if body_flags_unauthorized(Some(&json)) {
            let message = json
                .get("message")
                .and_then(JsonValue::as_str)
                .unwrap_or("unauthorized for this version");
            return Err(FetchError::unauthorized(message));
        }

        Ok(json)
    }
}
