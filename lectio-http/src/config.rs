//! Fetcher configuration
//!
//! Defines how chapters are reached: straight from API.Bible with an API key,
//! or through the app's serverless proxy that holds the key server-side.

use crate::error::{HttpError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default API.Bible REST root
pub const DEFAULT_API_BASE_URL: &str = "https://rest.api.bible/v1";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

pub const API_KEY_ENV: &str = "BIBLE_API_KEY";
/// Development fallback for [`API_KEY_ENV`]
pub const API_KEY_FALLBACK_ENV: &str = "VITE_BIBLE_API_KEY";
pub const API_BASE_URL_ENV: &str = "BIBLE_API_BASE_URL";
pub const PROXY_URL_ENV: &str = "BIBLE_PROXY_URL";
pub const TIMEOUT_ENV: &str = "BIBLE_API_TIMEOUT_MS";

/// How to reach chapter content
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FetchMode {
    /// API.Bible REST API, authenticated with the `api-key` header
    Direct { base_url: String, api_key: String },
    /// Serverless proxy exposing `GET /api/bible-chapter`
    Proxy { base_url: String },
}

impl FetchMode {
    pub fn base_url(&self) -> &str {
        match self {
            FetchMode::Direct { base_url, .. } | FetchMode::Proxy { base_url } => base_url,
        }
    }
}

// Keep the key out of logs.
impl fmt::Debug for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchMode::Direct { base_url, .. } => f
                .debug_struct("Direct")
                .field("base_url", base_url)
                .field("api_key", &"<redacted>")
                .finish(),
            FetchMode::Proxy { base_url } => {
                f.debug_struct("Proxy").field("base_url", base_url).finish()
            }
        }
    }
}

/// Configuration for [`ApiBibleFetcher`](crate::ApiBibleFetcher)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub mode: FetchMode,
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn normalize(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

impl ApiConfig {
    /// Direct API.Bible access against [`DEFAULT_API_BASE_URL`].
    pub fn direct(api_key: impl Into<String>) -> Self {
        Self {
            mode: FetchMode::Direct {
                base_url: DEFAULT_API_BASE_URL.to_string(),
                api_key: api_key.into(),
            },
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Proxy access. Trailing slashes are stripped from `base_url`.
    pub fn proxy(base_url: impl AsRef<str>) -> Self {
        Self {
            mode: FetchMode::Proxy {
                base_url: normalize(base_url.as_ref()),
            },
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the base URL, keeping the mode.
    pub fn with_base_url(mut self, url: impl AsRef<str>) -> Self {
        let url = normalize(url.as_ref());
        match &mut self.mode {
            FetchMode::Direct { base_url, .. } | FetchMode::Proxy { base_url } => *base_url = url,
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve from the environment.
    ///
    /// An API key (`BIBLE_API_KEY`, else `VITE_BIBLE_API_KEY`) selects direct
    /// mode, optionally against `BIBLE_API_BASE_URL`. Otherwise
    /// `BIBLE_PROXY_URL` selects proxy mode. `BIBLE_API_TIMEOUT_MS`
    /// overrides the timeout.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = if let Some(key) = non_empty(API_KEY_ENV).or_else(|| non_empty(API_KEY_FALLBACK_ENV)) {
            let config = Self::direct(key);
            match non_empty(API_BASE_URL_ENV) {
                Some(url) => config.with_base_url(url),
                None => config,
            }
        } else if let Some(url) = non_empty(PROXY_URL_ENV) {
            Self::proxy(url)
        } else {
            return Err(HttpError::Config(format!(
                "set {API_KEY_ENV} (or {API_KEY_FALLBACK_ENV}) for direct access, or {PROXY_URL_ENV} for the proxy"
            )));
        };

        if let Some(raw) = non_empty(TIMEOUT_ENV) {
            let ms = raw
                .parse::<u64>()
                .map_err(|e| HttpError::Config(format!("{TIMEOUT_ENV}={raw}: {e}")))?;
            config.timeout = Duration::from_millis(ms);
        }

        Ok(config)
    }
}
