//! HTTP chapter source for lectio-core
//!
//! This crate provides the `reqwest`-backed [`ApiBibleFetcher`], reaching
//! API.Bible either directly (with an API key) or through the app's
//! serverless proxy.
//!
//! # Architecture
//!
//! - [`config`]: fetch mode, base URLs, timeout and environment resolution
//! - [`fetcher`]: the `ChapterFetcher` implementation and status mapping
//! - [`error`]: error types for client construction and transport
//!
//! # Dependencies
//!
//! `lectio-core` stays free of HTTP; consumers that bring their own fetcher
//! don't pay for `reqwest`.

pub mod config;
pub mod error;
pub mod fetcher;

pub use config::{ApiConfig, FetchMode, DEFAULT_API_BASE_URL, DEFAULT_TIMEOUT};
pub use error::{HttpError, Result};
pub use fetcher::ApiBibleFetcher;
