//! HTTP fetching.
//!
//! The pipeline only ever talks to a [`Fetcher`]. [`HttpFetcher`] is the
//! production implementation on `reqwest`:
//! - HTTP/2 with fallback to HTTP/1.1
//! - TLS 1.3 via rustls
//! - Brotli, Zstd, Gzip compression (auto-negotiated)
//! - Connection pooling with keep-alive, cookie store
//!
//! Retries are not performed here; any failure is terminal for the branch
//! that issued the request.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT_LANGUAGE, REFERER};
use reqwest::Client;
use tracing::{debug, instrument};

use crate::config::HttpConfig;
use crate::error::{ExtractError, Result};

/// A fetched page. Created per request and discarded after extraction.
#[derive(Debug, Clone)]
pub struct SourcePage {
    /// Final URL after redirects.
    pub url: String,
    pub body: String,
    /// Response headers, lowercase names.
    pub headers: HashMap<String, String>,
}

impl SourcePage {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
            headers: HashMap::new(),
        }
    }
}

/// A single GET request.
#[derive(Debug, Clone, Default)]
pub struct FetchRequest {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub referer: Option<String>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn headers(mut self, headers: &HashMap<String, String>) -> Self {
        for (name, value) in headers {
            self.headers.insert(name.clone(), value.clone());
        }
        self
    }

    #[must_use]
    pub fn referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }
}

/// Transport collaborator used by every extractor.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issue a GET. Fails with [`ExtractError::Network`] on transport
    /// failure, timeout, or non-2xx status.
    async fn fetch(&self, request: &FetchRequest) -> Result<SourcePage>;
}

/// `reqwest`-backed [`Fetcher`].
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut defaults = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&config.accept_language) {
            defaults.insert(ACCEPT_LANGUAGE, value);
        }

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(defaults)
            .http2_adaptive_window(true)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .brotli(true)
            .zstd(true)
            .gzip(true)
            .deflate(true)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .cookie_store(true)
            .build()?;

        Ok(Self { client })
    }

    /// Get the underlying reqwest client
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

fn to_header_map(request: &FetchRequest) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in &request.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ExtractError::parse(format!("header name {name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ExtractError::parse(format!("header value for {name}: {e}")))?;
        map.insert(name, value);
    }
    if let Some(referer) = &request.referer {
        let value = HeaderValue::from_str(referer)
            .map_err(|e| ExtractError::parse(format!("referer {referer}: {e}")))?;
        map.insert(REFERER, value);
    }
    Ok(map)
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn fetch(&self, request: &FetchRequest) -> Result<SourcePage> {
        let headers = to_header_map(request)?;
        let response = self.client.get(&request.url).headers(headers).send().await?;

        let status = response.status();
        debug!(status = %status, version = ?response.version(), "Response received");
        if !status.is_success() {
            return Err(ExtractError::network(format!(
                "{} returned {status}",
                request.url
            )));
        }

        let url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;

        Ok(SourcePage { url, body, headers })
    }
}
