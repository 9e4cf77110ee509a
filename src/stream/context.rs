//! State for a single resolution call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::source::{SourceConfig, Target};
use super::token::EpisodeToken;
use crate::error::Result;
use crate::http_client::{FetchRequest, Fetcher, SourcePage};

/// Template variables plus a page memo, so each upstream page is fetched
/// at most once per call even when several strategies read it.
///
/// Discarded when the call ends; nothing here outlives a resolution.
pub struct ResolveContext<'a> {
    fetcher: &'a dyn Fetcher,
    pub source: &'a SourceConfig,
    vars: HashMap<&'static str, String>,
    pages: Mutex<HashMap<String, Arc<SourcePage>>>,
}

impl<'a> ResolveContext<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, source: &'a SourceConfig, token: &EpisodeToken) -> Self {
        let mut vars = HashMap::new();
        vars.insert("origin", source.origin.clone());
        if let Some(api) = &source.api_base {
            vars.insert("api", api.clone());
        }
        if let Some(url) = &token.url {
            vars.insert("url", url.clone());
            if let Some(id) = source.extract_id(url) {
                vars.insert("id", id);
            }
        }
        if let Some(id) = &token.episode_id {
            vars.insert("episode_id", id.clone());
        }
        if let Some(id) = &token.season_id {
            vars.insert("season_id", id.clone());
        }
        if let Some(id) = &token.asset_id {
            vars.insert("asset_id", id.clone());
        }

        Self {
            fetcher,
            source,
            vars,
            pages: Mutex::new(HashMap::new()),
        }
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn render(&self, target: &Target) -> Option<String> {
        target.render(&self.vars)
    }

    /// Render with additional variables discovered mid-strategy.
    pub fn render_with(&self, target: &Target, extra: &[(&'static str, String)]) -> Option<String> {
        let mut vars = self.vars.clone();
        for (name, value) in extra {
            vars.insert(name, value.clone());
        }
        target.render(&vars)
    }

    /// GET `url` with the source's request headers, memoized per call.
    pub async fn page(&self, url: &str) -> Result<Arc<SourcePage>> {
        if let Some(page) = self.cached(url) {
            debug!(url, "page memo hit");
            return Ok(page);
        }
        let request = FetchRequest::get(url).headers(&self.source.request_headers);
        let page = Arc::new(self.fetcher.fetch(&request).await?);
        if let Ok(mut pages) = self.pages.lock() {
            pages.insert(url.to_string(), Arc::clone(&page));
        }
        Ok(page)
    }

    /// Unmemoized request; the source's request headers are added unless
    /// the request already sets them.
    pub async fn fetch(&self, request: FetchRequest) -> Result<SourcePage> {
        let mut request = request;
        for (name, value) in &self.source.request_headers {
            request
                .headers
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
        self.fetcher.fetch(&request).await
    }

    fn cached(&self, url: &str) -> Option<Arc<SourcePage>> {
        self.pages.lock().ok()?.get(url).cloned()
    }
}
