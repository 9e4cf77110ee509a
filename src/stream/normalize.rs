//! Episode/link normalization.
//!
//! Listing pages link to episodes; detail pages are keyed by series. The
//! normalizer follows a page's breadcrumb back to its parent so both shapes
//! collapse to one canonical URL.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use scraper::{Html, Selector};
use tracing::{debug, instrument};

use crate::error::{ExtractError, Result};
use crate::http_client::{FetchRequest, Fetcher};
use crate::urls::absolutize;

static BREADCRUMB_PARENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.breadcrumb span:nth-child(3) a").unwrap());

pub struct LinkNormalizer {
    fetcher: Arc<dyn Fetcher>,
    selector: Selector,
    headers: HashMap<String, String>,
}

impl LinkNormalizer {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        selector: &str,
        headers: HashMap<String, String>,
    ) -> Result<Self> {
        let selector = Selector::parse(selector)
            .map_err(|e| ExtractError::parse(format!("invalid selector {selector:?}: {e}")))?;
        Ok(Self {
            fetcher,
            selector,
            headers,
        })
    }

    /// Third breadcrumb entry, as used by WordPress anime themes.
    pub fn breadcrumb(fetcher: Arc<dyn Fetcher>, headers: HashMap<String, String>) -> Self {
        Self {
            fetcher,
            selector: BREADCRUMB_PARENT.clone(),
            headers,
        }
    }

    /// Fetch `url` once and return its parent link, or `url` unchanged when
    /// the page has none.
    #[instrument(skip(self))]
    pub async fn normalize(&self, url: &str) -> Result<String> {
        let request = FetchRequest::get(url).headers(&self.headers);
        let page = self.fetcher.fetch(&request).await?;
        let canonical = self
            .parent_link(&page.body, url)
            .unwrap_or_else(|| url.to_string());
        debug!(canonical = %canonical, "normalized link");
        Ok(canonical)
    }

    /// Parent link from already-fetched HTML.
    pub fn parent_link(&self, html: &str, page_url: &str) -> Option<String> {
        let document = Html::parse_document(html);
        let href = document
            .select(&self.selector)
            .find_map(|a| a.value().attr("href"))?;
        absolutize(page_url, href)
    }
}
