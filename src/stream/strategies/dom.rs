//! DOM-selector strategy.

use scraper::{Html, Selector};

use crate::error::{ExtractError, Result};
use crate::stream::context::ResolveContext;
use crate::stream::source::Target;
use crate::stream::types::StreamCandidate;
use crate::urls::{absolutize, ensure_https, is_http_url};

/// Read one attribute from the first element matching `selector`.
#[derive(Debug, Clone)]
pub struct DomSelectorStrategy {
    pub target: Target,
    pub selector: String,
    pub attr: String,
}

impl DomSelectorStrategy {
    pub fn new(target: Target, selector: impl Into<String>, attr: impl Into<String>) -> Self {
        Self {
            target,
            selector: selector.into(),
            attr: attr.into(),
        }
    }

    pub(crate) async fn run(&self, ctx: &ResolveContext<'_>) -> Result<Vec<StreamCandidate>> {
        let Some(url) = ctx.render(&self.target) else {
            return Ok(Vec::new());
        };
        let page = ctx.page(&url).await?;
        self.extract(&page.body, &page.url)
    }

    pub fn extract(&self, html: &str, page_url: &str) -> Result<Vec<StreamCandidate>> {
        let Some(raw) = select_attr(html, &self.selector, &self.attr)? else {
            return Ok(Vec::new());
        };
        let url = absolutize(page_url, &ensure_https(raw.trim()));
        Ok(url
            .filter(|u| is_http_url(u))
            .map(StreamCandidate::video)
            .into_iter()
            .collect())
    }
}

fn select_attr(html: &str, selector: &str, attr: &str) -> Result<Option<String>> {
    let parsed = Selector::parse(selector)
        .map_err(|e| ExtractError::parse(format!("invalid selector {selector:?}: {e}")))?;
    let document = Html::parse_document(html);
    Ok(document
        .select(&parsed)
        .find_map(|el| el.value().attr(attr))
        .map(str::to_string))
}
