//! Per-source configuration.
//!
//! A source (streaming site or file host) is described by data rather
//! than by a type: its origin, the strategies to try in order, how to read
//! its quality hints, and which URLs count as valid media.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::quality::QualityTable;
use super::strategies::Strategy;
use crate::urls::is_http_url;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").unwrap());

/// One or more URL templates; the first whose placeholders all resolve
/// is used.
///
/// Placeholders: `{origin}`, `{api}`, `{url}`, `{id}`, `{episode_id}`,
/// `{season_id}`, `{asset_id}`, plus strategy-specific extras.
#[derive(Debug, Clone)]
pub struct Target {
    templates: Vec<String>,
}

impl Target {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            templates: vec![template.into()],
        }
    }

    pub fn first_of<I, S>(templates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            templates: templates.into_iter().map(Into::into).collect(),
        }
    }

    pub fn render(&self, vars: &HashMap<&str, String>) -> Option<String> {
        self.templates
            .iter()
            .find_map(|template| render_template(template, vars))
    }
}

/// Substitute `{name}` placeholders; `None` if any is missing.
pub fn render_template(template: &str, vars: &HashMap<&str, String>) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(template) {
        let whole = caps.get(0)?;
        let value = vars.get(&caps[1]).filter(|v| !v.is_empty())?;
        out.push_str(&template[last..whole.start()]);
        out.push_str(value);
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Some(out)
}

/// Validity filter for URLs found by loose scans.
///
/// An empty allow-list accepts any `http(s)` URL.
#[derive(Debug, Clone, Default)]
pub struct UrlFilter {
    allow: Vec<String>,
}

impl UrlFilter {
    pub fn allow_any() -> Self {
        Self::default()
    }

    pub fn hosts<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allow: fragments
                .into_iter()
                .map(|f| f.into().to_lowercase())
                .collect(),
        }
    }

    pub fn accepts(&self, url: &str) -> bool {
        if !is_http_url(url) {
            return false;
        }
        if self.allow.is_empty() {
            return true;
        }
        let lower = url.to_lowercase();
        self.allow.iter().any(|fragment| lower.contains(fragment))
    }
}

/// Metadata endpoint whose response is classified before extraction.
#[derive(Debug, Clone)]
pub struct Preflight {
    pub target: Target,
}

#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Display name, used as the descriptor `source`.
    pub name: String,
    /// Canonical origin, e.g. `https://gofile.io`.
    pub origin: String,
    pub api_base: Option<String>,
    /// Host fragments this source handles.
    pub hosts: Vec<String>,
    /// First capture group is the `{id}` template variable.
    pub id_pattern: Option<Regex>,
    /// Sent on every upstream request.
    pub request_headers: HashMap<String, String>,
    /// Attached to every emitted descriptor.
    pub stream_headers: HashMap<String, String>,
    /// Default descriptor referer; `None` stamps `{origin}/`.
    pub referer: Option<String>,
    pub preflight: Option<Preflight>,
    /// Tried in order; the first to yield candidates wins.
    pub strategies: Vec<Strategy>,
    pub quality_table: QualityTable,
    pub url_filter: UrlFilter,
}

impl SourceConfig {
    pub fn new(name: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: origin.into(),
            api_base: None,
            hosts: Vec::new(),
            id_pattern: None,
            request_headers: HashMap::new(),
            stream_headers: HashMap::new(),
            referer: None,
            preflight: None,
            strategies: Vec::new(),
            quality_table: QualityTable::Resolution,
            url_filter: UrlFilter::allow_any(),
        }
    }

    #[must_use]
    pub fn api_base(mut self, api: impl Into<String>) -> Self {
        self.api_base = Some(api.into());
        self
    }

    #[must_use]
    pub fn hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosts = hosts.into_iter().map(|h| h.into().to_lowercase()).collect();
        self
    }

    #[must_use]
    pub fn id_pattern(mut self, pattern: Regex) -> Self {
        self.id_pattern = Some(pattern);
        self
    }

    #[must_use]
    pub fn request_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request_headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn stream_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.stream_headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    #[must_use]
    pub fn preflight(mut self, target: Target) -> Self {
        self.preflight = Some(Preflight { target });
        self
    }

    #[must_use]
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategies.push(strategy);
        self
    }

    #[must_use]
    pub fn quality_table(mut self, table: QualityTable) -> Self {
        self.quality_table = table;
        self
    }

    #[must_use]
    pub fn url_filter(mut self, filter: UrlFilter) -> Self {
        self.url_filter = filter;
        self
    }

    /// Returns `true` if this source handles the given URL.
    pub fn matches(&self, url: &str) -> bool {
        let Ok(parsed) = url::Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        let host = host.to_lowercase();
        self.hosts.iter().any(|h| host.contains(h.as_str()))
    }

    pub fn extract_id(&self, url: &str) -> Option<String> {
        self.id_pattern
            .as_ref()?
            .captures(url)?
            .get(1)
            .map(|m| m.as_str().to_string())
    }

    /// Referer stamped on descriptors unless a candidate overrides it.
    pub fn default_referer(&self) -> String {
        self.referer
            .clone()
            .unwrap_or_else(|| format!("{}/", self.origin))
    }
}
