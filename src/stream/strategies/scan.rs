//! Pattern-scan strategy: regex families over raw page text.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;
use crate::stream::context::ResolveContext;
use crate::stream::source::{Target, UrlFilter};
use crate::stream::types::StreamCandidate;
use crate::urls::{is_http_url, unescape_url};

static HLS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(https?://[^"'\s<>\\]+\.m3u8[^"'\s<>\\]*)"#).unwrap());
static MP4_BARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(https?://[^"'\s<>\\]+\.mp4[^"'\s<>\\]*)"#).unwrap());
static MP4_URL_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""url"\s*:\s*"(https?://[^"]+\.mp4[^"]*)""#).unwrap());
static MP4_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"src\s*[=:]\s*["'](https?://[^"']+\.mp4[^"']*)["']"#).unwrap());
static DASH_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(https?://[^"'\s<>\\]+\.m4s[^"'\s<>\\]*)"#).unwrap());
static CDN_BILI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(https?://[^"'\s<>\\]*(?:upos-sz|bilivideo|bstar)[^"'\s<>\\]+)"#).unwrap()
});
static CDN_AKAMAI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(https?://[^"'\s<>\\]*akamaized\.net[^"'\s<>\\]+)"#).unwrap());

/// One labelled group of patterns. The first group capture (or the whole
/// match) is the URL.
#[derive(Debug, Clone)]
pub struct ScanFamily {
    pub label: String,
    pub patterns: Vec<Regex>,
    /// URLs must be longer than this.
    pub min_len: usize,
    /// Apply the source's host allow-list.
    pub host_checked: bool,
}

impl ScanFamily {
    pub fn new(label: impl Into<String>, patterns: Vec<Regex>) -> Self {
        Self {
            label: label.into(),
            patterns,
            min_len: 0,
            host_checked: false,
        }
    }

    #[must_use]
    pub fn min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }

    #[must_use]
    pub fn host_checked(mut self) -> Self {
        self.host_checked = true;
        self
    }
}

/// HLS, MP4, DASH segments, then known CDN hosts.
pub fn default_families() -> Vec<ScanFamily> {
    vec![
        ScanFamily::new("HLS", vec![HLS.clone()]).host_checked(),
        ScanFamily::new(
            "MP4",
            vec![MP4_BARE.clone(), MP4_URL_FIELD.clone(), MP4_SRC.clone()],
        )
        .host_checked(),
        ScanFamily::new("DASH", vec![DASH_SEGMENT.clone()]).host_checked(),
        ScanFamily::new("CDN", vec![CDN_BILI.clone(), CDN_AKAMAI.clone()]).min_len(50),
    ]
}

/// Families are tried in order; within a family each pattern keeps at most
/// `limit` distinct matches. The first family with a valid URL wins.
#[derive(Debug, Clone)]
pub struct PatternScanStrategy {
    pub target: Target,
    pub families: Vec<ScanFamily>,
    pub limit: usize,
}

impl PatternScanStrategy {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            families: default_families(),
            limit: 5,
        }
    }

    #[must_use]
    pub fn families(mut self, families: Vec<ScanFamily>) -> Self {
        self.families = families;
        self
    }

    pub(crate) async fn run(&self, ctx: &ResolveContext<'_>) -> Result<Vec<StreamCandidate>> {
        let Some(url) = ctx.render(&self.target) else {
            return Ok(Vec::new());
        };
        let page = ctx.page(&url).await?;
        Ok(self.scan(&page.body, &page.url, &ctx.source.url_filter))
    }

    pub fn scan(&self, text: &str, page_url: &str, filter: &UrlFilter) -> Vec<StreamCandidate> {
        let text = unescape_url(text);
        for family in &self.families {
            let mut urls: Vec<String> = Vec::new();
            for pattern in &family.patterns {
                let mut distinct: Vec<String> = Vec::new();
                for caps in pattern.captures_iter(&text) {
                    let Some(m) = caps.get(1).or_else(|| caps.get(0)) else {
                        continue;
                    };
                    let url = m.as_str().to_string();
                    if !distinct.contains(&url) {
                        distinct.push(url);
                    }
                    if distinct.len() == self.limit {
                        break;
                    }
                }
                for url in distinct {
                    let valid = url.len() > family.min_len
                        && is_http_url(&url)
                        && (!family.host_checked || filter.accepts(&url));
                    if valid && !urls.contains(&url) {
                        urls.push(url);
                    }
                }
            }
            if !urls.is_empty() {
                return urls
                    .into_iter()
                    .map(|url| {
                        StreamCandidate::video(url)
                            .with_label(family.label.clone())
                            .with_header("Referer", page_url)
                    })
                    .collect();
            }
        }
        Vec::new()
    }
}
