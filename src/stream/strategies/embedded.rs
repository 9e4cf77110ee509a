//! Embedded-state strategy: JSON the page serializes for its own player.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::api::{playurl_candidates, PlayurlInfo};
use crate::error::{ExtractError, Result};
use crate::stream::context::ResolveContext;
use crate::stream::source::{Target, UrlFilter};
use crate::stream::types::{QualityHint, StreamCandidate};
use crate::urls::{is_http_url, unescape_url};

static SCRIPT_BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script[^>]*>(.*?)</script>").unwrap());

static VIDEO_ISH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)m3u8|\.mp4|\.m4s|video|playurl").unwrap());

/// `"field": "http..."` for each URL-valued field name.
static URL_FIELDS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["url", "baseUrl", "base_url", "playUrl", "play_url"]
        .iter()
        .map(|field| Regex::new(&format!(r#""{field}"\s*:\s*"(https?:[^"]+)""#)).unwrap())
        .collect()
});

const MAX_DEPTH: usize = 32;

/// Where a page keeps its state.
#[derive(Debug, Clone)]
pub enum StateMarker {
    /// Assignment of the form `NAME = {...}`.
    Global(String),
    /// `<script id="ID">{...}</script>`.
    ScriptId(String),
    /// Inline script bodies containing any keyword.
    ScriptContaining(Vec<String>),
    /// JSON held in an element attribute.
    Attribute { selector: String, attr: String },
}

impl StateMarker {
    pub fn global(name: impl Into<String>) -> Self {
        Self::Global(name.into())
    }

    pub fn script_id(id: impl Into<String>) -> Self {
        Self::ScriptId(id.into())
    }

    pub fn script_containing<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ScriptContaining(keywords.into_iter().map(Into::into).collect())
    }

    pub fn attribute(selector: impl Into<String>, attr: impl Into<String>) -> Self {
        Self::Attribute {
            selector: selector.into(),
            attr: attr.into(),
        }
    }

    fn fragments(&self, html: &str) -> Result<Vec<String>> {
        match self {
            Self::Global(name) => Ok(html
                .match_indices(name.as_str())
                .filter_map(|(at, _)| {
                    let rest = html[at + name.len()..].trim_start();
                    let rest = rest.strip_prefix('=')?;
                    balanced_json(rest).map(str::to_string)
                })
                .collect()),
            Self::ScriptId(id) => element_texts(html, &format!("script#{id}")),
            Self::ScriptContaining(keywords) => Ok(SCRIPT_BODY
                .captures_iter(html)
                .filter_map(|c| c.get(1).map(|m| m.as_str()))
                .filter(|body| keywords.iter().any(|k| body.contains(k.as_str())))
                .map(str::to_string)
                .collect()),
            Self::Attribute { selector, attr } => attribute_values(html, selector, attr),
        }
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| ExtractError::parse(format!("invalid selector {selector:?}: {e}")))
}

fn attribute_values(html: &str, selector: &str, attr: &str) -> Result<Vec<String>> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);
    Ok(document
        .select(&selector)
        .filter_map(|el| el.value().attr(attr).map(str::to_string))
        .collect())
}

fn element_texts(html: &str, selector: &str) -> Result<Vec<String>> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);
    Ok(document
        .select(&selector)
        .map(|el| el.text().collect::<String>())
        .collect())
}

/// The first brace-balanced `{...}` in `text`, honoring JSON strings.
pub(crate) fn balanced_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Try each marker in order; for each captured fragment, prefer explicit
/// JSON pointers, then a structural walk for known payload shapes, then a
/// loose scan of URL-valued fields.
#[derive(Debug, Clone)]
pub struct EmbeddedStateStrategy {
    pub target: Target,
    pub markers: Vec<StateMarker>,
    pub pointers: Vec<String>,
}

impl EmbeddedStateStrategy {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            markers: Vec::new(),
            pointers: Vec::new(),
        }
    }

    #[must_use]
    pub fn marker(mut self, marker: StateMarker) -> Self {
        self.markers.push(marker);
        self
    }

    #[must_use]
    pub fn pointer(mut self, pointer: impl Into<String>) -> Self {
        self.pointers.push(pointer.into());
        self
    }

    pub(crate) async fn run(&self, ctx: &ResolveContext<'_>) -> Result<Vec<StreamCandidate>> {
        let Some(url) = ctx.render(&self.target) else {
            return Ok(Vec::new());
        };
        let page = ctx.page(&url).await?;
        self.extract(&page.body, &page.url, &ctx.source.url_filter)
    }

    pub fn extract(
        &self,
        html: &str,
        page_url: &str,
        filter: &UrlFilter,
    ) -> Result<Vec<StreamCandidate>> {
        for marker in &self.markers {
            for fragment in marker.fragments(html)? {
                let found = self.from_fragment(&fragment, page_url, filter);
                if !found.is_empty() {
                    debug!(count = found.len(), "embedded state matched");
                    return Ok(found);
                }
            }
        }
        Ok(Vec::new())
    }

    fn from_fragment(&self, fragment: &str, page_url: &str, filter: &UrlFilter) -> Vec<StreamCandidate> {
        let value = serde_json::from_str::<Value>(fragment).ok().or_else(|| {
            balanced_json(fragment).and_then(|json| serde_json::from_str::<Value>(json).ok())
        });
        if let Some(value) = value {
            for pointer in &self.pointers {
                let Some(raw) = value.pointer(pointer).and_then(Value::as_str) else {
                    continue;
                };
                let url = unescape_url(raw.trim());
                if is_http_url(&url) {
                    return vec![StreamCandidate::video(url)];
                }
            }
            let mut structured = structured_candidates(&value, 0);
            structured.retain(|c| is_http_url(&c.url));
            if !structured.is_empty() {
                return structured;
            }
        }
        scan_fields(fragment, page_url, filter)
    }
}

/// Loose scan of URL-valued fields, used when no known shape parses.
fn scan_fields(fragment: &str, page_url: &str, filter: &UrlFilter) -> Vec<StreamCandidate> {
    let mut found: Vec<StreamCandidate> = Vec::new();
    for pattern in URL_FIELDS.iter() {
        for caps in pattern.captures_iter(fragment) {
            let url = unescape_url(&caps[1]);
            if !VIDEO_ISH.is_match(&url) || !filter.accepts(&url) {
                continue;
            }
            if found.iter().any(|c| c.url == url) {
                continue;
            }
            found.push(
                StreamCandidate::video(url)
                    .with_label("Stream")
                    .with_header("Referer", page_url),
            );
        }
    }
    found
}

/// Depth-first search for a playurl or dash payload.
fn structured_candidates(value: &Value, depth: usize) -> Vec<StreamCandidate> {
    if depth > MAX_DEPTH {
        return Vec::new();
    }
    match value {
        Value::Object(map) => {
            let playurl_shaped = map
                .get("video")
                .and_then(Value::as_array)
                .is_some_and(|v| v.iter().any(|i| i.get("video_resource").is_some()));
            if playurl_shaped {
                if let Ok(info) = PlayurlInfo::deserialize(value) {
                    let found = playurl_candidates(&info);
                    if !found.is_empty() {
                        return found;
                    }
                }
            }
            if let Some(dash) = map.get("dash").filter(|d| d.is_object()) {
                if let Ok(dash) = Dash::deserialize(dash) {
                    let found = dash_candidates(&dash);
                    if !found.is_empty() {
                        return found;
                    }
                }
            }
            map.values()
                .map(|child| structured_candidates(child, depth + 1))
                .find(|found| !found.is_empty())
                .unwrap_or_default()
        }
        Value::Array(items) => items
            .iter()
            .map(|child| structured_candidates(child, depth + 1))
            .find(|found| !found.is_empty())
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn dash_candidates(dash: &Dash) -> Vec<StreamCandidate> {
    let video = dash.video.as_deref().unwrap_or_default().iter().filter_map(|s| {
        let url = s.url()?;
        let mut candidate = StreamCandidate::video(url)
            .with_codec(s.codecs.clone())
            .with_bandwidth(s.bandwidth);
        if let Some(id) = s.id {
            candidate = candidate.with_quality(QualityHint::Code(id));
        }
        Some(candidate)
    });
    let audio = dash.audio.as_deref().unwrap_or_default().iter().filter_map(|s| {
        Some(
            StreamCandidate::audio(s.url()?)
                .with_codec(s.codecs.clone())
                .with_bandwidth(s.bandwidth),
        )
    });
    video.chain(audio).collect()
}

#[derive(Debug, Deserialize)]
struct Dash {
    video: Option<Vec<DashStream>>,
    audio: Option<Vec<DashStream>>,
}

#[derive(Debug, Deserialize)]
struct DashStream {
    id: Option<u32>,
    #[serde(rename = "baseUrl")]
    base_url_camel: Option<String>,
    base_url: Option<String>,
    bandwidth: Option<u64>,
    codecs: Option<String>,
}

impl DashStream {
    fn url(&self) -> Option<String> {
        self.base_url_camel
            .as_deref()
            .or(self.base_url.as_deref())
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(unescape_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::types::MediaKind;

    fn strategy() -> EmbeddedStateStrategy {
        EmbeddedStateStrategy::new(Target::new("{url}"))
            .marker(StateMarker::global("window.__INITIAL_STATE__"))
            .marker(StateMarker::script_containing(["playurl", "baseUrl"]))
            .marker(StateMarker::global("window.__playinfo__"))
    }

    #[test]
    fn finds_nested_playurl() {
        let html = r#"<html><script>window.__INITIAL_STATE__ = {"player":{"playurl":{
            "video":[{"video_resource":{"url":"https://x/a.m4s"},"stream_info":{"quality":64}}],
            "audio_resource":[{"url":"https://x/a.m4a"}]}}};</script></html>"#;
        let found = strategy()
            .extract(html, "https://www.bilibili.tv/en/play/1/2", &UrlFilter::allow_any())
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].url, "https://x/a.m4s");
        assert_eq!(found[1].kind, MediaKind::Audio);
    }

    #[test]
    fn finds_dash_in_playinfo() {
        let html = r#"<script>window.__playinfo__={"code":0,"data":{"dash":{
            "video":[{"id":80,"baseUrl":"https:\/\/upos-sz.bilivideo.com\/v.m4s","codecs":"avc1"}],
            "audio":[{"id":30280,"base_url":"https://upos-sz.bilivideo.com/a.m4s"}]}}}</script>"#;
        let found = strategy()
            .extract(html, "https://www.bilibili.tv/", &UrlFilter::allow_any())
            .unwrap();
        assert_eq!(found[0].url, "https://upos-sz.bilivideo.com/v.m4s");
        assert_eq!(found[0].quality_hint, Some(QualityHint::Code(80)));
        assert_eq!(found[1].url, "https://upos-sz.bilivideo.com/a.m4s");
    }

    #[test]
    fn loose_field_scan_is_host_checked() {
        let html = r#"<script>var cfg = {"baseUrl":"https:\/\/upos-sz.bilivideo.com\/v.m4s",
            "url":"https://tracker.example/video.mp4"};</script>"#;
        let filter = UrlFilter::hosts(["bilivideo"]);
        let found = strategy().extract(html, "https://page/", &filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].url, "https://upos-sz.bilivideo.com/v.m4s");
        assert_eq!(
            found[0].required_headers.get("Referer").map(String::as_str),
            Some("https://page/")
        );
    }

    #[test]
    fn attribute_marker_with_pointer() {
        let html = r#"<div id="app" data-page="{&quot;props&quot;:{&quot;datas&quot;:{&quot;data&quot;:{&quot;link&quot;:{&quot;media&quot;:&quot;https://media.archivd.net/v.mp4&quot;}}}}}"></div>"#;
        let strategy = EmbeddedStateStrategy::new(Target::new("{url}"))
            .marker(StateMarker::attribute("div#app", "data-page"))
            .pointer("/props/datas/data/link/media");
        let found = strategy.extract(html, "https://archivd.net/", &UrlFilter::allow_any()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].url, "https://media.archivd.net/v.mp4");
    }

    #[test]
    fn balanced_json_skips_braces_in_strings() {
        let text = r#"= {"a":"}{","b":{"c":"\"}"}}; trailing"#;
        assert_eq!(balanced_json(text), Some(r#"{"a":"}{","b":{"c":"\"}"}}"#));
        assert_eq!(balanced_json("{unterminated"), None);
    }

    #[test]
    fn next_data_script_by_id() {
        let html = r#"<script id="__NEXT_DATA__" type="application/json">{"props":{"playurl":{"video":[{"video_resource":{"url":"https://x/v.m4s"}}]}}}</script>"#;
        let strategy = EmbeddedStateStrategy::new(Target::new("{url}"))
            .marker(StateMarker::script_id("__NEXT_DATA__"));
        let found = strategy.extract(html, "https://p/", &UrlFilter::allow_any()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].url, "https://x/v.m4s");
    }

    #[test]
    fn no_state_is_empty() {
        let found = strategy()
            .extract("<html><body>nothing</body></html>", "https://p/", &UrlFilter::allow_any())
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn relative_structured_urls_fall_back_to_field_scan() {
        let html = r#"<script>window.__INITIAL_STATE__ = {"playurl":{
            "video":[{"video_resource":{"url":"/v.m4s"},"stream_info":{"quality":64}}]},
            "backup":{"play_url":"https://upos-sz.bilivideo.com/backup.m3u8"}};</script>"#;
        let found = strategy()
            .extract(html, "https://www.bilibili.tv/en/play/1/2", &UrlFilter::hosts(["bilivideo"]))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].url, "https://upos-sz.bilivideo.com/backup.m3u8");
    }
}
