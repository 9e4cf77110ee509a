//! Direct API strategy.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ExtractError, Result};
use crate::stream::context::ResolveContext;
use crate::stream::source::Target;
use crate::stream::types::{QualityHint, StreamCandidate};
use crate::urls::unescape_url;

static GOFILE_WEBSITE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"fetchData\.wt\s*=\s*"([^"]+)""#).unwrap());

/// Request `target` and parse the response according to `layout`.
#[derive(Debug, Clone)]
pub struct ApiStrategy {
    pub target: Target,
    pub layout: ApiLayout,
}

#[derive(Debug, Clone)]
pub enum ApiLayout {
    /// `{code, message, data.playurl{video[], audio_resource[]}}`.
    BiliPlayurl,
    /// Guest account, then website token, then folder contents.
    /// `target` may use the extra `{token}` and `{wt}` variables.
    Gofile { account: Target, site_script: Target },
}

impl ApiStrategy {
    pub fn new(target: Target, layout: ApiLayout) -> Self {
        Self { target, layout }
    }

    pub(crate) async fn run(&self, ctx: &ResolveContext<'_>) -> Result<Vec<StreamCandidate>> {
        match &self.layout {
            ApiLayout::BiliPlayurl => self.playurl(ctx).await,
            ApiLayout::Gofile {
                account,
                site_script,
            } => self.gofile(ctx, account, site_script).await,
        }
    }

    async fn playurl(&self, ctx: &ResolveContext<'_>) -> Result<Vec<StreamCandidate>> {
        let Some(url) = ctx.render(&self.target) else {
            return Ok(Vec::new());
        };
        let page = ctx.page(&url).await?;
        let response: PlayurlResponse = serde_json::from_str(&page.body)?;

        let code = response.code.unwrap_or(0);
        if code != 0 {
            debug!(code, message = ?response.message, "playurl returned an error code");
            return Ok(Vec::new());
        }
        Ok(response
            .data
            .and_then(|d| d.playurl)
            .map(|playurl| playurl_candidates(&playurl))
            .unwrap_or_default())
    }

    async fn gofile(
        &self,
        ctx: &ResolveContext<'_>,
        account: &Target,
        site_script: &Target,
    ) -> Result<Vec<StreamCandidate>> {
        let (Some(account_url), Some(script_url)) = (ctx.render(account), ctx.render(site_script))
        else {
            return Ok(Vec::new());
        };
        if ctx.var("id").is_none() {
            return Ok(Vec::new());
        }

        let account: GofileAccount = serde_json::from_str(&ctx.page(&account_url).await?.body)?;
        let token = account
            .data
            .and_then(|d| d.token)
            .ok_or_else(|| ExtractError::parse("gofile account response has no token"))?;

        let script = ctx.page(&script_url).await?;
        let wt = GOFILE_WEBSITE_TOKEN
            .captures(&script.body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| ExtractError::parse("gofile website token not found"))?;

        let Some(url) = ctx.render_with(&self.target, &[("token", token.clone()), ("wt", wt)])
        else {
            return Ok(Vec::new());
        };
        let folder: GofileContent = serde_json::from_str(&ctx.page(&url).await?.body)?;
        let contents = folder.data.and_then(|d| d.contents).unwrap_or_default();

        let cookie = format!("accountToken={token}");
        Ok(contents
            .into_values()
            .filter_map(|item| {
                let link = item.link.filter(|l| !l.trim().is_empty())?;
                let mut candidate =
                    StreamCandidate::video(link).with_header("Cookie", cookie.clone());
                if let Some(name) = item.name {
                    candidate = candidate.with_quality(QualityHint::Label(name));
                }
                Some(candidate)
            })
            .collect())
    }
}

/// Video and audio candidates from a playurl payload. Empty URLs are
/// skipped.
pub(crate) fn playurl_candidates(playurl: &PlayurlInfo) -> Vec<StreamCandidate> {
    let mut candidates = Vec::new();

    for stream in playurl.video.as_deref().unwrap_or_default() {
        let Some(resource) = &stream.video_resource else {
            continue;
        };
        let Some(url) = resource.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
            continue;
        };
        let mut candidate = StreamCandidate::video(unescape_url(url))
            .with_codec(resource.codecs.clone())
            .with_bandwidth(resource.bandwidth);
        if let Some(quality) = stream.stream_info.as_ref().and_then(|i| i.quality) {
            candidate = candidate.with_quality(QualityHint::Code(quality));
        }
        candidates.push(candidate);
    }

    for audio in playurl.audio_resource.as_deref().unwrap_or_default() {
        let Some(url) = audio.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
            continue;
        };
        candidates.push(
            StreamCandidate::audio(unescape_url(url))
                .with_codec(audio.codecs.clone())
                .with_bandwidth(audio.bandwidth),
        );
    }

    candidates
}

// Response types

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub(crate) struct PlayurlResponse {
    pub code: Option<i64>,
    pub message: Option<String>,
    pub data: Option<PlayurlData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlayurlData {
    pub playurl: Option<PlayurlInfo>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PlayurlInfo {
    pub video: Option<Vec<PlayurlVideo>>,
    pub audio_resource: Option<Vec<AudioResource>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlayurlVideo {
    pub video_resource: Option<VideoResource>,
    pub stream_info: Option<StreamInfo>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub(crate) struct VideoResource {
    pub url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bandwidth: Option<u64>,
    pub codecs: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub(crate) struct StreamInfo {
    pub quality: Option<u32>,
    pub desc_words: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AudioResource {
    pub url: Option<String>,
    pub bandwidth: Option<u64>,
    pub codecs: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GofileAccount {
    data: Option<GofileAccountData>,
}

#[derive(Debug, Deserialize)]
struct GofileAccountData {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GofileContent {
    data: Option<GofileFolder>,
}

#[derive(Debug, Deserialize)]
struct GofileFolder {
    contents: Option<BTreeMap<String, GofileItem>>,
}

#[derive(Debug, Deserialize)]
struct GofileItem {
    link: Option<String>,
    name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::types::MediaKind;

    #[test]
    fn playurl_payload_yields_video_and_audio() {
        let json = r#"{
            "video": [
                {"video_resource": {"url": "https://upos/a.m4s", "codecs": "avc1.640032", "bandwidth": 900000},
                 "stream_info": {"quality": 80}},
                {"video_resource": {"url": ""}, "stream_info": {"quality": 112}},
                {"stream_info": {"quality": 64}}
            ],
            "audio_resource": [{"url": "https://upos/a.m4a", "codecs": "mp4a.40.2"}]
        }"#;
        let info: PlayurlInfo = serde_json::from_str(json).unwrap();
        let candidates = playurl_candidates(&info);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].kind, MediaKind::Video);
        assert_eq!(candidates[0].quality_hint, Some(QualityHint::Code(80)));
        assert_eq!(candidates[0].bandwidth, Some(900_000));
        assert_eq!(candidates[1].kind, MediaKind::Audio);
        assert_eq!(candidates[1].url, "https://upos/a.m4a");
    }

    #[test]
    fn null_lists_are_tolerated() {
        let info: PlayurlInfo =
            serde_json::from_str(r#"{"video": null, "audio_resource": null}"#).unwrap();
        assert!(playurl_candidates(&info).is_empty());
    }

    #[test]
    fn website_token_pattern() {
        let script = r#"var fetchData = {}; fetchData.wt = "4fd6sg89d7s6";"#;
        let wt = GOFILE_WEBSITE_TOKEN.captures(script).unwrap();
        assert_eq!(&wt[1], "4fd6sg89d7s6");
    }
}
