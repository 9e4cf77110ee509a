//! Bilibili TV (international).
//!
//! Listings and detail come from the `web/v2` gateway; stream resolution
//! goes through the [`bilibili`](crate::stream::providers::bilibili) source.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{Category, EntryKind, EpisodeEntry, ListingEntry, ListingPage, LoadDetail, SiteProvider};
use crate::config::{BilibiliConfig, ExtractorConfig};
use crate::error::{ExtractError, Result};
use crate::http_client::{FetchRequest, Fetcher};
use crate::stream::context::ResolveContext;
use crate::stream::providers::bilibili as stream_source;
use crate::stream::{EpisodeToken, Emitter, ResolvedLink, Resolver, SourceConfig, SubtitleFile};
use crate::urls::ensure_https;

static CATEGORIES: &[Category] = &[
    Category { key: "foryou", name: "For You" },
    Category { key: "timeline", name: "Latest Updates" },
    Category { key: "search:movie", name: "Movies" },
    Category { key: "search:anime", name: "Anime" },
    Category { key: "search:drama", name: "Drama" },
    Category { key: "search:action", name: "Action" },
    Category { key: "search:comedy", name: "Comedy" },
    Category { key: "search:romance", name: "Romance" },
    Category { key: "search:thriller", name: "Thriller" },
    Category { key: "search:horror", name: "Horror" },
    Category { key: "search:fantasy", name: "Fantasy" },
    Category { key: "search:adventure", name: "Adventure" },
    Category { key: "search:isekai", name: "Isekai" },
    Category { key: "search:hindi", name: "Hindi Dubbed" },
    Category { key: "search:tagalog", name: "Tagalog Dubbed" },
];

/// Rotated by page number for the "For You" row.
const POPULAR_TERMS: [&str; 5] = ["full movie", "anime", "action", "comedy", "drama"];

/// A listing page with fewer entries than this is the last one.
const FULL_PAGE: usize = 15;

static SEASON_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/play/(\d+)").unwrap());
static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/video/(\d+)").unwrap());
static PAGE_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<title>([^<]+)</title>").unwrap());
static OG_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<meta property="og:image" content="([^"]+)""#).unwrap());
static OG_DESCRIPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<meta property="og:description" content="([^"]+)""#).unwrap());

/// Which search modules a listing keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modules {
    All,
    SeasonsOnly,
}

pub struct Bilibili {
    config: BilibiliConfig,
    fetcher: Arc<dyn Fetcher>,
    headers: HashMap<String, String>,
    resolver: Resolver,
    source: SourceConfig,
}

impl Bilibili {
    pub fn new(config: &ExtractorConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let site = config.bilibili.clone();
        let source = stream_source::source(&site, &config.http.accept_language);
        Self {
            headers: source.request_headers.clone(),
            resolver: Resolver::new(Arc::clone(&fetcher)),
            source,
            config: site,
            fetcher,
        }
    }

    /// Source configuration used for stream resolution.
    pub fn source(&self) -> &SourceConfig {
        &self.source
    }

    fn web_api(&self) -> String {
        format!("{}/intl/gateway/web/v2", self.config.api_base)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let request = FetchRequest::get(url).headers(&self.headers);
        let page = self.fetcher.fetch(&request).await?;
        Ok(serde_json::from_str(&page.body)?)
    }

    fn season_url(&self, season_id: &str) -> String {
        format!("{}/en/play/{season_id}", self.config.main_url)
    }

    fn video_url(&self, aid: &str) -> String {
        format!("{}/en/video/{aid}", self.config.main_url)
    }

    async fn search_entries(&self, keyword: &str, page: u32, modules: Modules) -> Result<Vec<ListingEntry>> {
        let url = format!(
            "{}/search_v2?keyword={}&platform=web&pn={page}&ps=30",
            self.web_api(),
            urlencoding::encode(keyword)
        );
        let response: SearchResponse = self.get_json(&url).await?;
        let items = response
            .data
            .and_then(|d| d.modules)
            .unwrap_or_default()
            .into_iter()
            .flat_map(|m| m.items.unwrap_or_default());
        Ok(items
            .filter_map(|item| match modules {
                Modules::All => self.entry(item),
                Modules::SeasonsOnly if item.season_id.is_some() => self.entry(item),
                Modules::SeasonsOnly => None,
            })
            .collect())
    }

    fn entry(&self, item: SearchItem) -> Option<ListingEntry> {
        let title = item.title?;
        let poster = item.cover.as_deref().map(ensure_https);
        if let Some(season_id) = item.season_id {
            Some(ListingEntry {
                title,
                url: self.season_url(&season_id),
                poster,
                kind: EntryKind::Anime,
            })
        } else {
            item.aid.map(|aid| ListingEntry {
                title,
                url: self.video_url(&aid),
                poster,
                kind: EntryKind::Movie,
            })
        }
    }

    async fn timeline(&self) -> Result<Vec<ListingEntry>> {
        let url = format!(
            "{}/ogv/timeline?platform=web&s_locale={}",
            self.web_api(),
            self.config.locale
        );
        let response: TimelineResponse = self.get_json(&url).await?;
        Ok(response
            .data
            .and_then(|d| d.items)
            .unwrap_or_default()
            .into_iter()
            .flat_map(|day| day.cards.unwrap_or_default())
            .filter_map(|card| {
                Some(ListingEntry {
                    title: card.title?,
                    url: self.season_url(&card.season_id?),
                    poster: card.cover.as_deref().map(ensure_https),
                    kind: EntryKind::Anime,
                })
            })
            .collect())
    }

    async fn guard_access(&self, token: &EpisodeToken) -> Result<()> {
        let decision = self.resolver.access(&self.source, token).await;
        if decision.is_restricted() {
            return Err(ExtractError::AccessRestricted(decision));
        }
        Ok(())
    }

    async fn load_season(&self, url: &str, season_id: &str) -> Result<LoadDetail> {
        let api = self.web_api();
        let info: SeasonInfoResponse = self
            .get_json(&format!("{api}/ogv/play/season_info?season_id={season_id}&platform=web"))
            .await?;
        let season = info
            .data
            .and_then(|d| d.season)
            .ok_or_else(|| ExtractError::parse("season_info has no season"))?;
        let title = season
            .title
            .ok_or_else(|| ExtractError::parse("season has no title"))?;

        let listing: EpisodesResponse = self
            .get_json(&format!("{api}/ogv/play/episodes?season_id={season_id}&platform=web"))
            .await?;
        let sections = listing.data.and_then(|d| d.sections).unwrap_or_default();

        let first = sections
            .iter()
            .flat_map(|s| s.episodes.iter().flatten())
            .find_map(|ep| ep.episode_id.clone());
        if let Some(first) = first {
            self.guard_access(&EpisodeToken::episode(first, season_id)).await?;
        }

        let episodes = season_episodes(sections, season_id);
        let year = season
            .player_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .and_then(|y| y.parse().ok());

        Ok(LoadDetail {
            title,
            url: url.to_string(),
            kind: EntryKind::Anime,
            poster: season
                .vertical_cover
                .or(season.horizontal_cover)
                .as_deref()
                .map(ensure_https),
            description: season.description,
            tags: season
                .styles
                .unwrap_or_default()
                .into_iter()
                .filter_map(|s| s.title)
                .collect(),
            year,
            episodes,
        })
    }

    async fn load_video(&self, url: &str, aid: &str) -> Result<LoadDetail> {
        let token = EpisodeToken::asset(aid);
        self.guard_access(&token).await?;

        let fallback = || LoadDetail {
            title: format!("Video {aid}"),
            url: url.to_string(),
            kind: EntryKind::Movie,
            poster: None,
            description: Some("Bilibili.tv video".to_string()),
            tags: Vec::new(),
            year: None,
            episodes: vec![EpisodeEntry {
                name: format!("Video {aid}"),
                number: None,
                poster: None,
                token: token.clone(),
            }],
        };

        let request = FetchRequest::get(url).headers(&self.headers);
        let page = match self.fetcher.fetch(&request).await {
            Ok(page) => page,
            Err(e) => {
                warn!(url, error = %e, "video page unavailable; using minimal detail");
                return Ok(fallback());
            }
        };

        let title = first_capture(&PAGE_TITLE, &page.body)
            .map(|t| t.replace(" - Bilibili", "").trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| format!("Video {aid}"));

        let mut detail = fallback();
        detail.episodes[0].name.clone_from(&title);
        detail.title = title;
        detail.poster = first_capture(&OG_IMAGE, &page.body).as_deref().map(ensure_https);
        detail.description = first_capture(&OG_DESCRIPTION, &page.body);
        Ok(detail)
    }

    async fn subtitles(&self, token: &EpisodeToken) -> Vec<SubtitleFile> {
        let Some(episode_id) = token.episode_id.as_deref() else {
            return Vec::new();
        };
        let url = format!(
            "{}/subtitle?ep_id={episode_id}&platform=web&s_locale={}",
            self.web_api(),
            self.config.locale
        );
        match self.get_json::<SubtitleResponse>(&url).await {
            Ok(response) => response
                .data
                .and_then(|d| d.subtitles)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|s| {
                    Some(SubtitleFile {
                        url: ensure_https(&s.url?),
                        lang: s.lang_doc.or(s.lang).unwrap_or_else(|| "Unknown".to_string()),
                    })
                })
                .collect(),
            Err(e) => {
                warn!(episode_id, error = %e, "subtitles unavailable");
                Vec::new()
            }
        }
    }

    fn web_player(&self, token: &EpisodeToken) -> Option<ResolvedLink> {
        let ctx = ResolveContext::new(self.fetcher.as_ref(), &self.source, token);
        let url = ctx.render(&stream_source::player_page())?;
        Some(ResolvedLink::WebPlayer {
            source: stream_source::NAME.to_string(),
            label: format!("{} - Web Player", stream_source::NAME),
            url,
        })
    }
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text).map(|c| c[1].to_string())
}

/// Playable episodes in upload order. Trailers ("PV") are skipped.
fn season_episodes(sections: Vec<Section>, season_id: &str) -> Vec<EpisodeEntry> {
    let mut episodes = Vec::new();
    let mut counter = 1u32;
    for episode in sections.into_iter().flat_map(|s| s.episodes.unwrap_or_default()) {
        let Some(episode_id) = episode.episode_id else {
            continue;
        };
        let short = episode.short_title_display.unwrap_or_default();
        if short.to_uppercase().contains("PV") {
            continue;
        }
        let digits: String = short.chars().filter(char::is_ascii_digit).collect();
        let number = digits.parse().unwrap_or(counter);
        let name = episode
            .long_title_display
            .or(episode.title_display)
            .or_else(|| Some(short.clone()).filter(|s| !s.is_empty()))
            .unwrap_or_else(|| format!("Episode {counter}"));

        episodes.push(EpisodeEntry {
            name,
            number: Some(number),
            poster: episode.cover.as_deref().map(ensure_https),
            token: EpisodeToken::episode(episode_id, season_id),
        });
        counter += 1;
    }
    episodes
}

#[async_trait]
impl SiteProvider for Bilibili {
    fn name(&self) -> &'static str {
        stream_source::NAME
    }

    fn matches(&self, url: &str) -> bool {
        self.source.matches(url)
    }

    fn categories(&self) -> &'static [Category] {
        CATEGORIES
    }

    #[instrument(skip(self))]
    async fn list_entries(&self, page: u32, category: &str) -> Result<ListingPage> {
        let name = CATEGORIES
            .iter()
            .find(|c| c.key == category)
            .map_or(category, |c| c.name)
            .to_string();

        let entries = match category {
            "foryou" => {
                let term = POPULAR_TERMS[page as usize % POPULAR_TERMS.len()];
                self.search_entries(term, page, Modules::All).await
            }
            "timeline" => self.timeline().await,
            other => match other.strip_prefix("search:") {
                Some(keyword) => self.search_entries(keyword, page, Modules::All).await,
                None => self.search_entries(other, page, Modules::SeasonsOnly).await,
            },
        };
        let entries = entries.unwrap_or_else(|e| {
            warn!(category, error = %e, "listing failed; returning empty page");
            Vec::new()
        });

        Ok(ListingPage {
            name,
            has_next: entries.len() >= FULL_PAGE,
            entries,
        })
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<ListingEntry>> {
        let url = format!(
            "{}/search_v2?keyword={}&platform=web&pn=1&ps=30",
            self.web_api(),
            urlencoding::encode(query)
        );
        let response: SearchResponse = self.get_json(&url).await?;
        let mut results = Vec::new();
        for module in response.data.and_then(|d| d.modules).unwrap_or_default() {
            let items = module.items.unwrap_or_default();
            match module.kind.as_deref() {
                Some("ogv") => results.extend(
                    items
                        .into_iter()
                        .filter(|i| i.season_id.is_some())
                        .filter_map(|i| self.entry(i)),
                ),
                Some("ugc") => results.extend(
                    items
                        .into_iter()
                        .filter(|i| i.aid.is_some())
                        .map(|i| SearchItem { season_id: None, ..i })
                        .filter_map(|i| self.entry(i)),
                ),
                other => debug!(module = ?other, "skipping search module"),
            }
        }
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn load_detail(&self, url: &str) -> Result<LoadDetail> {
        if let Some(caps) = SEASON_ID.captures(url) {
            return self.load_season(url, &caps[1]).await;
        }
        if let Some(caps) = VIDEO_ID.captures(url) {
            return self.load_video(url, &caps[1]).await;
        }
        Err(ExtractError::parse(format!("not a season or video url: {url}")))
    }

    #[instrument(skip(self, emitter))]
    async fn resolve_links(&self, token: &EpisodeToken, emitter: &mut Emitter) -> bool {
        let (links, subtitles) = tokio::join!(
            self.resolver.resolve(&self.source, token),
            self.subtitles(token)
        );

        match links {
            Ok(links) => {
                let asset = token.asset_key().unwrap_or(stream_source::NAME);
                links
                    .into_iter()
                    .for_each(|link| emitter.asset_link(asset, link));
            }
            Err(e) => warn!(error = %e, "no streams resolved"),
        }
        if self.config.web_player_fallback {
            if let Some(link) = self.web_player(token) {
                emitter.link(link);
            }
        }
        for subtitle in subtitles {
            emitter.subtitle(subtitle);
        }
        emitter.emitted() > 0
    }
}

/// Ids arrive as strings or numbers depending on the endpoint.
fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// Response types

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Option<SearchData>,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    modules: Option<Vec<SearchModule>>,
}

#[derive(Debug, Deserialize)]
struct SearchModule {
    #[serde(rename = "type")]
    kind: Option<String>,
    items: Option<Vec<SearchItem>>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    season_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    aid: Option<String>,
    cover: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TimelineResponse {
    data: Option<TimelineData>,
}

#[derive(Debug, Deserialize)]
struct TimelineData {
    items: Option<Vec<TimelineDay>>,
}

#[derive(Debug, Deserialize)]
struct TimelineDay {
    cards: Option<Vec<TimelineCard>>,
}

#[derive(Debug, Deserialize)]
struct TimelineCard {
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    season_id: Option<String>,
    cover: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeasonInfoResponse {
    data: Option<SeasonInfoData>,
}

#[derive(Debug, Deserialize)]
struct SeasonInfoData {
    season: Option<Season>,
}

#[derive(Debug, Deserialize)]
struct Season {
    title: Option<String>,
    description: Option<String>,
    vertical_cover: Option<String>,
    horizontal_cover: Option<String>,
    player_date: Option<String>,
    styles: Option<Vec<Style>>,
}

#[derive(Debug, Deserialize)]
struct Style {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EpisodesResponse {
    data: Option<EpisodesData>,
}

#[derive(Debug, Deserialize)]
struct EpisodesData {
    sections: Option<Vec<Section>>,
}

#[derive(Debug, Deserialize)]
struct Section {
    episodes: Option<Vec<Episode>>,
}

#[derive(Debug, Deserialize)]
struct Episode {
    #[serde(default, deserialize_with = "lenient_id")]
    episode_id: Option<String>,
    cover: Option<String>,
    title_display: Option<String>,
    short_title_display: Option<String>,
    long_title_display: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubtitleResponse {
    data: Option<SubtitleData>,
}

#[derive(Debug, Deserialize)]
struct SubtitleData {
    subtitles: Option<Vec<Subtitle>>,
}

#[derive(Debug, Deserialize)]
struct Subtitle {
    url: Option<String>,
    lang: Option<String>,
    lang_doc: Option<String>,
}
