//! AnimeSail (Indonesian anime, WordPress theme).
//!
//! Episodes do not host video themselves: each episode page links to a
//! download page whose table lists mirrors on third-party file hosts, and
//! every mirror is resolved through the [`HostRegistry`].

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use futures::future::join_all;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};

use super::{Category, EntryKind, EpisodeEntry, ListingEntry, ListingPage, LoadDetail, SiteProvider};
use crate::config::{AnimeSailConfig, ExtractorConfig};
use crate::error::{ExtractError, Result};
use crate::http_client::{FetchRequest, Fetcher, SourcePage};
use crate::stream::{EpisodeToken, Emitter, HostRegistry, LinkNormalizer, Resolver};
use crate::urls::absolutize;

static CATEGORIES: &[Category] = &[
    Category {
        key: "",
        name: "Episode Terbaru",
    },
    Category {
        key: "rilisan-anime-terbaru",
        name: "Anime Terbaru",
    },
    Category {
        key: "rilisan-donghua-terbaru",
        name: "Donghua Terbaru",
    },
];

macro_rules! selector {
    ($name:ident, $css:literal) => {
        static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

selector!(ARTICLE, "div.listupd article");
selector!(ANCHOR, "a");
selector!(POSTER, "div.limit img");
selector!(COLUMN_LINK, "div.column-content a");
selector!(AMV, "div.amv");
selector!(TITLE, "h1.entry-title");
selector!(SERIAL_IMG, "div.entry-content.serial-info img");
selector!(SERIAL_DESC, "div.entry-content.serial-info p:nth-child(2)");
selector!(TABLE_ROW, "table tr");
selector!(TH, "th");
selector!(TD, "td");
selector!(EPISODE_LINK, "ul.daftar li a");
selector!(CENTER, "center");
selector!(SINGLE_DL, "a.singledl");
selector!(MIRROR, "table a[data-href]");

/// Listing card before its link is normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Card {
    title: String,
    href: String,
    poster: Option<String>,
}

pub struct AnimeSail {
    config: AnimeSailConfig,
    fetcher: Arc<dyn Fetcher>,
    headers: HashMap<String, String>,
    normalizer: LinkNormalizer,
    resolver: Resolver,
    hosts: HostRegistry,
}

impl AnimeSail {
    pub const NAME: &'static str = "AnimeSail";

    pub fn new(config: &ExtractorConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let site = config.animesail.clone();
        let headers = HashMap::from([
            ("Accept".to_string(), site.accept.clone()),
            ("Cookie".to_string(), site.cookie.clone()),
        ]);
        Self {
            normalizer: LinkNormalizer::breadcrumb(Arc::clone(&fetcher), headers.clone()),
            resolver: Resolver::new(Arc::clone(&fetcher)),
            hosts: HostRegistry::from_config(&config.hosts),
            config: site,
            fetcher,
            headers,
        }
    }

    async fn request(&self, url: &str) -> Result<SourcePage> {
        let request = FetchRequest::get(url).headers(&self.headers);
        self.fetcher.fetch(&request).await
    }

    fn listing_url(&self, page: u32, category: &str) -> String {
        if category.is_empty() {
            format!("{}/page/{page}", self.config.main_url)
        } else {
            format!("{}/{category}/page/{page}", self.config.main_url)
        }
    }

    /// Normalize card links concurrently; a failed lookup keeps the raw
    /// link.
    async fn to_entries(&self, cards: Vec<Card>) -> Vec<ListingEntry> {
        let canonical = join_all(cards.iter().map(|card| self.normalizer.normalize(&card.href))).await;
        cards
            .into_iter()
            .zip(canonical)
            .map(|(card, url)| {
                let url = url.unwrap_or_else(|e| {
                    warn!(href = %card.href, error = %e, "could not normalize listing link");
                    card.href.clone()
                });
                ListingEntry {
                    title: card.title,
                    url,
                    poster: card.poster,
                    kind: EntryKind::Anime,
                }
            })
            .collect()
    }
}

#[async_trait]
impl SiteProvider for AnimeSail {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn matches(&self, url: &str) -> bool {
        url.starts_with(&self.config.main_url)
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
        let listing = self.request(&self.listing_url(page, category)).await?;
        let cards = parse_cards(&listing.body, &listing.url);
        let entries = self.to_entries(cards).await;
        Ok(ListingPage {
            name,
            has_next: !entries.is_empty(),
            entries,
        })
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<ListingEntry>> {
        let url = format!(
            "{}/page/1/?s={}",
            self.config.main_url,
            urlencoding::encode(query)
        );
        let results = self.request(&url).await?;
        let mut cards = parse_cards(&results.body, &results.url);
        if cards.is_empty() {
            debug!("primary search layout empty; trying column layout");
            cards = parse_column_cards(&results.body, &results.url);
        }
        Ok(self.to_entries(cards).await)
    }

    #[instrument(skip(self))]
    async fn load_detail(&self, url: &str) -> Result<LoadDetail> {
        let page = self.request(url).await?;
        parse_detail(&page.body, url)
    }

    #[instrument(skip(self, emitter))]
    async fn resolve_links(&self, token: &EpisodeToken, emitter: &mut Emitter) -> bool {
        let Some(episode_url) = token.url.as_deref() else {
            warn!("token has no episode url");
            return false;
        };
        let mirrors = match self.mirrors(episode_url).await {
            Ok(mirrors) => mirrors,
            Err(e) => {
                warn!(error = %e, "could not read mirror list");
                return false;
            }
        };

        let jobs = mirrors.iter().filter_map(|mirror| {
            let Some(source) = self.hosts.find(mirror) else {
                debug!(mirror = %mirror, "no extractor for mirror host");
                return None;
            };
            let token = EpisodeToken::page(mirror.clone());
            Some(async move { (mirror, self.resolver.resolve(source, &token).await) })
        });

        // Every mirror carries the same episode: the first one to resolve
        // keeps the primary stream.
        let asset = token.asset_key().unwrap_or(episode_url);
        for (mirror, result) in join_all(jobs).await {
            match result {
                Ok(links) => links
                    .into_iter()
                    .for_each(|link| emitter.asset_link(asset, link)),
                Err(e) => warn!(mirror = %mirror, error = %e, "mirror did not resolve"),
            }
        }
        emitter.emitted() > 0
    }
}

impl AnimeSail {
    /// Episode page, then its download page, then every mirror link.
    async fn mirrors(&self, episode_url: &str) -> Result<Vec<String>> {
        let episode = self.request(episode_url).await?;
        let download = download_link(&episode.body, &episode.url)
            .ok_or_else(|| ExtractError::parse("episode page has no download link"))?;
        let page = self.request(&download).await?;
        Ok(mirror_links(&page.body))
    }
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn card(el: ElementRef<'_>, anchor: ElementRef<'_>, base: &str) -> Option<Card> {
    let href = absolutize(base, anchor.value().attr("href")?)?;
    let title = anchor.value().attr("title").unwrap_or_default();
    let title = title.split("Episode").next().unwrap_or_default().trim().to_string();
    let poster = el
        .select(&POSTER)
        .find_map(|img| img.value().attr("src"))
        .and_then(|src| absolutize(base, src));
    Some(Card {
        title,
        href,
        poster,
    })
}

fn parse_cards(html: &str, base: &str) -> Vec<Card> {
    let document = Html::parse_document(html);
    document
        .select(&ARTICLE)
        .filter_map(|article| card(article, article.select(&ANCHOR).next()?, base))
        .collect()
}

fn parse_column_cards(html: &str, base: &str) -> Vec<Card> {
    let document = Html::parse_document(html);
    document
        .select(&COLUMN_LINK)
        .filter(|a| a.select(&AMV).next().is_some())
        .filter_map(|a| card(a, a, base))
        .collect()
}

fn parse_detail(html: &str, url: &str) -> Result<LoadDetail> {
    let document = Html::parse_document(html);
    let title = document
        .select(&TITLE)
        .next()
        .map(text_of)
        .ok_or_else(|| ExtractError::parse("detail page has no title"))?;
    let title = title.split("Subtitle").next().unwrap_or_default().trim().to_string();

    let poster = document
        .select(&SERIAL_IMG)
        .find_map(|img| img.value().attr("src"))
        .and_then(|src| absolutize(url, src));
    let description = document
        .select(&SERIAL_DESC)
        .next()
        .map(text_of)
        .filter(|d| !d.is_empty());

    let tags = document
        .select(&TABLE_ROW)
        .find(|row| {
            row.select(&TH)
                .next()
                .is_some_and(|th| text_of(th).starts_with("Genre:"))
        })
        .and_then(|row| row.select(&TD).next())
        .map(|td| {
            text_of(td)
                .split(", ")
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let mut episodes: Vec<EpisodeEntry> = document
        .select(&EPISODE_LINK)
        .filter_map(|a| {
            let href = absolutize(url, a.value().attr("href")?)?;
            let label = text_of(a);
            let number = episode_number(&label);
            Some(EpisodeEntry {
                name: number.map_or(label, |n| format!("Episode {n}")),
                number,
                poster: None,
                token: EpisodeToken::page(href),
            })
        })
        .collect();
    episodes.reverse();

    Ok(LoadDetail {
        title,
        url: url.to_string(),
        kind: EntryKind::Anime,
        poster,
        description,
        tags,
        year: None,
        episodes,
    })
}

/// `"One Piece Episode 1071 Subtitle Indonesia"` → `1071`.
fn episode_number(label: &str) -> Option<u32> {
    let (_, after) = label.split_once("Episode")?;
    after.split("Subtitle").next()?.trim().parse().ok()
}

fn download_link(html: &str, base: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&CENTER)
        .filter(|center| center.select(&SINGLE_DL).next().is_some())
        .find_map(|center| center.select(&ANCHOR).next()?.value().attr("href").map(str::to_string))
        .and_then(|href| absolutize(base, &href))
}

fn mirror_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&MIRROR)
        .filter_map(|a| a.value().attr("data-href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string)
        .collect()
}
