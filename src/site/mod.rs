//! Site providers: listing, search, detail, and link resolution.
//!
//! # Architecture
//!
//! - [`SiteProvider`]: async trait each site implements
//! - [`SiteRouter`]: dispatches URLs to the matching provider
//! - [`Resolution`]: collected output of [`SiteProvider::resolve`]
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use linkscout::config::ExtractorConfig;
//! use linkscout::http_client::HttpFetcher;
//! use linkscout::site::SiteRouter;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ExtractorConfig::default();
//! let fetcher = Arc::new(HttpFetcher::new(&config.http)?);
//! let router = SiteRouter::new(&config, fetcher);
//!
//! let site = router.by_name("BilibiliTV").expect("registered");
//! let detail = site.load_detail("https://www.bilibili.tv/en/play/37738").await?;
//! if let Some(episode) = detail.episodes.first() {
//!     let resolution = site.resolve(&episode.token).await;
//!     for stream in resolution.streams() {
//!         println!("{} {}", stream.label, stream.url);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod animesail;
pub mod bilibili;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::ExtractorConfig;
use crate::error::Result;
use crate::http_client::Fetcher;
use crate::stream::{Emitter, EpisodeToken, Resolution};

pub use animesail::AnimeSail;
pub use bilibili::Bilibili;

/// Listing category: request key and display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub key: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryKind {
    Anime,
    Movie,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingEntry {
    pub title: String,
    /// Canonical detail URL.
    pub url: String,
    pub poster: Option<String>,
    pub kind: EntryKind,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ListingPage {
    pub name: String,
    pub entries: Vec<ListingEntry>,
    pub has_next: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EpisodeEntry {
    pub name: String,
    pub number: Option<u32>,
    pub poster: Option<String>,
    pub token: EpisodeToken,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadDetail {
    pub title: String,
    pub url: String,
    pub kind: EntryKind,
    pub poster: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub year: Option<i32>,
    pub episodes: Vec<EpisodeEntry>,
}

/// A browsable site.
#[async_trait]
pub trait SiteProvider: Send + Sync {
    /// Provider name (e.g., "AnimeSail").
    fn name(&self) -> &'static str;

    /// Check if this provider handles the given URL.
    fn matches(&self, url: &str) -> bool;

    fn categories(&self) -> &'static [Category];

    async fn list_entries(&self, page: u32, category: &str) -> Result<ListingPage>;

    async fn search(&self, query: &str) -> Result<Vec<ListingEntry>>;

    async fn load_detail(&self, url: &str) -> Result<LoadDetail>;

    /// Emit every link and subtitle found for `token`. Returns `true` iff
    /// at least one link (stream or diagnostic) was emitted.
    async fn resolve_links(&self, token: &EpisodeToken, emitter: &mut Emitter) -> bool;

    /// [`resolve_links`](Self::resolve_links), collected.
    async fn resolve(&self, token: &EpisodeToken) -> Resolution {
        let (mut emitter, receivers) = Emitter::channel();
        let found = self.resolve_links(token, &mut emitter).await;
        drop(emitter);
        let (links, subtitles) = receivers.drain();
        Resolution {
            links,
            subtitles,
            found,
        }
    }
}

/// Routes URLs to site providers.
///
/// Providers are checked in registration order. First match wins.
pub struct SiteRouter {
    providers: Vec<Box<dyn SiteProvider>>,
}

impl SiteRouter {
    pub fn new(config: &ExtractorConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let providers: Vec<Box<dyn SiteProvider>> = vec![
            Box::new(AnimeSail::new(config, Arc::clone(&fetcher))),
            Box::new(Bilibili::new(config, fetcher)),
        ];
        Self { providers }
    }

    pub fn find(&self, url: &str) -> Option<&dyn SiteProvider> {
        let provider = self.providers.iter().find(|p| p.matches(url))?;
        tracing::debug!("Matched site provider: {}", provider.name());
        Some(provider.as_ref())
    }

    pub fn by_name(&self, name: &str) -> Option<&dyn SiteProvider> {
        self.providers
            .iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
            .map(AsRef::as_ref)
    }

    pub fn providers(&self) -> impl Iterator<Item = &dyn SiteProvider> {
        self.providers.iter().map(AsRef::as_ref)
    }
}
