//! `linkscout` - media link resolution for streaming sites and file hosts
//!
//! # Features
//!
//! - **Site providers**: listing, search, and detail pages for AnimeSail and Bilibili TV
//! - **Strategy pipeline**: direct API, embedded state, packed scripts, pattern scans, DOM selectors
//! - **Access classification**: geo and premium restrictions surface as diagnostics
//! - **Quality ranking**: per-source quality tables, best stream first
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use linkscout::{EpisodeToken, ExtractorConfig, HttpFetcher, SiteRouter};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ExtractorConfig::default();
//!     let router = SiteRouter::new(&config, Arc::new(HttpFetcher::new(&config.http)?));
//!     let site = router.by_name("BilibiliTV").expect("registered");
//!     let resolution = site.resolve(&EpisodeToken::episode("2100001", "37738")).await;
//!     for stream in resolution.streams() {
//!         println!("{}: {}", stream.label, stream.url);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod deobfuscate;
pub mod error;
pub mod http_client;
pub mod site;
pub mod stream;
pub mod urls;

pub use config::ExtractorConfig;
pub use error::{ExtractError, Result};
pub use http_client::{FetchRequest, Fetcher, HttpFetcher, SourcePage};
pub use site::{SiteProvider, SiteRouter};
pub use stream::{
    AccessDecision, Diagnostic, EpisodeToken, Resolution, ResolvedLink, Resolver, SourceConfig,
    StreamDescriptor, SubtitleFile,
};

/// Version of linkscout
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
