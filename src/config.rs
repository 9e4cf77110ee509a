//! Extractor configuration.
//!
//! Hosts pass an [`ExtractorConfig`] into [`HttpFetcher`](crate::HttpFetcher)
//! and [`SiteRouter`](crate::site::SiteRouter) constructors. Every field has a default,
//! so a partial TOML document only needs to override what differs:
//!
//! ```toml
//! [http]
//! timeout_secs = 20
//!
//! [animesail]
//! main_url = "https://animesail.example"
//!
//! [bilibili]
//! web_player_fallback = true
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;

const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Top-level configuration shared read-only by every resolution call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub http: HttpConfig,
    pub animesail: AnimeSailConfig,
    pub bilibili: BilibiliConfig,
    pub hosts: HostsConfig,
}

/// Transport settings for [`HttpFetcher`](crate::HttpFetcher).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub accept_language: String,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: CHROME_USER_AGENT.to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            connect_timeout_secs: 10,
            timeout_secs: 30,
            max_redirects: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnimeSailConfig {
    pub main_url: String,
    /// Sent verbatim as the `Cookie` header; pins timezone/locale/country.
    pub cookie: String,
    pub accept: String,
}

impl Default for AnimeSailConfig {
    fn default() -> Self {
        Self {
            main_url: "https://154.26.137.28".to_string(),
            cookie: "_as_ipin_tz=Asia/Jakarta; _as_ipin_lc=en-US; _as_ipin_ct=ID".to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BilibiliConfig {
    pub main_url: String,
    pub api_base: String,
    pub locale: String,
    /// Emit a browser link to the episode page after extraction.
    pub web_player_fallback: bool,
}

impl Default for BilibiliConfig {
    fn default() -> Self {
        Self {
            main_url: "https://www.bilibili.tv".to_string(),
            api_base: "https://api.bilibili.tv".to_string(),
            locale: "en_US".to_string(),
            web_player_fallback: false,
        }
    }
}

/// Origins of the file hosts AnimeSail links out to.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostsConfig {
    pub gofile: String,
    pub gofile_api: String,
    pub acefile: String,
    pub archivd: String,
    pub krakenfiles: String,
}

impl Default for HostsConfig {
    fn default() -> Self {
        Self {
            gofile: "https://gofile.io".to_string(),
            gofile_api: "https://api.gofile.io".to_string(),
            acefile: "https://acefile.co".to_string(),
            archivd: "https://archivd.net".to_string(),
            krakenfiles: "https://krakenfiles.com".to_string(),
        }
    }
}

impl ExtractorConfig {
    /// Parse a TOML document, filling unspecified fields with defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Self =
            toml::from_str(content).context("invalid TOML in extractor config")?;
        config.trim_origins();
        Ok(config)
    }

    /// Strip trailing slashes so URL templates can append `/path` directly.
    fn trim_origins(&mut self) {
        for origin in [
            &mut self.animesail.main_url,
            &mut self.bilibili.main_url,
            &mut self.bilibili.api_base,
            &mut self.hosts.gofile,
            &mut self.hosts.gofile_api,
            &mut self.hosts.acefile,
            &mut self.hosts.archivd,
            &mut self.hosts.krakenfiles,
        ] {
            while origin.ends_with('/') {
                origin.pop();
            }
        }
    }
}
