//! Bilibili TV stream source.
//!
//! Resolution order: the playurl API, then the player page's embedded
//! state, a text scan of the player page, and finally the same two passes
//! over the embed page. The playurl response doubles as the access
//! preflight, so it is only requested once per call.

use crate::config::BilibiliConfig;
use crate::stream::quality::QualityTable;
use crate::stream::source::{SourceConfig, Target, UrlFilter};
use crate::stream::strategies::{
    ApiLayout, ApiStrategy, EmbeddedStateStrategy, PatternScanStrategy, StateMarker, Strategy,
};

pub const NAME: &str = "BilibiliTV";

/// Host fragments accepted for scanned media URLs.
pub const MEDIA_HOSTS: [&str; 8] = [
    "bilibili",
    "bstar",
    "bstarstatic",
    "upos",
    "akamai",
    "bilivideo",
    "hdslb",
    "acgvideo",
];

/// Episode template first; assets without an episode id use the `aid` form.
pub fn playurl_target(config: &BilibiliConfig) -> Target {
    Target::first_of([
        "{api}/intl/gateway/web/playurl?ep_id={episode_id}&device=wap&platform=web&qn=64&tf=0&type=0"
            .to_string(),
        format!(
            "{{api}}/intl/gateway/web/playurl?s_locale={}&platform=web&aid={{asset_id}}&qn=120",
            config.locale
        ),
    ])
}

/// Page a browser would open for the token.
pub fn player_page() -> Target {
    Target::first_of([
        "{origin}/en/play/{season_id}/{episode_id}",
        "{origin}/en/video/{asset_id}",
    ])
}

pub fn embed_page() -> Target {
    Target::first_of(["{origin}/embed/{episode_id}", "{origin}/embed/video/{asset_id}"])
}

fn page_state(target: Target) -> EmbeddedStateStrategy {
    EmbeddedStateStrategy::new(target)
        .marker(StateMarker::global("window.__INITIAL_STATE__"))
        .marker(StateMarker::global("window.__INITIAL_DATA__"))
        .marker(StateMarker::script_id("__NEXT_DATA__"))
        .marker(StateMarker::script_containing([
            "playurl",
            "video_resource",
            "baseUrl",
            "base_url",
        ]))
        .marker(StateMarker::global("playurlSSRData"))
        .marker(StateMarker::global("window.__playinfo__"))
}

pub fn source(config: &BilibiliConfig, accept_language: &str) -> SourceConfig {
    let referer = format!("{}/", config.main_url);
    SourceConfig::new(NAME, &config.main_url)
        .api_base(&config.api_base)
        .hosts(["bilibili.tv"])
        .request_header("Referer", &referer)
        .request_header("Origin", &config.main_url)
        .request_header("Accept", "application/json, text/plain, */*")
        .request_header("Accept-Language", accept_language)
        .stream_header("Referer", &referer)
        .stream_header("Origin", &config.main_url)
        .referer(&referer)
        .preflight(playurl_target(config))
        .strategy(Strategy::DirectApi(ApiStrategy::new(
            playurl_target(config),
            ApiLayout::BiliPlayurl,
        )))
        .strategy(Strategy::EmbeddedState(page_state(player_page())))
        .strategy(Strategy::PatternScan(PatternScanStrategy::new(player_page())))
        .strategy(Strategy::EmbeddedState(page_state(embed_page())))
        .strategy(Strategy::PatternScan(PatternScanStrategy::new(embed_page())))
        .quality_table(QualityTable::BilibiliQn)
        .url_filter(UrlFilter::hosts(MEDIA_HOSTS))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn playurl_prefers_episode_template() {
        let config = BilibiliConfig::default();
        let mut vars: HashMap<&str, String> = HashMap::new();
        vars.insert("api", config.api_base.clone());
        vars.insert("episode_id", "2041234".to_string());
        vars.insert("asset_id", "99".to_string());
        let url = playurl_target(&config).render(&vars).unwrap();
        assert!(url.contains("ep_id=2041234"));

        vars.remove("episode_id");
        let url = playurl_target(&config).render(&vars).unwrap();
        assert!(url.ends_with("s_locale=en_US&platform=web&aid=99&qn=120"));
    }

    #[test]
    fn strategy_order() {
        let source = source(&BilibiliConfig::default(), "en-US,en;q=0.9");
        let names: Vec<_> = source.strategies.iter().map(Strategy::name).collect();
        assert_eq!(
            names,
            [
                "direct-api",
                "embedded-state",
                "pattern-scan",
                "embedded-state",
                "pattern-scan"
            ]
        );
        assert!(source.preflight.is_some());
        assert_eq!(source.default_referer(), source.stream_headers["Referer"]);
    }
}
