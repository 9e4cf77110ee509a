//! Gofile: guest account plus website token, then the folder API.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::HostsConfig;
use crate::stream::source::{SourceConfig, Target};
use crate::stream::strategies::{ApiLayout, ApiStrategy, Strategy};

static CONTENT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(?:\?c=|d/)([\da-zA-Z-]+)").unwrap());

pub const NAME: &str = "Gofile";

pub fn source(hosts: &HostsConfig) -> SourceConfig {
    SourceConfig::new(NAME, &hosts.gofile)
        .api_base(&hosts.gofile_api)
        .hosts(["gofile.io"])
        .id_pattern(CONTENT_ID.clone())
        .strategy(Strategy::DirectApi(ApiStrategy::new(
            Target::new("{api}/getContent?contentId={id}&token={token}&wt={wt}"),
            ApiLayout::Gofile {
                account: Target::new("{api}/createAccount"),
                site_script: Target::new("{origin}/dist/js/alljs.js"),
            },
        )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_content_id() {
        let source = source(&HostsConfig::default());
        assert!(source.matches("https://gofile.io/d/aB3-xY"));
        assert_eq!(source.extract_id("https://gofile.io/d/aB3-xY").as_deref(), Some("aB3-xY"));
        assert_eq!(source.extract_id("https://gofile.io/?c=Zz9").as_deref(), Some("Zz9"));
    }
}
