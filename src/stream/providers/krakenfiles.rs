//! Krakenfiles: the embed page's `<source>` element.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::HostsConfig;
use crate::stream::source::{SourceConfig, Target};
use crate::stream::strategies::{DomSelectorStrategy, Strategy};

static FILE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(?:view|embed-video)/([\da-zA-Z]+)").unwrap());

pub const NAME: &str = "Krakenfiles";

pub fn source(hosts: &HostsConfig) -> SourceConfig {
    SourceConfig::new(NAME, &hosts.krakenfiles)
        .hosts(["krakenfiles.com"])
        .id_pattern(FILE_ID.clone())
        .strategy(Strategy::DomSelector(DomSelectorStrategy::new(
            Target::new("{origin}/embed-video/{id}"),
            "source",
            "src",
        )))
}
