//! Archivd: page props serialized into the app root's `data-page`.

use crate::config::HostsConfig;
use crate::stream::source::{SourceConfig, Target};
use crate::stream::strategies::{EmbeddedStateStrategy, StateMarker, Strategy};

pub const NAME: &str = "Archivd";

pub fn source(hosts: &HostsConfig) -> SourceConfig {
    SourceConfig::new(NAME, &hosts.archivd)
        .hosts(["archivd.net"])
        .strategy(Strategy::EmbeddedState(
            EmbeddedStateStrategy::new(Target::new("{url}"))
                .marker(StateMarker::attribute("div#app", "data-page"))
                .pointer("/props/datas/data/link/media"),
        ))
}
