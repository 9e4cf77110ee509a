//! Acefile: packed player script naming a service check endpoint.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::HostsConfig;
use crate::stream::source::{SourceConfig, Target};
use crate::stream::strategies::{ScriptUnpackStrategy, Strategy};

static FILE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(?:d|download|player|f|file)/(\w+)").unwrap());

pub const NAME: &str = "Acefile";

pub fn source(hosts: &HostsConfig) -> SourceConfig {
    SourceConfig::new(NAME, &hosts.acefile)
        .hosts(["acefile.co"])
        .id_pattern(FILE_ID.clone())
        .strategy(Strategy::ScriptUnpack(ScriptUnpackStrategy::service_check(
            Target::new("{origin}/player/{id}"),
            Target::new("{origin}/"),
        )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_file_id() {
        let source = source(&HostsConfig::default());
        assert_eq!(
            source.extract_id("https://acefile.co/f/110543/kusonime-ep01.mp4").as_deref(),
            Some("110543")
        );
        assert!(source.matches("https://acefile.co/player/110543"));
    }
}
