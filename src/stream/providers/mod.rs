//! Stream sources: the file hosts AnimeSail links out to, and Bilibili TV.

pub mod acefile;
pub mod archivd;
pub mod bilibili;
pub mod gofile;
pub mod krakenfiles;

use crate::config::HostsConfig;

use super::source::SourceConfig;

/// File-host sources, matched by URL host. First match wins.
#[derive(Debug, Clone)]
pub struct HostRegistry {
    sources: Vec<SourceConfig>,
}

impl HostRegistry {
    pub fn from_config(hosts: &HostsConfig) -> Self {
        Self {
            sources: vec![
                gofile::source(hosts),
                acefile::source(hosts),
                archivd::source(hosts),
                krakenfiles::source(hosts),
            ],
        }
    }

    pub fn find(&self, url: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.matches(url))
    }

    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name.as_str()).collect()
    }
}
