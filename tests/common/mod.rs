//! Shared test fixtures.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use linkscout::{ExtractError, FetchRequest, Fetcher, Result, SourcePage};

/// Serves canned bodies by exact URL and records every request.
///
/// Unmapped URLs fail with a network error.
#[derive(Default)]
pub struct MockFetcher {
    routes: HashMap<String, Result<String>>,
    requested: Mutex<Vec<FetchRequest>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, body: &str) -> Self {
        self.routes.insert(url.to_string(), Ok(body.to_string()));
        self
    }

    pub fn fail(mut self, url: &str, error: ExtractError) -> Self {
        self.routes.insert(url.to_string(), Err(error));
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.url.clone())
            .collect()
    }

    /// Last request whose URL contains `fragment`.
    pub fn request_to(&self, fragment: &str) -> Option<FetchRequest> {
        self.requested
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| r.url.contains(fragment))
            .cloned()
    }

    pub fn times_requested(&self, url: &str) -> usize {
        self.requested().iter().filter(|u| *u == url).count()
    }

    pub fn was_requested(&self, fragment: &str) -> bool {
        self.requested().iter().any(|url| url.contains(fragment))
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<SourcePage> {
        self.requested.lock().unwrap().push(request.clone());
        match self.routes.get(&request.url) {
            Some(Ok(body)) => Ok(SourcePage::new(&request.url, body)),
            Some(Err(e)) => Err(e.clone()),
            None => Err(ExtractError::network(format!("unmapped url: {}", request.url))),
        }
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
