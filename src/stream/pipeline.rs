//! Resolution pipeline: access preflight, strategy fallback, ranking.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::access::{classify_body, AccessDecision};
use super::builder::build_all;
use super::context::ResolveContext;
use super::source::SourceConfig;
use super::token::EpisodeToken;
use super::types::{Diagnostic, ResolvedLink, StreamCandidate};
use crate::error::{ExtractError, Result};
use crate::http_client::Fetcher;
use crate::urls::is_http_url;

/// Runs one source's strategies for one episode token.
#[derive(Clone)]
pub struct Resolver {
    fetcher: Arc<dyn Fetcher>,
}

impl Resolver {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }

    /// Resolve `token` against `source`.
    ///
    /// A restricted preflight yields a single [`ResolvedLink::Restricted`]
    /// and no strategy runs. Otherwise strategies run in order until one
    /// yields candidates, which are ranked and built into descriptors.
    #[instrument(skip_all, fields(source = %source.name))]
    pub async fn resolve(
        &self,
        source: &SourceConfig,
        token: &EpisodeToken,
    ) -> Result<Vec<ResolvedLink>> {
        let ctx = ResolveContext::new(self.fetcher.as_ref(), source, token);

        let decision = preflight(&ctx).await;
        if decision.is_restricted() {
            info!(%decision, "content is restricted; skipping extraction");
            return Ok(vec![ResolvedLink::Restricted(Diagnostic::new(
                &source.name,
                decision,
            ))]);
        }

        let candidates = extract(&ctx).await?;
        let descriptors = build_all(source, candidates);
        if descriptors.is_empty() {
            return Err(ExtractError::NoCandidatesFound);
        }
        debug!(count = descriptors.len(), "built stream descriptors");
        Ok(descriptors.into_iter().map(ResolvedLink::Stream).collect())
    }

    /// Run only the access preflight.
    pub async fn access(&self, source: &SourceConfig, token: &EpisodeToken) -> AccessDecision {
        let ctx = ResolveContext::new(self.fetcher.as_ref(), source, token);
        preflight(&ctx).await
    }
}

/// Classify the metadata endpoint. Fails open: any fetch problem is
/// treated as unrestricted.
async fn preflight(ctx: &ResolveContext<'_>) -> AccessDecision {
    let Some(preflight) = &ctx.source.preflight else {
        return AccessDecision::Unrestricted;
    };
    let Some(url) = ctx.render(&preflight.target) else {
        return AccessDecision::Unrestricted;
    };
    match ctx.page(&url).await {
        Ok(page) => classify_body(&page.body),
        Err(e) => {
            debug!(error = %e, "preflight failed; continuing");
            AccessDecision::Unrestricted
        }
    }
}

/// Run strategies in order and return the first result with a usable URL.
///
/// Candidates whose URL is not absolute `http(s)` are dropped before the
/// emptiness check, so a strategy yielding only those falls through.
/// Strategy errors are logged and skipped. When nothing is found, the
/// last network error is surfaced if every strategy failed; otherwise
/// [`ExtractError::NoCandidatesFound`].
pub(crate) async fn extract(ctx: &ResolveContext<'_>) -> Result<Vec<StreamCandidate>> {
    let mut last_network = None;
    let mut any_completed = false;

    for strategy in &ctx.source.strategies {
        match strategy.run(ctx).await.map(|found| valid_only(strategy.name(), found)) {
            Ok(candidates) if !candidates.is_empty() => {
                debug!(
                    strategy = strategy.name(),
                    count = candidates.len(),
                    "strategy produced candidates"
                );
                return Ok(candidates);
            }
            Ok(_) => {
                any_completed = true;
                debug!(strategy = strategy.name(), "strategy found nothing");
            }
            Err(e) => {
                warn!(strategy = strategy.name(), error = %e, "strategy failed");
                if e.is_network() {
                    last_network = Some(e);
                }
            }
        }
    }

    match last_network {
        Some(e) if !any_completed => Err(e),
        _ => Err(ExtractError::NoCandidatesFound),
    }
}

fn valid_only(strategy: &str, candidates: Vec<StreamCandidate>) -> Vec<StreamCandidate> {
    let (valid, rejected): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .partition(|c| is_http_url(c.url.trim()));
    if !rejected.is_empty() {
        debug!(strategy, rejected = rejected.len(), "dropped candidates without an http url");
    }
    valid
}
