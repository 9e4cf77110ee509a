//! Extraction strategies.
//!
//! Each strategy turns one upstream artifact (an API response, a page's
//! embedded state, a packed script, raw page text, or the DOM) into
//! [`StreamCandidate`]s. Sources list strategies in priority order and the
//! pipeline stops at the first one that yields anything.

pub mod api;
pub mod dom;
pub mod embedded;
pub mod scan;
pub mod unpack;

pub use api::{ApiLayout, ApiStrategy};
pub use dom::DomSelectorStrategy;
pub use embedded::{EmbeddedStateStrategy, StateMarker};
pub use scan::{PatternScanStrategy, ScanFamily};
pub use unpack::ScriptUnpackStrategy;

use super::context::ResolveContext;
use super::types::StreamCandidate;
use crate::error::Result;

#[derive(Debug, Clone)]
pub enum Strategy {
    /// Structured JSON endpoint.
    DirectApi(ApiStrategy),
    /// JSON state serialized into the page.
    EmbeddedState(EmbeddedStateStrategy),
    /// Packed player script that reveals a follow-up endpoint.
    ScriptUnpack(ScriptUnpackStrategy),
    /// Regex families over the raw page text.
    PatternScan(PatternScanStrategy),
    /// A single CSS selector and attribute.
    DomSelector(DomSelectorStrategy),
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DirectApi(_) => "direct-api",
            Self::EmbeddedState(_) => "embedded-state",
            Self::ScriptUnpack(_) => "script-unpack",
            Self::PatternScan(_) => "pattern-scan",
            Self::DomSelector(_) => "dom-selector",
        }
    }

    /// Run against the current source. An unrenderable target yields an
    /// empty list, not an error.
    pub async fn run(&self, ctx: &ResolveContext<'_>) -> Result<Vec<StreamCandidate>> {
        match self {
            Self::DirectApi(s) => s.run(ctx).await,
            Self::EmbeddedState(s) => s.run(ctx).await,
            Self::ScriptUnpack(s) => s.run(ctx).await,
            Self::PatternScan(s) => s.run(ctx).await,
            Self::DomSelector(s) => s.run(ctx).await,
        }
    }
}
