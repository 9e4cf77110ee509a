//! Error taxonomy for link resolution.
//!
//! Every failure inside the pipeline maps to one of four kinds. Only
//! [`ExtractError::AccessRestricted`] short-circuits a resolution; the
//! others are recovered locally by falling through to the next strategy.

use thiserror::Error;

use crate::stream::access::AccessDecision;

/// Resolution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// Transport failure, timeout, or non-2xx status.
    #[error("Network error: {0}")]
    Network(String),

    /// Malformed JSON/HTML, or a response missing the expected structure.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Upstream reported a geo or premium restriction.
    #[error("Access restricted: {0}")]
    AccessRestricted(AccessDecision),

    /// Every strategy ran and none produced a usable link.
    #[error("No candidates found")]
    NoCandidatesFound,
}

impl ExtractError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for ExtractError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

impl From<serde_json::Error> for ExtractError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
