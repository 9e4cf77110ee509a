//! Episode tokens: the opaque id bundle handed from the listing phase to
//! the resolution phase.

use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};

/// Serialized as compact JSON; absent keys mean "not applicable for this
/// source". Older tokens spelled the ids `epId` and `aid`; both are
/// accepted on input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeToken {
    #[serde(default, alias = "epId", skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season_id: Option<String>,
    #[serde(default, alias = "aid", skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    /// Page URL, for sources that resolve from a page rather than ids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl EpisodeToken {
    pub fn episode(episode_id: impl Into<String>, season_id: impl Into<String>) -> Self {
        Self {
            episode_id: Some(episode_id.into()),
            season_id: Some(season_id.into()),
            ..Self::default()
        }
    }

    pub fn asset(asset_id: impl Into<String>) -> Self {
        Self {
            asset_id: Some(asset_id.into()),
            ..Self::default()
        }
    }

    pub fn page(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(ExtractError::from)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        serde_json::from_str(data).map_err(ExtractError::from)
    }

    /// Key under which [`Emitter::asset_link`](crate::stream::Emitter::asset_link)
    /// keeps one primary descriptor per asset.
    pub fn asset_key(&self) -> Option<&str> {
        self.episode_id
            .as_deref()
            .or(self.asset_id.as_deref())
            .or(self.url.as_deref())
    }
}
