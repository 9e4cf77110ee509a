//! Access-restriction classification.
//!
//! Sources with a pre-flight metadata endpoint report region and premium
//! gates through a numeric response code. Classification fails open: a
//! transport or parse failure yields [`AccessDecision::Unrestricted`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Copyright/region restriction ("版权地区受限").
pub const GEO_RESTRICTED_CODE: i64 = 10_015_001;

/// Subscription-only content.
pub const PREMIUM_REQUIRED_CODE: i64 = 10_004_004;

const REGION_TERMS: &[&str] = &["region", "restricted", "地区", "受限"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessDecision {
    Unrestricted,
    GeoLocked,
    PremiumRequired,
}

impl AccessDecision {
    #[must_use]
    pub fn is_restricted(self) -> bool {
        self != Self::Unrestricted
    }

    /// Explanatory text a host can show instead of a blank failure.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Unrestricted => "Content is accessible",
            Self::GeoLocked => "GEO-LOCKED: This content is not available in your region",
            Self::PremiumRequired => "PREMIUM CONTENT: This content requires a subscription to watch",
        }
    }
}

impl fmt::Display for AccessDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unrestricted => "unrestricted",
            Self::GeoLocked => "geo-locked",
            Self::PremiumRequired => "premium required",
        })
    }
}

/// Classify an API response code and optional message.
pub fn classify(code: i64, message: Option<&str>) -> AccessDecision {
    match code {
        0 => AccessDecision::Unrestricted,
        GEO_RESTRICTED_CODE => AccessDecision::GeoLocked,
        PREMIUM_REQUIRED_CODE => AccessDecision::PremiumRequired,
        _ => {
            let message = message.unwrap_or_default().to_lowercase();
            if REGION_TERMS.iter().any(|term| message.contains(term)) {
                AccessDecision::GeoLocked
            } else {
                AccessDecision::Unrestricted
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    code: Option<i64>,
    message: Option<String>,
}

/// Classify a raw `{ "code": .., "message": .. }` response body.
pub fn classify_body(body: &str) -> AccessDecision {
    match serde_json::from_str::<StatusEnvelope>(body) {
        Ok(envelope) => classify(envelope.code.unwrap_or(0), envelope.message.as_deref()),
        Err(e) => {
            tracing::debug!("classifier could not parse response: {e}");
            AccessDecision::Unrestricted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geo_code_wins_regardless_of_message() {
        assert_eq!(classify(GEO_RESTRICTED_CODE, None), AccessDecision::GeoLocked);
        assert_eq!(
            classify(GEO_RESTRICTED_CODE, Some("everything is fine")),
            AccessDecision::GeoLocked
        );
    }

    #[test]
    fn premium_code() {
        assert_eq!(
            classify(PREMIUM_REQUIRED_CODE, Some("vip only")),
            AccessDecision::PremiumRequired
        );
        assert_eq!(
            classify(PREMIUM_REQUIRED_CODE, Some("region")),
            AccessDecision::PremiumRequired
        );
    }

    #[test]
    fn success_is_unrestricted() {
        assert_eq!(classify(0, None), AccessDecision::Unrestricted);
        assert_eq!(classify(0, Some("region restricted")), AccessDecision::Unrestricted);
    }

    #[test]
    fn message_fallback_is_case_insensitive() {
        assert_eq!(classify(-404, Some("Region Blocked")), AccessDecision::GeoLocked);
        assert_eq!(classify(-1, Some("版权地区受限")), AccessDecision::GeoLocked);
        assert_eq!(classify(-404, Some("not found")), AccessDecision::Unrestricted);
    }

    #[test]
    fn body_classification_fails_open() {
        assert_eq!(classify_body("<html>"), AccessDecision::Unrestricted);
        assert_eq!(
            classify_body(r#"{"code":10015001,"message":"region restricted"}"#),
            AccessDecision::GeoLocked
        );
        assert_eq!(classify_body(r#"{"data":{}}"#), AccessDecision::Unrestricted);
    }
}
