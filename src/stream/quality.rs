//! Quality normalization, ranking, and deduplication.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::types::{QualityHint, StreamCandidate};
use crate::urls::unescape_url;

static RESOLUTION_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|[^\d])(\d{3,4})p").unwrap());

/// Ordered quality scale. Derives `Ord` in declaration order, so
/// `Unknown` sorts lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum QualityLevel {
    Unknown,
    P360,
    P480,
    P720,
    P1080,
    P1080Plus,
    P1440,
    P2160,
}

impl QualityLevel {
    /// Map a vertical resolution to the nearest level at or below it.
    #[must_use]
    pub fn from_height(height: u32) -> Self {
        match height {
            2160.. => Self::P2160,
            1440.. => Self::P1440,
            1080.. => Self::P1080,
            720.. => Self::P720,
            480.. => Self::P480,
            360.. => Self::P360,
            _ => Self::Unknown,
        }
    }

    /// Parse labels such as `"Episode 1 720p.mp4"` or `"4K"`.
    pub fn from_label(label: &str) -> Self {
        if let Some(height) = RESOLUTION_LABEL
            .captures(label)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
        {
            return Self::from_height(height);
        }
        if label.to_lowercase().contains("4k") {
            return Self::P2160;
        }
        Self::Unknown
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::P360 => "360P",
            Self::P480 => "480P",
            Self::P720 => "720P",
            Self::P1080 => "1080P",
            Self::P1080Plus => "1080P+",
            Self::P1440 => "1440P",
            Self::P2160 => "4K",
        }
    }
}

/// How a source's numeric quality hints are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTable {
    /// Bilibili `qn` codes.
    BilibiliQn,
    /// Numeric hints are pixel heights.
    Resolution,
}

impl QualityTable {
    pub fn level(self, hint: Option<&QualityHint>) -> QualityLevel {
        match hint {
            None => QualityLevel::Unknown,
            Some(QualityHint::Label(label)) => QualityLevel::from_label(label),
            Some(QualityHint::Code(code)) => match self {
                Self::BilibiliQn => bilibili_level(*code),
                Self::Resolution => QualityLevel::from_height(*code),
            },
        }
    }

    /// Human label for a hint, e.g. `"1080P+"` for qn 112.
    pub fn label(self, hint: Option<&QualityHint>) -> Option<String> {
        match hint? {
            QualityHint::Label(label) => match QualityLevel::from_label(label) {
                QualityLevel::Unknown => None,
                level => Some(level.name().to_string()),
            },
            QualityHint::Code(code) => match self {
                Self::BilibiliQn => Some(bilibili_label(*code)),
                Self::Resolution => Some(format!("{code}p")),
            },
        }
    }
}

fn bilibili_level(qn: u32) -> QualityLevel {
    match qn {
        127 | 126 | 125 | 120 => QualityLevel::P2160,
        116 | 112 => QualityLevel::P1080Plus,
        80 => QualityLevel::P1080,
        74 | 64 => QualityLevel::P720,
        32 => QualityLevel::P480,
        16 => QualityLevel::P360,
        _ => QualityLevel::Unknown,
    }
}

fn bilibili_label(qn: u32) -> String {
    match qn {
        127 | 126 | 125 | 120 => "4K".to_string(),
        116 | 112 => "1080P+".to_string(),
        80 => "1080P".to_string(),
        74 | 64 => "720P".to_string(),
        32 => "480P".to_string(),
        16 => "360P".to_string(),
        other => format!("{other}p"),
    }
}

/// A candidate with its resolved quality.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub candidate: StreamCandidate,
    pub quality: QualityLevel,
}

/// Deduplicate by normalized URL (first occurrence wins) and sort by
/// descending quality. The sort is stable, so equal qualities keep
/// discovery order. Candidates with an empty URL are dropped.
pub fn rank(candidates: Vec<StreamCandidate>, table: QualityTable) -> Vec<RankedCandidate> {
    let mut seen = HashSet::new();
    let mut ranked: Vec<RankedCandidate> = candidates
        .into_iter()
        .filter_map(|mut candidate| {
            candidate.url = unescape_url(candidate.url.trim());
            if candidate.url.is_empty() || !seen.insert(candidate.url.clone()) {
                return None;
            }
            let quality = table.level(candidate.quality_hint.as_ref());
            Some(RankedCandidate { candidate, quality })
        })
        .collect();

    ranked.sort_by(|a, b| b.quality.cmp(&a.quality));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coded(url: &str, qn: u32) -> StreamCandidate {
        StreamCandidate::video(url).with_quality(QualityHint::Code(qn))
    }

    #[test]
    fn bilibili_code_table() {
        let table = QualityTable::BilibiliQn;
        let cases = [
            (127, QualityLevel::P2160),
            (126, QualityLevel::P2160),
            (125, QualityLevel::P2160),
            (120, QualityLevel::P2160),
            (116, QualityLevel::P1080Plus),
            (112, QualityLevel::P1080Plus),
            (80, QualityLevel::P1080),
            (74, QualityLevel::P720),
            (64, QualityLevel::P720),
            (32, QualityLevel::P480),
            (16, QualityLevel::P360),
            (7, QualityLevel::Unknown),
        ];
        for (qn, expected) in cases {
            assert_eq!(table.level(Some(&QualityHint::Code(qn))), expected, "qn {qn}");
        }
    }

    #[test]
    fn labels_parse_resolution() {
        assert_eq!(QualityLevel::from_label("Ep 01 [720p].mp4"), QualityLevel::P720);
        assert_eq!(QualityLevel::from_label("1080P"), QualityLevel::P1080);
        assert_eq!(QualityLevel::from_label("movie 4K"), QualityLevel::P2160);
        assert_eq!(QualityLevel::from_label("s01e02.mkv"), QualityLevel::Unknown);
        // Digits glued to a longer number are not a resolution.
        assert_eq!(QualityLevel::from_label("x12720p"), QualityLevel::Unknown);
    }

    #[test]
    fn rank_orders_non_increasing() {
        let ranked = rank(
            vec![
                coded("https://cdn/32", 32),
                StreamCandidate::video("https://cdn/none"),
                coded("https://cdn/112", 112),
                coded("https://cdn/64", 64),
                coded("https://cdn/80", 80),
            ],
            QualityTable::BilibiliQn,
        );
        let qualities: Vec<_> = ranked.iter().map(|r| r.quality).collect();
        assert!(qualities.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(ranked[0].candidate.url, "https://cdn/112");
        assert_eq!(ranked.last().unwrap().quality, QualityLevel::Unknown);
    }

    #[test]
    fn rank_is_stable_for_equal_quality() {
        let ranked = rank(
            vec![coded("https://cdn/a", 64), coded("https://cdn/b", 74), coded("https://cdn/c", 64)],
            QualityTable::BilibiliQn,
        );
        let urls: Vec<_> = ranked.iter().map(|r| r.candidate.url.as_str()).collect();
        assert_eq!(urls, ["https://cdn/a", "https://cdn/b", "https://cdn/c"]);
    }

    #[test]
    fn rank_dedupes_normalized_urls() {
        let ranked = rank(
            vec![
                coded(r"https:\/\/cdn\/a.m4s", 64),
                coded("https://cdn/a.m4s", 80),
                StreamCandidate::video("  "),
            ],
            QualityTable::BilibiliQn,
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].candidate.url, "https://cdn/a.m4s");
        assert_eq!(ranked[0].quality, QualityLevel::P720);
    }

    #[test]
    fn resolution_table_uses_heights() {
        let table = QualityTable::Resolution;
        assert_eq!(table.level(Some(&QualityHint::Code(1080))), QualityLevel::P1080);
        assert_eq!(table.label(Some(&QualityHint::Code(720))).as_deref(), Some("720p"));
        assert_eq!(table.level(None), QualityLevel::Unknown);
    }

    #[test]
    fn file_name_hints_label_only_when_recognized() {
        let table = QualityTable::Resolution;
        let named = QualityHint::Label("Show - 03 [1080p].mkv".to_string());
        assert_eq!(table.label(Some(&named)).as_deref(), Some("1080P"));
        let plain = QualityHint::Label("Show - 03.mkv".to_string());
        assert_eq!(table.label(Some(&plain)), None);
    }
}
