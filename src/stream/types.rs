//! Candidate and descriptor types.
//!
//! Extractors produce [`StreamCandidate`]s; the ranker and builder turn
//! them into caller-facing [`StreamDescriptor`]s wrapped in
//! [`ResolvedLink`].

use std::collections::HashMap;

use serde::Serialize;

use super::access::AccessDecision;
use super::quality::QualityLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MediaKind {
    Video,
    Audio,
    Subtitle,
}

/// Raw quality signal as found upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QualityHint {
    /// Numeric code (e.g., Bilibili `qn`) or pixel height.
    Code(u32),
    /// Free text such as a file name containing `720p`.
    Label(String),
}

/// A raw, unranked, possibly duplicate media URL.
#[derive(Debug, Clone)]
pub struct StreamCandidate {
    pub url: String,
    pub quality_hint: Option<QualityHint>,
    /// Codec string (e.g., `"avc1.640032"`, `"mp4a.40.2"`).
    pub codec: Option<String>,
    /// Bitrate in bits per second.
    pub bandwidth: Option<u64>,
    pub kind: MediaKind,
    /// Headers the media request must carry (cookies, per-page referer).
    pub required_headers: HashMap<String, String>,
    /// Overrides the source's default referer.
    pub referer: Option<String>,
    /// Short tag for the descriptor label (e.g., `"HLS"`).
    pub label: Option<String>,
}

impl StreamCandidate {
    pub fn new(url: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            url: url.into(),
            quality_hint: None,
            codec: None,
            bandwidth: None,
            kind,
            required_headers: HashMap::new(),
            referer: None,
            label: None,
        }
    }

    pub fn video(url: impl Into<String>) -> Self {
        Self::new(url, MediaKind::Video)
    }

    pub fn audio(url: impl Into<String>) -> Self {
        Self::new(url, MediaKind::Audio)
    }

    #[must_use]
    pub fn with_quality(mut self, hint: QualityHint) -> Self {
        self.quality_hint = Some(hint);
        self
    }

    #[must_use]
    pub fn with_codec(mut self, codec: Option<String>) -> Self {
        self.codec = codec.filter(|c| !c.is_empty());
        self
    }

    #[must_use]
    pub fn with_bandwidth(mut self, bandwidth: Option<u64>) -> Self {
        self.bandwidth = bandwidth;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.required_headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// `true` when the codec string shows audio muxed into this stream.
    #[must_use]
    pub fn has_muxed_audio(&self) -> bool {
        self.codec.as_deref().is_some_and(|codec| {
            let codec = codec.to_lowercase();
            ["mp4a", "opus", "ac-3", "ec-3", "aac"]
                .iter()
                .any(|a| codec.contains(a))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioTrack {
    pub url: String,
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StreamType {
    Video,
    Audio,
}

/// Final, ranked, caller-facing stream record.
#[derive(Debug, Clone, Serialize)]
pub struct StreamDescriptor {
    pub source: String,
    pub label: String,
    pub url: String,
    pub quality: QualityLevel,
    pub referer: Option<String>,
    pub headers: HashMap<String, String>,
    pub audio_tracks: Vec<AudioTrack>,
    pub stream_type: StreamType,
    /// `false` for the one primary descriptor of an asset.
    pub alternate: bool,
}

impl StreamDescriptor {
    /// Mark as an alternate of an already-emitted primary.
    pub fn demote(&mut self) {
        if !self.alternate {
            self.alternate = true;
            self.label.push_str(" (Alt)");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtitleFile {
    pub lang: String,
    pub url: String,
}

/// Explanation of an upstream access restriction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub source: String,
    pub decision: AccessDecision,
    pub message: String,
}

impl Diagnostic {
    pub fn new(source: impl Into<String>, decision: AccessDecision) -> Self {
        Self {
            source: source.into(),
            decision,
            message: decision.message().to_string(),
        }
    }
}

/// One unit emitted by a resolution call.
#[derive(Debug, Clone, Serialize)]
pub enum ResolvedLink {
    Stream(StreamDescriptor),
    /// The content is gated; no streams were extracted.
    Restricted(Diagnostic),
    /// A page the host can open in a browser when nothing else plays.
    WebPlayer {
        source: String,
        label: String,
        url: String,
    },
}

impl ResolvedLink {
    pub fn as_stream(&self) -> Option<&StreamDescriptor> {
        match self {
            Self::Stream(descriptor) => Some(descriptor),
            _ => None,
        }
    }
}
