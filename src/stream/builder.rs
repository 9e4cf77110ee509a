//! Turn ranked candidates into caller-facing descriptors.

use std::collections::HashMap;

use super::quality::{rank, RankedCandidate};
use super::source::SourceConfig;
use super::types::{AudioTrack, MediaKind, StreamCandidate, StreamDescriptor, StreamType};

/// Build one descriptor.
///
/// Headers are the source's stream headers overlaid with the candidate's
/// own; the candidate wins on conflicts. Audio tracks are attached as
/// given.
pub fn build(
    source: &SourceConfig,
    ranked: &RankedCandidate,
    audio_tracks: Vec<AudioTrack>,
    alternate: bool,
) -> StreamDescriptor {
    let candidate = &ranked.candidate;
    let tag = candidate
        .label
        .clone()
        .or_else(|| source.quality_table.label(candidate.quality_hint.as_ref()));
    let mut label = match tag {
        Some(tag) => format!("{} - {tag}", source.name),
        None => source.name.clone(),
    };
    if alternate {
        label.push_str(" (Alt)");
    }

    StreamDescriptor {
        source: source.name.clone(),
        label,
        url: candidate.url.clone(),
        quality: ranked.quality,
        referer: Some(
            candidate
                .referer
                .clone()
                .unwrap_or_else(|| source.default_referer()),
        ),
        headers: merged_headers(&source.stream_headers, &candidate.required_headers),
        audio_tracks,
        stream_type: match candidate.kind {
            MediaKind::Audio => StreamType::Audio,
            _ => StreamType::Video,
        },
        alternate,
    }
}

/// Rank and build every candidate from one strategy run.
///
/// The top video gets every audio track unless its own codec carries
/// audio; lower-ranked videos are alternates and get only the first
/// track. Without any video, audio candidates become audio descriptors.
pub fn build_all(source: &SourceConfig, candidates: Vec<StreamCandidate>) -> Vec<StreamDescriptor> {
    let (videos, audios): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .filter(|c| c.kind != MediaKind::Subtitle)
        .partition(|c| c.kind == MediaKind::Video);

    let videos = rank(videos, source.quality_table);
    let audios = rank(audios, source.quality_table);

    if videos.is_empty() {
        return audios
            .iter()
            .enumerate()
            .map(|(i, audio)| build(source, audio, Vec::new(), i > 0))
            .collect();
    }

    let tracks: Vec<AudioTrack> = audios
        .iter()
        .map(|audio| AudioTrack {
            url: audio.candidate.url.clone(),
            headers: merged_headers(&source.stream_headers, &audio.candidate.required_headers),
        })
        .collect();

    videos
        .iter()
        .enumerate()
        .map(|(index, video)| {
            let attached = if video.candidate.has_muxed_audio() {
                Vec::new()
            } else if index == 0 {
                tracks.clone()
            } else {
                tracks.iter().take(1).cloned().collect()
            };
            build(source, video, attached, index > 0)
        })
        .collect()
}

fn merged_headers(
    base: &HashMap<String, String>,
    overlay: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut headers = base.clone();
    for (name, value) in overlay {
        headers.insert(name.clone(), value.clone());
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::quality::{QualityLevel, QualityTable};
    use crate::stream::types::QualityHint;

    fn bili() -> SourceConfig {
        SourceConfig::new("BilibiliTV", "https://www.bilibili.tv")
            .quality_table(QualityTable::BilibiliQn)
            .stream_header("Origin", "https://www.bilibili.tv")
            .stream_header("Referer", "https://www.bilibili.tv/")
    }

    #[test]
    fn primary_gets_all_audio_and_alternates_get_first() {
        let descriptors = build_all(
            &bili(),
            vec![
                StreamCandidate::video("https://x/64.m4s").with_quality(QualityHint::Code(64)),
                StreamCandidate::video("https://x/80.m4s").with_quality(QualityHint::Code(80)),
                StreamCandidate::audio("https://x/a1.m4a"),
                StreamCandidate::audio("https://x/a2.m4a"),
            ],
        );
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].url, "https://x/80.m4s");
        assert_eq!(descriptors[0].quality, QualityLevel::P1080);
        assert_eq!(descriptors[0].label, "BilibiliTV - 1080P");
        assert_eq!(descriptors[0].audio_tracks.len(), 2);
        assert!(!descriptors[0].alternate);
        assert_eq!(descriptors[1].label, "BilibiliTV - 720P (Alt)");
        assert!(descriptors[1].alternate);
        assert_eq!(descriptors[1].audio_tracks.len(), 1);
        assert_eq!(descriptors[1].audio_tracks[0].url, "https://x/a1.m4a");
    }

    #[test]
    fn muxed_video_gets_no_audio_tracks() {
        let descriptors = build_all(
            &bili(),
            vec![
                StreamCandidate::video("https://x/v.mp4")
                    .with_codec(Some("avc1.64001F,mp4a.40.2".to_string())),
                StreamCandidate::audio("https://x/a.m4a"),
            ],
        );
        assert!(descriptors[0].audio_tracks.is_empty());
    }

    #[test]
    fn candidate_headers_override_source_headers() {
        let descriptors = build_all(
            &bili(),
            vec![StreamCandidate::video("https://x/v.mp4")
                .with_header("Referer", "https://www.bilibili.tv/en/play/1/2")
                .with_header("Cookie", "a=b")],
        );
        let headers = &descriptors[0].headers;
        assert_eq!(headers["Referer"], "https://www.bilibili.tv/en/play/1/2");
        assert_eq!(headers["Origin"], "https://www.bilibili.tv");
        assert_eq!(headers["Cookie"], "a=b");
        assert_eq!(descriptors[0].referer.as_deref(), Some("https://www.bilibili.tv/"));
    }

    #[test]
    fn audio_only_results_become_audio_descriptors() {
        let descriptors = build_all(&bili(), vec![StreamCandidate::audio("https://x/a.m4a")]);
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].stream_type, StreamType::Audio);
        assert_eq!(descriptors[0].label, "BilibiliTV");
    }
}
