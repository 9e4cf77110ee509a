//! Emission channels for links and subtitles.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use super::types::{ResolvedLink, SubtitleFile};

/// Sends resolved links and subtitles to the host as they are found.
///
/// Sends never fail the resolution; a dropped receiver only means nobody
/// is listening any more. Clones share the emitted count and the set of
/// assets that already have a primary stream.
#[derive(Debug, Clone)]
pub struct Emitter {
    links: mpsc::UnboundedSender<ResolvedLink>,
    subtitles: mpsc::UnboundedSender<SubtitleFile>,
    emitted: Arc<AtomicUsize>,
    primaries: Arc<Mutex<HashSet<String>>>,
}

/// Receiving side of an [`Emitter`].
#[derive(Debug)]
pub struct EmitReceivers {
    pub links: mpsc::UnboundedReceiver<ResolvedLink>,
    pub subtitles: mpsc::UnboundedReceiver<SubtitleFile>,
}

impl Emitter {
    pub fn channel() -> (Self, EmitReceivers) {
        let (links, link_rx) = mpsc::unbounded_channel();
        let (subtitles, subtitle_rx) = mpsc::unbounded_channel();
        (
            Self {
                links,
                subtitles,
                emitted: Arc::new(AtomicUsize::new(0)),
                primaries: Arc::new(Mutex::new(HashSet::new())),
            },
            EmitReceivers {
                links: link_rx,
                subtitles: subtitle_rx,
            },
        )
    }

    pub fn link(&mut self, link: ResolvedLink) {
        if self.links.send(link).is_ok() {
            self.emitted.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Emit a link belonging to `asset`. Only the first primary stream of
    /// an asset stays primary; later ones are demoted to alternates.
    pub fn asset_link(&mut self, asset: &str, mut link: ResolvedLink) {
        if let ResolvedLink::Stream(descriptor) = &mut link {
            if !descriptor.alternate {
                let mut primaries = self
                    .primaries
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                if !primaries.insert(asset.to_string()) {
                    descriptor.demote();
                }
            }
        }
        self.link(link);
    }

    pub fn subtitle(&mut self, subtitle: SubtitleFile) {
        let _ = self.subtitles.send(subtitle);
    }

    /// Links emitted so far through this handle and its clones.
    pub fn emitted(&self) -> usize {
        self.emitted.load(Ordering::Relaxed)
    }
}

impl EmitReceivers {
    /// Drain everything already sent. Call after the emitter is dropped to
    /// collect a complete result.
    pub fn drain(mut self) -> (Vec<ResolvedLink>, Vec<SubtitleFile>) {
        let mut links = Vec::new();
        while let Ok(link) = self.links.try_recv() {
            links.push(link);
        }
        let mut subtitles = Vec::new();
        while let Ok(subtitle) = self.subtitles.try_recv() {
            subtitles.push(subtitle);
        }
        (links, subtitles)
    }
}

/// Collected output of one resolution call.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub links: Vec<ResolvedLink>,
    pub subtitles: Vec<SubtitleFile>,
    /// `true` if at least one link was emitted.
    pub found: bool,
}

impl Resolution {
    pub fn streams(&self) -> impl Iterator<Item = &super::types::StreamDescriptor> {
        self.links.iter().filter_map(ResolvedLink::as_stream)
    }
}
