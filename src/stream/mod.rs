//! Link resolution.
//!
//! A [`SourceConfig`] lists extraction strategies in priority order. The
//! [`Resolver`] classifies access, runs the strategies until one yields
//! candidates, ranks them, and builds [`StreamDescriptor`]s.

pub mod access;
pub mod builder;
pub mod context;
pub mod emit;
pub mod normalize;
pub mod pipeline;
pub mod providers;
pub mod quality;
pub mod source;
pub mod strategies;
pub mod token;
pub mod types;

pub use access::{classify, classify_body, AccessDecision};
pub use emit::{EmitReceivers, Emitter, Resolution};
pub use normalize::LinkNormalizer;
pub use pipeline::Resolver;
pub use providers::HostRegistry;
pub use quality::{rank, QualityLevel, QualityTable, RankedCandidate};
pub use source::{SourceConfig, Target, UrlFilter};
pub use strategies::Strategy;
pub use token::EpisodeToken;
pub use types::{
    AudioTrack, Diagnostic, MediaKind, QualityHint, ResolvedLink, StreamCandidate,
    StreamDescriptor, StreamType, SubtitleFile,
};
