//! Video generation module.

pub mod chain;
pub mod classify;
pub mod extract;
pub mod normalize;
pub mod poll;
pub mod providers;
pub mod strategy;
mod types;

pub use chain::{AttemptResult, StrategyChain};
pub use classify::FailureClass;
pub use extract::{ContentBody, ContentDownloader, HttpResponse, MediaFetcher, MediaSource, ResponseExtractor};
pub use normalize::{bucket_duration, map_resolution, DurationBucket, NormalizedParameters, VideoSize};
pub use poll::{
    JobHandle, JobState, PollOutcome, Poller, StatusLocation, StatusSource, MIN_POLL_INTERVAL,
};
pub use strategy::{AttemptContext, GenerationStrategy, StrategyError};
pub use types::{
    GeneratedVideo, ReferenceImage, StrategyKind, VideoGenerationRequest, VideoMetadata,
    DEFAULT_MODEL,
};
