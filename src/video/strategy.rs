//! The strategy trait each provider dialect implements.

use crate::error::ProviderFailure;
use crate::video::normalize::NormalizedParameters;
use crate::video::types::{ReferenceImage, StrategyKind};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Everything a strategy needs for one attempt.
#[derive(Debug, Clone, Copy)]
pub struct AttemptContext<'a> {
    /// Text prompt.
    pub prompt: &'a str,
    /// Model identifier.
    pub model: &'a str,
    /// Snapped duration and size.
    pub params: NormalizedParameters,
    /// Reference image, when this attempt carries one.
    pub image: Option<&'a ReferenceImage>,
    /// Request-wide deadline.
    pub deadline: Instant,
    /// Request-wide cancellation.
    pub cancel: &'a CancellationToken,
}

impl AttemptContext<'_> {
    /// Time left before the request deadline.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Caps a per-call timeout at the remaining budget.
    pub fn clamp(&self, timeout: Duration) -> Duration {
        timeout.min(self.remaining())
    }
}

/// Why a strategy attempt produced no bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyError {
    /// The submission itself was refused; no job exists on the provider side.
    Rejected(ProviderFailure),
    /// The job was accepted but producing its bytes failed.
    Provider(ProviderFailure),
    /// A poll inside the attempt ran out of time.
    TimedOut,
    /// The cancellation token fired.
    Cancelled,
}

impl From<ProviderFailure> for StrategyError {
    fn from(failure: ProviderFailure) -> Self {
        Self::Provider(failure)
    }
}

/// One provider API dialect.
#[async_trait]
pub trait GenerationStrategy: Send + Sync {
    /// Which dialect this is.
    fn kind(&self) -> StrategyKind;

    /// Makes one attempt, returning raw video bytes.
    async fn attempt(&self, ctx: &AttemptContext<'_>) -> Result<Vec<u8>, StrategyError>;
}
