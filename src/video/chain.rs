//! The orchestrator: tries each dialect in priority order until one yields a video.

use crate::error::{AbortKind, AttemptRecord, FailureReport, Result, SoraChainError};
use crate::video::classify::{self, FailureClass};
use crate::video::normalize::NormalizedParameters;
use crate::video::poll::deadline_after;
use crate::video::strategy::{AttemptContext, GenerationStrategy, StrategyError};
use crate::video::types::{GeneratedVideo, StrategyKind, VideoGenerationRequest, VideoMetadata};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Classified outcome of one strategy attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    /// Non-empty video bytes.
    Success(Vec<u8>),
    /// Local to this strategy; the chain moves on.
    RetryableFailure(String),
    /// Account-level; the chain stops.
    FatalFailure(String),
}

enum Interrupted {
    TimedOut,
    Cancelled,
}

/// An attempt's result, and whether it failed before the provider accepted a job.
struct Verdict {
    result: AttemptResult,
    at_submission: bool,
}

/// Runs strategies sequentially, never in parallel, so a fatal verdict on one prevents
/// duplicate job submissions on the next.
pub struct StrategyChain {
    strategies: Vec<Box<dyn GenerationStrategy>>,
}

impl StrategyChain {
    /// Creates a chain that tries `strategies` in the given order.
    pub fn new(strategies: Vec<Box<dyn GenerationStrategy>>) -> Self {
        Self { strategies }
    }

    /// The dialects this chain will try, in order.
    pub fn strategies(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Generates a video, giving up once `timeout` has elapsed.
    pub async fn generate(
        &self,
        request: &VideoGenerationRequest,
        timeout: Duration,
    ) -> Result<GeneratedVideo> {
        self.generate_with_cancel(request, timeout, &CancellationToken::new())
            .await
    }

    /// Like [`generate`](Self::generate), also stopping when `cancel` fires.
    pub async fn generate_with_cancel(
        &self,
        request: &VideoGenerationRequest,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<GeneratedVideo> {
        request.validate()?;

        let params = NormalizedParameters::from_request(request);
        let start = Instant::now();
        let ctx = AttemptContext {
            prompt: &request.prompt,
            model: &request.model,
            params,
            image: request.reference_image.as_ref(),
            deadline: deadline_after(start, timeout),
            cancel,
        };
        tracing::debug!(
            model = %request.model,
            seconds = params.duration.seconds(),
            size = %params.size,
            with_image = ctx.image.is_some(),
            strategies = self.strategies.len(),
            "starting video generation"
        );

        let mut attempts = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            let kind = strategy.kind();
            let (result, image_used) =
                match self.attempt_with_image_fallback(strategy.as_ref(), &ctx).await {
                    Ok(outcome) => outcome,
                    Err(interrupted) => {
                        return Err(interrupted_error(interrupted, kind, attempts, timeout));
                    }
                };

            match result {
                AttemptResult::Success(data) => {
                    tracing::info!(
                        strategy = %kind,
                        bytes = data.len(),
                        image_used,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "video generated"
                    );
                    return Ok(GeneratedVideo::new(
                        data,
                        "video/mp4",
                        VideoMetadata {
                            model: Some(request.model.clone()),
                            duration_ms: Some(start.elapsed().as_millis() as u64),
                            video_duration_secs: Some(params.duration.seconds()),
                            resolution: Some(params.size.to_string()),
                            strategy: Some(kind),
                            reference_image_used: image_used,
                        },
                    ));
                }
                AttemptResult::FatalFailure(diagnostic) => {
                    tracing::error!(strategy = %kind, "fatal provider failure: {diagnostic}");
                    attempts.push(AttemptRecord {
                        strategy: kind,
                        diagnostic,
                    });
                    return Err(SoraChainError::Fatal(FailureReport {
                        abort: AbortKind::Fatal,
                        attempts,
                        guidance: classify::remediation(),
                    }));
                }
                AttemptResult::RetryableFailure(diagnostic) => {
                    tracing::warn!(strategy = %kind, "strategy failed, trying next: {diagnostic}");
                    attempts.push(AttemptRecord {
                        strategy: kind,
                        diagnostic,
                    });
                }
            }
        }

        let guidance = if attempts
            .iter()
            .any(|a| classify::is_content_rejection(&a.diagnostic))
        {
            "The provider rejected the prompt or reference image; try a different prompt or image."
        } else {
            "Every API surface failed; check the diagnostics above and try again later."
        };
        Err(SoraChainError::Exhausted(FailureReport {
            abort: AbortKind::Exhausted,
            attempts,
            guidance: guidance.to_string(),
        }))
    }

    /// Runs a strategy; if the provider refuses a submission carrying the reference image,
    /// submits once more without it. Failures after a job was accepted are never retried.
    ///
    /// Also reports whether the returned result came from an attempt that carried the image.
    async fn attempt_with_image_fallback(
        &self,
        strategy: &dyn GenerationStrategy,
        ctx: &AttemptContext<'_>,
    ) -> std::result::Result<(AttemptResult, bool), Interrupted> {
        let first = self.attempt(strategy, ctx).await?;
        let first_diagnostic = match (first, ctx.image) {
            (
                Verdict {
                    result: AttemptResult::RetryableFailure(diagnostic),
                    at_submission: true,
                },
                Some(_),
            ) => diagnostic,
            (first, image) => return Ok((first.result, image.is_some())),
        };

        tracing::warn!(
            strategy = %strategy.kind(),
            "submission with reference image rejected, retrying without it: {first_diagnostic}"
        );
        let bare = AttemptContext { image: None, ..*ctx };
        let result = match self.attempt(strategy, &bare).await?.result {
            AttemptResult::RetryableFailure(diagnostic) => AttemptResult::RetryableFailure(
                format!("{diagnostic} (with reference image: {first_diagnostic})"),
            ),
            other => other,
        };
        Ok((result, false))
    }

    async fn attempt(
        &self,
        strategy: &dyn GenerationStrategy,
        ctx: &AttemptContext<'_>,
    ) -> std::result::Result<Verdict, Interrupted> {
        tracing::debug!(strategy = %strategy.kind(), with_image = ctx.image.is_some(), "attempting strategy");

        let outcome = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return Err(Interrupted::Cancelled),
            r = tokio::time::timeout_at(ctx.deadline, strategy.attempt(ctx)) => r,
        };

        let (failure, at_submission) = match outcome {
            Err(_) | Ok(Err(StrategyError::TimedOut)) => return Err(Interrupted::TimedOut),
            Ok(Err(StrategyError::Cancelled)) => return Err(Interrupted::Cancelled),
            Ok(Err(StrategyError::Rejected(failure))) => (failure, true),
            Ok(Err(StrategyError::Provider(failure))) => (failure, false),
            Ok(Ok(data)) if data.is_empty() => {
                return Ok(Verdict {
                    result: AttemptResult::RetryableFailure(
                        "provider returned an empty video payload".into(),
                    ),
                    at_submission: false,
                });
            }
            Ok(Ok(data)) => {
                return Ok(Verdict {
                    result: AttemptResult::Success(data),
                    at_submission: false,
                });
            }
        };

        let result = match classify::classify(&failure) {
            FailureClass::Fatal => AttemptResult::FatalFailure(failure.to_string()),
            FailureClass::Retryable => AttemptResult::RetryableFailure(failure.to_string()),
        };
        Ok(Verdict {
            result,
            at_submission,
        })
    }
}

fn interrupted_error(
    interrupted: Interrupted,
    kind: StrategyKind,
    mut attempts: Vec<AttemptRecord>,
    timeout: Duration,
) -> SoraChainError {
    match interrupted {
        Interrupted::TimedOut => {
            tracing::warn!(strategy = %kind, timeout_secs = timeout.as_secs(), "video generation timed out");
            attempts.push(AttemptRecord {
                strategy: kind,
                diagnostic: format!("deadline of {timeout:?} exceeded"),
            });
            SoraChainError::Timeout {
                timeout,
                report: FailureReport {
                    abort: AbortKind::TimedOut,
                    attempts,
                    guidance: "The provider did not finish in time; retry with a longer timeout."
                        .into(),
                },
            }
        }
        Interrupted::Cancelled => {
            attempts.push(AttemptRecord {
                strategy: kind,
                diagnostic: "cancelled".into(),
            });
            SoraChainError::Cancelled(FailureReport {
                abort: AbortKind::Cancelled,
                attempts,
                guidance: "The request was cancelled by the caller.".into(),
            })
        }
    }
}
