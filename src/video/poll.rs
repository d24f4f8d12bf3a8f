//! Bounded polling of asynchronous generation jobs.

use crate::error::ProviderFailure;
use crate::video::extract::{HttpResponse, MediaSource};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Shortest pause allowed between two status checks.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Stand-in deadline for budgets too large to add to an instant.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `start + budget`, saturating to a far-future instant instead of overflowing.
pub(crate) fn deadline_after(start: Instant, budget: Duration) -> Instant {
    start
        .checked_add(budget)
        .unwrap_or_else(|| start + FAR_FUTURE)
}

/// Where a job's status is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLocation {
    /// The provider's own status-by-id endpoint.
    Job,
    /// A status URL handed back at submission.
    Url(String),
}

/// An asynchronous job to wait on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    /// Provider job id.
    pub job_id: String,
    /// Where to check progress.
    pub location: StatusLocation,
}

impl JobHandle {
    /// A job polled through the provider's status-by-id endpoint.
    pub fn by_id(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            location: StatusLocation::Job,
        }
    }

    /// A job polled through an explicit status URL.
    pub fn by_url(job_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            location: StatusLocation::Url(url.into()),
        }
    }
}

/// Reads the current status document of a job.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// One status check. Transport errors are `Err`; any HTTP status is `Ok`.
    async fn fetch_status(&self, handle: &JobHandle) -> Result<HttpResponse, ProviderFailure>;
}

/// Provider status strings collapsed onto three states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Still queued or running.
    Pending,
    /// Finished with output.
    Succeeded,
    /// Finished without output.
    Failed,
}

impl JobState {
    /// Maps a status string; unknown values count as pending.
    pub fn from_status(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "succeeded" | "completed" | "done" | "success" => Self::Succeeded,
            "failed" | "error" | "cancelled" | "canceled" => Self::Failed,
            _ => Self::Pending,
        }
    }

    /// Reads `status`, falling back to `state`.
    pub fn from_payload(payload: &Value) -> Self {
        payload
            .get("status")
            .or_else(|| payload.get("state"))
            .and_then(Value::as_str)
            .map(Self::from_status)
            .unwrap_or(Self::Pending)
    }
}

/// Terminal result of a poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The job finished and its media can be found here.
    Completed(MediaSource),
    /// The job failed, or a status check was rejected.
    Failed(ProviderFailure),
    /// The deadline passed while the job was still pending.
    TimedOut,
    /// The cancellation token fired.
    Cancelled,
}

/// Polls a job until it leaves the pending state or the deadline passes.
#[derive(Debug, Clone)]
pub struct Poller {
    timeout: Duration,
    interval: Duration,
    download_by_id: bool,
}

impl Poller {
    /// Creates a poller with a total budget and a pause between checks.
    ///
    /// The pause is raised to [`MIN_POLL_INTERVAL`] if shorter.
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval: interval.max(MIN_POLL_INTERVAL),
            download_by_id: false,
        }
    }

    /// Lets a completed payload resolve to an id-based download.
    pub fn download_by_id(mut self, enabled: bool) -> Self {
        self.download_by_id = enabled;
        self
    }

    /// Runs the loop. Never waits past the deadline by more than one interval.
    pub async fn poll(
        &self,
        source: &dyn StatusSource,
        handle: &JobHandle,
        cancel: &CancellationToken,
    ) -> PollOutcome {
        let start = Instant::now();
        let deadline = deadline_after(start, self.timeout);
        let mut polls: u32 = 0;

        loop {
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                r = tokio::time::timeout_at(deadline, source.fetch_status(handle)) => r,
            };
            let response = match fetched {
                Err(_) => return PollOutcome::TimedOut,
                Ok(Err(failure)) => return PollOutcome::Failed(failure),
                Ok(Ok(response)) => response,
            };
            polls += 1;

            if !response.is_success() {
                return PollOutcome::Failed(ProviderFailure::http(
                    response.status,
                    format!("status check failed: {}", response.text()),
                ));
            }
            let payload = match response.json() {
                Ok(payload) => payload,
                Err(failure) => return PollOutcome::Failed(failure),
            };

            let state = JobState::from_payload(&payload);
            let progress = payload.get("progress").and_then(Value::as_u64);
            tracing::debug!(
                job_id = %handle.job_id,
                ?state,
                polls,
                progress,
                elapsed_secs = start.elapsed().as_secs(),
                "polled video job"
            );

            match state {
                JobState::Succeeded => {
                    return match MediaSource::probe(&payload, self.download_by_id) {
                        Some(media) => PollOutcome::Completed(media),
                        None => PollOutcome::Failed(ProviderFailure::new(format!(
                            "job completed without a media locator: {payload}"
                        ))),
                    };
                }
                JobState::Failed => {
                    return PollOutcome::Failed(ProviderFailure::new(format!(
                        "job failed: {}",
                        failure_reason(&payload)
                    )));
                }
                JobState::Pending => {
                    let now = Instant::now();
                    if now >= deadline {
                        return PollOutcome::TimedOut;
                    }
                    let nap = self.interval.min(deadline - now);
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return PollOutcome::Cancelled,
                        _ = tokio::time::sleep(nap) => {}
                    }
                }
            }
        }
    }
}

/// Best human-readable reason from a failed job document.
fn failure_reason(payload: &Value) -> String {
    let error = payload.get("error");
    let code = error.and_then(|e| e.get("code")).and_then(Value::as_str);
    let message = payload
        .get("failure_reason")
        .and_then(Value::as_str)
        .or_else(|| error.and_then(|e| e.get("message")).and_then(Value::as_str))
        .or_else(|| error.and_then(Value::as_str));

    match (code, message) {
        (Some(code), Some(message)) => format!("{message} ({code})"),
        (None, Some(message)) => message.to_string(),
        (Some(code), None) => code.to_string(),
        (None, None) => payload.to_string(),
    }
}
