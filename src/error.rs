//! Error types for video generation.

use crate::video::StrategyKind;
use std::fmt;
use std::time::Duration;

/// Longest provider message kept in a diagnostic.
const MAX_DIAGNOSTIC_LEN: usize = 500;

/// Errors that can occur during video generation.
#[derive(Debug, thiserror::Error)]
pub enum SoraChainError {
    /// The request was rejected before any provider call (e.g. empty prompt).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No credential could be resolved.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A strategy hit an account-level block; no further strategies were tried.
    #[error("{0}")]
    Fatal(FailureReport),

    /// Every strategy failed with a strategy-local error.
    #[error("{0}")]
    Exhausted(FailureReport),

    /// The request deadline passed before a video was produced.
    #[error("operation timed out after {timeout:?}")]
    Timeout {
        /// The budget that was exceeded.
        timeout: Duration,
        /// Attempts made before the deadline.
        report: FailureReport,
    },

    /// The caller cancelled the request.
    #[error("{0}")]
    Cancelled(FailureReport),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., saving file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SoraChainError {
    /// Returns true if trying the same request again later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Exhausted(_) | Self::Timeout { .. } | Self::Network(_))
    }

    /// Returns the per-strategy report, if the chain ran.
    pub fn report(&self) -> Option<&FailureReport> {
        match self {
            Self::Fatal(report) | Self::Exhausted(report) | Self::Cancelled(report) => {
                Some(report)
            }
            Self::Timeout { report, .. } => Some(report),
            _ => None,
        }
    }
}

/// Result type alias for video generation operations.
pub type Result<T> = std::result::Result<T, SoraChainError>;

/// A single provider-side failure: optional HTTP status plus a sanitized message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    /// HTTP status code, when the failure came from a response.
    pub status: Option<u16>,
    /// Sanitized diagnostic text.
    pub message: String,
}

impl ProviderFailure {
    /// Creates a failure without an HTTP status.
    pub fn new(message: impl AsRef<str>) -> Self {
        Self {
            status: None,
            message: sanitize_error_message(message.as_ref()),
        }
    }

    /// Creates a failure from an HTTP status and response body.
    pub fn http(status: u16, body: impl AsRef<str>) -> Self {
        Self {
            status: Some(status),
            message: sanitize_error_message(body.as_ref()),
        }
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl From<reqwest::Error> for ProviderFailure {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {err}")
        } else {
            err.to_string()
        };
        Self {
            status: err.status().map(|s| s.as_u16()),
            message: sanitize_error_message(&message),
        }
    }
}

impl From<serde_json::Error> for ProviderFailure {
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("malformed JSON response: {err}"))
    }
}

impl From<base64::DecodeError> for ProviderFailure {
    fn from(err: base64::DecodeError) -> Self {
        Self::new(format!("invalid base64 payload: {err}"))
    }
}

/// How the strategy chain ended without producing a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortKind {
    /// Account-level block; remaining strategies were skipped.
    Fatal,
    /// All strategies failed locally.
    Exhausted,
    /// The request deadline passed.
    TimedOut,
    /// The caller cancelled.
    Cancelled,
}

impl fmt::Display for AbortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fatal => write!(f, "fatal"),
            Self::Exhausted => write!(f, "exhausted"),
            Self::TimedOut => write!(f, "timed out"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Outcome of one strategy attempt, as recorded in a [`FailureReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// Strategy that was attempted.
    pub strategy: StrategyKind,
    /// What went wrong.
    pub diagnostic: String,
}

/// Aggregate description of a failed generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    /// Why the chain stopped.
    pub abort: AbortKind,
    /// Attempts in the order they were made.
    pub attempts: Vec<AttemptRecord>,
    /// What the caller should do next.
    pub guidance: String,
}

impl FailureReport {
    /// Strategies that were attempted, in order.
    pub fn strategies(&self) -> Vec<StrategyKind> {
        self.attempts.iter().map(|a| a.strategy).collect()
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "video generation {}", self.abort)?;
        if self.attempts.is_empty() {
            write!(f, " before any strategy completed")?;
        }
        for attempt in &self.attempts {
            write!(f, "\n  - {}: {}", attempt.strategy, attempt.diagnostic)?;
        }
        write!(f, "\n{}", self.guidance)
    }
}

/// Redacts API keys and truncates oversized provider messages.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let redacted = text
        .split(' ')
        .map(|word| {
            let trimmed = word.trim_start_matches(|c: char| !c.is_alphanumeric());
            if trimmed.starts_with("sk-") && trimmed.len() > 8 {
                "[REDACTED]"
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    let redacted = redacted.trim();

    if redacted.chars().count() > MAX_DIAGNOSTIC_LEN {
        let cut: String = redacted.chars().take(MAX_DIAGNOSTIC_LEN).collect();
        format!("{cut}...")
    } else {
        redacted.to_string()
    }
}
