//! Deciding whether a provider failure ends the whole chain.

use crate::error::ProviderFailure;

/// Where the operator fixes an unverified organization.
pub const VERIFICATION_URL: &str = "https://platform.openai.com/settings/organization/general";

const VERIFICATION_MARKERS: [&str; 4] = [
    "must be verified",
    "verify organization",
    "organization verification",
    "organization is not verified",
];

const CONTENT_MARKERS: [&str; 5] = [
    "moderation_blocked",
    "sentinel_block",
    "content_policy",
    "safety",
    "blocked by moderation",
];

/// How the chain should react to a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// No other strategy can succeed with this account; stop.
    Fatal,
    /// Local to this strategy; try the next one.
    Retryable,
}

/// Classifies a provider failure. 403s and verification notices are fatal.
pub fn classify(failure: &ProviderFailure) -> FailureClass {
    if failure.status == Some(403) {
        return FailureClass::Fatal;
    }
    let lower = failure.message.to_lowercase();
    if VERIFICATION_MARKERS.iter().any(|m| lower.contains(m)) {
        return FailureClass::Fatal;
    }
    FailureClass::Retryable
}

/// True when the provider refused the prompt or image on content grounds.
pub fn is_content_rejection(message: &str) -> bool {
    let lower = message.to_lowercase();
    CONTENT_MARKERS.iter().any(|m| lower.contains(m))
}

/// Operator-facing steps for a fatal failure.
pub fn remediation() -> String {
    format!(
        "Organization verification required. Visit {VERIFICATION_URL}, click \
         'Verify Organization' and wait up to 15 minutes before retrying."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_is_fatal() {
        let failure = ProviderFailure::http(403, "Forbidden");
        assert_eq!(classify(&failure), FailureClass::Fatal);
    }

    #[test]
    fn test_verification_message_is_fatal() {
        let failure = ProviderFailure::http(
            400,
            r#"{"error":{"message":"Your organization must be verified to use the model `sora-2`."}}"#,
        );
        assert_eq!(classify(&failure), FailureClass::Fatal);

        let failure = ProviderFailure::new("Please Verify Organization first");
        assert_eq!(classify(&failure), FailureClass::Fatal);
    }

    #[test]
    fn test_other_failures_are_retryable() {
        for failure in [
            ProviderFailure::http(400, "Unknown parameter: 'input'"),
            ProviderFailure::http(404, "Not found"),
            ProviderFailure::http(500, "server error"),
            ProviderFailure::http(401, "invalid key"),
            ProviderFailure::new("unrecognized response shape"),
        ] {
            assert_eq!(classify(&failure), FailureClass::Retryable, "{failure}");
        }
    }

    #[test]
    fn test_content_rejection() {
        assert!(is_content_rejection("code: moderation_blocked"));
        assert!(is_content_rejection("Rejected by Safety system"));
        assert!(!is_content_rejection("HTTP 500: server error"));
    }

    #[test]
    fn test_remediation_mentions_settings_page() {
        let text = remediation();
        assert!(text.contains(VERIFICATION_URL));
        assert!(text.contains("15 minutes"));
    }
}
