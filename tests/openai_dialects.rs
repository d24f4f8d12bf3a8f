//! Integration tests for the OpenAI dialects using wiremock.
//!
//! These tests mock HTTP responses to verify fallback behavior without hitting real APIs.

use base64::Engine;
use serde_json::json;
use sorachain::{
    AbortKind, OpenAiVideoBuilder, ReferenceImage, SoraChainError, StrategyChain, StrategyKind,
    VideoGenerationRequest,
};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, header_regex, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(30);

fn chain_for(server: &MockServer) -> StrategyChain {
    OpenAiVideoBuilder::new()
        .api_key("sk-test-key")
        .base_url(format!("{}/v1", server.uri()))
        .poll_interval(Duration::from_millis(10))
        .build()
        .expect("chain should build")
}

fn json_create() -> MockBuilder {
    Mock::given(method("POST"))
        .and(path("/v1/videos"))
        .and(header("content-type", "application/json"))
}

fn multipart_create() -> MockBuilder {
    Mock::given(method("POST"))
        .and(path("/v1/videos"))
        .and(header_regex("content-type", "^multipart/form-data"))
}

fn responses_call() -> MockBuilder {
    Mock::given(method("POST")).and(path("/v1/responses"))
}

fn error_body(message: &str) -> serde_json::Value {
    json!({"error": {"message": message, "type": "invalid_request_error"}})
}

/// Managed dialect: create, poll until completed, download content.
#[tokio::test]
async fn test_managed_create_poll_download() {
    let server = MockServer::start().await;

    json_create()
        .and(header("authorization", "Bearer sk-test-key"))
        .and(body_partial_json(json!({"model": "sora-2", "seconds": "8", "size": "720x1280"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "video_123", "status": "queued"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/videos/video_123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "video_123", "status": "in_progress", "progress": 40})))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/videos/video_123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "video_123", "status": "completed"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/videos/video_123/content"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"MP4DATA".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    responses_call()
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let request = VideoGenerationRequest::new("A flying bird")
        .with_duration(7)
        .with_resolution("1080x1920");
    let video = chain_for(&server).generate(&request, TIMEOUT).await.unwrap();

    assert_eq!(video.data, b"MP4DATA");
    assert_eq!(video.metadata.strategy, Some(StrategyKind::Managed));
    assert_eq!(video.metadata.video_duration_secs, Some(8));
    assert_eq!(video.metadata.resolution.as_deref(), Some("720x1280"));
}

/// Managed rejects the request shape; the responses dialect returns inline base64.
#[tokio::test]
async fn test_falls_back_to_responses_inline_video() {
    let server = MockServer::start().await;

    json_create()
        .respond_with(ResponseTemplate::new(400).set_body_json(error_body("Unknown parameter: 'seconds'.")))
        .expect(1)
        .mount(&server)
        .await;

    let encoded = base64::engine::general_purpose::STANDARD.encode(b"INLINE-MP4");
    responses_call()
        .and(body_partial_json(json!({"model": "sora-2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "resp_1",
            "output": [{
                "type": "message",
                "content": [{"type": "output_video", "video": {"b64": encoded}}]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    multipart_create()
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let video = chain_for(&server)
        .generate(&VideoGenerationRequest::new("Ocean waves"), TIMEOUT)
        .await
        .unwrap();

    assert_eq!(video.data, b"INLINE-MP4");
    assert_eq!(video.metadata.strategy, Some(StrategyKind::Responses));
}

/// Legacy multipart answers with a status URL that is polled to completion.
#[tokio::test]
async fn test_falls_back_to_multipart_with_status_polling() {
    let server = MockServer::start().await;

    json_create()
        .respond_with(ResponseTemplate::new(404).set_body_json(error_body("Invalid URL (POST /v1/videos)")))
        .mount(&server)
        .await;

    responses_call()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "resp_1", "output": []})))
        .mount(&server)
        .await;

    multipart_create()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "job_1",
            "status_url": format!("{}/jobs/job_1", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/jobs/job_1"))
        .and(header("authorization", "Bearer sk-test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "running"})))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/jobs/job_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": "done",
            "video_url": format!("{}/media/job_1.mp4", server.uri())
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/media/job_1.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"POLLED-MP4".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let video = chain_for(&server)
        .generate(&VideoGenerationRequest::new("City at night"), TIMEOUT)
        .await
        .unwrap();

    assert_eq!(video.data, b"POLLED-MP4");
    assert_eq!(video.metadata.strategy, Some(StrategyKind::LegacyMultipart));
}

/// A verification notice stops the chain before any other dialect is called.
#[tokio::test]
async fn test_verification_required_is_fatal() {
    let server = MockServer::start().await;

    json_create()
        .respond_with(ResponseTemplate::new(403).set_body_json(error_body(
            "Your organization must be verified to use the model `sora-2`.",
        )))
        .expect(1)
        .mount(&server)
        .await;

    responses_call()
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    multipart_create()
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = chain_for(&server)
        .generate(&VideoGenerationRequest::new("A flying bird"), TIMEOUT)
        .await
        .unwrap_err();

    let SoraChainError::Fatal(report) = &err else {
        panic!("expected fatal error, got {err:?}");
    };
    assert_eq!(report.abort, AbortKind::Fatal);
    assert_eq!(report.strategies(), vec![StrategyKind::Managed]);
    assert!(report.attempts[0].diagnostic.contains("HTTP 403"));
    assert!(report.guidance.contains("platform.openai.com/settings/organization"));
    assert!(!err.is_retryable());
}

/// Every dialect fails locally; the report lists all three.
#[tokio::test]
async fn test_all_dialects_fail() {
    let server = MockServer::start().await;

    json_create()
        .respond_with(ResponseTemplate::new(400).set_body_json(error_body("bad managed")))
        .mount(&server)
        .await;
    responses_call()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "resp_1", "status": "completed"})))
        .mount(&server)
        .await;
    multipart_create()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "video_1", "status": "queued"})))
        .mount(&server)
        .await;

    let err = chain_for(&server)
        .generate(&VideoGenerationRequest::new("A flying bird"), TIMEOUT)
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    let report = err.report().unwrap();
    assert_eq!(report.abort, AbortKind::Exhausted);
    assert_eq!(
        report.strategies(),
        vec![
            StrategyKind::Managed,
            StrategyKind::Responses,
            StrategyKind::LegacyMultipart
        ]
    );
    assert!(report.attempts[0].diagnostic.contains("bad managed"));
    assert!(report.attempts[1].diagnostic.contains("unrecognized response shape"));
    assert!(report.attempts[2].diagnostic.contains("unrecognized response shape"));
}

/// The managed upload with an image is rejected; the same dialect succeeds without it.
#[tokio::test]
async fn test_image_rejection_retries_without_image() {
    let server = MockServer::start().await;

    multipart_create()
        .respond_with(ResponseTemplate::new(400).set_body_json(error_body(
            "input_reference dimensions must match the requested size",
        )))
        .expect(1)
        .mount(&server)
        .await;

    json_create()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "video_7", "status": "completed"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/videos/video_7/content"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"NO-IMAGE-MP4".to_vec()))
        .mount(&server)
        .await;

    responses_call()
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let request = VideoGenerationRequest::new("Animate this photo")
        .with_reference_image(ReferenceImage::new(vec![0x89, 0x50, 0x4E, 0x47], "image/png"));
    let video = chain_for(&server).generate(&request, TIMEOUT).await.unwrap();

    assert_eq!(video.data, b"NO-IMAGE-MP4");
    assert_eq!(video.metadata.strategy, Some(StrategyKind::Managed));
    assert!(!video.metadata.reference_image_used);
}

/// The image upload was accepted, so a failed download must not resubmit without the image.
#[tokio::test]
async fn test_download_failure_after_accepted_image_job_is_not_resubmitted() {
    let server = MockServer::start().await;

    multipart_create()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "vid_img", "status": "completed"})))
        .expect(1)
        .mount(&server)
        .await;

    json_create()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "vid_bare", "status": "completed"})))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/videos/vid_img/content"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(1)
        .mount(&server)
        .await;

    let encoded = base64::engine::general_purpose::STANDARD.encode(b"WITH-IMAGE-MP4");
    responses_call()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output": [{"content": [{"type": "output_video", "video": {"b64_json": encoded}}]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = VideoGenerationRequest::new("Animate this photo")
        .with_reference_image(ReferenceImage::new(vec![0x89, 0x50, 0x4E, 0x47], "image/png"));
    let video = chain_for(&server).generate(&request, TIMEOUT).await.unwrap();

    assert_eq!(video.data, b"WITH-IMAGE-MP4");
    assert_eq!(video.metadata.strategy, Some(StrategyKind::Responses));
    assert!(video.metadata.reference_image_used);
}

/// A status URL on another host is polled without the API key.
#[tokio::test]
async fn test_foreign_status_url_gets_no_credentials() {
    let server = MockServer::start().await;
    let job_host = MockServer::start().await;

    json_create()
        .respond_with(ResponseTemplate::new(404).set_body_json(error_body("Invalid URL (POST /v1/videos)")))
        .mount(&server)
        .await;
    responses_call()
        .respond_with(ResponseTemplate::new(404).set_body_json(error_body("Invalid URL (POST /v1/responses)")))
        .mount(&server)
        .await;
    multipart_create()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "job_2",
            "status_url": format!("{}/status/job_2", job_host.uri())
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/status/job_2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "succeeded",
            "video_url": format!("{}/media/job_2.mp4", job_host.uri())
        })))
        .expect(1)
        .mount(&job_host)
        .await;
    Mock::given(method("GET"))
        .and(path("/media/job_2.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"FOREIGN-MP4".to_vec()))
        .mount(&job_host)
        .await;

    let video = chain_for(&server)
        .generate(&VideoGenerationRequest::new("Harbor"), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(video.data, b"FOREIGN-MP4");

    let requests = job_host.received_requests().await.unwrap();
    assert!(!requests.is_empty());
    assert!(requests.iter().all(|r| r.headers.get("authorization").is_none()));
}

/// A broken media URL is a strategy-local failure, not a crash.
#[tokio::test]
async fn test_media_fetch_error_falls_through() {
    let server = MockServer::start().await;

    json_create()
        .respond_with(ResponseTemplate::new(400).set_body_json(error_body("nope")))
        .mount(&server)
        .await;

    responses_call()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output": [{"content": [{"type": "output_video", "video": {"url": format!("{}/media/expired.mp4", server.uri())}}]}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/media/expired.mp4"))
        .respond_with(ResponseTemplate::new(403).set_body_string("expired signature"))
        .mount(&server)
        .await;

    multipart_create()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "video_url": format!("{}/media/ok.mp4", server.uri())
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/media/ok.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"OK-MP4".to_vec()))
        .mount(&server)
        .await;

    let video = chain_for(&server)
        .generate(&VideoGenerationRequest::new("Forest"), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(video.data, b"OK-MP4");
    assert_eq!(video.metadata.strategy, Some(StrategyKind::LegacyMultipart));
}

/// A job that never finishes ends in a timeout, not an endless poll.
#[tokio::test]
async fn test_stuck_job_times_out() {
    let server = MockServer::start().await;

    json_create()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "video_slow", "status": "queued"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/videos/video_slow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "video_slow", "status": "in_progress"})))
        .mount(&server)
        .await;

    let err = chain_for(&server)
        .generate(&VideoGenerationRequest::new("Slow"), Duration::from_millis(300))
        .await
        .unwrap_err();

    assert!(matches!(err, SoraChainError::Timeout { .. }));
    assert_eq!(err.report().unwrap().abort, AbortKind::TimedOut);
}
