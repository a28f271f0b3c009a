//! End-to-end gateway behavior against a mock API server.

use std::time::Duration;

use alm_auth::providers::StaticProvider;
use alm_auth::{CredentialChain, TokenSource};
use alm_gateway::{ApiClient, ApiError, ErrorKind, Gateway, RequestOptions};
use pretty_assertions::assert_eq;
use reqwest::Method;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chain(token: &str) -> CredentialChain {
    CredentialChain::new(vec![Box::new(StaticProvider::new(
        TokenSource::TestBridge,
        token,
    ))])
}

fn gateway(server: &MockServer, timeout: Duration) -> Gateway {
    Gateway::new(reqwest::Client::new(), &server.uri(), chain("tok_1"), timeout)
}

#[tokio::test]
async fn attaches_bearer_and_decodes_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me/activation"))
        .and(header("authorization", "Bearer tok_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "profile_complete": true,
            "has_any_log": true,
            "has_any_report": false,
            "activation_complete": false,
            "next_step": "first_report"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiClient::new(gateway(&server, Duration::from_secs(5)), Duration::from_secs(5));
    let activation = api.activation().await.unwrap();
    assert!(activation.profile_complete);
    assert_eq!(activation.next_step.as_deref(), Some("first_report"));
}

#[tokio::test]
async fn no_credentials_short_circuits_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let gateway = Gateway::new(
        reqwest::Client::new(),
        &server.uri(),
        CredentialChain::new(Vec::new()),
        Duration::from_secs(5),
    );
    let err = gateway
        .request_value(Method::GET, "/api/me/entitlements", RequestOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthenticated));
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me/entitlements"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "plan": "free" }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = gateway(&server, Duration::from_millis(200))
        .request_value(Method::GET, "/api/me/entitlements", RequestOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn cancellation_aborts_in_flight_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/analyze"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let api = ApiClient::new(gateway(&server, Duration::from_secs(30)), Duration::from_secs(30));
    let err = api.analyze("2026-03-02", false, &token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Canceled);
}

#[tokio::test]
async fn analyze_in_progress_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/analyze"))
        .and(body_json(json!({ "date": "2026-03-02", "force": true })))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "detail": {
                "code": "ANALYZE_IN_PROGRESS",
                "message": "Report generation already running",
                "hint": "Check back shortly"
            }
        })))
        .mount(&server)
        .await;

    let api = ApiClient::new(gateway(&server, Duration::from_secs(5)), Duration::from_secs(5));
    let err = api
        .analyze("2026-03-02", true, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InProgress);
    assert_eq!(err.status(), Some(409));
    assert_eq!(err.hint(), Some("Check back shortly"));
}

#[tokio::test]
async fn pipeline_error_carries_reference_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/analyze"))
        .respond_with(
            ResponseTemplate::new(500)
                .insert_header("x-request-id", "req-abc")
                .set_body_json(json!({ "message": "Pipeline failed", "code": "PIPELINE_ERROR" })),
        )
        .mount(&server)
        .await;

    let api = ApiClient::new(gateway(&server, Duration::from_secs(5)), Duration::from_secs(5));
    let err = api
        .analyze("2026-03-02", false, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.user_message(), "Pipeline failed");
    assert_eq!(err.reference_id(), Some("req-abc"));
}

#[tokio::test]
async fn unparsable_error_body_keeps_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me/entitlements"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = gateway(&server, Duration::from_secs(5))
        .request_value(Method::GET, "/api/me/entitlements", RequestOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(err.user_message(), "request failed with status 503");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn report_not_found_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/reports"))
        .and(query_param("date", "2026-03-02"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Not found" })))
        .mount(&server)
        .await;

    let api = ApiClient::new(gateway(&server, Duration::from_secs(5)), Duration::from_secs(5));
    let err = api
        .report("2026-03-02", &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn malformed_routine_goal_falls_back_to_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "date": "2026-03-02",
            "report": {
                "summary": "Solid day",
                "tomorrow_routine": [{ "time": "07:30", "title": "Stretch" }]
            }
        })))
        .mount(&server)
        .await;

    let api = ApiClient::new(gateway(&server, Duration::from_secs(5)), Duration::from_secs(5));
    let artifact = api
        .analyze("2026-03-02", false, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(artifact.report.summary, "Solid day");
    assert_eq!(artifact.report.tomorrow_routine[0].goal, "");
}

#[tokio::test]
async fn strict_request_reports_decode_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/raw"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = gateway(&server, Duration::from_secs(5))
        .request::<serde_json::Value>(Method::GET, "/api/raw", RequestOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}
