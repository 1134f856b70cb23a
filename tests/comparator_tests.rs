// Dual-mode comparison against a mock API
use parcelprobe::comparator::compare_with_and_without_auth;
use parcelprobe::engine::ProbeClient;
use parcelprobe::error::{Mismatch, ProbeError};
use parcelprobe::auth::TokenAuth;
use parcelprobe::models::Endpoint;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RESET_PATH: &str = "/users/forget-password";

async fn client_for(server: &MockServer) -> ProbeClient {
    ProbeClient::new(&server.uri(), Duration::from_secs(5)).expect("client")
}

#[tokio::test]
async fn auth_independent_endpoint_is_consistent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RESET_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let request = Endpoint::forget_password().request(Some(json!({"email": "someone@example.com"})));
    let comparison = compare_with_and_without_auth(&client, &request, &TokenAuth::raw("user-token"))
        .await
        .expect("responses should match");

    assert_eq!(comparison.status, 200);
    assert_eq!(comparison.with_auth, json!({"status": "ok"}));
    assert_eq!(comparison.without_auth, json!({"status": "ok"}));
}

#[tokio::test]
async fn auth_dependent_keys_are_a_mismatch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RESET_PATH))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok", "accountId": "a1"})))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(RESET_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let request = Endpoint::forget_password().request(Some(json!({"email": "someone@example.com"})));
    let err = compare_with_and_without_auth(&client, &request, &TokenAuth::raw("user-token"))
        .await
        .unwrap_err();

    match err {
        ProbeError::ResponseMismatch(Mismatch::Structure { first, second }) => {
            assert_eq!(first, vec!["accountId", "status"]);
            assert_eq!(second, vec!["status"]);
        }
        other => panic!("expected structure mismatch, got {:?}", other),
    }
}

#[tokio::test]
async fn auth_dependent_status_is_a_mismatch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RESET_PATH))
        .and(header("authorization", "user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(RESET_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let request = Endpoint::forget_password().request(Some(json!({"email": "someone@example.com"})));
    let err = compare_with_and_without_auth(&client, &request, &TokenAuth::raw("user-token"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProbeError::ResponseMismatch(Mismatch::Status { first: 200, second: 404 })));
}

#[tokio::test]
async fn auth_dependent_values_are_a_mismatch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RESET_PATH))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Reset email sent"})))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(RESET_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Request received"})))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let request = Endpoint::forget_password().request(Some(json!({"email": "someone@example.com"})));
    let err = compare_with_and_without_auth(&client, &request, &TokenAuth::raw("user-token"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProbeError::ResponseMismatch(Mismatch::Content { .. })));
}

#[tokio::test]
async fn unreachable_target_is_a_network_failure() {
    let client = ProbeClient::new("http://127.0.0.1:1", Duration::from_secs(2)).expect("client");
    let request = Endpoint::forget_password().request(Some(json!({"email": "someone@example.com"})));
    let err = compare_with_and_without_auth(&client, &request, &TokenAuth::raw("user-token"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProbeError::Network { .. }));
    assert_eq!(err.verdict(), parcelprobe::Verdict::Uncertain);
}
