// vision-client/tests/chat_completions.rs
// Integration tests against a mock chat-completions server

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use vision_client::{ImagePayload, InferenceError, VisionBackend, VisionClient, VisionConfig, VisionRequest};

#[derive(Clone, Default)]
struct Captured {
    bodies: Arc<Mutex<Vec<Value>>>,
    auth: Arc<Mutex<Vec<Option<String>>>>,
}

async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn request() -> VisionRequest {
    VisionRequest {
        system: Some("You describe the image and generate keywords.".into()),
        instruction: "Describe the image.".into(),
        image: ImagePayload::jpeg("AAAA"),
    }
}

#[tokio::test]
async fn test_complete_returns_message_content() {
    let captured = Captured::default();
    let router = Router::new()
        .route(
            "/v1/chat/completions",
            post(
                |State(captured): State<Captured>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    captured.bodies.lock().unwrap().push(body);
                    captured.auth.lock().unwrap().push(
                        headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string),
                    );
                    Json(json!({
                        "choices": [{"message": {"role": "assistant", "content": "{\"Keywords\": [\"cat\"]}"}}]
                    }))
                },
            ),
        )
        .with_state(captured.clone());
    let base = spawn_server(router).await;

    let client = VisionClient::new(VisionConfig::new(base).with_api_key("secret")).unwrap();
    let text = client.complete(&request()).await.unwrap();
    assert_eq!(text, "{\"Keywords\": [\"cat\"]}");

    let bodies = captured.bodies.lock().unwrap();
    let body = &bodies[0];
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"][0]["text"], "Describe the image.");
    assert_eq!(
        body["messages"][1]["content"][1]["image_url"]["url"],
        "data:image/jpeg;base64,AAAA"
    );
    assert_eq!(body["stream"], false);
    assert_eq!(
        captured.auth.lock().unwrap()[0].as_deref(),
        Some("Bearer secret")
    );
}

#[tokio::test]
async fn test_non_success_status_is_reported() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "model loading") }),
    );
    let base = spawn_server(router).await;

    let client = VisionClient::new(VisionConfig::new(base)).unwrap();
    let err = client.complete(&request()).await.unwrap_err();
    match err {
        InferenceError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "model loading");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_choices_is_empty_response() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { Json(json!({"choices": []})) }),
    );
    let base = spawn_server(router).await;

    let client = VisionClient::new(VisionConfig::new(base)).unwrap();
    let err = client.complete(&request()).await.unwrap_err();
    assert!(matches!(err, InferenceError::EmptyResponse));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_garbage_body_is_invalid_response() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { "<html>proxy error</html>" }),
    );
    let base = spawn_server(router).await;

    let client = VisionClient::new(VisionConfig::new(base)).unwrap();
    let err = client.complete(&request()).await.unwrap_err();
    assert!(matches!(err, InferenceError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = VisionClient::new(VisionConfig::new(format!("http://{}", addr))).unwrap();
    let err = client.complete(&request()).await.unwrap_err();
    assert!(
        matches!(err, InferenceError::Unreachable(_)),
        "unexpected error: {err:?}"
    );
    assert!(!client.is_online().await);
}

#[test]
fn test_invalid_config_rejected() {
    let err = VisionClient::new(VisionConfig::new("  ")).unwrap_err();
    assert!(matches!(err, InferenceError::InvalidConfig(_)));
    assert!(!err.is_retryable());

    let err = VisionClient::new(VisionConfig::new("http://localhost:5001").with_timeout(0)).unwrap_err();
    assert!(matches!(err, InferenceError::InvalidConfig(_)));
}
