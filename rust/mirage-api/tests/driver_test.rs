use axum::{
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use tokio::net::TcpListener;

use mirage_api::error::GenerateError;
use mirage_api::llm::providers::create_generator;
use mirage_api::llm::{LlmSettings, Provider};

/// OpenAI-style endpoint that echoes the prompt back.
async fn chat_completions(
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer sk-test") {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
    Ok(Json(serde_json::json!({
        "id": "chatcmpl-1",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": format!("echo: {prompt}") },
            "finish_reason": "stop"
        }]
    })))
}

/// Anthropic-style endpoint.
async fn messages(
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some("sk-ant-test")
        || headers.get("anthropic-version").is_none()
    {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
    Ok(Json(serde_json::json!({
        "id": "msg_1",
        "type": "message",
        "role": "assistant",
        "content": [
            { "type": "text", "text": "echo: " },
            { "type": "text", "text": prompt }
        ],
        "stop_reason": "end_turn"
    })))
}

async fn overloaded() -> (StatusCode, &'static str) {
    (StatusCode::SERVICE_UNAVAILABLE, "overloaded")
}

async fn garbage() -> &'static str {
    "not json"
}

async fn spawn_mock() -> (String, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/messages", post(messages))
        .route("/down/v1/chat/completions", post(overloaded))
        .route("/garbage/v1/chat/completions", post(garbage));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let port = listener.local_addr().unwrap().port();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server error");
    });

    (format!("http://127.0.0.1:{port}"), handle)
}

fn settings(base_url: String, provider: Provider, api_key: &str) -> LlmSettings {
    LlmSettings {
        base_url,
        api_key: Some(api_key.to_string()),
        model: "test-model".to_string(),
        provider,
        timeout_secs: 5,
        ..LlmSettings::default()
    }
}

#[tokio::test]
async fn test_openai_compatible_driver() {
    let (base, handle) = spawn_mock().await;

    let generator = create_generator(settings(base, Provider::Custom, "sk-test")).unwrap();
    let text = generator.generate("ls -la").await.unwrap();
    assert_eq!(text, "echo: ls -la");
    assert_eq!(generator.describe(), "custom (test-model)");

    handle.abort();
}

#[tokio::test]
async fn test_anthropic_driver() {
    let (base, handle) = spawn_mock().await;

    let generator = create_generator(settings(base, Provider::Anthropic, "sk-ant-test")).unwrap();
    let text = generator.generate("dir").await.unwrap();
    assert_eq!(text, "echo: dir");

    handle.abort();
}

#[tokio::test]
async fn test_rejected_key_is_service_error() {
    let (base, handle) = spawn_mock().await;

    let generator = create_generator(settings(base, Provider::Custom, "sk-wrong")).unwrap();
    let err = generator.generate("ls").await.unwrap_err();
    assert!(matches!(err, GenerateError::Service { status: 401, .. }));

    handle.abort();
}

#[tokio::test]
async fn test_unavailable_service_is_service_error() {
    let (base, handle) = spawn_mock().await;

    let generator =
        create_generator(settings(format!("{base}/down"), Provider::Custom, "sk-test")).unwrap();
    match generator.generate("ls").await {
        Err(GenerateError::Service { status, message }) => {
            assert_eq!(status, 503);
            assert_eq!(message, "overloaded");
        }
        other => panic!("expected service error, got {other:?}"),
    }

    handle.abort();
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let (base, handle) = spawn_mock().await;

    let generator =
        create_generator(settings(format!("{base}/garbage"), Provider::Custom, "sk-test"))
            .unwrap();
    let err = generator.generate("ls").await.unwrap_err();
    assert!(matches!(err, GenerateError::MalformedResponse(_)));

    handle.abort();
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    // Bind then drop to get a port nobody is listening on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let generator = create_generator(settings(
        format!("http://127.0.0.1:{port}"),
        Provider::Custom,
        "sk-test",
    ))
    .unwrap();
    let err = generator.generate("ls").await.unwrap_err();
    assert!(matches!(err, GenerateError::Network(_)));
}
