use excel_ai_api::server;
use excel_ai_api::{ChatService, GroqClient, ServiceConfig};
use httpmock::prelude::*;
use serde_json::json;
use tokio::net::TcpListener;

const COMPLETIONS_PATH: &str = "/openai/v1/chat/completions";

/// Starts the API on an ephemeral port against `upstream`; returns its base URL.
async fn spawn_app(upstream: &MockServer, api_key: Option<&str>) -> String {
    let mut config = ServiceConfig::default();
    config.groq.api_url = upstream.url(COMPLETIONS_PATH);
    config.groq.api_key = api_key.map(str::to_string);
    config.groq.timeout_seconds = 5;

    let backend = GroqClient::from_config(&config);
    let app = server::router(ChatService::new(backend, config));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(server::run(listener, app));
    base_url
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
}

#[tokio::test]
async fn test_home_reports_running() {
    let upstream = MockServer::start();
    let base_url = spawn_app(&upstream, None).await;

    let response = reqwest::get(format!("{}/", base_url)).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.text().await.unwrap(),
        "🧠 Groq Unified Chat + Vision API is running!"
    );
}

#[tokio::test]
async fn test_single_message_chat() {
    let upstream = MockServer::start();
    let api_mock = upstream.mock(|when, then| {
        when.method(POST)
            .path(COMPLETIONS_PATH)
            .header("Authorization", "Bearer gsk_test")
            .json_body(json!({
                "model": "deepseek-r1-distill-llama-70b",
                "messages": [{ "role": "user", "content": "Sum A1:A3" }],
                "temperature": 0.5,
                "max_tokens": 1024
            }));
        then.status(200).json_body(completion("  =SUM(A1:A3)  "));
    });
    let base_url = spawn_app(&upstream, Some("gsk_test")).await;

    let response = reqwest::Client::new()
        .post(format!("{}/chat", base_url))
        .json(&json!({ "message": "Sum A1:A3" }))
        .send()
        .await
        .unwrap();

    api_mock.assert();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "reply": "=SUM(A1:A3)" }));
}

#[tokio::test]
async fn test_vision_chat_uses_vision_model() {
    let upstream = MockServer::start();
    let api_mock = upstream.mock(|when, then| {
        when.method(POST)
            .path(COMPLETIONS_PATH)
            .body_contains("meta-llama/llama-4-scout-17b-16e-instruct")
            .body_contains("https://img.example/sheet.png");
        then.status(200).json_body(completion("A table with three rows."));
    });
    let base_url = spawn_app(&upstream, Some("gsk_test")).await;

    let response = reqwest::Client::new()
        .post(format!("{}/chat", base_url))
        .json(&json!({
            "message": "What is in this screenshot?",
            "image_url": "https://img.example/sheet.png"
        }))
        .send()
        .await
        .unwrap();

    api_mock.assert();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["reply"], "A table with three rows.");
}

#[tokio::test]
async fn test_multi_turn_chat_forwards_history() {
    let upstream = MockServer::start();
    let api_mock = upstream.mock(|when, then| {
        when.method(POST).path(COMPLETIONS_PATH).json_body(json!({
            "model": "deepseek-r1-distill-llama-70b",
            "messages": [
                { "role": "system", "content": "Be brief." },
                { "role": "user", "content": "Hi" },
                { "role": "assistant", "content": "Hello." },
                { "role": "user", "content": "Bye" }
            ],
            "temperature": 0.5,
            "max_tokens": 1024
        }));
        then.status(200).json_body(completion("Goodbye."));
    });
    let base_url = spawn_app(&upstream, Some("gsk_test")).await;

    let response = reqwest::Client::new()
        .post(format!("{}/chat", base_url))
        .json(&json!({
            "messages": [
                { "role": "system", "content": "Be brief." },
                { "role": "user", "content": "Hi" },
                { "role": "assistant", "content": "Hello." },
                { "role": "user", "content": "Bye" }
            ]
        }))
        .send()
        .await
        .unwrap();

    api_mock.assert();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_request_without_input_is_bad_request() {
    let upstream = MockServer::start();
    let api_mock = upstream.mock(|when, then| {
        when.method(POST);
        then.status(200);
    });
    let base_url = spawn_app(&upstream, Some("gsk_test")).await;

    let response = reqwest::Client::new()
        .post(format!("{}/chat", base_url))
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, json!("No valid input provided"));
    api_mock.assert_hits(0);
}

#[tokio::test]
async fn test_missing_api_key_is_server_error() {
    let upstream = MockServer::start();
    let api_mock = upstream.mock(|when, then| {
        when.method(POST);
        then.status(200);
    });
    let base_url = spawn_app(&upstream, None).await;

    let response = reqwest::Client::new()
        .post(format!("{}/chat", base_url))
        .json(&json!({ "message": "hello" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, json!("API key not found"));
    api_mock.assert_hits(0);
}

#[tokio::test]
async fn test_upstream_error_status_is_passed_through() {
    let upstream = MockServer::start();
    upstream.mock(|when, then| {
        when.method(POST).path(COMPLETIONS_PATH);
        then.status(429).body("rate limited");
    });
    let base_url = spawn_app(&upstream, Some("gsk_test")).await;

    let response = reqwest::Client::new()
        .post(format!("{}/chat", base_url))
        .json(&json!({ "message": "hello" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 429);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!("Groq API returned an error: 429 Too Many Requests - rate limited")
    );
}

#[tokio::test]
async fn test_empty_choices_is_server_error() {
    let upstream = MockServer::start();
    upstream.mock(|when, then| {
        when.method(POST).path(COMPLETIONS_PATH);
        then.status(200).json_body(json!({ "choices": [] }));
    });
    let base_url = spawn_app(&upstream, Some("gsk_test")).await;

    let response = reqwest::Client::new()
        .post(format!("{}/chat", base_url))
        .json(&json!({ "message": "hello" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, json!("No choices found in API response"));
}

#[tokio::test]
async fn test_cors_is_permissive() {
    let upstream = MockServer::start();
    let base_url = spawn_app(&upstream, None).await;

    let response = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, format!("{}/chat", base_url))
        .header("Origin", "https://sheets.example")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}
