use crate::config::ServiceConfig;
use crate::domain::model::{CompletionPayload, CompletionResponse};
use crate::domain::ports::ChatBackend;
use crate::utils::error::{ApiError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Chat-completions client for the Groq OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct GroqClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl GroqClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key,
            timeout,
        }
    }

    /// The API key is resolved once, here, when the service starts.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(
            config.groq.api_url.clone(),
            config.api_key().map(str::to_string),
            Duration::from_secs(config.groq.timeout_seconds),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatBackend for GroqClient {
    fn ensure_ready(&self) -> Result<()> {
        match &self.api_key {
            Some(_) => Ok(()),
            None => Err(ApiError::MissingApiKey),
        }
    }

    async fn complete(&self, payload: &CompletionPayload) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or(ApiError::MissingApiKey)?;

        tracing::debug!(
            "Sending {} message(s) to {} using model {}",
            payload.messages.len(),
            self.endpoint,
            payload.model
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(payload)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Upstream response status: {}", status);

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            tracing::warn!("Upstream returned {}: {}", status, body);
            return Err(ApiError::UpstreamStatus { status, body });
        }

        let parsed: CompletionResponse = response.json().await.map_err(|e| {
            tracing::warn!("Could not decode completion response: {}", e);
            ApiError::MalformedCompletion
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or(ApiError::EmptyCompletion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Message;
    use httpmock::prelude::*;

    fn payload() -> CompletionPayload {
        CompletionPayload {
            model: "deepseek-r1-distill-llama-70b".to_string(),
            messages: vec![Message::user(serde_json::json!("hello"))],
            temperature: 0.5,
            max_tokens: 1024,
        }
    }

    fn client_for(server: &MockServer, key: Option<&str>) -> GroqClient {
        GroqClient::new(
            server.url("/openai/v1/chat/completions"),
            key.map(str::to_string),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_complete_returns_trimmed_first_choice() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/openai/v1/chat/completions")
                .header("Authorization", "Bearer gsk_test")
                .json_body(serde_json::json!({
                    "model": "deepseek-r1-distill-llama-70b",
                    "messages": [{"role": "user", "content": "hello"}],
                    "temperature": 0.5,
                    "max_tokens": 1024
                }));
            then.status(200).json_body(serde_json::json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "  Hi there!\n"}},
                    {"message": {"role": "assistant", "content": "second"}}
                ]
            }));
        });

        let reply = client_for(&server, Some("gsk_test"))
            .complete(&payload())
            .await
            .unwrap();

        api_mock.assert();
        assert_eq!(reply, "Hi there!");
    }

    #[tokio::test]
    async fn test_complete_without_choices() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(200)
                .json_body(serde_json::json!({ "choices": [] }));
        });

        let err = client_for(&server, Some("gsk_test"))
            .complete(&payload())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::EmptyCompletion));
    }

    #[tokio::test]
    async fn test_complete_with_undecodable_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(200).body("not json");
        });

        let err = client_for(&server, Some("gsk_test"))
            .complete(&payload())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Failed to parse API response");
    }

    #[tokio::test]
    async fn test_complete_propagates_upstream_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(401).body("invalid api key");
        });

        let err = client_for(&server, Some("gsk_bad"))
            .complete(&payload())
            .await
            .unwrap_err();

        match err {
            ApiError::UpstreamStatus { status, body } => {
                assert_eq!(status.as_u16(), 401);
                assert_eq!(body, "invalid api key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_key_never_calls_upstream() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST);
            then.status(200);
        });

        let client = client_for(&server, None);
        assert!(matches!(client.ensure_ready(), Err(ApiError::MissingApiKey)));
        assert!(matches!(
            client.complete(&payload()).await,
            Err(ApiError::MissingApiKey)
        ));
        api_mock.assert_hits(0);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_transport_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let client = GroqClient::new(
            "http://127.0.0.1:9/chat",
            Some("gsk_test".to_string()),
            Duration::from_secs(2),
        );

        let err = client.complete(&payload()).await.unwrap_err();
        assert!(err.to_string().starts_with("Groq API failed:"));
    }
}
