use crate::core::payload::build_payload;
use crate::domain::model::{ChatReply, ChatRequest};
use crate::domain::ports::{ChatBackend, ModelSettings};
use crate::utils::error::Result;

pub struct ChatService<B: ChatBackend, S: ModelSettings> {
    backend: B,
    settings: S,
}

impl<B: ChatBackend, S: ModelSettings> ChatService<B, S> {
    pub fn new(backend: B, settings: S) -> Self {
        Self { backend, settings }
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        // Credentials are checked before the request shape.
        self.backend.ensure_ready()?;

        let payload = build_payload(request, &self.settings)?;
        let reply = self.backend.complete(&payload).await?;

        tracing::info!(
            "Chat completed with model {} ({} chars)",
            payload.model,
            reply.len()
        );
        Ok(ChatReply { reply })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::domain::model::CompletionPayload;
    use crate::utils::error::ApiError;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingBackend {
        ready: bool,
        seen: Arc<Mutex<Vec<CompletionPayload>>>,
    }

    #[async_trait]
    impl ChatBackend for RecordingBackend {
        fn ensure_ready(&self) -> Result<()> {
            if self.ready {
                Ok(())
            } else {
                Err(ApiError::MissingApiKey)
            }
        }

        async fn complete(&self, payload: &CompletionPayload) -> Result<String> {
            self.seen.lock().unwrap().push(payload.clone());
            Ok("ok".to_string())
        }
    }

    #[tokio::test]
    async fn test_chat_sends_payload_to_backend() {
        let backend = RecordingBackend {
            ready: true,
            ..Default::default()
        };
        let service = ChatService::new(backend.clone(), ServiceConfig::default());

        let request = ChatRequest {
            message: Some("hello".to_string()),
            ..Default::default()
        };
        let reply = service.chat(&request).await.unwrap();

        assert_eq!(reply.reply, "ok");
        assert_eq!(backend.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_key_reported_before_bad_input() {
        let backend = RecordingBackend::default();
        let service = ChatService::new(backend.clone(), ServiceConfig::default());

        let err = service.chat(&ChatRequest::default()).await.unwrap_err();

        assert!(matches!(err, ApiError::MissingApiKey));
        assert!(backend.seen.lock().unwrap().is_empty());
    }
}
