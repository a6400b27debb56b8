use serde::{Deserialize, Serialize};

/// Body accepted by `POST /chat`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    pub messages: Option<Vec<Message>>,
    pub message: Option<String>,
    pub image_url: Option<String>,
    pub image_base64: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    // Either a plain string or an array of content parts.
    pub content: serde_json::Value,
}

impl Message {
    pub fn user(content: serde_json::Value) -> Self {
        Self {
            role: "user".to_string(),
            content,
        }
    }
}

/// Request body sent to the chat-completions endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionPayload {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
pub struct CompletionMessage {
    pub content: String,
}
