use crate::core::chat::ChatService;
use crate::domain::model::{ChatReply, ChatRequest};
use crate::domain::ports::{ChatBackend, ModelSettings};
use crate::utils::error::ApiError;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;

pub const BANNER: &str = "🧠 Groq Unified Chat + Vision API is running!";

pub async fn home() -> &'static str {
    BANNER
}

pub async fn chat<B, S>(
    State(service): State<Arc<ChatService<B, S>>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError>
where
    B: ChatBackend + 'static,
    S: ModelSettings + 'static,
{
    service.chat(&request).await.map(Json)
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            ApiError::UpstreamStatus { status, .. } => {
                StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Errors travel back as a bare JSON string.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("❌ {} (category: {:?})", self, self.category());
        } else {
            tracing::warn!("{}", self);
        }
        (status, Json(self.to_string())).into_response()
    }
}
