use crate::domain::model::{ChatRequest, CompletionPayload, Message};
use crate::domain::ports::ModelSettings;
use crate::utils::error::{ApiError, Result};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Vision,
    SingleTurn,
    MultiTurn,
}

/// Decides which shape of conversation a request carries.
///
/// A single `message` always takes precedence over `messages`; an image only
/// matters when it accompanies a single `message`.
pub fn classify(request: &ChatRequest) -> Result<RequestKind> {
    match (&request.message, &request.messages) {
        (Some(_), _) if request.image_url.is_some() || request.image_base64.is_some() => {
            Ok(RequestKind::Vision)
        }
        (Some(_), _) => Ok(RequestKind::SingleTurn),
        (None, Some(_)) => Ok(RequestKind::MultiTurn),
        _ => Err(ApiError::InvalidInput {
            message: "No valid input provided".to_string(),
        }),
    }
}

pub fn build_payload<S>(request: &ChatRequest, settings: &S) -> Result<CompletionPayload>
where
    S: ModelSettings + ?Sized,
{
    let kind = classify(request)?;
    tracing::debug!("Building {:?} completion payload", kind);

    let (model, messages) = match kind {
        RequestKind::Vision => {
            let text = request.message.clone().unwrap_or_default();
            // image_url wins; a base64 image is passed through as a data URL.
            let image_data = match &request.image_url {
                Some(url) => json!({ "url": url }),
                None => json!({ "url": request.image_base64 }),
            };
            let content = json!([
                { "type": "text", "text": text },
                { "type": "image_url", "image_url": image_data }
            ]);
            (settings.vision_model(), vec![Message::user(content)])
        }
        RequestKind::SingleTurn => {
            let text = request.message.clone().unwrap_or_default();
            (
                settings.text_model(),
                vec![Message::user(serde_json::Value::String(text))],
            )
        }
        RequestKind::MultiTurn => (
            settings.text_model(),
            request.messages.clone().unwrap_or_default(),
        ),
    };

    Ok(CompletionPayload {
        model: model.to_string(),
        messages,
        temperature: settings.temperature(),
        max_tokens: settings.max_tokens(),
    })
}
