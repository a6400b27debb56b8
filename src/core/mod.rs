pub mod chat;
pub mod groq;
pub mod payload;

pub use crate::domain::model::{ChatReply, ChatRequest, CompletionPayload, Message};
pub use crate::domain::ports::{ChatBackend, ModelSettings};
pub use crate::utils::error::Result;
