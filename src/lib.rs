pub mod config;
pub mod core;
pub mod domain;
pub mod pipeline;
pub mod server;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::ServeArgs;
pub use config::ServiceConfig;

pub use crate::core::{chat::ChatService, groq::GroqClient};
pub use pipeline::{PipelineConfig, PipelineRunner};
pub use utils::error::{ApiError, Result};
