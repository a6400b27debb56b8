use crate::domain::model::CompletionPayload;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// Upstream model API able to answer a chat completion.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Fails fast when the backend cannot serve any request (e.g. no credentials).
    fn ensure_ready(&self) -> Result<()>;

    async fn complete(&self, payload: &CompletionPayload) -> Result<String>;
}

pub trait ModelSettings: Send + Sync {
    fn text_model(&self) -> &str;
    fn vision_model(&self) -> &str;
    fn temperature(&self) -> f64;
    fn max_tokens(&self) -> u32;
}

/// Everything a container build tool needs to run one stage of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildRequest {
    pub context_dir: PathBuf,
    pub dockerfile: PathBuf,
    pub build_args: Vec<(String, String)>,
    pub builder_target: String,
    pub image_tag: String,
}

#[async_trait]
pub trait ImageBuilder: Send + Sync {
    /// Runs the builder stage only; success means the artifact exists.
    async fn build_artifact(&self, request: &BuildRequest) -> Result<()>;

    /// Runs the whole manifest and tags the runtime image.
    async fn package_image(&self, request: &BuildRequest) -> Result<String>;
}
