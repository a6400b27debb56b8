use crate::config::service::substitute_env_vars;
use crate::utils::error::{ApiError, Result};
use crate::utils::validation::{
    validate_absolute_path, validate_file_name, validate_non_empty_string, validate_pinned_image,
    Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Build argument carrying the toolchain version. The only place it is pinned.
pub const VERSION_ARG: &str = "RUST_VERSION";
pub const BUILDER_STAGE: &str = "builder";

/// Parameters of the two-stage container build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub rust_version: String,
    /// Toolchain image repository; its tag always comes from `RUST_VERSION`.
    pub builder_image: String,
    pub builder_workdir: String,
    pub runtime_image: String,
    pub artifact_name: String,
    pub workdir: String,
    pub entry_args: Vec<String>,
    pub image_tag: String,
    pub dockerfile: String,
    /// Build with `--locked` so dependencies come only from the committed Cargo.lock.
    pub locked: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rust_version: "1.82".to_string(),
            builder_image: "rust".to_string(),
            builder_workdir: "/usr/src/excel_ai_api".to_string(),
            runtime_image: "debian:bookworm-slim".to_string(),
            artifact_name: "excel_ai_api".to_string(),
            workdir: "/app".to_string(),
            entry_args: Vec::new(),
            image_tag: "excel_ai_api:latest".to_string(),
            dockerfile: "Dockerfile".to_string(),
            locked: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PipelineFile {
    #[serde(default)]
    pipeline: PipelineConfig,
}

impl PipelineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ApiError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content)?;

        toml::from_str::<PipelineFile>(&processed_content)
            .map(|file| file.pipeline)
            .map_err(|e| ApiError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: format!("TOML parsing error: {}", e),
            })
    }

    /// Where the builder stage leaves the release binary.
    pub fn artifact_build_path(&self) -> String {
        format!(
            "{}/target/release/{}",
            self.builder_workdir.trim_end_matches('/'),
            self.artifact_name
        )
    }

    /// Where the runtime stage places the binary.
    pub fn artifact_runtime_path(&self) -> String {
        format!("{}/{}", self.workdir.trim_end_matches('/'), self.artifact_name)
    }

    pub fn entry_command(&self) -> Vec<String> {
        std::iter::once(format!("./{}", self.artifact_name))
            .chain(self.entry_args.iter().cloned())
            .collect()
    }

    /// The manifest inside `context_dir`.
    pub fn dockerfile_path(&self, context_dir: &Path) -> PathBuf {
        context_dir.join(&self.dockerfile)
    }

    pub fn build_args(&self) -> Vec<(String, String)> {
        vec![(VERSION_ARG.to_string(), self.rust_version.clone())]
    }
}

impl Validate for PipelineConfig {
    fn validate(&self) -> Result<()> {
        let version_re = Regex::new(r"^\d+\.\d+(\.\d+)?$").map_err(|e| ApiError::ConfigError {
            message: e.to_string(),
        })?;
        if !version_re.is_match(&self.rust_version) {
            return Err(ApiError::InvalidConfigValueError {
                field: "pipeline.rust_version".to_string(),
                value: self.rust_version.clone(),
                reason: "Expected an exact MAJOR.MINOR[.PATCH] toolchain version".to_string(),
            });
        }

        validate_non_empty_string("pipeline.builder_image", &self.builder_image)?;
        let repo = self
            .builder_image
            .rsplit('/')
            .next()
            .unwrap_or(&self.builder_image);
        if repo.contains(':') || repo.contains('@') {
            return Err(ApiError::InvalidConfigValueError {
                field: "pipeline.builder_image".to_string(),
                value: self.builder_image.clone(),
                reason: format!("Give the repository only; the tag comes from {}", VERSION_ARG),
            });
        }

        validate_pinned_image("pipeline.runtime_image", &self.runtime_image)?;
        validate_absolute_path("pipeline.builder_workdir", &self.builder_workdir)?;
        validate_absolute_path("pipeline.workdir", &self.workdir)?;
        validate_file_name("pipeline.artifact_name", &self.artifact_name)?;
        validate_non_empty_string("pipeline.image_tag", &self.image_tag)?;
        validate_non_empty_string("pipeline.dockerfile", &self.dockerfile)?;

        tracing::debug!("Pipeline configuration validation passed");
        Ok(())
    }
}
