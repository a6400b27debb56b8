use crate::domain::ports::{BuildRequest, ImageBuilder};
use crate::pipeline::config::{PipelineConfig, BUILDER_STAGE};
use crate::pipeline::manifest::{check, ensure_sound, Manifest};
use crate::pipeline::state::{PipelineEvent, PipelineState};
use crate::utils::error::{ApiError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub final_state: PipelineState,
    pub history: Vec<PipelineState>,
    pub image: Option<String>,
    pub failure: Option<String>,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl PipelineReport {
    pub fn succeeded(&self) -> bool {
        self.final_state == PipelineState::ImageReady
    }
}

pub struct PipelineRunner<B: ImageBuilder> {
    builder: B,
    config: PipelineConfig,
}

struct Tracker {
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl Tracker {
    fn new() -> Self {
        Self {
            state: PipelineState::SourceReady,
            history: vec![PipelineState::SourceReady],
        }
    }

    fn advance(&mut self, event: PipelineEvent) -> Result<()> {
        let next = self.state.transition(event)?;
        tracing::info!("🔁 {} → {}", self.state, next);
        self.state = next;
        self.history.push(next);
        Ok(())
    }
}

impl<B: ImageBuilder> PipelineRunner<B> {
    pub fn new(builder: B, config: PipelineConfig) -> Self {
        Self { builder, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Verifies the source tree and manifest, then walks builder → package.
    ///
    /// Defects found before building (incomplete source tree, unsound
    /// manifest) are returned as errors. Stage failures end the run in a
    /// terminal failed state and are reported in the [`PipelineReport`].
    pub async fn run(&self, context_dir: &Path) -> Result<PipelineReport> {
        let started_at = Utc::now();
        let clock = Instant::now();

        let request = self.preflight(context_dir)?;
        let mut tracker = Tracker::new();

        tracing::info!(
            "🔨 Building {} (toolchain {})",
            self.config.artifact_name,
            self.config.rust_version
        );
        tracker.advance(PipelineEvent::BuildStarted)?;
        if let Err(e) = self.builder.build_artifact(&request).await {
            tracker.advance(PipelineEvent::BuildFailed)?;
            return Ok(self.failed(tracker, e, started_at, clock));
        }
        tracker.advance(PipelineEvent::BuildSucceeded)?;

        tracing::info!(
            "📦 Packaging {} into {}",
            self.config.artifact_name,
            self.config.runtime_image
        );
        tracker.advance(PipelineEvent::PackagingStarted)?;
        let image = match self.builder.package_image(&request).await {
            Ok(image) => image,
            Err(e) => {
                tracker.advance(PipelineEvent::PackagingFailed)?;
                return Ok(self.failed(tracker, e, started_at, clock));
            }
        };
        tracker.advance(PipelineEvent::PackagingSucceeded)?;

        tracing::info!("✅ Image {} ready in {:?}", image, clock.elapsed());
        Ok(PipelineReport {
            final_state: tracker.state,
            history: tracker.history,
            image: Some(image),
            failure: None,
            started_at,
            elapsed: clock.elapsed(),
        })
    }

    fn preflight(&self, context_dir: &Path) -> Result<BuildRequest> {
        let root = context_dir.display().to_string();

        if !context_dir.join("Cargo.toml").is_file() {
            return Err(ApiError::SourceTreeError {
                root,
                missing: "Cargo.toml".to_string(),
            });
        }

        if self.config.locked && !context_dir.join("Cargo.lock").is_file() {
            return Err(ApiError::SourceTreeError {
                root,
                missing: "Cargo.lock".to_string(),
            });
        }

        let dockerfile = self.config.dockerfile_path(context_dir);
        if !dockerfile.is_file() {
            return Err(ApiError::SourceTreeError {
                root,
                missing: self.config.dockerfile.clone(),
            });
        }

        let manifest = Manifest::from_file(&dockerfile)?;
        let findings = check(&manifest, &self.config);
        for finding in &findings {
            tracing::error!("❌ {}", finding);
        }
        ensure_sound(&findings)?;

        Ok(BuildRequest {
            context_dir: context_dir.to_path_buf(),
            dockerfile,
            build_args: self.config.build_args(),
            builder_target: BUILDER_STAGE.to_string(),
            image_tag: self.config.image_tag.clone(),
        })
    }

    fn failed(
        &self,
        tracker: Tracker,
        error: ApiError,
        started_at: DateTime<Utc>,
        clock: Instant,
    ) -> PipelineReport {
        tracing::error!("❌ Pipeline ended in {}: {}", tracker.state, error);
        tracing::error!("💡 Recovery suggestion: {}", error.recovery_suggestion());

        PipelineReport {
            final_state: tracker.state,
            history: tracker.history,
            image: None,
            failure: Some(error.to_string()),
            started_at,
            elapsed: clock.elapsed(),
        }
    }
}
