use crate::utils::error::{ApiError, Result};
use serde::Serialize;
use std::fmt;

/// Lifecycle of one pipeline run. Runs never loop back; a new run starts at `SourceReady`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    SourceReady,
    Building,
    BuildFailed,
    ArtifactReady,
    Packaging,
    PackageFailed,
    ImageReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEvent {
    BuildStarted,
    BuildSucceeded,
    BuildFailed,
    PackagingStarted,
    PackagingSucceeded,
    PackagingFailed,
}

impl PipelineState {
    pub fn transition(self, event: PipelineEvent) -> Result<PipelineState> {
        use PipelineEvent as E;
        use PipelineState as S;

        match (self, event) {
            (S::SourceReady, E::BuildStarted) => Ok(S::Building),
            (S::Building, E::BuildSucceeded) => Ok(S::ArtifactReady),
            (S::Building, E::BuildFailed) => Ok(S::BuildFailed),
            (S::ArtifactReady, E::PackagingStarted) => Ok(S::Packaging),
            (S::Packaging, E::PackagingSucceeded) => Ok(S::ImageReady),
            (S::Packaging, E::PackagingFailed) => Ok(S::PackageFailed),
            (from, event) => Err(ApiError::InvalidTransition {
                from: from.to_string(),
                event: format!("{:?}", event),
            }),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineState::BuildFailed | PipelineState::PackageFailed | PipelineState::ImageReady
        )
    }

    pub fn is_failure(self) -> bool {
        matches!(self, PipelineState::BuildFailed | PipelineState::PackageFailed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::SourceReady => "SOURCE_READY",
            PipelineState::Building => "BUILDING",
            PipelineState::BuildFailed => "BUILD_FAILED",
            PipelineState::ArtifactReady => "ARTIFACT_READY",
            PipelineState::Packaging => "PACKAGING",
            PipelineState::PackageFailed => "PACKAGE_FAILED",
            PipelineState::ImageReady => "IMAGE_READY",
        };
        f.write_str(name)
    }
}
