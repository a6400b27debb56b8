//! Two-stage container build for the service binary.
//!
//! ```text
//! SOURCE_READY ─▶ BUILDING ─┬─▶ BUILD_FAILED
//!                           └─▶ ARTIFACT_READY ─▶ PACKAGING ─┬─▶ PACKAGE_FAILED
//!                                                            └─▶ IMAGE_READY
//! ```
//!
//! The manifest is generated from [`PipelineConfig`] so the toolchain version
//! lives in exactly one build argument, and it is checked statically before
//! any build starts.

pub mod config;
pub mod docker;
pub mod dockerfile;
pub mod manifest;
pub mod runner;
pub mod state;

pub use config::PipelineConfig;
pub use docker::DockerCli;
pub use dockerfile::DockerfileGenerator;
pub use manifest::{check, Finding, Manifest};
pub use runner::{PipelineReport, PipelineRunner};
pub use state::{PipelineEvent, PipelineState};
