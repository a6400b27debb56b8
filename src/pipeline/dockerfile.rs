use crate::pipeline::config::{PipelineConfig, BUILDER_STAGE, VERSION_ARG};
use std::fmt::Write;

/// Renders the two-stage manifest for a [`PipelineConfig`].
pub struct DockerfileGenerator<'a> {
    config: &'a PipelineConfig,
}

impl<'a> DockerfileGenerator<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("# Generated by `pipeline render`. Edit pipeline.toml, not this file.\n");
        self.render_builder(&mut out);
        out.push('\n');
        self.render_runtime(&mut out);
        out
    }

    fn render_builder(&self, out: &mut String) {
        let c = self.config;
        let locked = if c.locked { " --locked" } else { "" };

        // Writing into a String cannot fail.
        let _ = writeln!(out, "ARG {}={}", VERSION_ARG, c.rust_version);
        out.push('\n');
        let _ = writeln!(
            out,
            "FROM {}:${{{}}} AS {}",
            c.builder_image, VERSION_ARG, BUILDER_STAGE
        );
        let _ = writeln!(out, "WORKDIR {}", c.builder_workdir);
        out.push_str("COPY . .\n");
        let _ = writeln!(
            out,
            "RUN cargo build --release{} --bin {}",
            locked, c.artifact_name
        );
    }

    fn render_runtime(&self, out: &mut String) {
        let c = self.config;
        let entry = serde_json::to_string(&c.entry_command()).unwrap_or_default();

        let _ = writeln!(out, "FROM {}", c.runtime_image);
        let _ = writeln!(out, "WORKDIR {}", c.workdir);
        let _ = writeln!(
            out,
            "COPY --from={} {} ./{}",
            BUILDER_STAGE,
            c.artifact_build_path(),
            c.artifact_name
        );
        let _ = writeln!(out, "CMD {}", entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_default_manifest() {
        let config = PipelineConfig::default();
        let rendered = DockerfileGenerator::new(&config).render();

        let expected = "\
# Generated by `pipeline render`. Edit pipeline.toml, not this file.
ARG RUST_VERSION=1.82

FROM rust:${RUST_VERSION} AS builder
WORKDIR /usr/src/excel_ai_api
COPY . .
RUN cargo build --release --locked --bin excel_ai_api

FROM debian:bookworm-slim
WORKDIR /app
COPY --from=builder /usr/src/excel_ai_api/target/release/excel_ai_api ./excel_ai_api
CMD [\"./excel_ai_api\"]
";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_version_appears_once() {
        let config = PipelineConfig {
            rust_version: "1.79.0".to_string(),
            ..Default::default()
        };
        let rendered = DockerfileGenerator::new(&config).render();

        assert_eq!(rendered.matches("1.79.0").count(), 1);
        assert!(rendered.contains("FROM rust:${RUST_VERSION} AS builder"));
    }

    #[test]
    fn test_unlocked_build_and_entry_args() {
        let config = PipelineConfig {
            locked: false,
            entry_args: vec!["--json-logs".to_string()],
            ..Default::default()
        };
        let rendered = DockerfileGenerator::new(&config).render();

        assert!(rendered.contains("RUN cargo build --release --bin excel_ai_api"));
        assert!(rendered.contains("CMD [\"./excel_ai_api\",\"--json-logs\"]"));
    }
}
