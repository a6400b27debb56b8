use crate::domain::ports::{BuildRequest, ImageBuilder};
use crate::utils::error::{ApiError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// [`ImageBuilder`] backed by the `docker` command line.
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: Vec<String>) -> Result<()> {
        let command = format!("{} {}", self.program, args.join(" "));
        tracing::info!("$ {}", command);

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child.stdout.take().map(|out| tokio::spawn(forward_lines(out)));
        let stderr = child.stderr.take().map(|err| tokio::spawn(forward_lines(err)));

        let status = child.wait().await?;
        for task in [stdout, stderr].into_iter().flatten() {
            let _ = task.await;
        }

        if status.success() {
            Ok(())
        } else {
            Err(ApiError::CommandFailed {
                command,
                code: status.code().unwrap_or(-1),
            })
        }
    }
}

async fn forward_lines<R: AsyncRead + Unpin>(reader: R) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim_end_matches('\r');
        if !line.is_empty() {
            tracing::info!("  │ {}", line);
        }
    }
}

/// Arguments for `docker build`; `target` stops after that stage.
pub fn build_command(request: &BuildRequest, target: Option<&str>) -> Vec<String> {
    let mut args = vec!["build".to_string()];
    for (name, value) in &request.build_args {
        args.push("--build-arg".to_string());
        args.push(format!("{}={}", name, value));
    }
    match target {
        Some(target) => {
            args.push("--target".to_string());
            args.push(target.to_string());
        }
        None => {
            args.push("--tag".to_string());
            args.push(request.image_tag.clone());
        }
    }
    args.push("--file".to_string());
    args.push(request.dockerfile.display().to_string());
    args.push(request.context_dir.display().to_string());
    args
}

#[async_trait]
impl ImageBuilder for DockerCli {
    async fn build_artifact(&self, request: &BuildRequest) -> Result<()> {
        self.run(build_command(request, Some(&request.builder_target)))
            .await
    }

    async fn package_image(&self, request: &BuildRequest) -> Result<String> {
        // The builder stage is served from the layer cache filled above.
        self.run(build_command(request, None)).await?;
        Ok(request.image_tag.clone())
    }
}
