use anyhow::Context;
use clap::{Parser, Subcommand};
use excel_ai_api::pipeline::{
    check, DockerCli, DockerfileGenerator, Manifest, PipelineConfig, PipelineRunner,
};
use excel_ai_api::utils::{logger, validation::Validate};
use excel_ai_api::ApiError;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pipeline")]
#[command(about = "Render, check and run the two-stage container build")]
struct Args {
    /// Pipeline parameters; defaults apply when the file is absent
    #[arg(short, long, default_value = "pipeline.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the manifest, or write it with --output
    Render {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check an existing manifest against the configuration
    Check {
        /// Defaults to the manifest named in the pipeline configuration
        #[arg(short, long)]
        dockerfile: Option<PathBuf>,
    },
    /// Build the artifact, then package the runtime image
    Build {
        /// Build context: the complete source tree
        #[arg(long, default_value = ".")]
        context: PathBuf,

        /// Container CLI to invoke
        #[arg(long, default_value = "docker")]
        docker: String,
    },
}

fn load_config(path: &Path) -> Result<PipelineConfig, ApiError> {
    let config = if path.is_file() {
        tracing::info!("📁 Loading pipeline configuration from: {}", path.display());
        PipelineConfig::from_file(path)?
    } else {
        tracing::info!("No {} found, using defaults", path.display());
        PipelineConfig::default()
    };
    config.validate()?;
    Ok(config)
}

fn fail(e: &ApiError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code().max(1));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let config = load_config(&args.config).unwrap_or_else(|e| fail(&e));

    match args.command {
        Commands::Render { output } => {
            let rendered = DockerfileGenerator::new(&config).render();
            match output {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("✅ Wrote {}", path.display());
                }
                None => print!("{}", rendered),
            }
        }
        Commands::Check { dockerfile } => {
            let dockerfile =
                dockerfile.unwrap_or_else(|| config.dockerfile_path(Path::new(".")));
            let manifest = Manifest::from_file(&dockerfile).unwrap_or_else(|e| fail(&e));
            let findings = check(&manifest, &config);
            if findings.is_empty() {
                println!("✅ {} is sound", dockerfile.display());
            } else {
                for finding in &findings {
                    eprintln!("❌ {}", finding);
                }
                std::process::exit(1);
            }
        }
        Commands::Build { context, docker } => {
            let runner = PipelineRunner::new(DockerCli::new(docker), config);
            let report = runner.run(&context).await.unwrap_or_else(|e| fail(&e));

            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.succeeded() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
