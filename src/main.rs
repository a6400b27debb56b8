use clap::Parser;
use excel_ai_api::utils::{logger, validation::Validate};
use excel_ai_api::{server, ServeArgs, ServiceConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is the normal case inside the container.
    let _ = dotenvy::dotenv();

    let args = ServeArgs::parse();
    logger::init_logger(args.verbose, args.json_logs);

    tracing::info!("Starting excel_ai_api v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match ServiceConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Failed to load configuration: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.exit_code().max(1));
        }
    };
    args.apply_overrides(&mut config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if args.verbose {
        tracing::debug!(
            "Upstream {} (text: {}, vision: {})",
            config.groq.api_url,
            config.groq.text_model,
            config.groq.vision_model
        );
    }

    if let Err(e) = server::serve(config).await {
        tracing::error!(
            "❌ Server failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code().max(1));
    }

    Ok(())
}
