use crate::config::ServiceConfig;
use clap::Parser;
use std::path::PathBuf;

/// Flags of the service binary. All optional: the container starts it bare.
#[derive(Debug, Clone, Parser)]
#[command(name = "excel_ai_api")]
#[command(about = "Chat and vision API backed by Groq")]
pub struct ServeArgs {
    /// Optional TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the bind host
    #[arg(long)]
    pub host: Option<String>,

    /// Override the bind port
    #[arg(short, long)]
    pub port: Option<u16>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

impl ServeArgs {
    pub fn apply_overrides(&self, config: &mut ServiceConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_is_valid() {
        let args = ServeArgs::try_parse_from(["excel_ai_api"]).unwrap();
        assert!(args.config.is_none());

        let mut config = ServiceConfig::default();
        args.apply_overrides(&mut config);
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn test_flags_override_config() {
        let args =
            ServeArgs::try_parse_from(["excel_ai_api", "--host", "127.0.0.1", "-p", "8081"])
                .unwrap();

        let mut config = ServiceConfig::default();
        args.apply_overrides(&mut config);
        assert_eq!(config.bind_address(), "127.0.0.1:8081");
    }
}
