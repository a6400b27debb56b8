use crate::domain::ports::ModelSettings;
use crate::utils::error::{ApiError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_range, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 10000;
pub const GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_TEXT_MODEL: &str = "deepseek-r1-distill-llama-70b";
pub const DEFAULT_VISION_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";

/// Runtime configuration of the HTTP service.
///
/// Every field has a default, so the binary starts with no file, no
/// environment and no arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub groq: GroqConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroqConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub text_model: String,
    pub vision_model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            api_url: GROQ_URL.to_string(),
            api_key: None,
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            temperature: 0.5,
            max_tokens: 1024,
            timeout_seconds: 30,
        }
    }
}

impl ServiceConfig {
    /// Defaults, then the optional TOML file, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ApiError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ApiError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Overlays `HOST`, `PORT` and the `GROQ_*` variables found through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = parse_env("PORT", &port)?;
        }
        if let Some(key) = lookup("GROQ_API_KEY") {
            self.groq.api_key = Some(key);
        }
        if let Some(url) = lookup("GROQ_API_URL") {
            self.groq.api_url = url;
        }
        if let Some(model) = lookup("GROQ_TEXT_MODEL") {
            self.groq.text_model = model;
        }
        if let Some(model) = lookup("GROQ_VISION_MODEL") {
            self.groq.vision_model = model;
        }
        if let Some(timeout) = lookup("GROQ_TIMEOUT_SECONDS") {
            self.groq.timeout_seconds = parse_env("GROQ_TIMEOUT_SECONDS", &timeout)?;
        }
        Ok(())
    }

    /// The API key, ignoring blanks and `${VAR}` placeholders left unresolved.
    pub fn api_key(&self) -> Option<&str> {
        self.groq
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && !key.starts_with("${"))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_env<T: std::str::FromStr>(field: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ApiError::InvalidConfigValueError {
            field: field.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Replaces `${VAR}` with the variable's value; unknown variables stay as written.
pub(crate) fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ApiError::ConfigError {
        message: e.to_string(),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.to_string())
}

impl ModelSettings for ServiceConfig {
    fn text_model(&self) -> &str {
        &self.groq.text_model
    }

    fn vision_model(&self) -> &str {
        &self.groq.vision_model
    }

    fn temperature(&self) -> f64 {
        self.groq.temperature
    }

    fn max_tokens(&self) -> u32 {
        self.groq.max_tokens
    }
}

impl Validate for ServiceConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("server.host", &self.server.host)?;
        validate_url("groq.api_url", &self.groq.api_url)?;
        validate_non_empty_string("groq.text_model", &self.groq.text_model)?;
        validate_non_empty_string("groq.vision_model", &self.groq.vision_model)?;
        validate_range("groq.temperature", self.groq.temperature, 0.0, 2.0)?;
        validate_range("groq.max_tokens", self.groq.max_tokens, 1, 32_768)?;
        validate_range("groq.timeout_seconds", self.groq.timeout_seconds, 1, 600)?;

        if self.api_key().is_none() {
            // Not fatal: /chat answers 500 until a key is provided.
            tracing::warn!("GROQ_API_KEY is not set; /chat requests will fail");
        }
        Ok(())
    }
}
