use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("API key not found")]
    MissingApiKey,

    #[error("{message}")]
    InvalidInput { message: String },

    #[error("Groq API failed: {0}")]
    UpstreamTransport(#[from] reqwest::Error),

    #[error("Groq API returned an error: {status} - {body}")]
    UpstreamStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("No choices found in API response")]
    EmptyCompletion,

    #[error("Failed to parse API response")]
    MalformedCompletion,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Manifest check failed: {message}")]
    ManifestError { message: String },

    #[error("Source tree is incomplete: {missing} not found in {root}")]
    SourceTreeError { root: String, missing: String },

    #[error("Command `{command}` exited with status {code}")]
    CommandFailed { command: String, code: i32 },

    #[error("Illegal pipeline transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Client,
    Upstream,
    Configuration,
    System,
    Pipeline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ApiError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ApiError::InvalidInput { .. } => ErrorCategory::Client,
            ApiError::UpstreamTransport(_)
            | ApiError::UpstreamStatus { .. }
            | ApiError::EmptyCompletion
            | ApiError::MalformedCompletion => ErrorCategory::Upstream,
            ApiError::MissingApiKey
            | ApiError::ConfigError { .. }
            | ApiError::MissingConfigError { .. }
            | ApiError::InvalidConfigValueError { .. }
            | ApiError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            ApiError::IoError(_) | ApiError::SerializationError(_) => ErrorCategory::System,
            ApiError::ManifestError { .. }
            | ApiError::SourceTreeError { .. }
            | ApiError::CommandFailed { .. }
            | ApiError::InvalidTransition { .. } => ErrorCategory::Pipeline,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ApiError::InvalidInput { .. } => ErrorSeverity::Low,
            ApiError::UpstreamTransport(_)
            | ApiError::UpstreamStatus { .. }
            | ApiError::EmptyCompletion
            | ApiError::MalformedCompletion => ErrorSeverity::Medium,
            ApiError::MissingApiKey
            | ApiError::ConfigError { .. }
            | ApiError::MissingConfigError { .. }
            | ApiError::InvalidConfigValueError { .. }
            | ApiError::ConfigValidationError { .. }
            | ApiError::ManifestError { .. }
            | ApiError::SourceTreeError { .. }
            | ApiError::CommandFailed { .. } => ErrorSeverity::High,
            ApiError::IoError(_)
            | ApiError::SerializationError(_)
            | ApiError::InvalidTransition { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            ApiError::MissingApiKey => {
                "Set GROQ_API_KEY in the environment or in a .env file".to_string()
            }
            ApiError::InvalidInput { .. } => {
                "Send either `message` (optionally with an image) or `messages`".to_string()
            }
            ApiError::UpstreamTransport(_) => {
                "Check network connectivity and the configured Groq API URL".to_string()
            }
            ApiError::UpstreamStatus { status, .. } if status.as_u16() == 401 => {
                "Verify that the Groq API key is valid".to_string()
            }
            ApiError::UpstreamStatus { status, .. } if status.as_u16() == 429 => {
                "The upstream rate limit was hit; retry later".to_string()
            }
            ApiError::UpstreamStatus { .. }
            | ApiError::EmptyCompletion
            | ApiError::MalformedCompletion => {
                "Check the upstream service status and the configured model names".to_string()
            }
            ApiError::IoError(_) => "Check file paths and permissions".to_string(),
            ApiError::SerializationError(_) => "Check the JSON payload format".to_string(),
            ApiError::ConfigError { .. }
            | ApiError::MissingConfigError { .. }
            | ApiError::InvalidConfigValueError { .. }
            | ApiError::ConfigValidationError { .. } => {
                "Review the configuration file, environment variables and flags".to_string()
            }
            ApiError::ManifestError { .. } => {
                "Regenerate the Dockerfile with `pipeline render`".to_string()
            }
            ApiError::SourceTreeError { .. } => {
                "Run the build from the repository root so the whole source tree is sent".to_string()
            }
            ApiError::CommandFailed { .. } => {
                "Inspect the toolchain output above; the build does not retry".to_string()
            }
            ApiError::InvalidTransition { .. } => "Start a fresh pipeline run".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Client => format!("Invalid request: {}", self),
            ErrorCategory::Upstream => format!("Upstream model API problem: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
            ErrorCategory::Pipeline => format!("Build pipeline aborted: {}", self),
        }
    }

    /// Process exit code used by the binaries.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_status_message_includes_status_and_body() {
        let err = ApiError::UpstreamStatus {
            status: reqwest::StatusCode::TOO_MANY_REQUESTS,
            body: "slow down".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Groq API returned an error: 429 Too Many Requests - slow down"
        );
        assert_eq!(err.category(), ErrorCategory::Upstream);
        assert!(err.recovery_suggestion().contains("rate limit"));
    }

    #[test]
    fn test_pipeline_errors_exit_non_zero() {
        let err = ApiError::CommandFailed {
            command: "docker build".to_string(),
            code: 101,
        };
        assert_eq!(err.category(), ErrorCategory::Pipeline);
        assert_ne!(err.exit_code(), 0);
        assert!(err.user_friendly_message().starts_with("Build pipeline aborted"));
    }
}
