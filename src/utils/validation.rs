use crate::utils::error::{ApiError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(ApiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(ApiError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(ApiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_absolute_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(ApiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(ApiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    if !path.starts_with('/') {
        return Err(ApiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path must be absolute inside the image".to_string(),
        });
    }

    Ok(())
}

pub fn validate_file_name(field_name: &str, name: &str) -> Result<()> {
    validate_non_empty_string(field_name, name)?;
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(ApiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: name.to_string(),
            reason: "Must be a bare file name without path separators".to_string(),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(ApiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// Rejects image references that float: no tag, or the `latest` tag.
pub fn validate_pinned_image(field_name: &str, image: &str) -> Result<()> {
    validate_non_empty_string(field_name, image)?;

    // A registry port ("host:5000/name") is not a tag, so only look past the last '/'.
    let name = image.rsplit('/').next().unwrap_or(image);
    let name = name.split('@').next().unwrap_or(name);
    let tag = if image.contains('@') {
        Some("digest")
    } else {
        name.split_once(':').map(|(_, tag)| tag)
    };

    match tag {
        None | Some("") => Err(ApiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: image.to_string(),
            reason: "Base image must carry an explicit tag".to_string(),
        }),
        Some("latest") => Err(ApiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: image.to_string(),
            reason: "The `latest` tag is not a pinned version".to_string(),
        }),
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("groq.api_url", "https://example.com").is_ok());
        assert!(validate_url("groq.api_url", "http://example.com").is_ok());
        assert!(validate_url("groq.api_url", "").is_err());
        assert!(validate_url("groq.api_url", "invalid-url").is_err());
        assert!(validate_url("groq.api_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_absolute_path() {
        assert!(validate_absolute_path("workdir", "/app").is_ok());
        assert!(validate_absolute_path("workdir", "app").is_err());
        assert!(validate_absolute_path("workdir", "").is_err());
    }

    #[test]
    fn test_validate_file_name() {
        assert!(validate_file_name("artifact_name", "excel_ai_api").is_ok());
        assert!(validate_file_name("artifact_name", "bin/excel_ai_api").is_err());
        assert!(validate_file_name("artifact_name", "  ").is_err());
    }

    #[test]
    fn test_validate_pinned_image() {
        assert!(validate_pinned_image("runtime_image", "debian:bookworm-slim").is_ok());
        assert!(validate_pinned_image("runtime_image", "registry:5000/debian:12").is_ok());
        assert!(validate_pinned_image("runtime_image", "debian@sha256:abcd").is_ok());
        assert!(validate_pinned_image("runtime_image", "debian").is_err());
        assert!(validate_pinned_image("runtime_image", "registry:5000/debian").is_err());
        assert!(validate_pinned_image("runtime_image", "debian:latest").is_err());
    }
}
