use serde::Serialize;
use thiserror::Error;

/// Domain-level errors
#[derive(Debug, Error, Clone, Serialize)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The compressor did not settle before the deadline.
    #[error("compress_timeout")]
    CompressTimeout { timeout_ms: u64 },

    #[error("Image error: {0}")]
    Image(String),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("File error: {0}")]
    File(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<image::ImageError> for DomainError {
    fn from(error: image::ImageError) -> Self {
        DomainError::Image(error.to_string())
    }
}

impl From<tokio::task::JoinError> for DomainError {
    fn from(error: tokio::task::JoinError) -> Self {
        DomainError::Internal(format!("Task join error: {}", error))
    }
}

/// Service-level errors (application specific)
#[derive(Debug, Error, Clone, Serialize)]
pub enum ServiceError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ServiceError {
    /// Message recorded on a result when the original file is returned in place
    /// of a failed compression.
    pub fn fallback_message(&self) -> String {
        match self {
            ServiceError::Domain(e) => e.to_string(),
            ServiceError::Configuration(msg) => msg.clone(),
        }
    }
}

/// Validation errors
#[derive(Debug, Error, Clone, Serialize)]
pub enum ValidationError {
    #[error("Validation error: {0}")]
    Custom(String),
}

impl ValidationError {
    pub fn custom(message: &str) -> Self {
        Self::Custom(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_displays_as_bare_code() {
        let err = DomainError::CompressTimeout { timeout_ms: 100 };
        assert_eq!(err.to_string(), "compress_timeout");
        assert_eq!(ServiceError::from(err).fallback_message(), "compress_timeout");
    }

    #[test]
    fn test_compression_error_message() {
        let err = ServiceError::Domain(DomainError::Compression("encoder exploded".to_string()));
        assert_eq!(err.fallback_message(), "Compression error: encoder exploded");
        assert_eq!(err.to_string(), "Domain error: Compression error: encoder exploded");
    }

    #[test]
    fn test_validation_message_is_wrapped_once_per_layer() {
        let err = DomainError::from(ValidationError::custom("bad effective type"));
        assert_eq!(err.to_string(), "Validation error: Validation error: bad effective type");
        assert!(matches!(err, DomainError::Validation(ValidationError::Custom(_))));
    }
}
