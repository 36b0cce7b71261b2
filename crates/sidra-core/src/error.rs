use thiserror::Error;

/// Core error types for Sidra domain operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Export failed for format {format}: {message}")]
    ExportFailed { format: String, message: String },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Timestamp formatting error: {0}")]
    TimeError(#[from] time::error::Format),
}

impl CoreError {
    /// Create a new UnsupportedFormat error
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat(format.into())
    }

    /// Create a new InvalidParameter error
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    /// Create a new ExportFailed error
    pub fn export_failed(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExportFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Check if this error is a client error (4xx category)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat(_) | Self::InvalidParameter(_)
        )
    }

    /// Check if this error is a server error (5xx category)
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnsupportedFormat(_) => ErrorCategory::Format,
            Self::InvalidParameter(_) => ErrorCategory::Validation,
            Self::ExportFailed { .. } => ErrorCategory::Export,
            Self::JsonError(_) => ErrorCategory::Serialization,
            Self::TimeError(_) => ErrorCategory::System,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Format,
    Export,
    Serialization,
    System,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Format => write!(f, "format"),
            Self::Export => write!(f, "export"),
            Self::Serialization => write!(f, "serialization"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_format_error() {
        let err = CoreError::unsupported_format("docx");
        assert_eq!(err.to_string(), "Unsupported export format: docx");
        assert!(err.is_client_error());
        assert!(!err.is_server_error());
        assert_eq!(err.category(), ErrorCategory::Format);
    }

    #[test]
    fn test_invalid_parameter_error() {
        let err = CoreError::invalid_parameter("termo must have at least 3 characters");
        assert!(err.is_client_error());
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_export_failed_error() {
        let err = CoreError::export_failed("pdf", "writer refused");
        assert_eq!(
            err.to_string(),
            "Export failed for format pdf: writer refused"
        );
        assert!(err.is_server_error());
        assert_eq!(err.category(), ErrorCategory::Export);
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err: serde_json::Error =
            serde_json::from_str::<serde_json::Value>("{ invalid }").unwrap_err();
        let core_err: CoreError = json_err.into();

        assert!(matches!(core_err, CoreError::JsonError(_)));
        assert!(core_err.is_server_error());
        assert_eq!(core_err.category(), ErrorCategory::Serialization);
    }

    #[test]
    fn test_error_categories_display() {
        assert_eq!(ErrorCategory::Validation.to_string(), "validation");
        assert_eq!(ErrorCategory::Format.to_string(), "format");
        assert_eq!(ErrorCategory::Export.to_string(), "export");
        assert_eq!(ErrorCategory::Serialization.to_string(), "serialization");
        assert_eq!(ErrorCategory::System.to_string(), "system");
    }

    #[test]
    fn test_client_vs_server_classification_is_exclusive() {
        let client_err = CoreError::unsupported_format("xml");
        assert!(client_err.is_client_error());
        assert!(!client_err.is_server_error());

        let server_err = CoreError::export_failed("xlsx", "boom");
        assert!(server_err.is_server_error());
        assert!(!server_err.is_client_error());
    }
}
