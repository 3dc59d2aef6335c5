use serde::Serialize;

/// All application errors, categorized by domain.
///
/// Script generation itself never fails; these cover the host boundary
/// (configuration files, validation, export).
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ── Configuration ──
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid override '{input}': {message}")]
    InvalidOverride { input: String, message: String },

    // ── Files ──
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read file: {0}")]
    FileRead(String),

    #[error("Failed to write file: {0}")]
    FileWrite(String),

    // ── Serialization ──
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Whether the error came from the configuration rather than the filesystem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            AppError::InvalidConfig(_) | AppError::InvalidOverride { .. } | AppError::Serialization(_)
        )
    }
}

/// Serializable error response for a frontend host.
#[derive(Debug, Serialize, Clone)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        let code = match err {
            AppError::InvalidConfig(_) => "INVALID_CONFIG",
            AppError::InvalidOverride { .. } => "INVALID_OVERRIDE",
            AppError::FileNotFound(_) => "FILE_NOT_FOUND",
            AppError::FileRead(_) => "FILE_READ",
            AppError::FileWrite(_) => "FILE_WRITE",
            AppError::Serialization(_) => "SERIALIZATION",
        };
        ErrorResponse {
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let response = ErrorResponse::from(self);
        response.serialize(serializer)
    }
}

// ── Conversions from external errors ──

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileRead(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_codes() {
        let err = AppError::InvalidConfig("lookback out of range".into());
        let response = ErrorResponse::from(&err);
        assert_eq!(response.code, "INVALID_CONFIG");
        assert_eq!(response.message, "Invalid configuration: lookback out of range");

        let err = AppError::FileWrite("disk full".into());
        assert_eq!(ErrorResponse::from(&err).code, "FILE_WRITE");
    }

    #[test]
    fn test_serializes_as_response() {
        let err = AppError::InvalidOverride {
            input: "rsi".into(),
            message: "expected ID=VALUE".into(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "INVALID_OVERRIDE");
        assert_eq!(json["message"], "Invalid override 'rsi': expected ID=VALUE");
    }

    #[test]
    fn test_config_error_classification() {
        assert!(AppError::InvalidConfig("x".into()).is_config_error());
        assert!(AppError::Serialization("x".into()).is_config_error());
        assert!(!AppError::FileRead("x".into()).is_config_error());
    }
}
