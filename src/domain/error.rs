use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize)]
pub enum AppError {
    Internal(String),
    NotFound(String),
    ValidationError(String),
    /// Required header columns absent from an uploaded table.
    MissingColumns {
        missing: Vec<String>,
        expected: Vec<String>,
    },
    ParseError(String),
    /// Request body larger than the configured upload limit.
    PayloadTooLarge(String),
    DatabaseError(String),
    IoError(String),
    ConfigError(String),
    HttpError(String),
}

impl AppError {
    pub fn missing_columns(missing: &[&str], expected: &[&str]) -> Self {
        AppError::MissingColumns {
            missing: missing.iter().map(|c| c.to_string()).collect(),
            expected: expected.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Input-level failures the caller can fix by sending a different file.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::ValidationError(_)
                | AppError::MissingColumns { .. }
                | AppError::ParseError(_)
                | AppError::PayloadTooLarge(_)
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::MissingColumns { missing, expected } => write!(
                f,
                "Validation error: Missing columns: [{}]. Expected: [{}]",
                missing.join(", "),
                expected.join(", ")
            ),
            AppError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AppError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            AppError::HttpError(msg) => write!(f, "HTTP error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
