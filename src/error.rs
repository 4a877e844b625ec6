use serde::Serialize;
use thiserror::Error;

use crate::validation::ValidationError;

/// Custom error types for the sequential thinking tool
#[derive(Error, Debug)]
pub enum ThinkingError {
    #[error("Schema error: {field} - {reason}")]
    Schema { field: String, reason: String },

    #[error("Consistency error: {field} - {reason}")]
    Consistency { field: String, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Config source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Caller-facing classification of a rejected submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Schema,
    Consistency,
}

impl ThinkingError {
    /// Schema and consistency errors are the caller's to fix; everything else is a defect.
    pub fn rejection_kind(&self) -> Option<ErrorKind> {
        match self {
            ThinkingError::Schema { .. } => Some(ErrorKind::Schema),
            ThinkingError::Consistency { .. } => Some(ErrorKind::Consistency),
            _ => None,
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            ThinkingError::Schema { field, .. } | ThinkingError::Consistency { field, .. } => {
                Some(field)
            }
            _ => None,
        }
    }

    pub fn reason(&self) -> String {
        match self {
            ThinkingError::Schema { reason, .. } | ThinkingError::Consistency { reason, .. } => {
                reason.clone()
            }
            other => other.to_string(),
        }
    }
}

/// Convert ValidationError to ThinkingError
impl From<ValidationError> for ThinkingError {
    fn from(err: ValidationError) -> Self {
        let field = err.field().to_string();
        let reason = err.to_string();
        if err.is_consistency() {
            ThinkingError::Consistency { field, reason }
        } else {
            ThinkingError::Schema { field, reason }
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ThinkingError>;
