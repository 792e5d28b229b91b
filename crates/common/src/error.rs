//! Error types for tally.

use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // === Server Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Redis error: {0}")]
    Redis(String),

    #[error("Recommender error: {0}")]
    Recommender(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::ItemNotFound(_) => "ITEM_NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Redis(_) => "REDIS_ERROR",
            Self::Recommender(_) => "RECOMMENDER_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether this error originates on the server side and should be
    /// logged at error level.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Redis(_)
                | Self::Recommender(_)
                | Self::Config(_)
                | Self::Internal(_)
        )
    }

    /// Returns whether the caller may retry the whole operation unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_are_not_server_errors() {
        assert!(!AppError::NotFound("vote".to_string()).is_server_error());
        assert!(!AppError::ItemNotFound("i1".to_string()).is_server_error());
        assert!(!AppError::Validation("direction".to_string()).is_server_error());
        assert!(!AppError::Conflict("stale".to_string()).is_server_error());
    }

    #[test]
    fn test_server_errors() {
        assert!(AppError::Database("down".to_string()).is_server_error());
        assert!(AppError::Recommender("timeout".to_string()).is_server_error());
    }

    #[test]
    fn test_only_conflict_is_retryable() {
        assert!(AppError::Conflict("stale".to_string()).is_retryable());
        assert!(!AppError::Database("down".to_string()).is_retryable());
        assert!(!AppError::Validation("bad".to_string()).is_retryable());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::ItemNotFound("x".to_string()).error_code(),
            "ITEM_NOT_FOUND"
        );
        assert_eq!(AppError::Conflict("x".to_string()).error_code(), "CONFLICT");
        assert_eq!(
            AppError::Validation("x".to_string()).error_code(),
            "VALIDATION_ERROR"
        );
    }

    #[test]
    fn test_display_includes_detail() {
        let err = AppError::ItemNotFound("item1".to_string());
        assert_eq!(err.to_string(), "Item not found: item1");
    }
}
