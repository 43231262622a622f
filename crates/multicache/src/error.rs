//! Cache-related error types

use thiserror::Error;

/// Cache operation errors
///
/// `InvalidBackend`, `InvalidScope` and `Schema` are parameter-validation
/// failures returned to the caller; `Config` is returned when a facade cannot
/// be assembled. `Serialization` and `Storage` are raised
/// while persisting a bucket and are handed to the write error callback
/// instead of being returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("[{method}]: type should be one of: {accepted}, your value is: {value}")]
    InvalidBackend {
        method: &'static str,
        value: String,
        accepted: String,
    },

    #[error("Invalid scope: {message}")]
    InvalidScope { message: String },

    #[error("Schema error: {message}")]
    Schema { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl CacheError {
    /// Create an invalid backend error
    pub fn invalid_backend(
        method: &'static str,
        value: impl Into<String>,
        accepted: &[&str],
    ) -> Self {
        CacheError::InvalidBackend {
            method,
            value: value.into(),
            accepted: accepted.join(", "),
        }
    }

    /// Create an invalid scope error
    pub fn invalid_scope(message: impl Into<String>) -> Self {
        CacheError::InvalidScope {
            message: message.into(),
        }
    }

    /// Create a schema error
    pub fn schema(message: impl Into<String>) -> Self {
        CacheError::Schema {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        CacheError::Config {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        CacheError::Serialization {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        CacheError::Storage {
            message: message.into(),
        }
    }

    /// Whether this error is routed to the write callback rather than returned
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            CacheError::Serialization { .. } | CacheError::Storage { .. }
        )
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::serialization(err.to_string())
    }
}

/// Re-export commonly used Result type
pub type Result<T> = std::result::Result<T, CacheError>;
