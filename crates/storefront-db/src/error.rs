//! # Database Error Types
//!
//! Error types for storage and store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error / io::Error / serde_json::Error                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (apps/server) ← Status code + JSON body                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! | Variant            | Meaning                                  | HTTP |
//! |--------------------|------------------------------------------|------|
//! | `NotFound`         | Unknown product, cart or cart line       | 404  |
//! | `Core`             | Validation or cart rule violation        | 400  |
//! | `Persistence`      | Write or read failed, memory untouched   | 500  |
//! | `Timeout`          | Write did not finish in time (retryable) | 500  |

use std::time::Duration;

use storefront_core::{CoreError, ValidationError};
use thiserror::Error;

/// Storage and store errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found.
    ///
    /// ## When This Occurs
    /// - Product id not in the catalog
    /// - Cart id not in the cart collection
    /// - Cart exists but holds no line for the product
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Domain rule rejected the operation (validation, cart limits).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Persisting or loading a collection failed.
    ///
    /// ## When This Occurs
    /// - Disk full, permission denied, rename failed
    /// - Corrupt JSON document on load
    /// - SQLite statement failed
    #[error("Persistence failed: {0}")]
    Persistence(String),

    /// Persisting did not complete within the configured timeout.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// True for unknown products, carts and cart lines.
    pub fn is_not_found(&self) -> bool {
        match self {
            DbError::NotFound { .. } => true,
            DbError::Core(core) => core.is_not_found(),
            _ => false,
        }
    }

    /// True when the caller sent something the domain rules reject.
    pub fn is_validation(&self) -> bool {
        matches!(self, DbError::Core(core) if !core.is_not_found())
    }

    /// True when retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::Timeout { .. } | DbError::ConnectionFailed(_))
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Core(CoreError::Validation(err))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => {
                DbError::ConnectionFailed("Connection pool exhausted".to_string())
            }
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),
            other => DbError::Persistence(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        DbError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Persistence(format!("Invalid document: {}", err))
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(DbError::not_found("Product", 4).is_not_found());
        assert!(DbError::Core(CoreError::CartNotFound("c".into())).is_not_found());

        let validation: DbError = ValidationError::Required {
            field: "title".into(),
        }
        .into();
        assert!(validation.is_validation());
        assert!(!validation.is_retryable());

        let timeout = DbError::Timeout {
            operation: "save products",
            after: Duration::from_millis(5),
        };
        assert!(timeout.is_retryable());
        assert!(!timeout.is_validation());
    }

    #[test]
    fn test_io_error_becomes_persistence() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(DbError::from(io), DbError::Persistence(_)));
    }
}
