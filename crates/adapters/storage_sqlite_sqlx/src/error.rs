//! Storage-specific error type wrapping sqlx errors.

use safelabs_domain::error::SafeLabsError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// A stored JSON value could not be encoded or decoded.
    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A node holds a value of the wrong shape.
    #[error("unexpected value at {path}: {found}")]
    UnexpectedValue { path: String, found: String },
}

impl From<StorageError> for SafeLabsError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
