//! Storage-specific error type wrapping sqlx errors.

use smarthome_domain::error::{NotFoundError, SmartHomeError};

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to serialize a value into a JSON column.
    #[error("JSON serialization error")]
    Json(#[from] serde_json::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for SmartHomeError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}

/// Turn an `UPDATE`/`DELETE` that touched no row into a not-found error.
pub(crate) fn expect_row(
    result: &sqlx::sqlite::SqliteQueryResult,
    entity: &'static str,
    id: impl ToString,
) -> Result<(), SmartHomeError> {
    if result.rows_affected() == 0 {
        return Err(NotFoundError {
            entity,
            id: id.to_string(),
        }
        .into());
    }
    Ok(())
}
