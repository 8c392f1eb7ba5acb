use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the persistence boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A row update was rejected because its version token was stale.
    /// The caller should reload and retry.
    #[error("row version conflict updating {entity} {id}")]
    ConcurrencyConflict { entity: &'static str, id: Uuid },

    /// A write targeted a row that does not exist.
    #[error("{entity} {id} not found")]
    RowNotFound { entity: &'static str, id: Uuid },

    /// An insert collided with an existing row.
    #[error("{entity} {id} already exists")]
    AlreadyExists { entity: &'static str, id: Uuid },

    /// The store reported a lock-wait timeout, deadlock, or serialization
    /// failure. The enclosing operation was rolled back and may be retried.
    #[error("transient store failure: {0}")]
    Transient(sqlx::Error),

    /// Any other database error.
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A persisted row could not be decoded into its record type.
    #[error("corrupt row: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        // SQLSTATE 40001 = serialization_failure, 40P01 = deadlock_detected,
        // 55P03 = lock_not_available.
        if let sqlx::Error::Database(db) = &e
            && matches!(db.code().as_deref(), Some("40001" | "40P01" | "55P03"))
        {
            return StoreError::Transient(e);
        }
        StoreError::Database(e)
    }
}

impl StoreError {
    /// Returns true if the failed operation may be retried against fresh
    /// state.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Transient(_) | StoreError::ConcurrencyConflict { .. }
        )
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
