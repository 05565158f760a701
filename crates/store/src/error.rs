use domain::ErrorKind;
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A row changed or vanished under a concurrent transaction, or the
    /// database aborted the transaction over lock contention.
    #[error("Concurrent update conflict: {0}")]
    Conflict(String),

    /// A uniqueness constraint was violated.
    #[error("Duplicate {entity}: {key}")]
    Duplicate { entity: &'static str, key: String },

    /// Stored data could not be mapped back into the domain.
    #[error("Corrupt {entity} record {id}: {reason}")]
    Corrupt {
        entity: &'static str,
        id: String,
        reason: String,
    },

    /// The store refused the write.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Conflict(_) | StoreError::Duplicate { .. } => ErrorKind::Conflict,
            _ => ErrorKind::Internal,
        }
    }
}

/// SQLSTATE codes for deadlock and serialization failure. The transaction
/// was rolled back and may be retried.
const LOCK_CONFLICT_CODES: [&str; 2] = ["40P01", "40001"];

fn is_lock_conflict(code: &str) -> bool {
    LOCK_CONFLICT_CODES.contains(&code)
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && let Some(code) = db_err.code()
            && is_lock_conflict(&code)
        {
            tracing::warn!(code = %code, "transaction aborted by lock contention");
            return StoreError::Conflict(format!(
                "transaction aborted ({code}): {}",
                db_err.message()
            ));
        }
        StoreError::Database(e)
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadlock_and_serialization_failures_are_conflicts() {
        assert!(is_lock_conflict("40P01"));
        assert!(is_lock_conflict("40001"));
        assert!(!is_lock_conflict("23505"));
        assert!(!is_lock_conflict("40P0"));
    }

    #[test]
    fn other_database_errors_stay_internal() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(_)));
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(StoreError::Conflict("x".into()).kind(), ErrorKind::Conflict);
    }
}
