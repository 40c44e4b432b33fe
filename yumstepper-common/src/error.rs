// ================================================================
// File: yumstepper-common/src/error.rs
// ================================================================

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found error: {0}")]
    NotFound(String),

    /// Daily check-in or monthly redemption cap reached. Expected, user-facing.
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Reward grant {0} has already been redeemed")]
    AlreadyRedeemed(Uuid),

    #[error("Reward {0} has expired")]
    Expired(Uuid),

    #[error("Insufficient points: {required} required, {available} available")]
    InsufficientPoints { required: i64, available: i64 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for outcomes a caller should report to the user as-is rather than
    /// treat as a system fault.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_)
                | Error::NotFound(_)
                | Error::QuotaExceeded(_)
                | Error::AlreadyRedeemed(_)
                | Error::Expired(_)
                | Error::InsufficientPoints { .. }
        )
    }

    /// Whether this came out of the store (connection, commit, migration).
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Migration(_))
    }

    /// Postgres `unique_violation` (SQLSTATE 23505).
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Database(e) => e
                .as_database_error()
                .and_then(|db_err| db_err.code())
                .map(|code| code == "23505")
                .unwrap_or(false),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_and_precondition_failures_are_expected() {
        assert!(Error::QuotaExceeded("daily".into()).is_expected());
        assert!(Error::AlreadyRedeemed(Uuid::nil()).is_expected());
        assert!(Error::InsufficientPoints { required: 100, available: 99 }.is_expected());
        assert!(!Error::QuotaExceeded("daily".into()).is_storage_failure());
    }

    #[test]
    fn storage_errors_are_not_expected() {
        let err = Error::Database(sqlx::Error::PoolTimedOut);
        assert!(!err.is_expected());
        assert!(err.is_storage_failure());
        assert!(!err.is_unique_violation());
    }
}
