use sqlx::error::ErrorKind;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No event record with id {0}")]
    NotFound(Uuid),

    /// The row was rejected by Postgres (null violation, value too long, bad type).
    #[error("Rejected by database: {0}")]
    Validation(#[source] sqlx::Error),

    /// Connectivity, pool or engine failure.
    #[error("Database error: {0}")]
    Storage(#[source] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let rejected = match &err {
            sqlx::Error::Database(db) => match db.kind() {
                ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation
                | ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation => true,
                // SQLSTATE class 22: data exception (string too long, bad json, ...)
                _ => db.code().is_some_and(|code| code.starts_with("22")),
            },
            sqlx::Error::Encode(_) => true,
            _ => false,
        };

        if rejected {
            StoreError::Validation(err)
        } else {
            StoreError::Storage(err)
        }
    }
}
