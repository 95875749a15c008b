//! # Storage Errors
//!
//! What the repositories and the stock ledger can fail with.
//!
//! ```text
//! sqlx::Error ──► DbError ──┬──► CommitError (adds the saga stage)
//!                           └──► ApiError    (serialized for the UI)
//! ```

use thiserror::Error;

/// Failure of a storage call, classified so callers can tell a rule the
/// store enforced from a store that could not be reached.
#[derive(Debug, Error)]
pub enum DbError {
    /// No row with that id.
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: String,
        id: String,
    },

    /// Duplicate invoice number, or two items at one position.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation {
        field: String,
        value: String,
    },

    /// An item names a missing product or variant, or a ledger entry a
    /// missing invoice.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation {
        message: String,
    },

    /// A guarded decrement found fewer units on hand than requested.
    ///
    /// Nothing was written; the counter still holds `available`.
    #[error("Insufficient stock for {target}: available {available}, requested {requested}")]
    InsufficientStock {
        target: String,
        available: i64,
        requested: i64,
    },

    /// A write would break a ledger rule (e.g. settle past the grand total).
    /// The transaction was rolled back.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Input rejected before touching the database.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A call did not finish within its bound.
    #[error("{operation} timed out")]
    Timeout {
        operation: String,
    },

    /// The database file could not be opened or the pool is closed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// SQLite rejected the statement for a reason not classified above.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Stored payload could not be (de)serialized.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Every pooled connection stayed busy past `connect_timeout`.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        DbError::Timeout {
            operation: operation.into(),
        }
    }

    /// True when the store could not be reached at all, as opposed to a
    /// rule the store enforced.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DbError::ConnectionFailed(_) | DbError::PoolExhausted | DbError::Timeout { .. }
        )
    }
}

/// Constraint failures are recognised from SQLite's message text; pool and
/// I/O failures count as unavailability.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite reports constraints as
                //   "UNIQUE constraint failed: <table>.<column>"
                //   "FOREIGN KEY constraint failed"
                if let Some(field) = msg.split("UNIQUE constraint failed: ").nth(1) {
                    DbError::duplicate(field, "unknown")
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::Io(io) => DbError::ConnectionFailed(io.to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
