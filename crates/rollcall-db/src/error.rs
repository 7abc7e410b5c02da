//! Error types for rollcall-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Uniqueness constraint violation (D003)
    #[error("[D003] Duplicate key: {0}")]
    DuplicateKey(String),

    /// Operation on a closed connection (D004)
    #[error("[D004] Database connection is closed")]
    Closed,

    /// Mutex poisoned (D005)
    #[error("[D005] Database mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// Internal error (D006)
    #[error("[D006] Internal database error: {0}")]
    Internal(String),

    /// The database file is locked by another process (D007)
    #[error(
        "[D007] Database '{path}' is locked by another process, \
         another rollcall run is probably in progress: {message}"
    )]
    Busy { path: String, message: String },
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        // duckdb::Error does not expose structured constraint variants, so
        // uniqueness violations are recognised by message.
        let msg = err.to_string();
        if msg.contains("Duplicate key")
            || msg.contains("violates primary key constraint")
            || msg.contains("violates unique constraint")
        {
            DbError::DuplicateKey(msg)
        } else {
            DbError::ExecutionError(msg)
        }
    }
}
