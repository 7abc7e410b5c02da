//! Error types for the migration engine

use chrono::{DateTime, Utc};
use rollcall_core::{CoreError, UnitName};
use rollcall_db::DbError;
use thiserror::Error;

/// Errors raised by a forward action
#[derive(Error, Debug)]
pub enum ActionError {
    /// The target database rejected a statement
    #[error(transparent)]
    Database(#[from] DbError),

    /// Any other failure reported by the action
    #[error("{0}")]
    Failed(String),
}

/// Migration engine errors
#[derive(Error, Debug)]
pub enum MigrateError {
    /// The record store could not be opened or queried (R001)
    #[error("[R001] Record store unavailable: {0}")]
    StoreUnavailable(#[source] DbError),

    /// Another run holds the advisory lock (R002)
    #[error(
        "[R002] Migration lock is held by run '{holder}' since {acquired_at}. \
         If that run is no longer alive, clear the lock with `rollcall unlock`"
    )]
    LockHeld {
        holder: String,
        acquired_at: DateTime<Utc>,
    },

    /// A unit's forward action failed (R003)
    #[error("[R003] Migration unit '{name}' failed: {cause}")]
    UnitExecutionFailed {
        name: UnitName,
        #[source]
        cause: ActionError,
    },

    /// A unit was applied but its record could not be written (R004)
    #[error("[R004] Migration unit '{name}' was applied but its record was not written: {cause}")]
    RecordWriteFailed {
        name: UnitName,
        #[source]
        cause: DbError,
    },

    /// Two units share a name (R005)
    #[error("[R005] Duplicate migration unit name: {name}")]
    DuplicateUnit { name: UnitName },

    /// The migration directory or project config could not be loaded (R006)
    #[error("[R006] Failed to load migration source: {0}")]
    Source(#[from] CoreError),

    /// A cancel signal was observed between units (R007)
    #[error("[R007] Run cancelled before unit '{next}'")]
    Cancelled { next: UnitName },
}

impl MigrateError {
    /// Name of the unit the error is about, if any
    pub fn unit_name(&self) -> Option<&UnitName> {
        match self {
            MigrateError::UnitExecutionFailed { name, .. }
            | MigrateError::RecordWriteFailed { name, .. }
            | MigrateError::DuplicateUnit { name }
            | MigrateError::Cancelled { next: name } => Some(name),
            _ => None,
        }
    }
}

/// Result type alias for MigrateError
pub type MigrateResult<T> = Result<T, MigrateError>;
