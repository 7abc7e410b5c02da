//! Store trait definitions

use crate::error::DbResult;
use crate::record::{AppliedRecord, LockAttempt, LockInfo};
use async_trait::async_trait;
use rollcall_core::UnitName;

/// Target database that forward actions run against
///
/// Implementations must be Send + Sync for async operation.
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute SQL that modifies data, returns affected rows
    async fn execute(&self, sql: &str) -> DbResult<usize>;

    /// Execute multiple SQL statements
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Check if a table or view exists
    async fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Execute query returning its row count
    async fn query_count(&self, sql: &str) -> DbResult<usize>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}

/// Durable store of applied records plus the advisory run lock
///
/// Records are keyed uniquely by unit name; inserting a name twice fails with
/// [`DbError::DuplicateKey`](crate::DbError::DuplicateKey).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create the bookkeeping schema and tables if they do not exist
    async fn ensure_schema(&self) -> DbResult<()>;

    /// All applied records, ordered by name
    async fn list_records(&self) -> DbResult<Vec<AppliedRecord>>;

    /// Insert one record, failing if the name already has one
    async fn insert_record(
        &self,
        name: &UnitName,
        checksum: Option<&str>,
    ) -> DbResult<AppliedRecord>;

    /// Try to take the run lock without blocking
    async fn try_acquire_lock(&self, holder: &str) -> DbResult<LockAttempt>;

    /// Current lock holder, if any
    async fn current_lock(&self) -> DbResult<Option<LockInfo>>;

    /// Release the lock if `holder` owns it; returns whether a row was removed
    async fn release_lock(&self, holder: &str) -> DbResult<bool>;

    /// Remove the lock regardless of holder, returning the previous holder
    async fn force_release_lock(&self) -> DbResult<Option<LockInfo>>;

    /// Close the underlying connection; later calls fail with `Closed`
    async fn close(&self) -> DbResult<()>;
}
