//! DuckDB backend: target database and record store on one connection

use crate::error::{DbError, DbResult};
use crate::record::{AppliedRecord, LockAttempt, LockInfo};
use crate::traits::{Database, RecordStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckdb::{params, Connection, OptionalExt};
use rollcall_core::config::MEMORY_DB_PATH;
use rollcall_core::sql_utils::{qualified_table, quote_ident};
use rollcall_core::UnitName;
use std::path::Path;
use std::sync::Mutex;

const RECORD_TABLE: &str = "applied_records";
const LOCK_TABLE: &str = "run_lock";

/// The lock table holds at most this single row.
const LOCK_ROW_ID: i32 = 1;

/// DuckDB database backend
///
/// The connection sits behind a `Mutex<Option<_>>` so that [`RecordStore::close`]
/// can drop it while other handles to the backend still exist.
pub struct DuckDbBackend {
    conn: Mutex<Option<Connection>>,
    schema: String,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path).map_err(|e| open_error(path, e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == MEMORY_DB_PATH {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
            schema: "rollcall".to_string(),
        }
    }

    /// Use `schema` for the bookkeeping tables instead of `rollcall`
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Schema holding the bookkeeping tables
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Whether [`RecordStore::close`] has been called
    pub fn is_closed(&self) -> bool {
        match self.conn.lock() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> DbResult<T>) -> DbResult<T> {
        let guard = self
            .conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        let conn = guard.as_ref().ok_or(DbError::Closed)?;
        f(conn)
    }

    fn record_table(&self) -> String {
        qualified_table(&self.schema, RECORD_TABLE)
    }

    fn lock_table(&self) -> String {
        qualified_table(&self.schema, LOCK_TABLE)
    }

    /// Execute SQL synchronously
    fn execute_sync(&self, sql: &str) -> DbResult<usize> {
        self.with_conn(|conn| {
            let result = conn
                .execute(sql, [])
                .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)));
            leave_autocommit_clean(conn, result)
        })
    }

    /// Execute batch SQL synchronously
    fn execute_batch_sync(&self, sql: &str) -> DbResult<()> {
        self.with_conn(|conn| {
            let result = conn
                .execute_batch(sql)
                .map_err(|e| DbError::ExecutionError(e.to_string()));
            leave_autocommit_clean(conn, result)
        })
    }

    /// Query count synchronously
    fn query_count_sync(&self, sql: &str) -> DbResult<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM ({})", sql), [], |row| {
                    row.get(0)
                })
                .map_err(|e| DbError::ExecutionError(e.to_string()))?;
            Ok(count as usize)
        })
    }

    /// Check if relation exists synchronously
    fn relation_exists_sync(&self, name: &str) -> DbResult<bool> {
        // Handle schema-qualified names
        let (schema, table) = match name.rfind('.') {
            Some(pos) => (&name[..pos], &name[pos + 1..]),
            None => ("main", name),
        };

        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_schema = ? AND table_name = ?",
                params![schema, table],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    fn read_lock(&self, conn: &Connection) -> DbResult<Option<LockInfo>> {
        let row: Option<(String, i64)> = conn
            .query_row(
                &format!(
                    "SELECT holder, epoch_us(acquired_at) FROM {} WHERE id = ?",
                    self.lock_table()
                ),
                params![LOCK_ROW_ID],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        row.map(|(holder, micros)| {
            Ok(LockInfo {
                holder,
                acquired_at: timestamp_from_micros(micros)?,
            })
        })
        .transpose()
    }
}

/// DuckDB takes an exclusive file lock per process, so a second run against
/// the same file fails here rather than at the run lock.
fn open_error(path: &Path, message: String) -> DbError {
    if message.contains("Could not set lock on file") || message.contains("Conflicting lock") {
        DbError::Busy {
            path: path.display().to_string(),
            message,
        }
    } else {
        DbError::ConnectionError(format!("{message}: {}", path.display()))
    }
}

/// Roll back any transaction the caller's SQL left open.
///
/// The bookkeeping writes share this connection and must run in autocommit
/// mode, so an explicit `BEGIN` that failed part-way or was never committed
/// cannot outlive the statement that opened it. `ROLLBACK` errors when no
/// transaction is active, which is the normal case.
fn leave_autocommit_clean<T>(conn: &Connection, result: DbResult<T>) -> DbResult<T> {
    let rolled_back = conn.execute_batch("ROLLBACK").is_ok();
    match result {
        Err(e) => {
            if rolled_back {
                log::debug!("Rolled back transaction left open by failed SQL");
            }
            Err(e)
        }
        Ok(_) if rolled_back => Err(DbError::ExecutionError(
            "SQL left a transaction open; its uncommitted changes were rolled back".to_string(),
        )),
        Ok(value) => Ok(value),
    }
}

fn timestamp_from_micros(micros: i64) -> DbResult<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| DbError::Internal(format!("timestamp out of range: {micros}us")))
}

#[async_trait]
impl Database for DuckDbBackend {
    async fn execute(&self, sql: &str) -> DbResult<usize> {
        self.execute_sync(sql)
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.execute_batch_sync(sql)
    }

    async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        self.relation_exists_sync(name)
    }

    async fn query_count(&self, sql: &str) -> DbResult<usize> {
        self.query_count_sync(sql)
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[async_trait]
impl RecordStore for DuckDbBackend {
    async fn ensure_schema(&self) -> DbResult<()> {
        let ddl = format!(
            "CREATE SCHEMA IF NOT EXISTS {schema};
             CREATE TABLE IF NOT EXISTS {records} (
                 name       VARCHAR PRIMARY KEY,
                 checksum   VARCHAR,
                 applied_at TIMESTAMPTZ NOT NULL DEFAULT current_timestamp
             );
             CREATE TABLE IF NOT EXISTS {lock} (
                 id          INTEGER PRIMARY KEY,
                 holder      VARCHAR NOT NULL,
                 acquired_at TIMESTAMPTZ NOT NULL DEFAULT current_timestamp
             );",
            schema = quote_ident(&self.schema),
            records = self.record_table(),
            lock = self.lock_table(),
        );
        self.with_conn(|conn| {
            conn.execute_batch(&ddl).map_err(|e| {
                DbError::ExecutionError(format!("failed to create bookkeeping tables: {e}"))
            })
        })
    }

    async fn list_records(&self) -> DbResult<Vec<AppliedRecord>> {
        let sql = format!(
            "SELECT name, checksum, epoch_us(applied_at) FROM {} ORDER BY name",
            self.record_table()
        );
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?;

            let mut records = Vec::new();
            for row in rows {
                let (name, checksum, micros) = row?;
                let name = UnitName::try_new(name)
                    .ok_or_else(|| DbError::Internal("applied record with empty name".into()))?;
                records.push(AppliedRecord {
                    name,
                    applied_at: timestamp_from_micros(micros)?,
                    checksum,
                });
            }
            Ok(records)
        })
    }

    async fn insert_record(
        &self,
        name: &UnitName,
        checksum: Option<&str>,
    ) -> DbResult<AppliedRecord> {
        let table = self.record_table();
        self.with_conn(|conn| {
            conn.execute(
                &format!("INSERT INTO {table} (name, checksum) VALUES (?, ?)"),
                params![name.as_str(), checksum],
            )?;
            let micros: i64 = conn.query_row(
                &format!("SELECT epoch_us(applied_at) FROM {table} WHERE name = ?"),
                params![name.as_str()],
                |row| row.get(0),
            )?;
            Ok(AppliedRecord {
                name: name.clone(),
                applied_at: timestamp_from_micros(micros)?,
                checksum: checksum.map(String::from),
            })
        })
    }

    async fn try_acquire_lock(&self, holder: &str) -> DbResult<LockAttempt> {
        let sql = format!("INSERT INTO {} (id, holder) VALUES (?, ?)", self.lock_table());
        self.with_conn(|conn| match conn.execute(&sql, params![LOCK_ROW_ID, holder]) {
            Ok(_) => Ok(LockAttempt::Acquired),
            Err(e) => match DbError::from(e) {
                DbError::DuplicateKey(_) => match self.read_lock(conn)? {
                    Some(info) => Ok(LockAttempt::Held(info)),
                    None => Err(DbError::Internal(
                        "run lock reported as held but no holder row exists".into(),
                    )),
                },
                other => Err(other),
            },
        })
    }

    async fn current_lock(&self) -> DbResult<Option<LockInfo>> {
        self.with_conn(|conn| self.read_lock(conn))
    }

    async fn release_lock(&self, holder: &str) -> DbResult<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE id = ? AND holder = ?",
            self.lock_table()
        );
        self.with_conn(|conn| Ok(conn.execute(&sql, params![LOCK_ROW_ID, holder])? > 0))
    }

    async fn force_release_lock(&self) -> DbResult<Option<LockInfo>> {
        let sql = format!("DELETE FROM {} WHERE id = ?", self.lock_table());
        self.with_conn(|conn| {
            let previous = self.read_lock(conn)?;
            conn.execute(&sql, params![LOCK_ROW_ID])?;
            Ok(previous)
        })
    }

    async fn close(&self) -> DbResult<()> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        match guard.take() {
            Some(conn) => {
                log::debug!("Closing DuckDB connection");
                conn.close()
                    .map_err(|(_, e)| DbError::ConnectionError(format!("close failed: {e}")))
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
