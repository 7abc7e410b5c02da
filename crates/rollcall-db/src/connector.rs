//! Scoped store sessions.
//!
//! A [`Connector`] opens one [`StoreHandle`] per engine operation; the handle
//! is closed on every exit path of that operation.

use crate::duckdb::DuckDbBackend;
use crate::error::DbResult;
use crate::traits::{Database, RecordStore};
use async_trait::async_trait;
use rollcall_core::DatabaseConfig;
use std::sync::Arc;

/// An open session: the record store and the target database forward actions
/// run against. For DuckDB both are the same connection.
pub struct StoreHandle {
    records: Arc<dyn RecordStore>,
    target: Arc<dyn Database>,
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("target", &self.target.db_type())
            .finish_non_exhaustive()
    }
}

impl StoreHandle {
    pub fn new(records: Arc<dyn RecordStore>, target: Arc<dyn Database>) -> Self {
        Self { records, target }
    }

    /// Build a handle where one backend serves as both store and target
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: RecordStore + Database + 'static,
    {
        Self {
            records: backend.clone(),
            target: backend,
        }
    }

    pub fn records(&self) -> &dyn RecordStore {
        self.records.as_ref()
    }

    pub fn target(&self) -> &dyn Database {
        self.target.as_ref()
    }

    /// Close the session's connection
    pub async fn close(self) -> DbResult<()> {
        self.records.close().await
    }
}

/// Opens store sessions
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a new session
    async fn connect(&self) -> DbResult<StoreHandle>;

    /// Human-readable connection target for progress output
    fn describe(&self) -> String;
}

/// Connector for a DuckDB file (or `:memory:`)
#[derive(Debug, Clone)]
pub struct DuckDbConnector {
    config: DatabaseConfig,
}

impl DuckDbConnector {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for DuckDbConnector {
    async fn connect(&self) -> DbResult<StoreHandle> {
        log::debug!("Opening DuckDB database at {}", self.config.path);
        let backend = DuckDbBackend::new(&self.config.path)?.with_schema(&self.config.schema);
        Ok(StoreHandle::from_backend(Arc::new(backend)))
    }

    fn describe(&self) -> String {
        format!("duckdb:{}", self.config.path)
    }
}
