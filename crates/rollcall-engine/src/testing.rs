//! Test doubles for exercising the engine without a real database.
//!
//! Enabled for this crate's own tests and, through the `test-support`
//! feature, for integration tests.

use crate::error::ActionError;
use crate::unit::ForwardAction;
use async_trait::async_trait;
use chrono::Utc;
use rollcall_core::UnitName;
use rollcall_db::{
    AppliedRecord, Connector, Database, DbError, DbResult, LockAttempt, LockInfo, RecordStore,
    StoreHandle,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared, ordered log of forward actions that ran.
pub type ActionLog = Arc<Mutex<Vec<String>>>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Forward action that appends its label to an [`ActionLog`].
pub struct RecordingAction {
    label: String,
    log: ActionLog,
}

impl RecordingAction {
    /// Create an action with its own fresh log.
    pub fn new(label: impl Into<String>) -> (Self, ActionLog) {
        let log = ActionLog::default();
        (Self::with_log(label, &log), log)
    }

    /// Create an action that appends to an existing log.
    pub fn with_log(label: impl Into<String>, log: &ActionLog) -> Self {
        Self {
            label: label.into(),
            log: Arc::clone(log),
        }
    }
}

#[async_trait]
impl ForwardAction for RecordingAction {
    async fn apply(&self, _db: &dyn Database) -> Result<(), ActionError> {
        lock(&self.log).push(self.label.clone());
        Ok(())
    }
}

/// Forward action that always fails.
pub struct FailingAction {
    message: String,
}

impl FailingAction {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl ForwardAction for FailingAction {
    async fn apply(&self, _db: &dyn Database) -> Result<(), ActionError> {
        Err(ActionError::Failed(self.message.clone()))
    }
}

#[derive(Default)]
struct MemoryState {
    records: BTreeMap<UnitName, AppliedRecord>,
    lock: Option<LockInfo>,
    batches: Vec<String>,
}

#[derive(Default)]
struct Faults {
    ensure_schema: bool,
    list_records: bool,
    insert_for: Option<String>,
}

/// In-memory record store and target database with failure injection.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    faults: Faults,
    closes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate applied records.
    pub fn with_records(self, names: &[&str]) -> Self {
        {
            let mut state = lock(&self.state);
            for name in names {
                let name = UnitName::new(*name);
                state.records.insert(
                    name.clone(),
                    AppliedRecord {
                        name,
                        applied_at: Utc::now(),
                        checksum: None,
                    },
                );
            }
        }
        self
    }

    /// Pre-populate the run lock as held by `holder`.
    pub fn with_lock_held_by(self, holder: &str) -> Self {
        lock(&self.state).lock = Some(LockInfo {
            holder: holder.to_string(),
            acquired_at: Utc::now(),
        });
        self
    }

    /// Make `ensure_schema` fail.
    pub fn failing_ensure_schema(mut self) -> Self {
        self.faults.ensure_schema = true;
        self
    }

    /// Make `list_records` fail.
    pub fn failing_list_records(mut self) -> Self {
        self.faults.list_records = true;
        self
    }

    /// Make `insert_record` fail for `name`.
    pub fn failing_insert_for(mut self, name: &str) -> Self {
        self.faults.insert_for = Some(name.to_string());
        self
    }

    /// Names with a record, in order.
    pub fn record_names(&self) -> Vec<String> {
        lock(&self.state)
            .records
            .keys()
            .map(|n| n.to_string())
            .collect()
    }

    /// SQL batches executed against the target, in order.
    pub fn executed_batches(&self) -> Vec<String> {
        lock(&self.state).batches.clone()
    }

    pub fn lock_holder(&self) -> Option<String> {
        lock(&self.state).lock.as_ref().map(|l| l.holder.clone())
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn ensure_schema(&self) -> DbResult<()> {
        if self.faults.ensure_schema {
            return Err(DbError::ConnectionError("injected: schema unavailable".into()));
        }
        Ok(())
    }

    async fn list_records(&self) -> DbResult<Vec<AppliedRecord>> {
        if self.faults.list_records {
            return Err(DbError::ExecutionError("injected: query failed".into()));
        }
        Ok(lock(&self.state).records.values().cloned().collect())
    }

    async fn insert_record(
        &self,
        name: &UnitName,
        checksum: Option<&str>,
    ) -> DbResult<AppliedRecord> {
        if self.faults.insert_for.as_deref() == Some(name.as_str()) {
            return Err(DbError::ExecutionError("injected: insert failed".into()));
        }
        let mut state = lock(&self.state);
        if state.records.contains_key(name) {
            return Err(DbError::DuplicateKey(name.to_string()));
        }
        let record = AppliedRecord {
            name: name.clone(),
            applied_at: Utc::now(),
            checksum: checksum.map(String::from),
        };
        state.records.insert(name.clone(), record.clone());
        Ok(record)
    }

    async fn try_acquire_lock(&self, holder: &str) -> DbResult<LockAttempt> {
        let mut state = lock(&self.state);
        match &state.lock {
            Some(info) => Ok(LockAttempt::Held(info.clone())),
            None => {
                state.lock = Some(LockInfo {
                    holder: holder.to_string(),
                    acquired_at: Utc::now(),
                });
                Ok(LockAttempt::Acquired)
            }
        }
    }

    async fn current_lock(&self) -> DbResult<Option<LockInfo>> {
        Ok(lock(&self.state).lock.clone())
    }

    async fn release_lock(&self, holder: &str) -> DbResult<bool> {
        let mut state = lock(&self.state);
        if state.lock.as_ref().is_some_and(|l| l.holder == holder) {
            state.lock = None;
            return Ok(true);
        }
        Ok(false)
    }

    async fn force_release_lock(&self) -> DbResult<Option<LockInfo>> {
        Ok(lock(&self.state).lock.take())
    }

    async fn close(&self) -> DbResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Database for MemoryStore {
    async fn execute(&self, sql: &str) -> DbResult<usize> {
        lock(&self.state).batches.push(sql.to_string());
        Ok(0)
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        lock(&self.state).batches.push(sql.to_string());
        Ok(())
    }

    async fn relation_exists(&self, _name: &str) -> DbResult<bool> {
        Ok(false)
    }

    async fn query_count(&self, _sql: &str) -> DbResult<usize> {
        Ok(0)
    }

    fn db_type(&self) -> &'static str {
        "memory"
    }
}

/// Connector handing out sessions on a shared [`MemoryStore`].
pub struct FakeConnector {
    store: Arc<MemoryStore>,
    unreachable: bool,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            unreachable: false,
            connects: AtomicUsize::new(0),
        }
    }

    /// A connector whose `connect` always fails.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::new(Arc::new(MemoryStore::new()))
        }
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Sessions opened and not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.connect_count() - self.store.close_count()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self) -> DbResult<StoreHandle> {
        if self.unreachable {
            return Err(DbError::ConnectionError("injected: store unreachable".into()));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(StoreHandle::from_backend(Arc::clone(&self.store)))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
