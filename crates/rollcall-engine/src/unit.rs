//! Migration units and their forward actions.

use crate::error::ActionError;
use async_trait::async_trait;
use rollcall_core::{compute_checksum, UnitName};
use rollcall_db::Database;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// The one-way change a unit performs.
///
/// Actions are atomic-or-failed from the engine's point of view: the engine
/// awaits `apply` to completion and never interrupts it.
#[async_trait]
pub trait ForwardAction: Send + Sync {
    async fn apply(&self, db: &dyn Database) -> Result<(), ActionError>;
}

/// Forward action that executes a batch of SQL statements.
#[derive(Debug, Clone)]
pub struct SqlAction {
    sql: String,
}

impl SqlAction {
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

#[async_trait]
impl ForwardAction for SqlAction {
    async fn apply(&self, db: &dyn Database) -> Result<(), ActionError> {
        db.execute_batch(&self.sql).await?;
        Ok(())
    }
}

/// Where a unit was defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOrigin {
    /// Registered in code at startup
    Registered,
    /// Loaded from a file in the migrations directory
    File(PathBuf),
}

impl fmt::Display for UnitOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitOrigin::Registered => write!(f, "registered"),
            UnitOrigin::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A named, ordered, one-way change script.
#[derive(Clone)]
pub struct MigrationUnit {
    name: UnitName,
    action: Arc<dyn ForwardAction>,
    checksum: Option<String>,
    origin: UnitOrigin,
}

impl fmt::Debug for MigrationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationUnit")
            .field("name", &self.name)
            .field("checksum", &self.checksum)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl MigrationUnit {
    /// A unit backed by an arbitrary forward action, with no checksum.
    pub fn new(name: UnitName, action: Arc<dyn ForwardAction>) -> Self {
        Self {
            name,
            action,
            checksum: None,
            origin: UnitOrigin::Registered,
        }
    }

    /// A SQL unit; the checksum covers the SQL text.
    pub fn sql(name: UnitName, sql: impl Into<String>, origin: UnitOrigin) -> Self {
        let sql = sql.into();
        Self {
            name,
            checksum: Some(compute_checksum(&sql)),
            action: Arc::new(SqlAction::new(sql)),
            origin,
        }
    }

    pub fn name(&self) -> &UnitName {
        &self.name
    }

    pub fn action(&self) -> &dyn ForwardAction {
        self.action.as_ref()
    }

    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    pub fn origin(&self) -> &UnitOrigin {
        &self.origin
    }
}
