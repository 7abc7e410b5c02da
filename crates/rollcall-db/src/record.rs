//! Rows held by the record store.

use chrono::{DateTime, Utc};
use rollcall_core::UnitName;
use serde::Serialize;

/// Durable proof that a unit's forward action completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedRecord {
    /// Name of the applied unit
    pub name: UnitName,
    /// When the record was written
    pub applied_at: DateTime<Utc>,
    /// Checksum of the unit body at apply time, if the unit has one
    pub checksum: Option<String>,
}

/// Current holder of the advisory run lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockInfo {
    pub holder: String,
    pub acquired_at: DateTime<Utc>,
}

/// Outcome of a non-blocking lock acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockAttempt {
    Acquired,
    Held(LockInfo),
}
