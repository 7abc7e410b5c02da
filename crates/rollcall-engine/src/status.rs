//! Per-unit applied/pending state.

use crate::registry::Registry;
use chrono::{DateTime, Utc};
use rollcall_core::UnitName;
use rollcall_db::{AppliedRecord, LockInfo};
use serde::Serialize;
use std::collections::BTreeMap;

/// Whether a unit has an applied record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitState {
    Pending,
    Applied,
}

impl std::fmt::Display for UnitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitState::Pending => write!(f, "pending"),
            UnitState::Applied => write!(f, "applied"),
        }
    }
}

/// State of one known unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitStatus {
    pub name: UnitName,
    pub state: UnitState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
    /// The unit's SQL changed after it was applied
    pub checksum_drift: bool,
}

/// Snapshot of the registry against the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Every known unit, in execution order
    pub units: Vec<UnitStatus>,
    /// Records whose unit is no longer known
    pub orphaned: Vec<AppliedRecord>,
    /// Current holder of the run lock
    pub lock: Option<LockInfo>,
}

impl StatusReport {
    pub fn build(registry: &Registry, records: Vec<AppliedRecord>, lock: Option<LockInfo>) -> Self {
        let mut records: BTreeMap<UnitName, AppliedRecord> =
            records.into_iter().map(|r| (r.name.clone(), r)).collect();

        let units = registry
            .units()
            .map(|unit| match records.remove(unit.name()) {
                Some(record) => {
                    let checksum_drift = matches!(
                        (unit.checksum(), record.checksum.as_deref()),
                        (Some(current), Some(applied)) if current != applied
                    );
                    if checksum_drift {
                        log::warn!("Applied unit {} has changed since it ran", unit.name());
                    }
                    UnitStatus {
                        name: unit.name().clone(),
                        state: UnitState::Applied,
                        applied_at: Some(record.applied_at),
                        checksum_drift,
                    }
                }
                None => UnitStatus {
                    name: unit.name().clone(),
                    state: UnitState::Pending,
                    applied_at: None,
                    checksum_drift: false,
                },
            })
            .collect();

        Self {
            units,
            orphaned: records.into_values().collect(),
            lock,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.count(UnitState::Pending)
    }

    pub fn applied_count(&self) -> usize {
        self.count(UnitState::Applied)
    }

    fn count(&self, state: UnitState) -> usize {
        self.units.iter().filter(|u| u.state == state).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, checksum: Option<&str>) -> AppliedRecord {
        AppliedRecord {
            name: UnitName::new(name),
            applied_at: Utc::now(),
            checksum: checksum.map(String::from),
        }
    }

    #[test]
    fn test_states_drift_and_orphans() {
        let mut registry = Registry::new();
        registry
            .register_sql(UnitName::new("001_schools"), "CREATE TABLE schools (id INTEGER)")
            .unwrap();
        registry
            .register_sql(UnitName::new("002_students"), "CREATE TABLE students (id INTEGER)")
            .unwrap();
        registry
            .register_sql(UnitName::new("003_staff"), "CREATE TABLE staff (id INTEGER)")
            .unwrap();

        let schools_checksum = registry.get("001_schools").unwrap().checksum().unwrap();
        let records = vec![
            record("001_schools", Some(schools_checksum)),
            record("002_students", Some("stale")),
            record("000_legacy", None),
        ];

        let report = StatusReport::build(&registry, records, None);
        assert_eq!(report.applied_count(), 2);
        assert_eq!(report.pending_count(), 1);

        assert_eq!(report.units[0].state, UnitState::Applied);
        assert!(!report.units[0].checksum_drift);
        assert!(report.units[1].checksum_drift);
        assert_eq!(report.units[2].state, UnitState::Pending);
        assert!(report.units[2].applied_at.is_none());

        assert_eq!(report.orphaned.len(), 1);
        assert_eq!(report.orphaned[0].name, "000_legacy");
    }

    #[test]
    fn test_record_without_checksum_never_drifts() {
        let mut registry = Registry::new();
        registry
            .register_sql(UnitName::new("001_schools"), "SELECT 1")
            .unwrap();
        let report = StatusReport::build(&registry, vec![record("001_schools", None)], None);
        assert!(!report.units[0].checksum_drift);
    }

    #[test]
    fn test_serializes_state_lowercase() {
        let mut registry = Registry::new();
        registry
            .register_sql(UnitName::new("001_schools"), "SELECT 1")
            .unwrap();
        let report = StatusReport::build(&registry, Vec::new(), None);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["units"][0]["state"], "pending");
        assert_eq!(json["units"][0]["name"], "001_schools");
        assert!(json["units"][0].get("applied_at").is_none());
    }
}
