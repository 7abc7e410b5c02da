//! The migration engine: pending computation and ordered apply.

use crate::cancel::CancelSignal;
use crate::error::{MigrateError, MigrateResult};
use crate::events::{LogObserver, RunEvent, RunObserver};
use crate::registry::Registry;
use crate::status::StatusReport;
use crate::unit::MigrationUnit;
use rollcall_core::UnitName;
use rollcall_db::{AppliedRecord, Connector, LockAttempt, LockInfo, StoreHandle};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Units applied by one successful run, in the order they ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub applied: Vec<UnitName>,
}

impl RunReport {
    /// True when the run found nothing to do
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Applies a [`Registry`] of units to the store a [`Connector`] opens.
///
/// Every operation opens its own store session and closes it before
/// returning, whatever the outcome.
pub struct Migrator {
    registry: Registry,
    connector: Arc<dyn Connector>,
    observer: Arc<dyn RunObserver>,
    cancel: CancelSignal,
}

impl Migrator {
    pub fn new(registry: Registry, connector: Arc<dyn Connector>) -> Self {
        Self {
            registry,
            connector,
            observer: Arc::new(LogObserver),
            cancel: CancelSignal::never(),
        }
    }

    /// Replace the default [`LogObserver`]
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Stop a run at the next unit boundary once `cancel` fires
    pub fn with_cancel_signal(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Human-readable description of the store this migrator targets
    pub fn target(&self) -> String {
        self.connector.describe()
    }

    /// All known unit names in execution order.
    pub fn list_units(&self) -> Vec<&UnitName> {
        self.registry.names()
    }

    /// Units with no applied record, in execution order.
    pub async fn compute_pending(&self) -> MigrateResult<Vec<UnitName>> {
        let handle = self.open_session().await?;
        let result = handle
            .records()
            .list_records()
            .await
            .map_err(MigrateError::StoreUnavailable)
            .map(|records| {
                self.pending_units(&records)
                    .into_iter()
                    .map(|u| u.name().clone())
                    .collect()
            });
        close_session(handle).await;
        result
    }

    /// Apply every pending unit in order, recording each as it succeeds.
    ///
    /// Stops at the first failure; units applied before it keep their
    /// records and nothing is rolled back.
    pub async fn run(&self) -> MigrateResult<RunReport> {
        let started = Instant::now();
        let handle = self.open_session().await?;
        let holder = Uuid::new_v4().to_string();

        let result = match handle.records().try_acquire_lock(&holder).await {
            Ok(LockAttempt::Acquired) => {
                log::debug!("Acquired migration lock as run {holder}");
                let result = self.apply_pending(&handle, started).await;
                match handle.records().release_lock(&holder).await {
                    Ok(true) => log::debug!("Released migration lock for run {holder}"),
                    Ok(false) => {
                        log::warn!("Migration lock for run {holder} was cleared by someone else")
                    }
                    Err(e) => log::warn!("Failed to release migration lock for run {holder}: {e}"),
                }
                result
            }
            Ok(LockAttempt::Held(info)) => Err(MigrateError::LockHeld {
                holder: info.holder,
                acquired_at: info.acquired_at,
            }),
            Err(e) => Err(MigrateError::StoreUnavailable(e)),
        };

        close_session(handle).await;
        result
    }

    /// Applied/pending state of every known unit plus orphaned records.
    pub async fn status(&self) -> MigrateResult<StatusReport> {
        let handle = self.open_session().await?;
        let result = self.read_status(&handle).await;
        close_session(handle).await;
        result
    }

    /// Clear the run lock whoever holds it, returning the previous holder.
    pub async fn unlock(&self) -> MigrateResult<Option<LockInfo>> {
        let handle = self.open_session().await?;
        let result = handle
            .records()
            .force_release_lock()
            .await
            .map_err(MigrateError::StoreUnavailable);
        if let Ok(Some(info)) = &result {
            log::warn!(
                "Force-released migration lock held by run {} since {}",
                info.holder,
                info.acquired_at
            );
        }
        close_session(handle).await;
        result
    }

    async fn open_session(&self) -> MigrateResult<StoreHandle> {
        let handle = self
            .connector
            .connect()
            .await
            .map_err(MigrateError::StoreUnavailable)?;
        if let Err(e) = handle.records().ensure_schema().await {
            close_session(handle).await;
            return Err(MigrateError::StoreUnavailable(e));
        }
        Ok(handle)
    }

    async fn read_status(&self, handle: &StoreHandle) -> MigrateResult<StatusReport> {
        let records = handle
            .records()
            .list_records()
            .await
            .map_err(MigrateError::StoreUnavailable)?;
        let lock = handle
            .records()
            .current_lock()
            .await
            .map_err(MigrateError::StoreUnavailable)?;
        Ok(StatusReport::build(&self.registry, records, lock))
    }

    fn pending_units(&self, records: &[AppliedRecord]) -> Vec<&MigrationUnit> {
        let applied: BTreeSet<&UnitName> = records.iter().map(|r| &r.name).collect();
        self.registry
            .units()
            .filter(|u| !applied.contains(u.name()))
            .collect()
    }

    async fn apply_pending(
        &self,
        handle: &StoreHandle,
        started: Instant,
    ) -> MigrateResult<RunReport> {
        let records = handle
            .records()
            .list_records()
            .await
            .map_err(MigrateError::StoreUnavailable)?;
        let pending = self.pending_units(&records);
        let total = pending.len();
        let target = self.connector.describe();
        self.observer.on_event(&RunEvent::Started {
            target: &target,
            pending: total,
        });

        let mut applied = Vec::with_capacity(total);
        for (index, unit) in pending.into_iter().enumerate() {
            let name = unit.name();
            if self.cancel.is_cancelled() {
                log::warn!("Cancellation requested, stopping before {name}");
                return Err(MigrateError::Cancelled { next: name.clone() });
            }

            self.observer.on_event(&RunEvent::UnitStarted { name, index, total });
            let unit_start = Instant::now();

            if let Err(cause) = unit.action().apply(handle.target()).await {
                self.observer.on_event(&RunEvent::UnitFailed {
                    name,
                    reason: cause.to_string(),
                });
                return Err(MigrateError::UnitExecutionFailed {
                    name: name.clone(),
                    cause,
                });
            }

            if let Err(cause) = handle.records().insert_record(name, unit.checksum()).await {
                log::error!(
                    "unit applied, record not written: '{name}' is NOT idempotent-safe on retry \
                     unless its forward action itself is idempotent"
                );
                self.observer.on_event(&RunEvent::UnitFailed {
                    name,
                    reason: format!("record not written: {cause}"),
                });
                return Err(MigrateError::RecordWriteFailed {
                    name: name.clone(),
                    cause,
                });
            }

            self.observer.on_event(&RunEvent::UnitApplied {
                name,
                elapsed: unit_start.elapsed(),
            });
            applied.push(name.clone());
        }

        self.observer.on_event(&RunEvent::Finished {
            applied: applied.len(),
            elapsed: started.elapsed(),
        });
        Ok(RunReport { applied })
    }
}

async fn close_session(handle: StoreHandle) {
    if let Err(e) = handle.close().await {
        log::warn!("Failed to close store session: {e}");
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
