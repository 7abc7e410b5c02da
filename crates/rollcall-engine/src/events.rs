//! Progress events emitted during a run.

use rollcall_core::UnitName;
use std::time::Duration;

/// One step of a run, in the order the engine emits them.
#[derive(Debug)]
pub enum RunEvent<'a> {
    /// The pending set has been computed and the lock is held
    Started { target: &'a str, pending: usize },
    /// A unit's forward action is about to run
    UnitStarted {
        name: &'a UnitName,
        index: usize,
        total: usize,
    },
    /// A unit's forward action succeeded and its record was written
    UnitApplied { name: &'a UnitName, elapsed: Duration },
    /// A unit failed; the run stops here
    UnitFailed { name: &'a UnitName, reason: String },
    /// Every pending unit was applied
    Finished { applied: usize, elapsed: Duration },
}

/// Receives progress events.
pub trait RunObserver: Send + Sync {
    fn on_event(&self, event: &RunEvent<'_>);
}

/// Observer that writes progress through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl RunObserver for LogObserver {
    fn on_event(&self, event: &RunEvent<'_>) {
        match event {
            RunEvent::Started { target, pending } => {
                log::info!("{pending} pending migration unit(s) for {target}");
            }
            RunEvent::UnitStarted { name, index, total } => {
                log::info!("[{}/{}] applying {}", index + 1, total, name);
            }
            RunEvent::UnitApplied { name, elapsed } => {
                log::info!("applied {} in {}ms", name, elapsed.as_millis());
            }
            RunEvent::UnitFailed { name, reason } => {
                log::error!("migration unit {} failed: {}", name, reason);
            }
            RunEvent::Finished { applied, elapsed } => {
                log::info!(
                    "migrations complete: {} applied in {}ms",
                    applied,
                    elapsed.as_millis()
                );
            }
        }
    }
}
