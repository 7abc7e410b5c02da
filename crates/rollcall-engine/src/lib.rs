//! rollcall-engine - the migration engine
//!
//! Discovers migration units, works out which have no applied record, and
//! applies those in ascending name order, writing one record per unit as soon
//! as its forward action succeeds. A second run with no new units does
//! nothing.
//!
//! ```no_run
//! # async fn deploy() -> rollcall_engine::MigrateResult<()> {
//! use rollcall_engine::{run_migrations, Project};
//! use std::path::Path;
//!
//! let project = Project::load(Path::new("."), None, None, None)?;
//! let report = run_migrations(&project).await?;
//! println!("applied {} units", report.applied.len());
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod engine;
pub mod error;
pub mod events;
pub mod project;
pub mod registry;
pub mod source;
pub mod status;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod unit;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use engine::{Migrator, RunReport};
pub use error::{ActionError, MigrateError, MigrateResult};
pub use events::{LogObserver, RunEvent, RunObserver};
pub use project::{run_migrations, Project};
pub use registry::Registry;
pub use status::{StatusReport, UnitState, UnitStatus};
pub use unit::{ForwardAction, MigrationUnit, SqlAction, UnitOrigin};
