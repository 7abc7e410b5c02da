//! The set of known migration units, keyed and ordered by name.

use crate::error::{MigrateError, MigrateResult};
use crate::source::{discover_unit_files, DiscoveryOptions};
use crate::unit::{ForwardAction, MigrationUnit, UnitOrigin};
use rollcall_core::UnitName;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Explicit registry of migration units built at startup.
///
/// Iteration is always in ascending byte-wise name order, which is the only
/// ordering guarantee a run gives.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    units: BTreeMap<UnitName, MigrationUnit>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit, rejecting a name that is already registered.
    pub fn insert(&mut self, unit: MigrationUnit) -> MigrateResult<()> {
        if let Some(existing) = self.units.get(unit.name()) {
            log::error!(
                "Unit {} defined twice: {} and {}",
                unit.name(),
                existing.origin(),
                unit.origin()
            );
            return Err(MigrateError::DuplicateUnit {
                name: unit.name().clone(),
            });
        }
        self.units.insert(unit.name().clone(), unit);
        Ok(())
    }

    /// Register a unit backed by a forward action defined in code.
    pub fn register(
        &mut self,
        name: UnitName,
        action: impl ForwardAction + 'static,
    ) -> MigrateResult<()> {
        self.insert(MigrationUnit::new(name, Arc::new(action)))
    }

    /// Register an embedded SQL unit.
    pub fn register_sql(&mut self, name: UnitName, sql: impl Into<String>) -> MigrateResult<()> {
        self.insert(MigrationUnit::sql(name, sql, UnitOrigin::Registered))
    }

    /// Add every unit file found in `dir`. Returns how many were added.
    pub fn load_directory(
        &mut self,
        dir: &Path,
        options: &DiscoveryOptions,
    ) -> MigrateResult<usize> {
        let files = discover_unit_files(dir, options)?;
        let count = files.len();
        for file in files {
            self.insert(MigrationUnit::sql(
                file.name,
                file.sql,
                UnitOrigin::File(file.path),
            ))?;
        }
        log::debug!("Loaded {count} migration unit(s) from {}", dir.display());
        Ok(count)
    }

    /// All unit names in execution order.
    pub fn names(&self) -> Vec<&UnitName> {
        self.units.keys().collect()
    }

    /// All units in execution order.
    pub fn units(&self) -> impl Iterator<Item = &MigrationUnit> {
        self.units.values()
    }

    pub fn get(&self, name: &str) -> Option<&MigrationUnit> {
        self.units.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
