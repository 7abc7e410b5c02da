//! A project on disk: its config, resolved database, and migrations directory.

use crate::engine::{Migrator, RunReport};
use crate::error::MigrateResult;
use crate::registry::Registry;
use crate::source::DiscoveryOptions;
use rollcall_core::{Config, CoreError, DatabaseConfig};
use rollcall_db::DuckDbConnector;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Loaded project settings
#[derive(Debug, Clone)]
pub struct Project {
    /// Project root directory
    pub root: PathBuf,
    /// Parsed configuration
    pub config: Config,
    /// Selected target, if any
    pub target: Option<String>,
    /// Database the run applies to, after all overrides
    pub database: DatabaseConfig,
}

impl Project {
    /// Load a project rooted at `root`.
    ///
    /// `config_path` overrides config discovery in `root`; without it a
    /// missing config file means defaults. `target` and `database` are the
    /// command-line overrides, falling back to their environment variables.
    pub fn load(
        root: &Path,
        config_path: Option<&Path>,
        target: Option<&str>,
        database: Option<&str>,
    ) -> MigrateResult<Self> {
        let config = match config_path {
            Some(path) => Config::load(path)?,
            None => Config::load_from_dir_or_default(root)?,
        };
        let target = Config::resolve_target(target);
        let database = config.resolve_database(root, database, target.as_deref())?;
        log::debug!(
            "Loaded project {} (target: {}, database: {})",
            config.name,
            target.as_deref().unwrap_or("default"),
            database.path
        );

        Ok(Self {
            root: root.to_path_buf(),
            config,
            target,
            database,
        })
    }

    /// Absolute path of the migrations directory
    pub fn migrations_dir(&self) -> PathBuf {
        self.config.migrations_path_absolute(&self.root)
    }

    /// Add this project's directory units to `registry`.
    ///
    /// A project with no migrations directory contributes nothing; a
    /// `migrations_path` that names anything other than a directory is an
    /// error.
    pub fn load_registry(&self, mut registry: Registry) -> MigrateResult<Registry> {
        let dir = self.migrations_dir();
        if !dir.exists() {
            log::warn!("Migrations directory {} does not exist", dir.display());
            return Ok(registry);
        }
        if !dir.is_dir() {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "migrations_path '{}' is not a directory",
                    self.config.migrations_path
                ),
            }
            .into());
        }
        let options = DiscoveryOptions::from_config(&self.config)?;
        registry.load_directory(&dir, &options)?;
        Ok(registry)
    }

    /// A migrator over `registry` plus the directory units, targeting the
    /// project database.
    pub fn migrator(&self, registry: Registry) -> MigrateResult<Migrator> {
        let registry = self.load_registry(registry)?;
        let connector = DuckDbConnector::new(self.database.clone());
        Ok(Migrator::new(registry, Arc::new(connector)))
    }
}

/// Apply every pending directory unit of `project`.
pub async fn run_migrations(project: &Project) -> MigrateResult<RunReport> {
    project.migrator(Registry::new())?.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::config::{DATABASE_ENV_VAR, TARGET_ENV_VAR};
    use serial_test::serial;
    use std::fs;

    fn clear_env() {
        std::env::remove_var(DATABASE_ENV_VAR);
        std::env::remove_var(TARGET_ENV_VAR);
    }

    #[test]
    #[serial]
    fn test_load_defaults_without_config() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let project = Project::load(dir.path(), None, None, None).unwrap();
        assert_eq!(project.config.migrations_path, "migrations");
        assert_eq!(project.migrations_dir(), dir.path().join("migrations"));
        assert_eq!(
            project.database.path,
            dir.path().join("rollcall_dev.duckdb").display().to_string()
        );
    }

    #[test]
    #[serial]
    fn test_load_with_target_and_database_override() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("rollcall.yml"),
            "name: school_portal\n\
             database:\n  path: dev.duckdb\n\
             targets:\n  prod:\n    database:\n      path: prod.duckdb\n",
        )
        .unwrap();

        let project = Project::load(dir.path(), None, Some("prod"), None).unwrap();
        assert_eq!(project.target.as_deref(), Some("prod"));
        assert!(project.database.path.ends_with("prod.duckdb"));

        let project = Project::load(dir.path(), None, Some("prod"), Some(":memory:")).unwrap();
        assert_eq!(project.database.path, ":memory:");
    }

    #[test]
    #[serial]
    fn test_unknown_target_is_an_error() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let err = Project::load(dir.path(), None, Some("staging"), None).unwrap_err();
        assert!(err.to_string().contains("staging"));
    }

    #[test]
    #[serial]
    fn test_missing_migrations_dir_loads_empty_registry() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let project = Project::load(dir.path(), None, None, Some(":memory:")).unwrap();
        let registry = project.load_registry(Registry::new()).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    #[serial]
    fn test_env_database_applies_when_no_flag() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var(DATABASE_ENV_VAR, ":memory:");
        let project = Project::load(dir.path(), None, None, None);
        clear_env();
        assert_eq!(project.unwrap().database.path, ":memory:");
    }

    #[test]
    #[serial]
    fn test_migrations_path_naming_a_file_is_rejected() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("migrations"), "not a directory").unwrap();
        let project = Project::load(dir.path(), None, None, Some(":memory:")).unwrap();
        let err = project.load_registry(Registry::new()).unwrap_err();
        assert!(matches!(err, crate::MigrateError::Source(_)));
        assert!(err.to_string().contains("not a directory"));
    }
}
