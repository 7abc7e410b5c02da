//! Configuration types and parsing for rollcall.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// File names recognised as a rollcall project configuration.
///
/// These are always excluded from unit discovery, even when the migrations
/// directory is the project root.
pub const CONFIG_FILE_NAMES: &[&str] = &["rollcall.yml", "rollcall.yaml"];

/// Environment variable overriding the database path.
pub const DATABASE_ENV_VAR: &str = "ROLLCALL_DATABASE";

/// Environment variable selecting a named target.
pub const TARGET_ENV_VAR: &str = "ROLLCALL_TARGET";

/// Local-development database used when nothing else is configured.
pub const DEFAULT_DB_PATH: &str = "rollcall_dev.duckdb";

/// Path value selecting an in-memory database.
pub const MEMORY_DB_PATH: &str = ":memory:";

const DEFAULT_RECORD_SCHEMA: &str = "rollcall";

/// Main project configuration from rollcall.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    pub name: String,

    /// Directory holding migration unit files, relative to the project root
    #[serde(default = "default_migrations_path")]
    pub migrations_path: String,

    /// File suffix that marks a file as a migration unit
    #[serde(default = "default_unit_suffix")]
    pub unit_suffix: String,

    /// Extra glob patterns for files that must never be treated as units
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Named target configurations (e.g., dev, staging, prod)
    #[serde(default)]
    pub targets: HashMap<String, TargetConfig>,
}

/// Target-specific configuration overrides
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Database configuration override
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
}

/// Database connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// DuckDB file path (relative to the project root) or `:memory:`
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Schema holding the applied-record and run-lock tables
    #[serde(default = "default_record_schema")]
    pub schema: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            schema: default_record_schema(),
        }
    }
}

fn default_migrations_path() -> String {
    "migrations".to_string()
}

fn default_unit_suffix() -> String {
    ".sql".to_string()
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

fn default_record_schema() -> String {
    DEFAULT_RECORD_SCHEMA.to_string()
}

impl Config {
    /// Build a configuration with every field at its default.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            migrations_path: default_migrations_path(),
            unit_suffix: default_unit_suffix(),
            exclude: Vec::new(),
            database: DatabaseConfig::default(),
            targets: HashMap::new(),
        }
    }

    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for rollcall.yml or rollcall.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        match CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.exists())
        {
            Some(path) => Self::load(&path),
            None => Err(CoreError::ConfigNotFound {
                path: dir.join(CONFIG_FILE_NAMES[0]).display().to_string(),
            }),
        }
    }

    /// Load configuration from a project directory, falling back to defaults
    /// named after the directory when no config file exists.
    pub fn load_from_dir_or_default(dir: &Path) -> CoreResult<Self> {
        match Self::load_from_dir(dir) {
            Err(CoreError::ConfigNotFound { path }) => {
                log::debug!("No config at {path}, using defaults");
                let name = dir
                    .canonicalize()
                    .ok()
                    .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                    .unwrap_or_else(|| "rollcall".to_string());
                Ok(Self::with_name(name))
            }
            other => other,
        }
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        if self.name.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "Project name cannot be empty".to_string(),
            });
        }

        if self.unit_suffix.len() < 2 || !self.unit_suffix.starts_with('.') {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "unit_suffix must start with '.' and name an extension, found '{}'",
                    self.unit_suffix
                ),
            });
        }

        if self.migrations_path.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "migrations_path cannot be empty".to_string(),
            });
        }

        let databases = std::iter::once(&self.database).chain(
            self.targets
                .values()
                .filter_map(|target| target.database.as_ref()),
        );
        for db in databases {
            if db.schema.is_empty() {
                return Err(CoreError::ConfigInvalid {
                    message: "database.schema cannot be empty".to_string(),
                });
            }
            if db.path.is_empty() {
                return Err(CoreError::ConfigInvalid {
                    message: "database.path cannot be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Get the absolute migrations directory relative to a project root
    pub fn migrations_path_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.migrations_path)
    }

    /// All exclusion patterns: the configured ones plus the config file names.
    pub fn exclude_patterns(&self) -> Vec<String> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|s| s.to_string())
            .chain(self.exclude.iter().cloned())
            .collect()
    }

    /// Get the list of available target names
    pub fn available_targets(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.targets.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Get database configuration, optionally applying target overrides
    ///
    /// If target is specified and exists, uses target's database config.
    /// Otherwise, uses the base database config.
    pub fn get_database_config(&self, target: Option<&str>) -> CoreResult<DatabaseConfig> {
        match target {
            Some(name) => {
                let target_config =
                    self.targets
                        .get(name)
                        .ok_or_else(|| CoreError::ConfigInvalid {
                            message: format!(
                                "Target '{}' not found. Available targets: {}",
                                name,
                                self.available_targets().join(", ")
                            ),
                        })?;

                Ok(target_config
                    .database
                    .clone()
                    .unwrap_or_else(|| self.database.clone()))
            }
            None => Ok(self.database.clone()),
        }
    }

    /// Resolve target from CLI flag or ROLLCALL_TARGET environment variable
    ///
    /// Priority: CLI flag > ROLLCALL_TARGET env var > None
    pub fn resolve_target(cli_target: Option<&str>) -> Option<String> {
        cli_target
            .map(String::from)
            .or_else(|| std::env::var(TARGET_ENV_VAR).ok())
            .filter(|t| !t.is_empty())
    }

    /// Resolve the database configuration for a run.
    ///
    /// Priority for the path: CLI flag > ROLLCALL_DATABASE env var > target
    /// config > base config > [`DEFAULT_DB_PATH`]. Relative paths are joined
    /// onto `root`.
    pub fn resolve_database(
        &self,
        root: &Path,
        cli_database: Option<&str>,
        target: Option<&str>,
    ) -> CoreResult<DatabaseConfig> {
        let mut db = self.get_database_config(target)?;
        if let Some(path) = cli_database
            .map(String::from)
            .or_else(|| std::env::var(DATABASE_ENV_VAR).ok())
            .filter(|p| !p.is_empty())
        {
            db.path = path;
        }
        if db.path != MEMORY_DB_PATH && Path::new(&db.path).is_relative() {
            db.path = root.join(&db.path).display().to_string();
        }
        Ok(db)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
