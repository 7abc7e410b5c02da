//! Migration directory discovery.
//!
//! A file is a migration unit when its name ends with the configured unit
//! suffix, it is not hidden, and it matches none of the exclusion patterns.
//! Everything else in the directory (the project config, notes, editor
//! backups) is ignored. Enumeration order of the filesystem does not matter;
//! callers sort by unit name.

use glob::Pattern;
use rollcall_core::{Config, CoreError, CoreResult, UnitName};
use std::path::{Path, PathBuf};

/// Rules deciding which files are units.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    suffix: String,
    exclude: Vec<Pattern>,
}

impl DiscoveryOptions {
    /// Build options from a suffix and glob patterns matched against file names.
    pub fn new(suffix: impl Into<String>, exclude: &[String]) -> CoreResult<Self> {
        let exclude = exclude
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| CoreError::ConfigInvalid {
                    message: format!("invalid exclude pattern '{p}': {e}"),
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self {
            suffix: suffix.into(),
            exclude,
        })
    }

    /// Options for a project: its unit suffix plus the config file names and
    /// the configured exclusions.
    pub fn from_config(config: &Config) -> CoreResult<Self> {
        Self::new(&config.unit_suffix, &config.exclude_patterns())
    }

    /// Unit name for `file_name`, or `None` if the file is not a unit.
    fn unit_name_for(&self, file_name: &str) -> CoreResult<Option<UnitName>> {
        if file_name.starts_with('.') {
            return Ok(None);
        }
        if self.exclude.iter().any(|p| p.matches(file_name)) {
            log::debug!("Excluded from migrations: {file_name}");
            return Ok(None);
        }
        let Some(stem) = file_name.strip_suffix(self.suffix.as_str()) else {
            log::debug!("Skipping non-unit file: {file_name}");
            return Ok(None);
        };
        UnitName::try_new(stem)
            .map(Some)
            .ok_or_else(|| CoreError::InvalidUnitFile {
                file: file_name.to_string(),
                reason: format!("name is empty once '{}' is removed", self.suffix),
            })
    }
}

/// A unit file read from the migrations directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFile {
    pub name: UnitName,
    pub path: PathBuf,
    pub sql: String,
}

/// Scan `dir` for unit files, returned in ascending name order.
pub fn discover_unit_files(dir: &Path, options: &DiscoveryOptions) -> CoreResult<Vec<UnitFile>> {
    if !dir.is_dir() {
        return Err(CoreError::MigrationsDirNotFound {
            path: dir.display().to_string(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| CoreError::IoWithPath {
        path: dir.display().to_string(),
        source: e,
    })?;

    let mut units = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            log::warn!("Skipping file with non UTF-8 name: {}", path.display());
            continue;
        };
        let Some(name) = options.unit_name_for(file_name)? else {
            continue;
        };
        let sql = std::fs::read_to_string(&path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        units.push(UnitFile { name, path, sql });
    }

    units.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(units)
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;
