//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use rollcall_engine::{Migrator, Project, Registry};
use std::fmt;

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; the failure has already been reported.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Load the project selected by the global flags
pub(crate) fn load_project(global: &GlobalArgs) -> Result<Project> {
    log::debug!("Loading project from {}", global.project_dir.display());
    Project::load(
        &global.project_dir,
        global.config.as_deref(),
        global.target.as_deref(),
        global.database.as_deref(),
    )
    .context("Failed to load project")
}

/// Load the project and build a migrator over its migrations directory
pub(crate) fn load_migrator(global: &GlobalArgs) -> Result<(Project, Migrator)> {
    let project = load_project(global)?;
    let migrator = project
        .migrator(Registry::new())
        .context("Failed to load migration units")?;
    Ok((project, migrator))
}

/// Calculate column widths for a table given headers and row data.
pub(crate) fn calculate_column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.len());
        }
    }
    widths
}

/// Print a left-aligned table to stdout, columns separated by two spaces.
pub(crate) fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let widths = calculate_column_widths(headers, rows);

    let header_parts: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, &w)| format!("{:<width$}", h, width = w))
        .collect();
    println!("{}", header_parts.join("  ").trim_end());

    let sep_parts: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep_parts.join("  "));

    for row in rows {
        let row_parts: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{:<width$}", cell, width = w))
            .collect();
        println!("{}", row_parts.join("  ").trim_end());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_widths_cover_header_and_cells() {
        let rows = vec![
            vec!["001_create_schools".to_string(), "applied".to_string()],
            vec!["002_a".to_string(), "pending".to_string()],
        ];
        assert_eq!(calculate_column_widths(&["NAME", "STATE"], &rows), vec![18, 7]);
    }

    #[test]
    fn test_exit_code_has_empty_display() {
        let err: anyhow::Error = ExitCode(1).into();
        assert_eq!(err.to_string(), "");
        assert_eq!(err.downcast_ref::<ExitCode>().map(|e| e.0), Some(1));
    }
}
