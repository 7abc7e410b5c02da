//! Status command implementation

use anyhow::{Context, Result};
use rollcall_engine::{StatusReport, UnitState};

use crate::cli::{GlobalArgs, StatusArgs, StatusOutput};
use crate::commands::common::{load_migrator, print_table};

/// Execute the status command
pub async fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let (project, migrator) = load_migrator(global)?;
    let report = migrator
        .status()
        .await
        .context("Failed to read migration status")?;

    match args.output {
        StatusOutput::Json => {
            let json =
                serde_json::to_string_pretty(&report).context("Failed to serialize status")?;
            println!("{}", json);
        }
        StatusOutput::Table => {
            println!("{} ({})\n", project.config.name, migrator.target());
            print_report(&report);
        }
    }
    Ok(())
}

fn print_report(report: &StatusReport) {
    if report.units.is_empty() {
        println!("No migration units found.");
    } else {
        print_table(&["NAME", "STATE", "APPLIED AT", "NOTE"], &status_rows(report));
    }

    if !report.orphaned.is_empty() {
        println!("\nRecords with no matching unit:");
        for record in &report.orphaned {
            println!(
                "  {} (applied {})",
                record.name,
                record.applied_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
    }

    if let Some(lock) = &report.lock {
        println!(
            "\nRun lock held by {} since {}",
            lock.holder,
            lock.acquired_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    println!(
        "\n{} applied, {} pending",
        report.applied_count(),
        report.pending_count()
    );
}

fn status_rows(report: &StatusReport) -> Vec<Vec<String>> {
    report
        .units
        .iter()
        .map(|unit| {
            let applied_at = unit
                .applied_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string());
            let note = match (unit.state, unit.checksum_drift) {
                (UnitState::Applied, true) => "changed since applied",
                _ => "",
            };
            vec![
                unit.name.to_string(),
                unit.state.to_string(),
                applied_at,
                note.to_string(),
            ]
        })
        .collect()
}
