//! Pending command implementation

use anyhow::{Context, Result};

use crate::cli::GlobalArgs;
use crate::commands::common::load_migrator;

/// Execute the pending command
pub async fn execute(global: &GlobalArgs) -> Result<()> {
    let (_, migrator) = load_migrator(global)?;
    let pending = migrator
        .compute_pending()
        .await
        .context("Failed to compute pending migrations")?;

    for name in &pending {
        println!("{}", name);
    }
    if global.verbose {
        eprintln!("{} pending migration(s)", pending.len());
    }
    Ok(())
}
