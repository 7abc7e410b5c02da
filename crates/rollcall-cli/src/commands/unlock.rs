//! Unlock command implementation

use anyhow::{Context, Result};

use crate::cli::GlobalArgs;
use crate::commands::common::load_migrator;

/// Execute the unlock command
pub async fn execute(global: &GlobalArgs) -> Result<()> {
    let (_, migrator) = load_migrator(global)?;
    let previous = migrator
        .unlock()
        .await
        .context("Failed to release run lock")?;

    match previous {
        Some(lock) => println!(
            "Released run lock held by {} since {}",
            lock.holder,
            lock.acquired_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        None => println!("No run lock was held"),
    }
    Ok(())
}
