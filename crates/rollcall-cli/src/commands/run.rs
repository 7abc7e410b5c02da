//! Run command implementation

use anyhow::{Context, Result};
use rollcall_engine::{cancel_pair, CancelHandle, RunEvent, RunObserver};
use std::future::Future;
use std::sync::Arc;

use crate::cli::{GlobalArgs, RunArgs};
use crate::commands::common::{load_migrator, ExitCode};

/// Prints one line per unit as the run progresses
struct ConsoleObserver;

impl RunObserver for ConsoleObserver {
    fn on_event(&self, event: &RunEvent<'_>) {
        match event {
            RunEvent::Started { target, pending } => {
                if *pending == 0 {
                    println!("Nothing to apply, {} is up to date", target);
                } else {
                    println!("Applying {} migration(s) to {}\n", pending, target);
                }
            }
            RunEvent::UnitStarted { name, index, total } => {
                println!("[{}/{}] {}", index + 1, total, name);
            }
            RunEvent::UnitApplied { name, elapsed } => {
                println!("  \u{2713} {} [{}ms]", name, elapsed.as_millis());
            }
            RunEvent::UnitFailed { name, reason } => {
                println!("  \u{2717} {} - {}", name, reason);
            }
            RunEvent::Finished { applied, elapsed } => {
                if *applied > 0 {
                    println!(
                        "\nApplied {} migration(s) in {:.2}s",
                        applied,
                        elapsed.as_secs_f64()
                    );
                }
            }
        }
    }
}

/// The first interrupt cancels the run at the next unit boundary. Returns
/// `true` once a second interrupt arrives, `false` if the signal source fails.
async fn watch_interrupts<F, Fut>(mut interrupted: F, cancel: CancelHandle) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    if !interrupted().await {
        return false;
    }
    eprintln!(
        "\nInterrupted, stopping after the current migration finishes \
         (press Ctrl-C again to exit now)..."
    );
    cancel.cancel();
    interrupted().await
}

/// Execute the run command
pub async fn execute(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    let (project, migrator) = load_migrator(global)?;

    if args.dry_run {
        let pending = migrator
            .compute_pending()
            .await
            .context("Failed to compute pending migrations")?;
        if pending.is_empty() {
            println!("Dry run - nothing to apply, {} is up to date", migrator.target());
        } else {
            println!("Dry run - would apply to {}:", migrator.target());
            for name in &pending {
                println!("  {}", name);
            }
        }
        return Ok(());
    }

    if global.verbose {
        println!(
            "Project: {} ({} unit(s) known)",
            project.config.name,
            migrator.list_units().len()
        );
    }

    let (cancel, signal) = cancel_pair();
    let interrupt = tokio::spawn(async move {
        let ctrl_c = || async { tokio::signal::ctrl_c().await.is_ok() };
        if watch_interrupts(ctrl_c, cancel).await {
            eprintln!("Interrupted again, exiting without waiting for the current migration");
            std::process::exit(130);
        }
    });

    let migrator = migrator
        .with_observer(Arc::new(ConsoleObserver))
        .with_cancel_signal(signal);
    let result = migrator.run().await;
    interrupt.abort();

    match result {
        Ok(_) => Ok(()),
        Err(e) => {
            eprintln!("\n{}", e);
            Err(ExitCode(1).into())
        }
    }
}

#[cfg(test)]
#[path = "run_test.rs"]
mod tests;
