//! New command implementation

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use std::fs;

use crate::cli::{GlobalArgs, NewArgs};
use crate::commands::common::load_project;

/// Execute the new command
pub async fn execute(args: &NewArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let dir = project.migrations_dir();
    let file_name = unit_file_name(&args.description, &project.config.unit_suffix, Utc::now())?;
    let path = dir.join(&file_name);

    if path.exists() {
        bail!("Migration unit already exists: {}", path.display());
    }
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create migrations directory {}", dir.display()))?;
    fs::write(&path, format!("-- {}\n", args.description.trim()))
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Created {}", path.display());
    Ok(())
}

/// `<yyyymmddHHMMSS>_<slug><suffix>`, so new units sort after existing ones.
fn unit_file_name(description: &str, suffix: &str, now: DateTime<Utc>) -> Result<String> {
    let slug = slugify(description);
    if slug.is_empty() {
        bail!("Description '{description}' has no letters or digits to name the unit with");
    }
    Ok(format!("{}_{}{}", now.format("%Y%m%d%H%M%S"), slug, suffix))
}

fn slugify(description: &str) -> String {
    let mut slug = String::with_capacity(description.len());
    for c in description.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_end_matches('_').to_string()
}
