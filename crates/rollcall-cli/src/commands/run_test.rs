use super::*;
use rollcall_core::UnitName;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_project(root: &Path, units: &[(&str, &str)]) {
    fs::write(
        root.join("rollcall.yml"),
        "name: school_portal\ndatabase:\n  path: school.duckdb\n",
    )
    .unwrap();
    let migrations = root.join("migrations");
    fs::create_dir_all(&migrations).unwrap();
    for (file, sql) in units {
        fs::write(migrations.join(file), sql).unwrap();
    }
}

fn global_for(root: &Path) -> GlobalArgs {
    GlobalArgs {
        verbose: false,
        project_dir: root.to_path_buf(),
        config: None,
        target: None,
        database: None,
    }
}

async fn pending(global: &GlobalArgs) -> Vec<UnitName> {
    let (_, migrator) = load_migrator(global).unwrap();
    migrator.compute_pending().await.unwrap()
}

#[tokio::test]
async fn test_run_applies_pending_units() {
    let temp_dir = tempdir().unwrap();
    write_project(
        temp_dir.path(),
        &[
            ("001_schools.sql", "CREATE TABLE schools (id INTEGER);"),
            ("002_students.sql", "CREATE TABLE students (id INTEGER);"),
        ],
    );
    let global = global_for(temp_dir.path());

    execute(&RunArgs { dry_run: false }, &global).await.unwrap();
    assert!(pending(&global).await.is_empty());

    // Second run is a no-op
    execute(&RunArgs { dry_run: false }, &global).await.unwrap();
}

#[tokio::test]
async fn test_dry_run_applies_nothing() {
    let temp_dir = tempdir().unwrap();
    write_project(
        temp_dir.path(),
        &[("001_schools.sql", "CREATE TABLE schools (id INTEGER);")],
    );
    let global = global_for(temp_dir.path());

    execute(&RunArgs { dry_run: true }, &global).await.unwrap();
    assert_eq!(pending(&global).await, vec![UnitName::new("001_schools")]);
}

#[tokio::test]
async fn test_failed_run_exits_non_zero() {
    let temp_dir = tempdir().unwrap();
    write_project(
        temp_dir.path(),
        &[
            ("001_schools.sql", "CREATE TABLE schools (id INTEGER);"),
            ("002_broken.sql", "CREATE TABLE"),
        ],
    );
    let global = global_for(temp_dir.path());

    let err = execute(&RunArgs { dry_run: false }, &global)
        .await
        .unwrap_err();
    assert_eq!(err.downcast_ref::<ExitCode>().map(|c| c.0), Some(1));
    assert_eq!(pending(&global).await, vec![UnitName::new("002_broken")]);
}

#[tokio::test]
async fn test_database_flag_overrides_config() {
    let temp_dir = tempdir().unwrap();
    write_project(
        temp_dir.path(),
        &[("001_schools.sql", "CREATE TABLE schools (id INTEGER);")],
    );
    let mut global = global_for(temp_dir.path());
    global.database = Some("override.duckdb".to_string());

    execute(&RunArgs { dry_run: false }, &global).await.unwrap();
    assert!(temp_dir.path().join("override.duckdb").exists());
    assert!(!temp_dir.path().join("school.duckdb").exists());
}

#[tokio::test]
async fn test_second_interrupt_forces_exit() {
    let (cancel, signal) = rollcall_engine::cancel_pair();
    let calls = std::cell::Cell::new(0);
    let forced = watch_interrupts(
        || {
            calls.set(calls.get() + 1);
            async { true }
        },
        cancel,
    )
    .await;

    assert!(forced);
    assert_eq!(calls.get(), 2);
    assert!(signal.is_cancelled());
}

#[tokio::test]
async fn test_failed_signal_source_cancels_nothing() {
    let (cancel, signal) = rollcall_engine::cancel_pair();
    assert!(!watch_interrupts(|| async { false }, cancel).await);
    assert!(!signal.is_cancelled());
}
