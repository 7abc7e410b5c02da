use super::*;
use std::fs;

fn default_options() -> DiscoveryOptions {
    DiscoveryOptions::from_config(&Config::with_name("school_portal")).unwrap()
}

fn names(units: &[UnitFile]) -> Vec<&str> {
    units.iter().map(|u| u.name.as_str()).collect()
}

#[test]
fn test_discovers_sql_files_sorted() {
    let dir = tempfile::tempdir().unwrap();
    // Written out of order on purpose
    fs::write(dir.path().join("010_c.sql"), "SELECT 3").unwrap();
    fs::write(dir.path().join("001_a.sql"), "SELECT 1").unwrap();
    fs::write(dir.path().join("002_b.sql"), "SELECT 2").unwrap();

    let units = discover_unit_files(dir.path(), &default_options()).unwrap();
    assert_eq!(names(&units), vec!["001_a", "002_b", "010_c"]);
    assert_eq!(units[0].sql, "SELECT 1");
    assert_eq!(units[0].path, dir.path().join("001_a.sql"));
}

#[test]
fn test_config_file_is_never_a_unit() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("rollcall.yml"), "name: school_portal").unwrap();
    fs::write(dir.path().join("001_a.sql"), "SELECT 1").unwrap();

    // Even with a suffix that matches the config file
    let excludes = Config::with_name("school_portal").exclude_patterns();
    let options = DiscoveryOptions::new(".yml", &excludes).unwrap();
    fs::write(dir.path().join("002_b.yml"), "SELECT 2").unwrap();

    let units = discover_unit_files(dir.path(), &options).unwrap();
    assert_eq!(names(&units), vec!["002_b"]);
}

#[test]
fn test_skips_non_units() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("001_a.sql"), "SELECT 1").unwrap();
    fs::write(dir.path().join("README.md"), "notes").unwrap();
    fs::write(dir.path().join(".002_hidden.sql"), "SELECT 2").unwrap();
    fs::write(dir.path().join("003_backup.sql~"), "SELECT 3").unwrap();
    fs::create_dir(dir.path().join("004_dir.sql")).unwrap();

    let units = discover_unit_files(dir.path(), &default_options()).unwrap();
    assert_eq!(names(&units), vec!["001_a"]);
}

#[test]
fn test_exclude_patterns() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("001_a.sql"), "SELECT 1").unwrap();
    fs::write(dir.path().join("001_a.down.sql"), "SELECT -1").unwrap();
    fs::write(dir.path().join("_bootstrap.sql"), "SELECT 0").unwrap();

    let mut config = Config::with_name("school_portal");
    config.exclude = vec!["*.down.sql".to_string(), "_*".to_string()];
    let options = DiscoveryOptions::from_config(&config).unwrap();

    let units = discover_unit_files(dir.path(), &options).unwrap();
    assert_eq!(names(&units), vec!["001_a"]);
}

#[test]
fn test_invalid_exclude_pattern() {
    let err = DiscoveryOptions::new(".sql", &["[unclosed".to_string()]).unwrap_err();
    assert!(matches!(err, CoreError::ConfigInvalid { .. }));
}

#[test]
fn test_suffix_only_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("x.up.sql"), "SELECT 1").unwrap();
    fs::write(dir.path().join(".up.sql"), "SELECT 1").unwrap();

    // Hidden, so skipped rather than rejected
    let options = DiscoveryOptions::new(".up.sql", &[]).unwrap();
    let units = discover_unit_files(dir.path(), &options).unwrap();
    assert_eq!(names(&units), vec!["x"]);

    let options = DiscoveryOptions::new("x.up.sql", &[]).unwrap();
    let err = discover_unit_files(dir.path(), &options).unwrap_err();
    assert!(matches!(err, CoreError::InvalidUnitFile { .. }));
}

#[test]
fn test_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("migrations");
    let err = discover_unit_files(&missing, &default_options()).unwrap_err();
    assert!(matches!(err, CoreError::MigrationsDirNotFound { .. }));
}

#[test]
fn test_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    let units = discover_unit_files(dir.path(), &default_options()).unwrap();
    assert!(units.is_empty());
}
