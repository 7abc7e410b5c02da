use super::*;

async fn store() -> DuckDbBackend {
    let db = DuckDbBackend::in_memory().unwrap();
    db.ensure_schema().await.unwrap();
    db
}

#[tokio::test]
async fn test_in_memory() {
    let db = DuckDbBackend::new(":memory:").unwrap();
    assert_eq!(db.db_type(), "duckdb");
    assert_eq!(db.schema(), "rollcall");
    assert!(!db.is_closed());
}

#[tokio::test]
async fn test_ensure_schema_is_idempotent() {
    let db = store().await;
    db.ensure_schema().await.unwrap();
    assert!(db.relation_exists("rollcall.applied_records").await.unwrap());
    assert!(db.relation_exists("rollcall.run_lock").await.unwrap());
}

#[tokio::test]
async fn test_custom_schema() {
    let db = DuckDbBackend::in_memory()
        .unwrap()
        .with_schema("bookkeeping");
    db.ensure_schema().await.unwrap();
    assert!(db
        .relation_exists("bookkeeping.applied_records")
        .await
        .unwrap());
    assert!(!db.relation_exists("rollcall.applied_records").await.unwrap());
}

#[tokio::test]
async fn test_execute_batch_and_count() {
    let db = store().await;
    db.execute_batch(
        "CREATE TABLE schools (id INTEGER, name VARCHAR);
         INSERT INTO schools VALUES (1, 'North'), (2, 'South');",
    )
    .await
    .unwrap();

    assert!(db.relation_exists("schools").await.unwrap());
    assert_eq!(db.query_count("SELECT * FROM schools").await.unwrap(), 2);
    assert_eq!(
        db.execute("DELETE FROM schools WHERE id = 1").await.unwrap(),
        1
    );
}

#[tokio::test]
async fn test_failed_transaction_is_rolled_back() {
    let db = store().await;
    db.try_acquire_lock("run-a").await.unwrap();

    let err = db
        .execute_batch(
            "BEGIN TRANSACTION;
             CREATE TABLE students (id INTEGER);
             SELECT * FROM no_such_table;
             COMMIT;",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::ExecutionError(_)));

    // Bookkeeping writes still work on the same connection
    assert!(!db.relation_exists("students").await.unwrap());
    db.insert_record(&UnitName::new("001_schools"), None)
        .await
        .unwrap();
    assert!(db.release_lock("run-a").await.unwrap());
    assert_eq!(db.current_lock().await.unwrap(), None);
}

#[tokio::test]
async fn test_uncommitted_transaction_is_an_error() {
    let db = store().await;
    let err = db
        .execute_batch("BEGIN TRANSACTION; CREATE TABLE staff (id INTEGER);")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("transaction open"));
    assert!(!db.relation_exists("staff").await.unwrap());

    // A committed transaction is fine
    db.execute_batch("BEGIN TRANSACTION; CREATE TABLE staff (id INTEGER); COMMIT;")
        .await
        .unwrap();
    assert!(db.relation_exists("staff").await.unwrap());
}

#[tokio::test]
async fn test_relation_not_exists() {
    let db = store().await;
    assert!(!db.relation_exists("students").await.unwrap());
}

#[tokio::test]
async fn test_insert_and_list_records() {
    let db = store().await;
    let before = chrono::Utc::now() - chrono::Duration::seconds(5);

    let second = db
        .insert_record(&UnitName::new("002_students"), None)
        .await
        .unwrap();
    let first = db
        .insert_record(&UnitName::new("001_schools"), Some("abc123"))
        .await
        .unwrap();

    assert_eq!(first.name, "001_schools");
    assert_eq!(first.checksum.as_deref(), Some("abc123"));
    assert!(first.applied_at >= before);
    assert_eq!(second.checksum, None);

    let records = db.list_records().await.unwrap();
    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["001_schools", "002_students"]);
    assert_eq!(records[0], first);
}

#[tokio::test]
async fn test_insert_duplicate_is_rejected() {
    let db = store().await;
    let name = UnitName::new("001_schools");
    db.insert_record(&name, None).await.unwrap();

    let err = db.insert_record(&name, None).await.unwrap_err();
    assert!(
        matches!(err, DbError::DuplicateKey(_)),
        "expected DuplicateKey, got {err:?}"
    );
    assert_eq!(db.list_records().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_lock_acquire_is_exclusive() {
    let db = store().await;
    assert_eq!(db.current_lock().await.unwrap(), None);

    assert_eq!(
        db.try_acquire_lock("run-a").await.unwrap(),
        LockAttempt::Acquired
    );
    match db.try_acquire_lock("run-b").await.unwrap() {
        LockAttempt::Held(info) => assert_eq!(info.holder, "run-a"),
        LockAttempt::Acquired => panic!("second holder must not acquire the lock"),
    }

    // Only the owner releases
    assert!(!db.release_lock("run-b").await.unwrap());
    assert!(db.release_lock("run-a").await.unwrap());
    assert_eq!(db.current_lock().await.unwrap(), None);

    assert_eq!(
        db.try_acquire_lock("run-b").await.unwrap(),
        LockAttempt::Acquired
    );
}

#[tokio::test]
async fn test_force_release_lock() {
    let db = store().await;
    assert_eq!(db.force_release_lock().await.unwrap(), None);

    db.try_acquire_lock("crashed-run").await.unwrap();
    let previous = db.force_release_lock().await.unwrap().unwrap();
    assert_eq!(previous.holder, "crashed-run");
    assert_eq!(db.current_lock().await.unwrap(), None);
}

#[tokio::test]
async fn test_close_rejects_later_calls() {
    let db = store().await;
    db.close().await.unwrap();
    assert!(db.is_closed());
    assert!(matches!(db.list_records().await, Err(DbError::Closed)));
    assert!(matches!(db.execute_batch("SELECT 1").await, Err(DbError::Closed)));

    // Closing twice is harmless
    db.close().await.unwrap();
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("school.duckdb");
    {
        let db = DuckDbBackend::from_path(&path).unwrap();
        db.ensure_schema().await.unwrap();
        db.insert_record(&UnitName::new("001_schools"), None)
            .await
            .unwrap();
        db.close().await.unwrap();
    }

    let db = DuckDbBackend::from_path(&path).unwrap();
    db.ensure_schema().await.unwrap();
    let records = db.list_records().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "001_schools");
}

#[test]
fn test_open_error_reports_busy_file() {
    let path = Path::new("/srv/school.duckdb");
    let err = open_error(
        path,
        "IO Error: Could not set lock on file \"/srv/school.duckdb\": \
         Conflicting lock is held in /usr/bin/rollcall (PID 4242)"
            .to_string(),
    );
    assert!(matches!(err, DbError::Busy { .. }));
    assert!(err.to_string().contains("another rollcall run"));

    let err = open_error(path, "IO Error: No such file or directory".to_string());
    assert!(matches!(err, DbError::ConnectionError(_)));
}
