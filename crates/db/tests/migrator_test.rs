//! Integration tests for the migration manager against in-memory SQLite.

use std::sync::{Arc, Mutex};

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use strata_db::application_manager;
use strata_db::migrator::{
    Direction, ManagerOptions, MigrationError, MigrationManager, MigrationName, MigrationTrait,
    RecordStore, Registry, SchemaManager,
};
use strata_shared::OrphanPolicy;

type Log = Arc<Mutex<Vec<String>>>;

/// Test migration that creates a table named after itself and logs each call.
struct Recording {
    name: &'static str,
    log: Log,
    fail_up: bool,
    fail_down: bool,
}

impl Recording {
    fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: Arc::clone(log),
            fail_up: false,
            fail_down: false,
        }
    }

    fn failing(name: &'static str, log: &Log) -> Self {
        Self {
            fail_up: true,
            ..Self::new(name, log)
        }
    }

    fn failing_down(name: &'static str, log: &Log) -> Self {
        Self {
            fail_down: true,
            ..Self::new(name, log)
        }
    }

    fn table(&self) -> String {
        format!("t_{}", self.name)
    }
}

impl MigrationName for Recording {
    fn name(&self) -> &str {
        self.name
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Recording {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.log.lock().unwrap().push(format!("up:{}", self.name));
        if self.fail_up {
            return Err(DbErr::Custom(format!("{} refused to apply", self.name)));
        }
        manager
            .get_connection()
            .execute_unprepared(&format!(
                "CREATE TABLE {} (id INTEGER PRIMARY KEY)",
                self.table()
            ))
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.log.lock().unwrap().push(format!("down:{}", self.name));
        if self.fail_down {
            return Err(DbErr::Custom(format!("{} refused to revert", self.name)));
        }
        manager
            .get_connection()
            .execute_unprepared(&format!("DROP TABLE IF EXISTS {}", self.table()))
            .await?;
        Ok(())
    }
}

/// Single-connection in-memory database, so every handle sees the same data.
async fn memory_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    Database::connect(options)
        .await
        .expect("Failed to open in-memory database")
}

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn registry(log: &Log, names: &[&'static str]) -> Registry {
    names
        .iter()
        .fold(Registry::builder(), |builder, name| {
            builder.register(Recording::new(name, log))
        })
        .build()
        .expect("Failed to build registry")
}

fn manager(db: &DatabaseConnection, registry: Registry) -> MigrationManager {
    MigrationManager::new(db.clone(), registry)
}

/// (name, batch) of every record in chronological order.
async fn recorded(db: &DatabaseConnection) -> Vec<(String, i32)> {
    let store = RecordStore::new(db);
    store.ensure_table().await.unwrap();
    store
        .all_records()
        .await
        .unwrap()
        .into_iter()
        .map(|record| (record.name, record.batch))
        .collect()
}

async fn has_table(db: &DatabaseConnection, table: &str) -> bool {
    SchemaManager::new(db)
        .has_table(table)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_run_applies_all_pending_in_one_batch() {
    let db = memory_db().await;
    let log = new_log();
    let manager = manager(&db, registry(&log, &["001_init", "002_add_col"]));

    let report = manager.run().await.unwrap();

    assert_eq!(report.applied_count(), 2);
    assert_eq!(report.batch, 1);
    assert_eq!(entries(&log), vec!["up:001_init", "up:002_add_col"]);
    assert_eq!(
        recorded(&db).await,
        vec![("001_init".to_string(), 1), ("002_add_col".to_string(), 1)]
    );
    assert!(has_table(&db, "t_001_init").await);
}

#[tokio::test]
async fn test_run_is_idempotent() {
    let db = memory_db().await;
    let log = new_log();
    let manager = manager(&db, registry(&log, &["001_init", "002_add_col"]));

    manager.run().await.unwrap();
    let second = manager.run().await.unwrap();

    assert_eq!(second.applied_count(), 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(entries(&log).len(), 2);
    assert_eq!(recorded(&db).await.len(), 2);
}

#[tokio::test]
async fn test_batches_increase_without_gaps() {
    let db = memory_db().await;
    let log = new_log();

    manager(&db, registry(&log, &["001_init"])).run().await.unwrap();
    manager(&db, registry(&log, &["001_init"])).run().await.unwrap();
    let report = manager(&db, registry(&log, &["001_init", "002_add_col"]))
        .run()
        .await
        .unwrap();
    let last = manager(&db, registry(&log, &["001_init", "002_add_col", "003_index"]))
        .run()
        .await
        .unwrap();

    assert_eq!(report.batch, 2);
    assert_eq!(last.batch, 3);
    assert_eq!(
        recorded(&db).await,
        vec![
            ("001_init".to_string(), 1),
            ("002_add_col".to_string(), 2),
            ("003_index".to_string(), 3),
        ]
    );
}

#[tokio::test]
async fn test_rollback_latest_reverses_batch() {
    let db = memory_db().await;
    let log = new_log();
    let manager = manager(&db, registry(&log, &["001_init", "002_add_col"]));
    manager.run().await.unwrap();

    let report = manager.rollback(None).await.unwrap();

    assert_eq!(report.batches, vec![1]);
    assert_eq!(report.rolled_back, vec!["002_add_col", "001_init"]);
    assert!(report.orphaned.is_empty());
    assert_eq!(
        entries(&log)[2..],
        ["down:002_add_col".to_string(), "down:001_init".to_string()]
    );
    assert!(recorded(&db).await.is_empty());
    assert!(!has_table(&db, "t_001_init").await);
}

#[tokio::test]
async fn test_rollback_non_positive_batch_means_latest() {
    let db = memory_db().await;
    let log = new_log();

    manager(&db, registry(&log, &["001_init"])).run().await.unwrap();
    let manager = manager(&db, registry(&log, &["001_init", "002_add_col"]));
    manager.run().await.unwrap();

    let report = manager.rollback(Some(0)).await.unwrap();

    assert_eq!(report.batches, vec![2]);
    assert_eq!(report.rolled_back, vec!["002_add_col"]);
    assert_eq!(recorded(&db).await, vec![("001_init".to_string(), 1)]);
}

#[tokio::test]
async fn test_rollback_explicit_older_batch() {
    let db = memory_db().await;
    let log = new_log();

    manager(&db, registry(&log, &["001_init"])).run().await.unwrap();
    let manager = manager(&db, registry(&log, &["001_init", "002_add_col"]));
    manager.run().await.unwrap();

    let report = manager.rollback(Some(1)).await.unwrap();

    assert_eq!(report.rolled_back, vec!["001_init"]);
    assert_eq!(recorded(&db).await, vec![("002_add_col".to_string(), 2)]);
}

#[tokio::test]
async fn test_rollback_unknown_batch_changes_nothing() {
    let db = memory_db().await;
    let log = new_log();
    let manager = manager(&db, registry(&log, &["001_init", "002_add_col"]));
    manager.run().await.unwrap();

    let err = manager.rollback(Some(5)).await.unwrap_err();

    assert!(matches!(err, MigrationError::BatchNotFound(5)));
    assert_eq!(err.to_string(), "no migrations found for batch 5");
    assert_eq!(recorded(&db).await.len(), 2);
    assert_eq!(entries(&log).len(), 2);
}

#[tokio::test]
async fn test_rollback_on_empty_store() {
    let db = memory_db().await;
    let log = new_log();
    let manager = manager(&db, registry(&log, &["001_init"]));

    let err = manager.rollback(None).await.unwrap_err();
    assert!(matches!(err, MigrationError::NothingToRollback));
    assert_eq!(err.to_string(), "no migrations to rollback");

    let err = manager.rollback_all().await.unwrap_err();
    assert!(matches!(err, MigrationError::NothingToRollback));
}

#[tokio::test]
async fn test_run_failure_keeps_earlier_migrations() {
    let db = memory_db().await;
    let log = new_log();
    let registry = Registry::builder()
        .register(Recording::new("001_init", &log))
        .register(Recording::failing("002_broken", &log))
        .register(Recording::new("003_never", &log))
        .build()
        .unwrap();
    let manager = manager(&db, registry);

    let err = manager.run().await.unwrap_err();

    match err {
        MigrationError::Execution {
            name, direction, ..
        } => {
            assert_eq!(name, "002_broken");
            assert_eq!(direction, Direction::Up);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(entries(&log), vec!["up:001_init", "up:002_broken"]);
    assert_eq!(recorded(&db).await, vec![("001_init".to_string(), 1)]);
    assert!(has_table(&db, "t_001_init").await);
}

#[tokio::test]
async fn test_strict_run_failure_leaves_no_trace() {
    let db = memory_db().await;
    let log = new_log();
    let registry = Registry::builder()
        .register(Recording::new("001_init", &log))
        .register(Recording::failing("002_broken", &log))
        .build()
        .unwrap();
    let options = ManagerOptions {
        strict: true,
        ..ManagerOptions::default()
    };
    let manager = MigrationManager::with_options(db.clone(), registry, options);

    assert!(manager.run().await.is_err());

    assert!(recorded(&db).await.is_empty());
    assert!(!has_table(&db, "t_001_init").await);
}

#[tokio::test]
async fn test_strict_run_and_rollback_succeed() {
    let db = memory_db().await;
    let log = new_log();
    let options = ManagerOptions {
        strict: true,
        ..ManagerOptions::default()
    };
    let manager = MigrationManager::with_options(
        db.clone(),
        registry(&log, &["001_init", "002_add_col"]),
        options,
    );

    assert_eq!(manager.run().await.unwrap().applied_count(), 2);
    assert_eq!(recorded(&db).await.len(), 2);

    assert_eq!(manager.rollback(None).await.unwrap().rolled_back_count(), 2);
    assert!(recorded(&db).await.is_empty());
}

#[tokio::test]
async fn test_down_failure_keeps_earlier_deletions() {
    let db = memory_db().await;
    let log = new_log();
    let registry = Registry::builder()
        .register(Recording::failing_down("001_init", &log))
        .register(Recording::new("002_add_col", &log))
        .build()
        .unwrap();
    let manager = manager(&db, registry);
    manager.run().await.unwrap();

    let err = manager.rollback(None).await.unwrap_err();

    match err {
        MigrationError::Execution {
            name, direction, ..
        } => {
            assert_eq!(name, "001_init");
            assert_eq!(direction, Direction::Down);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(recorded(&db).await, vec![("001_init".to_string(), 1)]);
    assert!(!has_table(&db, "t_002_add_col").await);
}

#[tokio::test]
async fn test_strict_down_failure_keeps_whole_batch() {
    let db = memory_db().await;
    let log = new_log();
    let registry = Registry::builder()
        .register(Recording::failing_down("001_init", &log))
        .register(Recording::new("002_add_col", &log))
        .build()
        .unwrap();
    let options = ManagerOptions {
        strict: true,
        ..ManagerOptions::default()
    };
    let manager = MigrationManager::with_options(db.clone(), registry, options);
    manager.run().await.unwrap();

    let err = manager.rollback(None).await.unwrap_err();

    assert!(matches!(
        err,
        MigrationError::Execution {
            direction: Direction::Down,
            ..
        }
    ));
    assert_eq!(
        recorded(&db).await,
        vec![("001_init".to_string(), 1), ("002_add_col".to_string(), 1)]
    );
    assert!(has_table(&db, "t_002_add_col").await);
}

#[tokio::test]
async fn test_rollback_deletes_orphaned_record_with_warning() {
    let db = memory_db().await;
    let log = new_log();
    manager(&db, registry(&log, &["001_init", "002_add_col"]))
        .run()
        .await
        .unwrap();

    let report = manager(&db, registry(&log, &["002_add_col"]))
        .rollback(None)
        .await
        .unwrap();

    assert_eq!(report.rolled_back, vec!["002_add_col"]);
    assert_eq!(report.orphaned, vec!["001_init"]);
    assert!(!entries(&log).contains(&"down:001_init".to_string()));
    assert!(recorded(&db).await.is_empty());
}

#[tokio::test]
async fn test_rollback_fails_on_orphan_when_configured() {
    let db = memory_db().await;
    let log = new_log();
    manager(&db, registry(&log, &["001_init", "002_add_col"]))
        .run()
        .await
        .unwrap();

    let options = ManagerOptions {
        orphan_policy: OrphanPolicy::Fail,
        ..ManagerOptions::default()
    };
    let manager = MigrationManager::with_options(db.clone(), registry(&log, &["001_init"]), options);

    let err = manager.rollback(None).await.unwrap_err();

    assert!(matches!(err, MigrationError::OrphanedRecord(ref name) if name == "002_add_col"));
    assert_eq!(recorded(&db).await.len(), 2);
    assert!(!entries(&log).iter().any(|entry| entry.starts_with("down:")));
}

#[tokio::test]
async fn test_rollback_all_goes_newest_batch_first() {
    let db = memory_db().await;
    let log = new_log();

    manager(&db, registry(&log, &["001_init", "002_add_col"]))
        .run()
        .await
        .unwrap();
    let manager = manager(&db, registry(&log, &["001_init", "002_add_col", "003_index"]));
    manager.run().await.unwrap();

    let report = manager.rollback_all().await.unwrap();

    assert_eq!(report.batches, vec![2, 1]);
    assert_eq!(report.rolled_back, vec!["003_index", "002_add_col", "001_init"]);
    assert!(recorded(&db).await.is_empty());
}

#[tokio::test]
async fn test_status_counts_applied_and_pending() {
    let db = memory_db().await;
    let log = new_log();

    manager(&db, registry(&log, &["001_init", "002_add_col"]))
        .run()
        .await
        .unwrap();
    let manager = manager(&db, registry(&log, &["001_init", "002_add_col", "003_index"]));

    let status = manager.status().await.unwrap();

    assert_eq!(status.total(), 2);
    assert_eq!(status.pending_count(), 1);
    assert_eq!(status.pending, vec!["003_index"]);
    assert!(status.orphaned.is_empty());
    assert_eq!(status.applied[0].name, "001_init");
    assert_eq!(status.applied[1].batch, 1);
    assert_eq!(
        status.pending_count(),
        manager.registry().len() - status.total()
    );
}

#[tokio::test]
async fn test_status_reports_orphans_without_negative_pending() {
    let db = memory_db().await;
    let log = new_log();

    manager(&db, registry(&log, &["001_init", "002_add_col"]))
        .run()
        .await
        .unwrap();
    let status = manager(&db, registry(&log, &["002_add_col"]))
        .status()
        .await
        .unwrap();

    assert_eq!(status.total(), 2);
    assert_eq!(status.pending_count(), 0);
    assert_eq!(status.orphaned, vec!["001_init"]);
}

#[tokio::test]
async fn test_pending_count_is_registry_minus_records() {
    let db = memory_db().await;
    let log = new_log();

    manager(&db, registry(&log, &["001_a", "002_b"]))
        .run()
        .await
        .unwrap();
    let status = manager(&db, registry(&log, &["002_b", "003_c"]))
        .status()
        .await
        .unwrap();

    // 003_c has no record, but 001_a is orphaned: 2 registered - 2 recorded.
    assert_eq!(status.pending_count(), 0);
    assert_eq!(status.pending, vec!["003_c"]);
    assert_eq!(status.orphaned, vec!["001_a"]);
}

#[tokio::test]
async fn test_status_on_fresh_store() {
    let db = memory_db().await;
    let log = new_log();

    let status = manager(&db, registry(&log, &["001_init"]))
        .status()
        .await
        .unwrap();

    assert_eq!(status.total(), 0);
    assert_eq!(status.pending, vec!["001_init"]);
}

#[tokio::test]
async fn test_application_migrations_round_trip() {
    let db = memory_db().await;
    let manager = application_manager(db.clone(), ManagerOptions::default()).unwrap();

    let report = manager.run().await.unwrap();
    assert_eq!(
        report.applied,
        vec![
            "m20260108_000001_create_users_table",
            "m20260108_000002_create_sessions_table",
        ]
    );
    assert!(has_table(&db, "users").await);
    assert!(has_table(&db, "sessions").await);

    let report = manager.rollback_all().await.unwrap();
    assert_eq!(report.rolled_back_count(), 2);
    assert!(!has_table(&db, "sessions").await);
    assert!(!has_table(&db, "users").await);
    assert!(has_table(&db, "schema_migrations").await);
}
