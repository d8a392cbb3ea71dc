//! End-to-end tests for the full workout-timerd stack.
//!
//! Each test opens a real `SQLite` file in a temporary directory and drives
//! it through the timer service, exactly as the daemon wires it.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use workout_timer_adapter_storage_sqlite_sqlx::{Config, Database, OpenOutcome, SqliteTimerRepository};
use workout_timer_app::invalidation_tracker::InvalidationTracker;
use workout_timer_app::services::timer_service::{TimerService, TimerSnapshots};
use workout_timer_domain::error::TimerError;
use workout_timer_domain::id::TimerId;
use workout_timer_domain::time::from_epoch_millis;
use workout_timer_domain::timer::{TimerConfig, TimerMode};

type Service = TimerService<SqliteTimerRepository, Arc<InvalidationTracker>>;

async fn open(dir: &Path) -> Database {
    Config::new(format!("sqlite:{}", dir.join("timers.db").display()))
        .with_max_connections(2)
        .build()
        .await
        .expect("store should open")
}

fn service(db: &Database) -> Service {
    TimerService::new(
        SqliteTimerRepository::new(db.pool().clone()),
        Arc::new(InvalidationTracker::new(16)),
    )
}

fn preset(name: &str, created_at_ms: i64) -> TimerConfig {
    TimerConfig::builder()
        .name(name)
        .created_at(from_epoch_millis(created_at_ms).unwrap())
        .build()
        .unwrap()
}

async fn next_snapshot(stream: &mut TimerSnapshots) -> Vec<TimerConfig> {
    tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("snapshot should arrive")
        .expect("stream should stay open")
        .expect("query should succeed")
}

#[tokio::test]
async fn should_manage_presets_through_the_service() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(dir.path()).await;
    assert_eq!(db.outcome(), OpenOutcome::Created);
    let service = service(&db);

    let older = service.insert_timer(preset("EMOM", 1_000)).await.unwrap();
    let newer = service
        .save_timer(preset("Hangboard", 2_000))
        .await
        .unwrap();

    let names: Vec<String> = service
        .list_timers()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, ["Hangboard", "EMOM"]);

    let mut edited = service
        .get_timer(older, &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();
    edited.timer_mode = TimerMode::Climbing;
    edited.total_repetitions = 12;
    service.save_timer(edited.clone()).await.unwrap();
    let stored = service
        .get_timer(older, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(stored, Some(edited));

    service.delete_timer_by_id(newer).await.unwrap();
    assert_eq!(service.list_timers().await.unwrap().len(), 1);
    assert_eq!(service.clear_timers().await.unwrap(), 1);
    assert!(service.list_timers().await.unwrap().is_empty());
}

#[tokio::test]
async fn should_stream_snapshots_after_each_write() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(dir.path()).await;
    let service = service(&db);

    let mut snapshots = service.watch_timers();
    assert!(next_snapshot(&mut snapshots).await.is_empty());

    let id = service.insert_timer(preset("EMOM", 1_000)).await.unwrap();
    let after_insert = next_snapshot(&mut snapshots).await;
    assert_eq!(after_insert.len(), 1);
    assert_eq!(after_insert[0].id, Some(id));

    service.delete_timer_by_id(id).await.unwrap();
    assert!(next_snapshot(&mut snapshots).await.is_empty());
}

#[tokio::test]
async fn should_keep_presets_across_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let db = open(dir.path()).await;
    let id = service(&db)
        .insert_timer(preset("EMOM", 1_000))
        .await
        .unwrap();
    db.close().await;

    let db = open(dir.path()).await;
    assert_eq!(db.outcome(), OpenOutcome::Validated);
    let found = service(&db)
        .get_timer(id, &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.name, "EMOM");
    assert_eq!(found.created_at, from_epoch_millis(1_000).unwrap());
}

#[tokio::test]
async fn should_fail_update_of_unknown_preset() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(dir.path()).await;
    let service = service(&db);

    let mut ghost = preset("Ghost", 1_000);
    ghost.id = Some(TimerId::new(404));

    let err = service.update_timer(ghost).await.unwrap_err();

    assert!(matches!(err, TimerError::NotFound(_)));
    assert!(service.list_timers().await.unwrap().is_empty());
}

#[tokio::test]
async fn should_abort_cancelled_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(dir.path()).await;
    let service = service(&db);
    let id = service.insert_timer(preset("EMOM", 1_000)).await.unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = service.get_timer(id, &cancel).await.unwrap_err();

    assert!(err.is_cancelled());
}

#[tokio::test]
async fn should_reject_invalid_preset_before_storing() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(dir.path()).await;
    let service = service(&db);

    let mut invalid = preset("EMOM", 1_000);
    invalid.total_minutes = 500;

    let err = service.insert_timer(invalid).await.unwrap_err();

    assert!(matches!(err, TimerError::Validation(_)));
    assert!(service.list_timers().await.unwrap().is_empty());
}
