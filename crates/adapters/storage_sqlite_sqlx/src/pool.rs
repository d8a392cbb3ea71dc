//! `SQLite` connection pool setup and schema bootstrap.

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use workout_timer_domain::timer::TimerConfig;

use crate::error::StorageError;
use crate::migrations;
use crate::schema::{self, LATEST_VERSION};

/// Configuration for the `SQLite` storage adapter.
#[derive(Debug, Clone)]
pub struct Config {
    /// `SQLite` connection URL (e.g. `sqlite:timers.db` or `sqlite::memory:`).
    pub database_url: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout: Duration,
    /// Drop and recreate the table when no migration path exists.
    pub destructive_fallback: bool,
}

impl Config {
    /// Configuration with default pool settings for `database_url`.
    #[must_use]
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 4,
            busy_timeout: Duration::from_secs(5),
            destructive_fallback: false,
        }
    }

    #[must_use]
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    #[must_use]
    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    #[must_use]
    pub fn with_destructive_fallback(mut self, enabled: bool) -> Self {
        self.destructive_fallback = enabled;
        self
    }

    /// Read configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `WORKOUT_TIMER_DATABASE_URL` is not set.
    pub fn from_env() -> Result<Self, std::env::VarError> {
        Ok(Self::new(std::env::var("WORKOUT_TIMER_DATABASE_URL")?))
    }

    /// Build a [`Database`] from this configuration.
    ///
    /// Creates the connection pool, creates the database file if missing,
    /// then creates, migrates and validates the schema.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the connection, a migration or schema
    /// validation fails. A validation failure means the store must not be
    /// used until it is migrated or recreated.
    pub async fn build(self) -> Result<Database, StorageError> {
        Database::initialize(&self).await
    }
}

/// What opening the store had to do to the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// Fresh store, table created at the latest version.
    Created,
    /// Store upgraded by applying migrations.
    Migrated { from: i64, to: i64 },
    /// Store was already current and matched the expected schema.
    Validated,
    /// No migration path existed; the table was dropped and every row lost.
    Recreated { from: i64 },
}

/// Holds the `SQLite` connection pool and provides access to it.
pub struct Database {
    pool: SqlitePool,
    outcome: OpenOutcome,
}

impl Database {
    /// Connect to the database and bring the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the connection, migrations or validation fail.
    async fn initialize(config: &Config) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        let outcome = prepare_schema(&pool, config.destructive_fallback).await?;
        tracing::info!(?outcome, url = %config.database_url, "timer store opened");

        Ok(Self { pool, outcome })
    }

    /// Borrow the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// What opening the store did to the schema.
    ///
    /// [`OpenOutcome::Recreated`] means previously stored rows are gone and
    /// any cached copies of them must be discarded.
    #[must_use]
    pub fn outcome(&self) -> OpenOutcome {
        self.outcome
    }

    /// Close every pooled connection.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

async fn prepare_schema(
    pool: &SqlitePool,
    destructive_fallback: bool,
) -> Result<OpenOutcome, StorageError> {
    let mut conn = pool.acquire().await?;
    let version = schema::user_version(&mut conn).await?;
    let exists = schema::table_exists(&mut conn, TimerConfig::TABLE).await?;
    drop(conn);

    let outcome = if version == 0 && !exists {
        let mut tx = pool.begin().await?;
        schema::create_all(&mut tx).await?;
        tx.commit().await?;
        OpenOutcome::Created
    } else if version == LATEST_VERSION {
        OpenOutcome::Validated
    } else if let Some(steps) = migrations::plan(version, LATEST_VERSION) {
        migrations::apply(pool, &steps).await?;
        OpenOutcome::Migrated {
            from: version,
            to: LATEST_VERSION,
        }
    } else if destructive_fallback {
        tracing::warn!(
            from = version,
            to = LATEST_VERSION,
            "no migration path, recreating timer table"
        );
        let mut tx = pool.begin().await?;
        schema::drop_all(&mut tx).await?;
        schema::create_all(&mut tx).await?;
        tx.commit().await?;
        OpenOutcome::Recreated { from: version }
    } else {
        return Err(StorageError::MigrationMissing {
            from: version,
            to: LATEST_VERSION,
        });
    };

    let mut conn = pool.acquire().await?;
    schema::validate(&mut conn).await?;
    match outcome {
        OpenOutcome::Validated => match schema::read_identity(&mut conn).await? {
            Some(found) if found != schema::identity_hash() => {
                return Err(StorageError::IdentityMismatch {
                    expected: schema::identity_hash(),
                    found,
                });
            }
            Some(_) => {}
            None => schema::write_identity(&mut conn).await?,
        },
        OpenOutcome::Migrated { .. } => schema::write_identity(&mut conn).await?,
        OpenOutcome::Created | OpenOutcome::Recreated { .. } => {}
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const V1_TIMERS: &str = "CREATE TABLE IF NOT EXISTS `timers` (`id` INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, `name` TEXT NOT NULL, `totalMinutes` INTEGER NOT NULL, `audioEnabled` INTEGER NOT NULL, `audioType` TEXT NOT NULL, `countdownSeconds` INTEGER NOT NULL, `createdAt` INTEGER NOT NULL)";
    const V1_ROW: &str = "INSERT INTO timers (name, totalMinutes, audioEnabled, audioType, countdownSeconds, createdAt) VALUES ('Legacy EMOM', 15, 1, 'VOICE', 5, 1000)";

    fn file_url(dir: &Path) -> String {
        format!("sqlite:{}", dir.join("timers.db").display())
    }

    /// Prepare a database file by hand, bypassing the schema manager.
    async fn seed(url: &str, statements: &[&str]) {
        let options = SqliteConnectOptions::from_str(url)
            .unwrap()
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.unwrap();
        for statement in statements {
            sqlx::query(statement).execute(&pool).await.unwrap();
        }
        pool.close().await;
    }

    async fn open(url: &str) -> Result<Database, StorageError> {
        Config::new(url).with_max_connections(1).build().await
    }

    #[tokio::test]
    async fn should_create_schema_when_using_memory_db() {
        let db = open("sqlite::memory:").await.unwrap();
        assert_eq!(db.outcome(), OpenOutcome::Created);

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(db.pool())
        .await
        .unwrap();
        let names: Vec<&str> = tables.iter().map(|row| row.0.as_str()).collect();
        assert_eq!(names, ["schema_master", "timers"]);

        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(schema::user_version(&mut conn).await.unwrap(), LATEST_VERSION);
        assert_eq!(
            schema::read_identity(&mut conn).await.unwrap(),
            Some(schema::identity_hash())
        );
    }

    #[tokio::test]
    async fn should_validate_when_reopening_current_store() {
        let dir = tempfile::tempdir().unwrap();
        let url = file_url(dir.path());

        open(&url).await.unwrap().close().await;
        let db = open(&url).await.unwrap();

        assert_eq!(db.outcome(), OpenOutcome::Validated);
    }

    #[tokio::test]
    async fn should_migrate_first_version_and_fill_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let url = file_url(dir.path());
        seed(&url, &[V1_TIMERS, V1_ROW, "PRAGMA user_version = 1"]).await;

        let db = open(&url).await.unwrap();
        assert_eq!(db.outcome(), OpenOutcome::Migrated { from: 1, to: 3 });

        let row: (String, String, i64, i64, i64, i64) = sqlx::query_as(
            "SELECT name, timerMode, initialCountdownSeconds, holdSeconds, restSeconds, totalRepetitions FROM timers",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(
            row,
            ("Legacy EMOM".to_string(), "WEIGHTLIFT".to_string(), 0, 7, 3, 6)
        );

        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(schema::user_version(&mut conn).await.unwrap(), 3);
        assert_eq!(
            schema::read_identity(&mut conn).await.unwrap(),
            Some(schema::identity_hash())
        );
    }

    #[tokio::test]
    async fn should_migrate_from_intermediate_version() {
        let dir = tempfile::tempdir().unwrap();
        let url = file_url(dir.path());
        seed(
            &url,
            &[
                V1_TIMERS,
                "ALTER TABLE timers ADD COLUMN initialCountdownSeconds INTEGER NOT NULL DEFAULT 0",
                "PRAGMA user_version = 2",
            ],
        )
        .await;

        let db = open(&url).await.unwrap();

        assert_eq!(db.outcome(), OpenOutcome::Migrated { from: 2, to: 3 });
    }

    #[tokio::test]
    async fn should_fail_open_when_column_missing() {
        let dir = tempfile::tempdir().unwrap();
        let url = file_url(dir.path());
        // Claims to be current but never received the version 2 column.
        seed(
            &url,
            &[
                V1_TIMERS,
                "ALTER TABLE timers ADD COLUMN timerMode TEXT NOT NULL DEFAULT 'WEIGHTLIFT'",
                "ALTER TABLE timers ADD COLUMN holdSeconds INTEGER NOT NULL DEFAULT 7",
                "ALTER TABLE timers ADD COLUMN restSeconds INTEGER NOT NULL DEFAULT 3",
                "ALTER TABLE timers ADD COLUMN totalRepetitions INTEGER NOT NULL DEFAULT 6",
                "PRAGMA user_version = 3",
            ],
        )
        .await;

        let Err(StorageError::SchemaMismatch(mismatch)) = open(&url).await else {
            panic!("expected schema mismatch");
        };
        assert_eq!(mismatch.entity, "TimerConfig");
        assert_eq!(mismatch.missing, ["initialCountdownSeconds"]);
        assert!(mismatch.unexpected.is_empty());
        assert!(mismatch.to_string().contains("initialCountdownSeconds"));
    }

    #[tokio::test]
    async fn should_fail_open_when_column_type_differs() {
        let dir = tempfile::tempdir().unwrap();
        let url = file_url(dir.path());
        seed(
            &url,
            &[
                schema::CREATE_TIMERS
                    .replace("`audioType` TEXT", "`audioType` INTEGER")
                    .as_str(),
                "PRAGMA user_version = 3",
            ],
        )
        .await;

        let Err(StorageError::SchemaMismatch(mismatch)) = open(&url).await else {
            panic!("expected schema mismatch");
        };
        assert_eq!(mismatch.changed, ["audioType"]);
    }

    #[tokio::test]
    async fn should_fail_open_when_identity_differs() {
        let dir = tempfile::tempdir().unwrap();
        let url = file_url(dir.path());
        open(&url).await.unwrap().close().await;
        seed(&url, &["UPDATE schema_master SET identity_hash = 'stale'"]).await;

        let result = open(&url).await;

        assert!(matches!(
            result,
            Err(StorageError::IdentityMismatch { ref found, .. }) if found == "stale"
        ));
    }

    #[tokio::test]
    async fn should_record_identity_when_current_store_lacks_it() {
        let dir = tempfile::tempdir().unwrap();
        let url = file_url(dir.path());
        seed(&url, &[schema::CREATE_TIMERS, "PRAGMA user_version = 3"]).await;

        let db = open(&url).await.unwrap();

        assert_eq!(db.outcome(), OpenOutcome::Validated);
        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(
            schema::read_identity(&mut conn).await.unwrap(),
            Some(schema::identity_hash())
        );
    }

    #[tokio::test]
    async fn should_refuse_unknown_version_without_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let url = file_url(dir.path());
        seed(&url, &[schema::CREATE_TIMERS, "PRAGMA user_version = 7"]).await;

        let result = open(&url).await;

        assert!(matches!(
            result,
            Err(StorageError::MigrationMissing { from: 7, to: 3 })
        ));
    }

    #[tokio::test]
    async fn should_recreate_table_when_fallback_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let url = file_url(dir.path());
        seed(&url, &[V1_TIMERS, V1_ROW, "PRAGMA user_version = 9"]).await;

        let db = Config::new(&url)
            .with_max_connections(1)
            .with_destructive_fallback(true)
            .build()
            .await
            .unwrap();

        assert_eq!(db.outcome(), OpenOutcome::Recreated { from: 9 });
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM timers")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn should_apply_pool_defaults() {
        let config = Config::new("sqlite:timers.db");
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
        assert!(!config.destructive_fallback);
    }
}
