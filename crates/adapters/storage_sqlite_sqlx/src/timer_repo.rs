//! `SQLite` implementation of [`TimerRepository`].

use std::future::Future;
use std::str::FromStr;

use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{FromRow, Row, Sqlite, SqlitePool};

use workout_timer_app::ports::TimerRepository;
use workout_timer_domain::error::{NotFoundError, TimerError};
use workout_timer_domain::id::TimerId;
use workout_timer_domain::time::{from_epoch_millis, to_epoch_millis};
use workout_timer_domain::timer::{AudioType, TimerConfig, TimerMode};

use crate::error::{StorageError, TimestampOutOfRange};

/// Wrapper for converting database rows into domain [`TimerConfig`].
struct Wrapper(TimerConfig);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<TimerConfig> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: i64 = row.try_get("id")?;
        let timer_mode: String = row.try_get("timerMode")?;
        let audio_type: String = row.try_get("audioType")?;
        let created_at: i64 = row.try_get("createdAt")?;

        let timer_mode =
            TimerMode::from_str(&timer_mode).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let audio_type =
            AudioType::from_str(&audio_type).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let created_at = from_epoch_millis(created_at)
            .ok_or_else(|| sqlx::Error::Decode(Box::new(TimestampOutOfRange(created_at))))?;

        Ok(Self(TimerConfig {
            id: Some(TimerId::new(id)),
            name: row.try_get("name")?,
            timer_mode,
            total_minutes: row.try_get("totalMinutes")?,
            audio_enabled: row.try_get("audioEnabled")?,
            audio_type,
            countdown_seconds: row.try_get("countdownSeconds")?,
            initial_countdown_seconds: row.try_get("initialCountdownSeconds")?,
            hold_seconds: row.try_get("holdSeconds")?,
            rest_seconds: row.try_get("restSeconds")?,
            total_repetitions: row.try_get("totalRepetitions")?,
            created_at,
        }))
    }
}

// An id of 0 is turned into NULL so SQLite allocates the next key.
const INSERT: &str = "INSERT OR REPLACE INTO `timers` (`id`,`name`,`timerMode`,`totalMinutes`,`audioEnabled`,`audioType`,`countdownSeconds`,`initialCountdownSeconds`,`holdSeconds`,`restSeconds`,`totalRepetitions`,`createdAt`) VALUES (nullif(?, 0),?,?,?,?,?,?,?,?,?,?,?)";
const UPDATE: &str = "UPDATE OR ABORT `timers` SET `id` = ?,`name` = ?,`timerMode` = ?,`totalMinutes` = ?,`audioEnabled` = ?,`audioType` = ?,`countdownSeconds` = ?,`initialCountdownSeconds` = ?,`holdSeconds` = ?,`restSeconds` = ?,`totalRepetitions` = ?,`createdAt` = ? WHERE `id` = ?";
const DELETE_BY_ID: &str = "DELETE FROM `timers` WHERE `id` = ?";
const DELETE_ALL: &str = "DELETE FROM `timers`";
const SELECT_ALL: &str = "SELECT * FROM timers ORDER BY createdAt DESC, id DESC";
const SELECT_BY_ID: &str = "SELECT * FROM timers WHERE id = ?";

/// Every statement template this repository issues, hashed into the schema identity.
pub(crate) const STATEMENTS: [&str; 6] = [
    INSERT,
    UPDATE,
    DELETE_BY_ID,
    DELETE_ALL,
    SELECT_ALL,
    SELECT_BY_ID,
];

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Bind the twelve entity columns in table order.
fn bind_columns<'q>(query: SqliteQuery<'q>, timer: &'q TimerConfig) -> SqliteQuery<'q> {
    query
        .bind(raw_id(timer.id))
        .bind(timer.name.as_str())
        .bind(timer.timer_mode.as_str())
        .bind(timer.total_minutes)
        .bind(timer.audio_enabled)
        .bind(timer.audio_type.as_str())
        .bind(timer.countdown_seconds)
        .bind(timer.initial_countdown_seconds)
        .bind(timer.hold_seconds)
        .bind(timer.rest_seconds)
        .bind(timer.total_repetitions)
        .bind(to_epoch_millis(timer.created_at))
}

fn raw_id(id: Option<TimerId>) -> i64 {
    id.map_or(0, TimerId::get)
}

async fn delete_row(pool: &SqlitePool, id: i64) -> Result<bool, StorageError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query(DELETE_BY_ID)
        .persistent(true)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

/// `SQLite`-backed timer repository.
#[derive(Clone)]
pub struct SqliteTimerRepository {
    pool: SqlitePool,
}

impl SqliteTimerRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl TimerRepository for SqliteTimerRepository {
    fn insert(
        &self,
        timer: TimerConfig,
    ) -> impl Future<Output = Result<TimerId, TimerError>> + Send {
        let pool = self.pool.clone();
        async move {
            let mut tx = pool.begin().await.map_err(StorageError::from)?;
            let result = bind_columns(sqlx::query(INSERT), &timer)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
            tx.commit().await.map_err(StorageError::from)?;

            Ok(TimerId::new(result.last_insert_rowid()))
        }
    }

    fn update(
        &self,
        timer: TimerConfig,
    ) -> impl Future<Output = Result<TimerConfig, TimerError>> + Send {
        let pool = self.pool.clone();
        async move {
            let id = raw_id(timer.id);
            let mut tx = pool.begin().await.map_err(StorageError::from)?;
            let result = bind_columns(sqlx::query(UPDATE), &timer)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;

            // Dropping the transaction rolls it back.
            if result.rows_affected() == 0 {
                return Err(NotFoundError {
                    entity: "TimerConfig",
                    id: id.to_string(),
                }
                .into());
            }
            tx.commit().await.map_err(StorageError::from)?;

            Ok(timer)
        }
    }

    fn delete(&self, timer: &TimerConfig) -> impl Future<Output = Result<bool, TimerError>> + Send {
        let pool = self.pool.clone();
        let id = timer.id;
        async move {
            match id {
                Some(id) => Ok(delete_row(&pool, id.get()).await?),
                None => Ok(false),
            }
        }
    }

    fn delete_by_id(&self, id: TimerId) -> impl Future<Output = Result<bool, TimerError>> + Send {
        let pool = self.pool.clone();
        async move { Ok(delete_row(&pool, id.get()).await?) }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<TimerConfig>, TimerError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn get_by_id(
        &self,
        id: TimerId,
    ) -> impl Future<Output = Result<Option<TimerConfig>, TimerError>> + Send {
        let pool = self.pool.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
                .bind(id.get())
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn clear(&self) -> impl Future<Output = Result<u64, TimerError>> + Send {
        let pool = self.pool.clone();
        async move {
            let mut tx = pool.begin().await.map_err(StorageError::from)?;
            let result = sqlx::query(DELETE_ALL)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
            tx.commit().await.map_err(StorageError::from)?;

            Ok(result.rows_affected())
        }
    }
}
