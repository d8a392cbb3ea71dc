//! Ordered, forward-only schema migrations.
//!
//! Each step upgrades the store by one or more versions inside its own
//! transaction and bumps `PRAGMA user_version` before committing, so an
//! interrupted upgrade resumes from the last completed step.

use sqlx::SqlitePool;

use crate::error::StorageError;
use crate::schema;

/// One schema delta from version `from` to version `to`.
#[derive(Debug)]
pub struct Migration {
    pub from: i64,
    pub to: i64,
    statements: &'static [&'static str],
}

/// Every known migration, additive only.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        from: 1,
        to: 2,
        statements: &[
            "ALTER TABLE `timers` ADD COLUMN `initialCountdownSeconds` INTEGER NOT NULL DEFAULT 0",
        ],
    },
    Migration {
        from: 2,
        to: 3,
        statements: &[
            // Presets created before modes existed were all weightlift timers.
            "ALTER TABLE `timers` ADD COLUMN `timerMode` TEXT NOT NULL DEFAULT 'WEIGHTLIFT'",
            "ALTER TABLE `timers` ADD COLUMN `holdSeconds` INTEGER NOT NULL DEFAULT 7",
            "ALTER TABLE `timers` ADD COLUMN `restSeconds` INTEGER NOT NULL DEFAULT 3",
            "ALTER TABLE `timers` ADD COLUMN `totalRepetitions` INTEGER NOT NULL DEFAULT 6",
        ],
    },
];

/// Find the chain of migrations leading from `from` to `to`.
///
/// At every version the step reaching furthest without overshooting `to` is
/// taken. Returns `None` when no chain exists, including any downgrade.
#[must_use]
pub fn plan(from: i64, to: i64) -> Option<Vec<&'static Migration>> {
    if from > to {
        return None;
    }
    let mut steps = Vec::new();
    let mut current = from;
    while current < to {
        let step = MIGRATIONS
            .iter()
            .filter(|m| m.from == current && m.to <= to)
            .max_by_key(|m| m.to)?;
        steps.push(step);
        current = step.to;
    }
    Some(steps)
}

/// Apply `steps` in order, one transaction per step.
pub(crate) async fn apply(pool: &SqlitePool, steps: &[&Migration]) -> Result<(), StorageError> {
    for step in steps {
        let mut tx = pool.begin().await?;
        for statement in step.statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        schema::set_user_version(&mut tx, step.to).await?;
        tx.commit().await?;
        tracing::info!(from = step.from, to = step.to, "applied schema migration");
    }
    Ok(())
}
