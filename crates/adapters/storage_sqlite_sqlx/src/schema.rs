//! Expected table shape, live table introspection and schema identity.
//!
//! The `timers` table is described once here. At open time the live column
//! set (read with `pragma_table_info`) is compared with [`TableInfo::expected`]
//! by set equality; any difference is fatal.

use std::collections::BTreeMap;
use std::fmt;

use sha2::{Digest, Sha256};
use sqlx::{Row, SqliteConnection};

use workout_timer_domain::timer::TimerConfig;

use crate::error::StorageError;
use crate::timer_repo;

/// Schema version written to `PRAGMA user_version` by a fully migrated store.
pub const LATEST_VERSION: i64 = 3;

/// Key of the single row in `schema_master` holding the identity pair.
pub const MASTER_ROW_ID: i64 = 42;

const ENTITY: &str = "TimerConfig";

pub(crate) const CREATE_TIMERS: &str = "CREATE TABLE IF NOT EXISTS `timers` (`id` INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, `name` TEXT NOT NULL, `timerMode` TEXT NOT NULL, `totalMinutes` INTEGER NOT NULL, `audioEnabled` INTEGER NOT NULL, `audioType` TEXT NOT NULL, `countdownSeconds` INTEGER NOT NULL, `initialCountdownSeconds` INTEGER NOT NULL, `holdSeconds` INTEGER NOT NULL, `restSeconds` INTEGER NOT NULL, `totalRepetitions` INTEGER NOT NULL, `createdAt` INTEGER NOT NULL)";
const DROP_TIMERS: &str = "DROP TABLE IF EXISTS `timers`";
const CREATE_MASTER: &str = "CREATE TABLE IF NOT EXISTS schema_master (id INTEGER PRIMARY KEY, identity_hash TEXT NOT NULL, query_hash TEXT NOT NULL)";
const WRITE_IDENTITY: &str =
    "INSERT OR REPLACE INTO schema_master (id, identity_hash, query_hash) VALUES (?, ?, ?)";
const READ_IDENTITY: &str = "SELECT identity_hash FROM schema_master WHERE id = ?";
const TABLE_EXISTS: &str = "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?";
const TABLE_INFO: &str = r#"SELECT name, type, "notnull", pk FROM pragma_table_info(?)"#;

/// `(name, declared type, primary-key position)`; every column is `NOT NULL`.
const EXPECTED_COLUMNS: [(&str, &str, u32); 12] = [
    ("id", "INTEGER", 1),
    ("name", "TEXT", 0),
    ("timerMode", "TEXT", 0),
    ("totalMinutes", "INTEGER", 0),
    ("audioEnabled", "INTEGER", 0),
    ("audioType", "TEXT", 0),
    ("countdownSeconds", "INTEGER", 0),
    ("initialCountdownSeconds", "INTEGER", 0),
    ("holdSeconds", "INTEGER", 0),
    ("restSeconds", "INTEGER", 0),
    ("totalRepetitions", "INTEGER", 0),
    ("createdAt", "INTEGER", 0),
];

/// `SQLite` type affinity of a declared column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    Integer,
    Text,
    Blob,
    Real,
    Numeric,
}

impl Affinity {
    /// Apply `SQLite`'s affinity rules to a declared type, in rule order.
    #[must_use]
    pub fn from_declared_type(declared: &str) -> Self {
        let declared = declared.to_ascii_uppercase();
        if declared.contains("INT") {
            Self::Integer
        } else if ["CHAR", "CLOB", "TEXT"].iter().any(|t| declared.contains(t)) {
            Self::Text
        } else if declared.is_empty() || declared.contains("BLOB") {
            Self::Blob
        } else if ["REAL", "FLOA", "DOUB"].iter().any(|t| declared.contains(t)) {
            Self::Real
        } else {
            Self::Numeric
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
            Self::Real => "REAL",
            Self::Numeric => "NUMERIC",
        }
    }
}

/// One column descriptor as compared at open time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub affinity: Affinity,
    pub not_null: bool,
    /// 1-based position in the primary key, 0 when not part of it.
    pub primary_key_position: u32,
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.affinity.as_str())?;
        if self.not_null {
            f.write_str(" NOT NULL")?;
        }
        if self.primary_key_position > 0 {
            write!(f, " PRIMARY KEY({})", self.primary_key_position)?;
        }
        Ok(())
    }
}

/// A table's column set, keyed by column name so comparison ignores order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub name: String,
    pub columns: BTreeMap<String, Column>,
}

impl TableInfo {
    /// The column set a fully migrated `timers` table must have.
    #[must_use]
    pub fn expected() -> Self {
        let columns = EXPECTED_COLUMNS
            .iter()
            .map(|&(name, declared, pk)| {
                let column = Column {
                    name: name.to_string(),
                    affinity: Affinity::from_declared_type(declared),
                    not_null: true,
                    primary_key_position: pk,
                };
                (name.to_string(), column)
            })
            .collect();
        Self {
            name: TimerConfig::TABLE.to_string(),
            columns,
        }
    }

    /// Read the live column set of `table`. A missing table has no columns.
    ///
    /// # Errors
    ///
    /// Returns the underlying sqlx error if the introspection query fails.
    pub async fn read(conn: &mut SqliteConnection, table: &str) -> Result<Self, sqlx::Error> {
        let rows = sqlx::query(TABLE_INFO)
            .bind(table)
            .fetch_all(&mut *conn)
            .await?;

        let mut columns = BTreeMap::new();
        for row in rows {
            let name: String = row.try_get("name")?;
            let declared: String = row.try_get("type")?;
            let not_null: i64 = row.try_get("notnull")?;
            let pk: i64 = row.try_get("pk")?;
            let column = Column {
                name: name.clone(),
                affinity: Affinity::from_declared_type(&declared),
                not_null: not_null != 0,
                primary_key_position: u32::try_from(pk).unwrap_or_default(),
            };
            columns.insert(name, column);
        }

        Ok(Self {
            name: table.to_string(),
            columns,
        })
    }

    /// Compare against the live table, describing every difference.
    #[must_use]
    pub fn diff(&self, found: &TableInfo) -> Option<SchemaMismatch> {
        if self == found {
            return None;
        }
        let missing = self
            .columns
            .keys()
            .filter(|name| !found.columns.contains_key(*name))
            .cloned()
            .collect();
        let unexpected = found
            .columns
            .keys()
            .filter(|name| !self.columns.contains_key(*name))
            .cloned()
            .collect();
        let changed = self
            .columns
            .iter()
            .filter(|(name, column)| found.columns.get(*name).is_some_and(|live| live != *column))
            .map(|(name, _)| name.clone())
            .collect();

        Some(SchemaMismatch {
            entity: ENTITY,
            expected: self.clone(),
            found: found.clone(),
            missing,
            unexpected,
            changed,
        })
    }
}

impl fmt::Display for TableInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {{", self.name)?;
        for column in self.columns.values() {
            writeln!(f, "  {column}")?;
        }
        f.write_str("}")
    }
}

/// Diagnostic for a live table that differs from the expected shape.
#[derive(Debug, Clone)]
pub struct SchemaMismatch {
    pub entity: &'static str,
    pub expected: TableInfo,
    pub found: TableInfo,
    /// Expected columns absent from the live table.
    pub missing: Vec<String>,
    /// Live columns the entity does not declare.
    pub unexpected: Vec<String>,
    /// Columns present on both sides with different type, nullability or key.
    pub changed: Vec<String>,
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}({}) does not match the expected schema (missing: [{}], unexpected: [{}], changed: [{}])",
            self.expected.name,
            self.entity,
            self.missing.join(", "),
            self.unexpected.join(", "),
            self.changed.join(", "),
        )?;
        writeln!(f, " Expected:\n{}", self.expected)?;
        write!(f, " Found:\n{}", self.found)
    }
}

impl std::error::Error for SchemaMismatch {}

/// SHA-256 of the canonical `timers` definition, hex encoded.
#[must_use]
pub fn identity_hash() -> String {
    format!("{:x}", Sha256::digest(CREATE_TIMERS.as_bytes()))
}

/// SHA-256 of the row-access statement templates, hex encoded.
#[must_use]
pub fn query_hash() -> String {
    format!(
        "{:x}",
        Sha256::digest(timer_repo::STATEMENTS.join("\n").as_bytes())
    )
}

pub(crate) async fn user_version(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(&mut *conn)
        .await
}

pub(crate) async fn set_user_version(
    conn: &mut SqliteConnection,
    version: i64,
) -> Result<(), sqlx::Error> {
    let statement = format!("PRAGMA user_version = {version}");
    sqlx::query(&statement).execute(&mut *conn).await?;
    Ok(())
}

pub(crate) async fn table_exists(
    conn: &mut SqliteConnection,
    table: &str,
) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(TABLE_EXISTS)
        .bind(table)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

/// Create the latest schema and record its identity and version.
pub(crate) async fn create_all(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_TIMERS).execute(&mut *conn).await?;
    write_identity(conn).await?;
    set_user_version(conn, LATEST_VERSION).await
}

pub(crate) async fn drop_all(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(DROP_TIMERS).execute(&mut *conn).await?;
    Ok(())
}

pub(crate) async fn write_identity(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_MASTER).execute(&mut *conn).await?;
    sqlx::query(WRITE_IDENTITY)
        .bind(MASTER_ROW_ID)
        .bind(identity_hash())
        .bind(query_hash())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub(crate) async fn read_identity(
    conn: &mut SqliteConnection,
) -> Result<Option<String>, sqlx::Error> {
    if !table_exists(conn, "schema_master").await? {
        return Ok(None);
    }
    sqlx::query_scalar(READ_IDENTITY)
        .bind(MASTER_ROW_ID)
        .fetch_optional(&mut *conn)
        .await
}

/// Fail unless the live `timers` table has exactly the expected columns.
pub(crate) async fn validate(conn: &mut SqliteConnection) -> Result<(), StorageError> {
    let found = TableInfo::read(conn, TimerConfig::TABLE).await?;
    match TableInfo::expected().diff(&found) {
        None => Ok(()),
        Some(mismatch) => Err(Box::new(mismatch).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, affinity: Affinity, pk: u32) -> Column {
        Column {
            name: name.to_string(),
            affinity,
            not_null: true,
            primary_key_position: pk,
        }
    }

    #[test]
    fn should_apply_sqlite_affinity_rules() {
        assert_eq!(Affinity::from_declared_type("INTEGER"), Affinity::Integer);
        assert_eq!(Affinity::from_declared_type("bigint"), Affinity::Integer);
        assert_eq!(Affinity::from_declared_type("VARCHAR(32)"), Affinity::Text);
        assert_eq!(Affinity::from_declared_type(""), Affinity::Blob);
        assert_eq!(Affinity::from_declared_type("DOUBLE"), Affinity::Real);
        assert_eq!(Affinity::from_declared_type("DECIMAL"), Affinity::Numeric);
        // "INT" wins over "CHAR" because its rule comes first.
        assert_eq!(Affinity::from_declared_type("CHARINT"), Affinity::Integer);
    }

    #[test]
    fn should_describe_expected_table() {
        let expected = TableInfo::expected();
        assert_eq!(expected.name, "timers");
        assert_eq!(expected.columns.len(), 12);
        assert_eq!(expected.columns["id"].primary_key_position, 1);
        assert_eq!(expected.columns["timerMode"].affinity, Affinity::Text);
        assert!(expected.columns.values().all(|c| c.not_null));
    }

    #[test]
    fn should_report_no_diff_for_identical_tables() {
        let expected = TableInfo::expected();
        assert!(expected.diff(&expected.clone()).is_none());
    }

    #[test]
    fn should_name_missing_unexpected_and_changed_columns() {
        let expected = TableInfo::expected();
        let mut found = expected.clone();
        found.columns.remove("totalRepetitions");
        found
            .columns
            .insert("legacy".to_string(), column("legacy", Affinity::Text, 0));
        found
            .columns
            .insert("audioType".to_string(), column("audioType", Affinity::Integer, 0));

        let mismatch = expected.diff(&found).unwrap();
        assert_eq!(mismatch.missing, ["totalRepetitions"]);
        assert_eq!(mismatch.unexpected, ["legacy"]);
        assert_eq!(mismatch.changed, ["audioType"]);

        let message = mismatch.to_string();
        assert!(message.starts_with("timers(TimerConfig)"));
        assert!(message.contains("missing: [totalRepetitions]"));
        assert!(message.contains(" Expected:\n"));
        assert!(message.contains(" Found:\n"));
    }

    #[test]
    fn should_render_column_descriptor() {
        let id = column("id", Affinity::Integer, 1);
        assert_eq!(id.to_string(), "id INTEGER NOT NULL PRIMARY KEY(1)");
    }

    #[test]
    fn should_produce_stable_hex_hashes() {
        let identity = identity_hash();
        assert_eq!(identity.len(), 64);
        assert!(identity.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(identity, identity_hash());
        assert_ne!(identity, query_hash());
    }
}
