//! SQLite-backed playtime record storage.
//!
//! A single-file database with one table keyed by user id. The journal is
//! kept in DELETE mode so the database stays one visible file on disk; writes
//! are one per connect/disconnect, so giving up WAL write concurrency is fine.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use playtime_domain::{PlayMinutes, UserId, UserRecord};

use crate::infrastructure::ports::{RecordStore, RepoError};

const MAX_CONNECTIONS: u32 = 4;

/// SQLite implementation of [`RecordStore`].
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Open (creating if absent) the database at `path` and ensure the schema.
    pub async fn open(path: &Path) -> Result<Self, RepoError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RepoError::database("user_records.open", e))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Delete);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| RepoError::database("user_records.open", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_records (
                user_id INTEGER PRIMARY KEY NOT NULL,
                last_login TEXT NOT NULL,
                cumulative_play_minutes INTEGER NOT NULL DEFAULT 0
                    CHECK (cumulative_play_minutes >= 0)
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| RepoError::database("user_records.schema", e))?;

        Ok(Self { pool })
    }

    /// Expose underlying pool for diagnostics and tests.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn row_to_record(row: &SqliteRow) -> Result<UserRecord, RepoError> {
        let user_id: i64 = row
            .try_get("user_id")
            .map_err(RepoError::serialization)?;
        let last_login: String = row
            .try_get("last_login")
            .map_err(RepoError::serialization)?;
        let minutes: i64 = row
            .try_get("cumulative_play_minutes")
            .map_err(RepoError::serialization)?;

        let last_login = DateTime::parse_from_rfc3339(&last_login)
            .map_err(|e| RepoError::serialization(format!("invalid last_login {last_login:?}: {e}")))?
            .with_timezone(&Utc);
        let minutes = PlayMinutes::try_from(minutes).map_err(RepoError::serialization)?;

        Ok(UserRecord::restore(
            user_id_from_db(user_id),
            last_login,
            minutes,
        ))
    }
}

// SQLite integers are signed; the u64 id is stored bit-for-bit.
fn user_id_to_db(user_id: UserId) -> i64 {
    user_id.get() as i64
}

fn user_id_from_db(raw: i64) -> UserId {
    UserId::new(raw as u64)
}

fn timestamp_to_db(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn get(&self, user_id: UserId) -> Result<Option<UserRecord>, RepoError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| RepoError::database("user_records.get", e))?;

        let row = sqlx::query(
            r#"
            SELECT user_id, last_login, cumulative_play_minutes
            FROM user_records
            WHERE user_id = ?
            "#,
        )
        .bind(user_id_to_db(user_id))
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| RepoError::database("user_records.get", e))?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn upsert(&self, record: &UserRecord) -> Result<(), RepoError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| RepoError::database("user_records.upsert", e))?;

        sqlx::query(
            r#"
            INSERT INTO user_records (user_id, last_login, cumulative_play_minutes)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                last_login = excluded.last_login,
                cumulative_play_minutes = excluded.cumulative_play_minutes
            "#,
        )
        .bind(user_id_to_db(record.user_id()))
        .bind(timestamp_to_db(record.last_login()))
        .bind(i64::from(record.cumulative_play_minutes()))
        .execute(&mut *conn)
        .await
        .map_err(|e| RepoError::database("user_records.upsert", e))?;

        Ok(())
    }

    async fn count(&self) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_records")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::database("user_records.count", e))?;
        Ok(count.max(0) as u64)
    }
}
