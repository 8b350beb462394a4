use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use zap_types::{ContentKind, ShortCode, Zap, ZapId};

use crate::error::{StoreError, StoreResult};
use crate::traits::ZapRepository;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS zaps (
        id              TEXT PRIMARY KEY NOT NULL,
        short_code      TEXT NOT NULL UNIQUE,
        content_id      TEXT NOT NULL,
        kind            TEXT NOT NULL,
        display_name    TEXT,
        content_url     TEXT,
        original_url    TEXT,
        password_hash   TEXT,
        view_limit      INTEGER CHECK (view_limit IS NULL OR view_limit > 0),
        view_count      INTEGER NOT NULL DEFAULT 0 CHECK (view_count >= 0),
        expires_at_us   INTEGER,
        self_destruct   INTEGER NOT NULL DEFAULT 0,
        created_at_us   INTEGER NOT NULL,
        CHECK ((content_url IS NULL) <> (original_url IS NULL))
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_zaps_expires_at ON zaps (expires_at_us) \
     WHERE expires_at_us IS NOT NULL",
];

/// SQLite-backed zap repository.
///
/// Timestamps are stored as integer microseconds so range scans for the
/// expiry sweep compare numerically.
pub struct SqliteZapRepository {
    pool: Pool<Sqlite>,
}

impl SqliteZapRepository {
    /// Open (creating if missing) a database file and run migrations.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        // One writer connection keeps SQLite from reporting "database is locked"
        // under concurrent request load.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let repo = Self { pool };
        repo.migrate().await?;
        tracing::info!(path = %path.display(), "sqlite zap repository opened");
        Ok(repo)
    }

    /// A private in-memory database (tests and throwaway servers).
    pub async fn in_memory() -> StoreResult<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // The database lives only as long as its single connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;
        let repo = Self { pool };
        repo.migrate().await?;
        Ok(repo)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    async fn migrate(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(*statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn find_by_id(&self, id: ZapId) -> StoreResult<Option<Zap>> {
        let row = sqlx::query("SELECT * FROM zaps WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_row).transpose()
    }
}

fn to_micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

fn from_micros(us: i64, column: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_micros(us)
        .ok_or_else(|| StoreError::Corrupt(format!("{column} out of range: {us}")))
}

fn decode_row(row: &SqliteRow) -> StoreResult<Zap> {
    let corrupt = |e: zap_types::TypeError| StoreError::Corrupt(e.to_string());

    let id: String = row.try_get("id")?;
    let short_code: String = row.try_get("short_code")?;
    let content_id: String = row.try_get("content_id")?;
    let kind: String = row.try_get("kind")?;
    let expires_at_us: Option<i64> = row.try_get("expires_at_us")?;
    let created_at_us: i64 = row.try_get("created_at_us")?;

    Ok(Zap {
        id: id.parse().map_err(corrupt)?,
        short_code: ShortCode::parse(short_code).map_err(corrupt)?,
        content_id: ShortCode::parse(content_id).map_err(corrupt)?,
        kind: kind.parse::<ContentKind>().map_err(corrupt)?,
        display_name: row.try_get("display_name")?,
        content_url: row.try_get("content_url")?,
        original_url: row.try_get("original_url")?,
        password_hash: row.try_get("password_hash")?,
        view_limit: row.try_get("view_limit")?,
        view_count: row.try_get("view_count")?,
        expires_at: expires_at_us
            .map(|us| from_micros(us, "expires_at_us"))
            .transpose()?,
        self_destruct: row.try_get("self_destruct")?,
        created_at: from_micros(created_at_us, "created_at_us")?,
    })
}

fn map_insert_error(err: sqlx::Error, zap: &Zap) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return if db.message().contains("short_code") {
                StoreError::DuplicateKey {
                    field: "short_code",
                    value: zap.short_code.to_string(),
                }
            } else {
                StoreError::DuplicateKey {
                    field: "id",
                    value: zap.id.to_string(),
                }
            };
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl ZapRepository for SqliteZapRepository {
    async fn create(&self, zap: &Zap) -> StoreResult<Zap> {
        sqlx::query(
            r#"
            INSERT INTO zaps (
                id, short_code, content_id, kind, display_name, content_url,
                original_url, password_hash, view_limit, view_count,
                expires_at_us, self_destruct, created_at_us
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(zap.id.to_string())
        .bind(zap.short_code.as_str())
        .bind(zap.content_id.as_str())
        .bind(zap.kind.as_str())
        .bind(&zap.display_name)
        .bind(&zap.content_url)
        .bind(&zap.original_url)
        .bind(&zap.password_hash)
        .bind(zap.view_limit)
        .bind(zap.view_count)
        .bind(zap.expires_at.map(to_micros))
        .bind(zap.self_destruct)
        .bind(to_micros(zap.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, zap))?;

        self.find_by_id(zap.id)
            .await?
            .ok_or(StoreError::NotFound(zap.id))
    }

    async fn find_by_short_code(&self, code: &ShortCode) -> StoreResult<Option<Zap>> {
        let row = sqlx::query("SELECT * FROM zaps WHERE short_code = ?")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn increment_view_count(&self, id: ZapId, expected_current: u32) -> StoreResult<Zap> {
        let row = sqlx::query(
            "UPDATE zaps SET view_count = view_count + 1 \
             WHERE id = ? AND view_count = ? RETURNING *",
        )
        .bind(id.to_string())
        .bind(expected_current)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => decode_row(&row),
            None => match self.find_by_id(id).await? {
                Some(_) => Err(StoreError::Conflict {
                    id,
                    expected: expected_current,
                }),
                None => Err(StoreError::NotFound(id)),
            },
        }
    }

    async fn delete(&self, id: ZapId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM zaps WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> StoreResult<Vec<Zap>> {
        let now_us = to_micros(now);
        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query(
            "SELECT * FROM zaps WHERE expires_at_us IS NOT NULL AND expires_at_us < ?",
        )
        .bind(now_us)
        .fetch_all(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM zaps WHERE expires_at_us IS NOT NULL AND expires_at_us < ?")
            .bind(now_us)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        rows.iter().map(decode_row).collect()
    }
}
