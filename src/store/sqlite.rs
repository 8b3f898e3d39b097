//! SQLite-backed record store.
//!
//! The engine is sequential, so the store holds a single connection and
//! scopes the run's transaction with literal BEGIN/COMMIT/ROLLBACK on
//! it. Dependent children (`record_events`) hang off `records` with
//! `ON DELETE CASCADE`, so deleting a record removes them in the same
//! statement. The mutation listeners map to an `activity_stream` table
//! and a derived `update_count` on `sources`; both writes are skipped
//! while the engine has them suppressed.

use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{Connection, Row};
use tokio::sync::Mutex;

use super::{MutationListeners, RecordStore, StoreError, StoreResult};
use crate::models::{Category, ParentPointers, RecordDetail, RecordSnapshot, Status};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category TEXT NOT NULL,
    source_kind TEXT NOT NULL DEFAULT '',
    current_update_id INTEGER,
    last_update_id INTEGER,
    update_count INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category TEXT NOT NULL,
    name TEXT NOT NULL,
    status TEXT NOT NULL,
    created TEXT NOT NULL,
    detail TEXT NOT NULL DEFAULT '{}',
    source_id INTEGER REFERENCES sources (id)
);

CREATE INDEX IF NOT EXISTS idx_records_category ON records (category);

CREATE TABLE IF NOT EXISTS record_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    record_id INTEGER NOT NULL REFERENCES records (id) ON DELETE CASCADE,
    payload TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_record_events_record ON record_events (record_id);

CREATE TABLE IF NOT EXISTS activity_stream (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    operation TEXT NOT NULL,
    category TEXT NOT NULL,
    record_id INTEGER NOT NULL,
    recorded_at TEXT NOT NULL
);
"#;

pub struct SqliteStore {
    conn: Mutex<SqliteConnection>,
    in_transaction: AtomicBool,
    computed_fields_enabled: AtomicBool,
    activity_stream_enabled: AtomicBool,
}

impl SqliteStore {
    /// Open (creating if missing) a run-history database on disk.
    pub async fn open(path: &Path) -> StoreResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        Self::connect(options).await
    }

    /// Open a fresh in-memory database. Lives as long as the store.
    pub async fn open_in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        Self::connect(options).await
    }

    async fn connect(options: SqliteConnectOptions) -> StoreResult<Self> {
        let mut conn = SqliteConnection::connect_with(&options).await?;
        sqlx::raw_sql(SCHEMA).execute(&mut conn).await?;
        Ok(Self {
            conn: Mutex::new(conn),
            in_transaction: AtomicBool::new(false),
            computed_fields_enabled: AtomicBool::new(true),
            activity_stream_enabled: AtomicBool::new(true),
        })
    }

    /// Insert a parent entity; an empty `source_kind` means the source
    /// is not configured and its pointers do not protect anything.
    pub async fn insert_source(&self, category: Category, source_kind: &str) -> StoreResult<i64> {
        let mut conn = self.conn.lock().await;
        let result = sqlx::query("INSERT INTO sources (category, source_kind) VALUES (?, ?)")
            .bind(category.as_str())
            .bind(source_kind)
            .execute(&mut *conn)
            .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn set_source_pointers(
        &self,
        source_id: i64,
        current_update: Option<i64>,
        last_update: Option<i64>,
    ) -> StoreResult<()> {
        let mut conn = self.conn.lock().await;
        sqlx::query("UPDATE sources SET current_update_id = ?, last_update_id = ? WHERE id = ?")
            .bind(current_update)
            .bind(last_update)
            .bind(source_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn insert_record(
        &self,
        category: Category,
        name: &str,
        status: Status,
        created: DateTime<Utc>,
        detail: &RecordDetail,
        source_id: Option<i64>,
    ) -> StoreResult<i64> {
        let detail_json = serde_json::to_string(detail)?;
        let mut conn = self.conn.lock().await;
        let result = sqlx::query(
            r#"
            INSERT INTO records (category, name, status, created, detail, source_id)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(category.as_str())
        .bind(name)
        .bind(status.as_str())
        .bind(created)
        .bind(&detail_json)
        .bind(source_id)
        .execute(&mut *conn)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn insert_event(&self, record_id: i64, payload: &str) -> StoreResult<i64> {
        let mut conn = self.conn.lock().await;
        let result = sqlx::query("INSERT INTO record_events (record_id, payload) VALUES (?, ?)")
            .bind(record_id)
            .bind(payload)
            .execute(&mut *conn)
            .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn record_count(&self, category: Category) -> StoreResult<i64> {
        let mut conn = self.conn.lock().await;
        let row = sqlx::query("SELECT COUNT(*) AS n FROM records WHERE category = ?")
            .bind(category.as_str())
            .fetch_one(&mut *conn)
            .await?;
        Ok(row.get("n"))
    }

    pub async fn event_count(&self) -> StoreResult<i64> {
        let mut conn = self.conn.lock().await;
        let row = sqlx::query("SELECT COUNT(*) AS n FROM record_events")
            .fetch_one(&mut *conn)
            .await?;
        Ok(row.get("n"))
    }

    pub async fn activity_entry_count(&self) -> StoreResult<i64> {
        let mut conn = self.conn.lock().await;
        let row = sqlx::query("SELECT COUNT(*) AS n FROM activity_stream")
            .fetch_one(&mut *conn)
            .await?;
        Ok(row.get("n"))
    }

    pub async fn source_update_count(&self, source_id: i64) -> StoreResult<i64> {
        let mut conn = self.conn.lock().await;
        let row = sqlx::query("SELECT update_count FROM sources WHERE id = ?")
            .bind(source_id)
            .fetch_one(&mut *conn)
            .await?;
        Ok(row.get("update_count"))
    }

    fn snapshot_from_row(row: &sqlx::sqlite::SqliteRow) -> StoreResult<RecordSnapshot> {
        let status: String = row.get("status");
        let detail: String = row.get("detail");
        Ok(RecordSnapshot {
            id: row.get("id"),
            name: row.get("name"),
            status: Status::from_str(&status).map_err(StoreError::Internal)?,
            created: row.get("created"),
            detail: serde_json::from_str(&detail)?,
            parent: None,
        })
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn begin(&self) -> StoreResult<()> {
        if self.in_transaction.swap(true, Ordering::SeqCst) {
            return Err(StoreError::Internal(
                "transaction already in progress".into(),
            ));
        }
        let mut conn = self.conn.lock().await;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(())
    }

    async fn commit(&self) -> StoreResult<()> {
        if !self.in_transaction.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Internal("no transaction in progress".into()));
        }
        let mut conn = self.conn.lock().await;
        sqlx::query("COMMIT").execute(&mut *conn).await?;
        Ok(())
    }

    async fn rollback(&self) -> StoreResult<()> {
        if !self.in_transaction.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Internal("no transaction in progress".into()));
        }
        let mut conn = self.conn.lock().await;
        sqlx::query("ROLLBACK").execute(&mut *conn).await?;
        Ok(())
    }

    async fn list_records(&self, category: Category) -> StoreResult<Vec<RecordSnapshot>> {
        let mut conn = self.conn.lock().await;
        let rows = sqlx::query(
            r#"
            SELECT id, name, status, created, detail
            FROM records
            WHERE category = ?
            ORDER BY id
            "#,
        )
        .bind(category.as_str())
        .fetch_all(&mut *conn)
        .await?;

        rows.iter().map(Self::snapshot_from_row).collect()
    }

    async fn parent_pointers(
        &self,
        category: Category,
        record_id: i64,
    ) -> StoreResult<Option<ParentPointers>> {
        let mut conn = self.conn.lock().await;
        let row = sqlx::query(
            r#"
            SELECT s.current_update_id, s.last_update_id, s.source_kind
            FROM sources s
            JOIN records r ON r.source_id = s.id
            WHERE r.category = ? AND r.id = ?
            "#,
        )
        .bind(category.as_str())
        .bind(record_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(|row| {
            let source_kind: String = row.get("source_kind");
            ParentPointers {
                current_update: row.get("current_update_id"),
                last_update: row.get("last_update_id"),
                source_configured: !source_kind.is_empty(),
            }
        }))
    }

    async fn delete_record(&self, category: Category, record_id: i64) -> StoreResult<()> {
        let mut conn = self.conn.lock().await;

        let row = sqlx::query("SELECT source_id FROM records WHERE category = ? AND id = ?")
            .bind(category.as_str())
            .bind(record_id)
            .fetch_optional(&mut *conn)
            .await?;
        let source_id: Option<i64> = match row {
            Some(row) => row.get("source_id"),
            None => return Err(StoreError::NotFound),
        };

        // FK cascade removes record_events rows with the record.
        sqlx::query("DELETE FROM records WHERE category = ? AND id = ?")
            .bind(category.as_str())
            .bind(record_id)
            .execute(&mut *conn)
            .await?;

        if self.computed_fields_enabled.load(Ordering::SeqCst)
            && let Some(source_id) = source_id
        {
            sqlx::query(
                r#"
                UPDATE sources
                SET update_count = (SELECT COUNT(*) FROM records WHERE source_id = ?)
                WHERE id = ?
                "#,
            )
            .bind(source_id)
            .bind(source_id)
            .execute(&mut *conn)
            .await?;
        }

        if self.activity_stream_enabled.load(Ordering::SeqCst) {
            sqlx::query(
                r#"
                INSERT INTO activity_stream (operation, category, record_id, recorded_at)
                VALUES ('delete', ?, ?, ?)
                "#,
            )
            .bind(category.as_str())
            .bind(record_id)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }
}

impl MutationListeners for SqliteStore {
    fn set_computed_fields_enabled(&self, enabled: bool) {
        self.computed_fields_enabled.store(enabled, Ordering::SeqCst);
    }

    fn set_activity_stream_enabled(&self, enabled: bool) {
        self.activity_stream_enabled.store(enabled, Ordering::SeqCst);
    }
}
