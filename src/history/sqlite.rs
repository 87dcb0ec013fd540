use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use super::{HistoryEntry, HistoryStore, Role, HISTORY_LIMIT};
use crate::rag::RagError;

const SCHEMA_VERSION: i64 = 1;

/// History persisted in a local SQLite file so sessions survive restarts.
#[derive(Debug, Clone)]
pub struct SqliteHistoryStore {
    db_path: PathBuf,
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, RagError> {
        let db_path = db_path.as_ref().to_path_buf();
        let connect_options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(connect_options)
            .await
            .map_err(RagError::history)?;

        let store = Self { db_path, pool };
        store.init_db().await?;
        tracing::info!("Conversation history stored in {}", store.db_path.display());
        Ok(store)
    }

    async fn init_db(&self) -> Result<(), RagError> {
        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await
            .map_err(RagError::history)?;

        if version != SCHEMA_VERSION {
            self.rebuild_schema().await?;
        }
        Ok(())
    }

    async fn rebuild_schema(&self) -> Result<(), RagError> {
        let mut tx = self.pool.begin().await.map_err(RagError::history)?;

        sqlx::query("DROP TABLE IF EXISTS history_entries")
            .execute(&mut *tx)
            .await
            .map_err(RagError::history)?;

        sqlx::query(
            "\
            CREATE TABLE history_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_key TEXT NOT NULL,
                role TEXT NOT NULL CHECK(role IN ('user', 'assistant')),
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&mut *tx)
        .await
        .map_err(RagError::history)?;

        sqlx::query("CREATE INDEX idx_history_session_id ON history_entries(session_key, id)")
            .execute(&mut *tx)
            .await
            .map_err(RagError::history)?;

        let pragma = format!("PRAGMA user_version = {}", SCHEMA_VERSION);
        sqlx::query(&pragma)
            .execute(&mut *tx)
            .await
            .map_err(RagError::history)?;

        tx.commit().await.map_err(RagError::history)?;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn get(&self, session: &str) -> Result<Vec<HistoryEntry>, RagError> {
        let rows = sqlx::query(
            "SELECT role, content FROM history_entries WHERE session_key = ?1 ORDER BY id ASC",
        )
        .bind(session)
        .fetch_all(&self.pool)
        .await
        .map_err(RagError::history)?;

        rows.into_iter().map(entry_from_row).collect()
    }

    async fn append(&self, session: &str, entry: HistoryEntry) -> Result<(), RagError> {
        let mut tx = self.pool.begin().await.map_err(RagError::history)?;
        insert_entry(&mut tx, session, entry.role, &entry.content).await?;
        trim_session(&mut tx, session).await?;
        tx.commit().await.map_err(RagError::history)?;
        Ok(())
    }

    async fn append_turn(
        &self,
        session: &str,
        user: &str,
        assistant: &str,
    ) -> Result<Vec<HistoryEntry>, RagError> {
        let mut tx = self.pool.begin().await.map_err(RagError::history)?;

        insert_entry(&mut tx, session, Role::User, user).await?;
        insert_entry(&mut tx, session, Role::Assistant, assistant).await?;
        trim_session(&mut tx, session).await?;

        let rows = sqlx::query(
            "SELECT role, content FROM history_entries WHERE session_key = ?1 ORDER BY id ASC",
        )
        .bind(session)
        .fetch_all(&mut *tx)
        .await
        .map_err(RagError::history)?;

        tx.commit().await.map_err(RagError::history)?;

        rows.into_iter().map(entry_from_row).collect()
    }

    async fn clear(&self, session: &str) -> Result<(), RagError> {
        sqlx::query("DELETE FROM history_entries WHERE session_key = ?1")
            .bind(session)
            .execute(&self.pool)
            .await
            .map_err(RagError::history)?;
        Ok(())
    }
}

async fn insert_entry(
    tx: &mut Transaction<'_, Sqlite>,
    session: &str,
    role: Role,
    content: &str,
) -> Result<(), RagError> {
    sqlx::query(
        "INSERT INTO history_entries (session_key, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(session)
    .bind(role.as_str())
    .bind(content)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut **tx)
    .await
    .map_err(RagError::history)?;
    Ok(())
}

async fn trim_session(tx: &mut Transaction<'_, Sqlite>, session: &str) -> Result<(), RagError> {
    sqlx::query(
        "\
        DELETE FROM history_entries
        WHERE session_key = ?1
          AND id NOT IN (
            SELECT id FROM history_entries
            WHERE session_key = ?1
            ORDER BY id DESC
            LIMIT ?2
          )",
    )
    .bind(session)
    .bind(HISTORY_LIMIT as i64)
    .execute(&mut **tx)
    .await
    .map_err(RagError::history)?;
    Ok(())
}

fn entry_from_row(row: SqliteRow) -> Result<HistoryEntry, RagError> {
    let raw_role: String = row.try_get("role").map_err(RagError::history)?;
    let role = Role::parse(&raw_role)
        .ok_or_else(|| RagError::History(format!("unknown role '{}'", raw_role)))?;
    let content: String = row.try_get("content").map_err(RagError::history)?;
    Ok(HistoryEntry { role, content })
}
