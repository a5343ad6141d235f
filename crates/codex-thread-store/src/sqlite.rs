//! SQLite implementation of the thread store.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

use crate::error::StoreResult;
use crate::types::{
    normalize_conversation_id, normalize_provider, Scope, ThreadRecord, ThreadUpsert,
};
use crate::ThreadStore;

/// SQLite-backed thread mapping store.
pub struct SqliteThreadStore {
    conn: Mutex<Connection>,
}

impl SqliteThreadStore {
    /// Opens a SQLite database at the given path, creating the schema if
    /// it does not exist.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Creates an in-memory store. Useful for testing.
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Wraps an existing connection without touching the schema.
    ///
    /// Used when the table lives in a database owned by another component
    /// and may not have been migrated yet; operations then surface
    /// `StoreError::MissingTable` until it appears.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Creates the `codex_threads` table and its index.
    pub fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock().expect("lock poisoned");
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS codex_threads (
                user_id TEXT NOT NULL,
                provider TEXT NOT NULL,
                scope TEXT NOT NULL,
                conversation_id TEXT NOT NULL,
                thread_id TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (user_id, provider, scope, conversation_id)
            );

            CREATE INDEX IF NOT EXISTS idx_codex_threads_user ON codex_threads(user_id, provider);
            "#,
        )?;
        Ok(())
    }

    fn now_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

impl ThreadStore for SqliteThreadStore {
    fn upsert(&self, record: &ThreadUpsert) -> StoreResult<()> {
        if record.user_id.trim().is_empty() || record.thread_id.trim().is_empty() {
            debug!("Skipping thread upsert with blank user or thread id");
            return Ok(());
        }

        let provider = normalize_provider(&record.provider);
        let conversation_id = normalize_conversation_id(record.scope, &record.conversation_id);

        let conn = self.conn.lock().expect("lock poisoned");
        conn.execute(
            r#"
            INSERT INTO codex_threads (user_id, provider, scope, conversation_id, thread_id, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(user_id, provider, scope, conversation_id)
            DO UPDATE SET
                thread_id = excluded.thread_id,
                updated_at = excluded.updated_at
            "#,
            params![
                record.user_id,
                provider,
                record.scope.as_str(),
                conversation_id,
                record.thread_id,
                Self::now_millis(),
            ],
        )?;
        Ok(())
    }

    fn find_thread_id(
        &self,
        user_id: &str,
        provider: &str,
        scope: Scope,
        conversation_id: &str,
    ) -> StoreResult<Option<String>> {
        if user_id.trim().is_empty() {
            return Ok(None);
        }

        let provider = normalize_provider(provider);
        let conversation_id = normalize_conversation_id(scope, conversation_id);

        let conn = self.conn.lock().expect("lock poisoned");
        let thread_id = conn
            .query_row(
                r#"
                SELECT thread_id
                FROM codex_threads
                WHERE user_id = ?1
                  AND provider = ?2
                  AND scope = ?3
                  AND conversation_id = ?4
                LIMIT 1
                "#,
                params![user_id, provider, scope.as_str(), conversation_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(thread_id)
    }

    fn list_all(&self) -> StoreResult<Vec<ThreadRecord>> {
        let conn = self.conn.lock().expect("lock poisoned");
        let mut stmt = conn.prepare(
            r#"
            SELECT user_id, provider, scope, conversation_id, thread_id, updated_at
            FROM codex_threads
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ThreadRecord {
                user_id: row.get(0)?,
                provider: row.get(1)?,
                scope: Scope::parse(&row.get::<_, String>(2)?),
                conversation_id: row.get(3)?,
                thread_id: row.get(4)?,
                updated_at_ms: row.get(5)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}
