//! SQLite adapter for ViewStore
//!
//! One table, one row per key. `rusqlite::Connection` is not `Sync`, so the
//! connection sits behind a mutex and every statement runs on the tokio
//! blocking pool.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::{StoredView, ViewStore};
use crate::{Result, StorageError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS compiled_views (
    key        TEXT PRIMARY KEY,
    payload    BLOB NOT NULL,
    checksum   TEXT NOT NULL,
    stored_at  TEXT NOT NULL,
    metadata   TEXT NOT NULL
);
";

/// SQLite-backed view store
#[derive(Clone)]
pub struct SqliteViewStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteViewStore {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StorageError::database("connection mutex poisoned"))?;
            f(&guard)
        })
        .await?
    }
}

#[async_trait]
impl ViewStore for SqliteViewStore {
    async fn put(&self, entry: &StoredView) -> Result<()> {
        let entry = entry.clone();
        let metadata = serde_json::to_string(&entry.metadata)?;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO compiled_views (key, payload, checksum, stored_at, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.key,
                    entry.payload,
                    entry.checksum,
                    entry.stored_at,
                    metadata
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<Option<StoredView>> {
        let key = key.to_string();
        let row = self
            .with_conn(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT key, payload, checksum, stored_at, metadata
                         FROM compiled_views WHERE key = ?1",
                        params![key],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, Vec<u8>>(1)?,
                                row.get::<_, String>(2)?,
                                row.get::<_, DateTime<Utc>>(3)?,
                                row.get::<_, String>(4)?,
                            ))
                        },
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;

        match row {
            Some((key, payload, checksum, stored_at, metadata)) => {
                let entry = StoredView {
                    key,
                    payload,
                    checksum,
                    stored_at,
                    metadata: serde_json::from_str(&metadata)?,
                };
                entry.verify()?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let removed = conn.execute("DELETE FROM compiled_views WHERE key = ?1", params![key])?;
            Ok(removed > 0)
        })
        .await
    }

    async fn clear(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM compiled_views", [])?;
            Ok(())
        })
        .await
    }

    async fn len(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM compiled_views", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }
}
