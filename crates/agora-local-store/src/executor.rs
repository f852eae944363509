//! Async SQLite executor using a dedicated background thread.
//!
//! All statements for one database file run on a single thread owned by
//! `tokio-rusqlite`. Callers send closures over a channel and await the
//! result, so the Tokio workers never block on disk I/O and statements
//! execute in FIFO order.
//!
//! ```ignore
//! let db = AsyncDatabase::open(path).await?;
//! let starred = db.call(|conn| queries::list_starred(conn)).await?;
//! ```
//!
//! Only SQL and row mapping belong inside `call()`. Anything else holds up
//! every other statement queued behind it.

use crate::{migrations, DatabaseError, DatabaseResult};
use std::path::Path;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

fn from_tokio_rusqlite(e: tokio_rusqlite::Error) -> DatabaseError {
    match e {
        tokio_rusqlite::Error::Rusqlite(e) => DatabaseError::Sqlite(e),
        tokio_rusqlite::Error::Close(_) => DatabaseError::Connection("Connection closed".to_string()),
        other => DatabaseError::Connection(other.to_string()),
    }
}

/// Async SQLite database with a dedicated executor thread.
#[derive(Clone)]
pub struct AsyncDatabase {
    conn: Connection,
    path: String,
}

impl AsyncDatabase {
    /// Open (creating if needed) the database at `path`, apply pragmas and
    /// run pending migrations.
    pub async fn open(path: &Path) -> DatabaseResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let path_str = path.to_string_lossy().to_string();
        info!(path = %path_str, "Opening local store");

        let conn = Connection::open(path_str.clone())
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        let db = Self {
            conn,
            path: path_str,
        };

        db.call_sqlite(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA foreign_keys = ON;
                PRAGMA busy_timeout = 5000;
                ",
            )
        })
        .await?;

        db.call(|conn| migrations::run_migrations(conn)).await?;

        info!(path = %db.path, "Local store ready");
        Ok(db)
    }

    /// Run `f` on the SQLite thread and await its result.
    pub async fn call<F, T>(&self, f: F) -> DatabaseResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> DatabaseResult<T> + Send + 'static,
        T: Send + 'static,
    {
        // The domain result rides inside tokio_rusqlite's Ok so our own error
        // variants survive the channel hop untouched.
        let outer = self.conn.call(move |conn| Ok(f(conn))).await;

        match outer {
            Ok(inner) => inner,
            Err(e) => Err(from_tokio_rusqlite(e)),
        }
    }

    /// Same as [`call`](Self::call) for closures that only produce rusqlite errors.
    pub async fn call_sqlite<F, T>(&self, f: F) -> DatabaseResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.conn
            .call(move |conn| Ok(f(conn)?))
            .await
            .map_err(from_tokio_rusqlite)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn health_check(&self) -> DatabaseResult<()> {
        self.call_sqlite(|conn| conn.execute_batch("SELECT 1")).await?;
        debug!("Local store health check passed");
        Ok(())
    }

    /// Wait for queued statements, then stop the executor thread.
    pub async fn close(self) -> DatabaseResult<()> {
        self.conn
            .close()
            .await
            .map_err(|e| DatabaseError::Connection(format!("Failed to close database: {:?}", e)))?;
        info!(path = %self.path, "Local store closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested/agora.sqlite");

        let db = AsyncDatabase::open(&db_path).await.unwrap();
        assert!(db.health_check().await.is_ok());
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_call_preserves_domain_errors() {
        let dir = tempdir().unwrap();
        let db = AsyncDatabase::open(&dir.path().join("errors.sqlite")).await.unwrap();

        let result: DatabaseResult<()> = db
            .call(|_| {
                Err(DatabaseError::Corrupted {
                    entity: "starred",
                    count: 2,
                })
            })
            .await;

        assert!(matches!(
            result,
            Err(DatabaseError::Corrupted { entity: "starred", count: 2 })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_writes_are_serialized() {
        let dir = tempdir().unwrap();
        let db = AsyncDatabase::open(&dir.path().join("concurrent.sqlite")).await.unwrap();

        let mut handles = vec![];
        for debate in 0..10 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.call_sqlite(move |conn| {
                    conn.execute("INSERT INTO starred (debate_pk) VALUES (?1)", [debate])
                })
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let count: i64 = db
            .call_sqlite(|conn| conn.query_row("SELECT COUNT(*) FROM starred", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(count, 10);
    }
}
