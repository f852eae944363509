//! Database migrations.
//!
//! Migrations run in order and are tracked in the `migrations` table.

use crate::DatabaseResult;
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> DatabaseResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    info!(current_version, target_version = CURRENT_VERSION, "Running migrations");

    if current_version < 1 {
        migrate_v1_user_data(conn)?;
    }

    Ok(())
}

fn record_migration(conn: &Connection, version: i32, name: &str) -> DatabaseResult<()> {
    conn.execute(
        "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![version, name],
    )?;
    debug!(version, name, "Migration applied");
    Ok(())
}

/// V1: starred debates and per-debate progress.
///
/// `starred.debate_pk` and `progress.debate_pk` are deliberately not UNIQUE:
/// duplicates are detected on read and reported as corruption instead of
/// being silently rejected on write.
fn migrate_v1_user_data(conn: &Connection) -> DatabaseResult<()> {
    info!("Applying migration v1: user data");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS starred (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            debate_pk INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_starred_debate_pk ON starred(debate_pk);

        CREATE TABLE IF NOT EXISTS progress (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            debate_pk INTEGER NOT NULL,
            completed_percentage INTEGER NOT NULL DEFAULT 0
                CHECK (completed_percentage BETWEEN 0 AND 100),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_progress_debate_pk ON progress(debate_pk);

        CREATE TABLE IF NOT EXISTS seen_points (
            progress_id INTEGER NOT NULL REFERENCES progress(id) ON DELETE CASCADE,
            point_pk INTEGER NOT NULL,
            position INTEGER NOT NULL,
            PRIMARY KEY (progress_id, point_pk)
        );
        ",
    )?;

    record_migration(conn, 1, "user_data")?;
    Ok(())
}
