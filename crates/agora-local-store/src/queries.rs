//! Standalone query functions.
//!
//! Each function takes a `&Connection` as its first parameter and is meant
//! to run inside [`AsyncDatabase::call`](crate::AsyncDatabase::call).

use crate::{DatabaseError, DatabaseResult, ProgressRecord, StarredRecord};
use agora_config_and_utils::models::{DebateId, PointId};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use tracing::debug;

/// At most one element of `rows`; more is corruption.
fn unique<T>(entity: &'static str, mut rows: Vec<T>) -> DatabaseResult<Option<T>> {
    match rows.len() {
        0 => Ok(None),
        1 => Ok(rows.pop()),
        count => Err(DatabaseError::Corrupted { entity, count }),
    }
}

// ==========================================
// Starred
// ==========================================

/// All starred records, oldest first.
pub fn list_starred(conn: &Connection) -> DatabaseResult<Vec<StarredRecord>> {
    let mut stmt = conn.prepare_cached("SELECT id, debate_pk FROM starred ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(StarredRecord {
                id: row.get(0)?,
                debate_id: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// The starred record for a debate, if any.
pub fn find_starred(conn: &Connection, debate_id: DebateId) -> DatabaseResult<Option<StarredRecord>> {
    let mut stmt = conn.prepare_cached("SELECT id, debate_pk FROM starred WHERE debate_pk = ?1")?;
    let rows = stmt
        .query_map(params![debate_id], |row| {
            Ok(StarredRecord {
                id: row.get(0)?,
                debate_id: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    unique("starred", rows)
}

pub fn insert_starred(conn: &Connection, debate_id: DebateId) -> DatabaseResult<StarredRecord> {
    conn.execute("INSERT INTO starred (debate_pk) VALUES (?1)", params![debate_id])?;
    let id = conn.last_insert_rowid();
    debug!(debate_id, "Starred record inserted");
    Ok(StarredRecord { id, debate_id })
}

pub fn delete_starred(conn: &Connection, id: i64) -> DatabaseResult<bool> {
    let count = conn.execute("DELETE FROM starred WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

/// Remove every starred record. Returns the number removed.
pub fn clear_starred(conn: &Connection) -> DatabaseResult<usize> {
    Ok(conn.execute("DELETE FROM starred", [])?)
}

// ==========================================
// Progress
// ==========================================

fn seen_points_by_progress(conn: &Connection) -> DatabaseResult<HashMap<i64, Vec<PointId>>> {
    let mut stmt = conn.prepare_cached(
        "SELECT progress_id, point_pk FROM seen_points ORDER BY progress_id, position",
    )?;
    let mut map: HashMap<i64, Vec<PointId>> = HashMap::new();
    let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, PointId>(1)?)))?;
    for row in rows {
        let (progress_id, point) = row?;
        map.entry(progress_id).or_default().push(point);
    }
    Ok(map)
}

fn seen_points_for(conn: &Connection, progress_id: i64) -> DatabaseResult<Vec<PointId>> {
    let mut stmt = conn.prepare_cached(
        "SELECT point_pk FROM seen_points WHERE progress_id = ?1 ORDER BY position",
    )?;
    let points = stmt
        .query_map(params![progress_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(points)
}

/// All progress records with their seen points.
pub fn list_progress(conn: &Connection) -> DatabaseResult<Vec<ProgressRecord>> {
    let mut seen = seen_points_by_progress(conn)?;
    let mut stmt = conn.prepare_cached(
        "SELECT id, debate_pk, completed_percentage FROM progress ORDER BY id",
    )?;
    let heads = stmt
        .query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, DebateId>(1)?, row.get::<_, u8>(2)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(heads
        .into_iter()
        .map(|(id, debate_id, completed_percentage)| ProgressRecord {
            id,
            debate_id,
            completed_percentage,
            seen_points: seen.remove(&id).unwrap_or_default(),
        })
        .collect())
}

/// The progress record for a debate, if any.
pub fn find_progress(conn: &Connection, debate_id: DebateId) -> DatabaseResult<Option<ProgressRecord>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, completed_percentage FROM progress WHERE debate_pk = ?1",
    )?;
    let heads = stmt
        .query_map(params![debate_id], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, u8>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    match unique("progress", heads)? {
        Some((id, completed_percentage)) => Ok(Some(ProgressRecord {
            id,
            debate_id,
            completed_percentage,
            seen_points: seen_points_for(conn, id)?,
        })),
        None => Ok(None),
    }
}

pub fn insert_progress(conn: &Connection, debate_id: DebateId) -> DatabaseResult<ProgressRecord> {
    conn.execute("INSERT INTO progress (debate_pk) VALUES (?1)", params![debate_id])?;
    let id = conn.last_insert_rowid();
    debug!(debate_id, "Progress record inserted");
    Ok(ProgressRecord {
        id,
        debate_id,
        completed_percentage: 0,
        seen_points: Vec::new(),
    })
}

/// Append points to a progress record, skipping ones already seen, and store
/// the new cached percentage. Returns how many points were new.
pub fn append_seen_points(
    conn: &Connection,
    progress_id: i64,
    points: &[PointId],
    completed_percentage: u8,
) -> DatabaseResult<usize> {
    let mut next_position: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM seen_points WHERE progress_id = ?1",
            params![progress_id],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0);

    let mut inserted = 0;
    {
        let mut stmt = conn.prepare_cached(
            "INSERT OR IGNORE INTO seen_points (progress_id, point_pk, position) VALUES (?1, ?2, ?3)",
        )?;
        for point in points {
            if stmt.execute(params![progress_id, point, next_position])? > 0 {
                inserted += 1;
                next_position += 1;
            }
        }
    }

    conn.execute(
        "UPDATE progress SET completed_percentage = ?2, updated_at = datetime('now') WHERE id = ?1",
        params![progress_id, completed_percentage],
    )?;
    Ok(inserted)
}

/// Remove every progress record and its seen points. Returns the number of
/// progress records removed.
pub fn clear_progress(conn: &Connection) -> DatabaseResult<usize> {
    conn.execute("DELETE FROM seen_points", [])?;
    Ok(conn.execute("DELETE FROM progress", [])?)
}
