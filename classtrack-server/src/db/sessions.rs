//! Session store operations

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use classtrack_common::{time, Error, Result};

use crate::models::Session;

fn session_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Session> {
    let start_time: String = row.get("start_time");
    let end_time: Option<String> = row.get("end_time");
    Ok(Session {
        id: row.get("id"),
        meeting_code: row.get("meeting_code"),
        tutor_id: row.get("tutor_id"),
        start_time: time::from_db(&start_time)?,
        end_time: time::from_db_opt(end_time)?,
        ai_summary: row.get("ai_summary"),
    })
}

/// Create a session for a meeting, returning the new id
pub async fn create_session(
    pool: &SqlitePool,
    meeting_code: &str,
    tutor_id: i64,
    start_time: DateTime<Utc>,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO sessions (meeting_code, tutor_id, start_time) VALUES (?, ?, ?)",
    )
    .bind(meeting_code)
    .bind(tutor_id)
    .bind(time::to_db(start_time))
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Fetch a session by id
pub async fn get_session(pool: &SqlitePool, session_id: i64) -> Result<Session> {
    let row = sqlx::query("SELECT * FROM sessions WHERE id = ?")
        .bind(session_id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => session_from_row(&row),
        None => Err(Error::NotFound(format!("No session with id {}", session_id))),
    }
}

/// Look up a session by its provider meeting code
pub async fn find_by_meeting_code(pool: &SqlitePool, meeting_code: &str) -> Result<Option<Session>> {
    let row = sqlx::query("SELECT * FROM sessions WHERE meeting_code = ?")
        .bind(meeting_code)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(session_from_row).transpose()
}

/// Close a session
///
/// Only sets end_time when it is currently unset, so a webhook tutor-exit and
/// the scheduler's window-elapsed sweep cannot move an already-closed session.
pub async fn set_end_time(
    pool: &SqlitePool,
    session_id: i64,
    end_time: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query("UPDATE sessions SET end_time = ? WHERE id = ? AND end_time IS NULL")
        .bind(time::to_db(end_time))
        .bind(session_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// All active sessions (no end time), newest first
pub async fn active_sessions(pool: &SqlitePool) -> Result<Vec<Session>> {
    let rows = sqlx::query(
        "SELECT * FROM sessions WHERE end_time IS NULL ORDER BY start_time DESC",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(session_from_row).collect()
}
