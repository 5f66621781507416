//! Attendance interval store
//!
//! All mutations are narrow row-level updates with monotonic guards in the
//! WHERE clause: join times only move earlier, exit times are only set when
//! unset. Push-based webhook writes and polled reconciliation merges can
//! therefore interleave without clobbering more precise data.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use classtrack_common::{time, Result};

use crate::models::{AttendanceInterval, Identity, UserRole};

fn interval_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<AttendanceInterval> {
    let role: String = row.get("role");
    let user_id: i64 = row.get("user_id");
    let identity = match UserRole::parse(&role)? {
        UserRole::Tutor => Identity::Tutor(user_id),
        UserRole::Student => Identity::Student(user_id),
    };
    let join_time: String = row.get("join_time");
    let exit_time: Option<String> = row.get("exit_time");
    Ok(AttendanceInterval {
        id: row.get("id"),
        session_id: row.get("session_id"),
        user_email: row.get("user_email"),
        display_name: row.get("display_name"),
        identity,
        join_time: time::from_db(&join_time)?,
        exit_time: time::from_db_opt(exit_time)?,
        duration_minutes: row.get("duration_minutes"),
        needs_review: row.get::<i64, _>("needs_review") != 0,
    })
}

/// Insert a new interval, returning the new id
#[allow(clippy::too_many_arguments)]
pub async fn insert_interval(
    pool: &SqlitePool,
    session_id: i64,
    user_email: &str,
    display_name: Option<&str>,
    identity: Identity,
    join_time: DateTime<Utc>,
    exit_time: Option<DateTime<Utc>>,
    duration_minutes: f64,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO attendance_intervals
            (session_id, user_email, display_name, role, user_id, join_time, exit_time, duration_minutes)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(session_id)
    .bind(user_email)
    .bind(display_name)
    .bind(identity.role().as_str())
    .bind(identity.user_id())
    .bind(time::to_db(join_time))
    .bind(exit_time.map(time::to_db))
    .bind(duration_minutes)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Most recent open interval for a user in a session
///
/// Ordered by join time descending so the latest unclosed connect cycle is
/// the one an exit event closes.
pub async fn find_open_interval(
    pool: &SqlitePool,
    session_id: i64,
    user_email: &str,
) -> Result<Option<AttendanceInterval>> {
    let row = sqlx::query(
        r#"
        SELECT * FROM attendance_intervals
        WHERE session_id = ? AND user_email = ? AND exit_time IS NULL
        ORDER BY join_time DESC
        LIMIT 1
        "#,
    )
    .bind(session_id)
    .bind(user_email)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(interval_from_row).transpose()
}

/// Earliest interval for a user in a session, open or closed
///
/// The reconciliation merge anchors on this row: provider data carries the
/// participant's full reconnect history, so the earliest span is the one it
/// can extend conservatively.
pub async fn find_earliest_interval(
    pool: &SqlitePool,
    session_id: i64,
    user_email: &str,
) -> Result<Option<AttendanceInterval>> {
    let row = sqlx::query(
        r#"
        SELECT * FROM attendance_intervals
        WHERE session_id = ? AND user_email = ?
        ORDER BY join_time ASC
        LIMIT 1
        "#,
    )
    .bind(session_id)
    .bind(user_email)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(interval_from_row).transpose()
}

/// All intervals for a user in a session, join time ascending (stitching input)
pub async fn list_for_user(
    pool: &SqlitePool,
    session_id: i64,
    user_email: &str,
) -> Result<Vec<AttendanceInterval>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM attendance_intervals
        WHERE session_id = ? AND user_email = ?
        ORDER BY join_time ASC
        "#,
    )
    .bind(session_id)
    .bind(user_email)
    .fetch_all(pool)
    .await?;

    rows.iter().map(interval_from_row).collect()
}

/// All intervals for a session, most recent join first
pub async fn list_for_session(pool: &SqlitePool, session_id: i64) -> Result<Vec<AttendanceInterval>> {
    let rows = sqlx::query(
        "SELECT * FROM attendance_intervals WHERE session_id = ? ORDER BY join_time DESC",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(interval_from_row).collect()
}

/// Open intervals for a session (auto-closed when the class window elapses)
pub async fn open_intervals_for_session(
    pool: &SqlitePool,
    session_id: i64,
) -> Result<Vec<AttendanceInterval>> {
    let rows = sqlx::query(
        "SELECT * FROM attendance_intervals WHERE session_id = ? AND exit_time IS NULL",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(interval_from_row).collect()
}

/// Close an interval: set exit time and duration, only if still open
pub async fn close_interval(
    pool: &SqlitePool,
    interval_id: i64,
    exit_time: DateTime<Utc>,
    duration_minutes: f64,
    needs_review: bool,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE attendance_intervals
        SET exit_time = ?, duration_minutes = ?, needs_review = ?
        WHERE id = ? AND exit_time IS NULL
        "#,
    )
    .bind(time::to_db(exit_time))
    .bind(duration_minutes)
    .bind(needs_review as i64)
    .bind(interval_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Move an interval's join time earlier, never later
pub async fn move_join_earlier(
    pool: &SqlitePool,
    interval_id: i64,
    join_time: DateTime<Utc>,
    duration_minutes: f64,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE attendance_intervals
        SET join_time = ?, duration_minutes = ?
        WHERE id = ? AND join_time > ?
        "#,
    )
    .bind(time::to_db(join_time))
    .bind(duration_minutes)
    .bind(interval_id)
    .bind(time::to_db(join_time))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Fill in a display name, only when none is recorded yet
pub async fn fill_display_name(
    pool: &SqlitePool,
    interval_id: i64,
    display_name: &str,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE attendance_intervals
        SET display_name = ?
        WHERE id = ? AND (display_name IS NULL OR display_name = '')
        "#,
    )
    .bind(display_name)
    .bind(interval_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Sum of recorded durations for a user role within a time window
///
/// The window filters on join time: an interval spanning the window edge
/// counts wholly toward the window of its join.
pub async fn sum_minutes(
    pool: &SqlitePool,
    identity: Identity,
    window: (DateTime<Utc>, DateTime<Utc>),
) -> Result<f64> {
    let total: Option<f64> = sqlx::query_scalar(
        r#"
        SELECT SUM(duration_minutes) FROM attendance_intervals
        WHERE role = ? AND user_id = ? AND join_time >= ? AND join_time < ?
        "#,
    )
    .bind(identity.role().as_str())
    .bind(identity.user_id())
    .bind(time::to_db(window.0))
    .bind(time::to_db(window.1))
    .fetch_one(pool)
    .await?;

    Ok(total.unwrap_or(0.0))
}

/// Per-student minute sums for sessions a tutor taught within a window
pub async fn tutor_student_breakdown(
    pool: &SqlitePool,
    tutor_id: i64,
    window: (DateTime<Utc>, DateTime<Utc>),
) -> Result<Vec<(i64, String, String, f64)>> {
    let rows = sqlx::query(
        r#"
        SELECT ai.user_id AS student_id, u.full_name, u.email,
               SUM(ai.duration_minutes) AS total_minutes
        FROM attendance_intervals ai
        JOIN sessions s ON s.id = ai.session_id
        JOIN users u ON u.id = ai.user_id
        WHERE s.tutor_id = ? AND ai.role = 'student'
          AND ai.join_time >= ? AND ai.join_time < ?
        GROUP BY ai.user_id, u.full_name, u.email
        ORDER BY u.full_name ASC
        "#,
    )
    .bind(tutor_id)
    .bind(time::to_db(window.0))
    .bind(time::to_db(window.1))
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| {
            (
                row.get("student_id"),
                row.get("full_name"),
                row.get("email"),
                row.get("total_minutes"),
            )
        })
        .collect())
}

/// Whether a session has any attendance data at all (retry-pass predicate)
pub async fn session_has_intervals(pool: &SqlitePool, session_id: i64) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM attendance_intervals WHERE session_id = ?")
            .bind(session_id)
            .fetch_one(pool)
            .await?;

    Ok(count > 0)
}
