//! Scheduled class store operations

use chrono::{DateTime, Duration, Utc};
use sqlx::{Row, SqlitePool};

use classtrack_common::{time, Result};

use crate::models::{ScheduledClass, User};

fn class_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ScheduledClass> {
    let start_time: String = row.get("start_time");
    let end_time: String = row.get("end_time");
    Ok(ScheduledClass {
        id: row.get("id"),
        tutor_id: row.get("tutor_id"),
        subject: row.get("subject"),
        start_time: time::from_db(&start_time)?,
        end_time: time::from_db(&end_time)?,
        meeting_code: row.get("meeting_code"),
        session_id: row.get("session_id"),
        is_active: row.get::<i64, _>("is_active") != 0,
        is_completed: row.get::<i64, _>("is_completed") != 0,
    })
}

/// Insert a scheduled class, returning the new id
pub async fn create_class(
    pool: &SqlitePool,
    tutor_id: i64,
    subject: &str,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    meeting_code: Option<&str>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO scheduled_classes (tutor_id, subject, start_time, end_time, meeting_code)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(tutor_id)
    .bind(subject)
    .bind(time::to_db(start_time))
    .bind(time::to_db(end_time))
    .bind(meeting_code)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Enroll a student in a class (idempotent)
pub async fn enroll_student(pool: &SqlitePool, class_id: i64, student_id: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO class_students (class_id, student_id) VALUES (?, ?)")
        .bind(class_id)
        .bind(student_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Classes whose window contains `now` and that are not yet completed
pub async fn classes_in_window(pool: &SqlitePool, now: DateTime<Utc>) -> Result<Vec<ScheduledClass>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM scheduled_classes
        WHERE start_time <= ? AND end_time >= ? AND is_completed = 0
        "#,
    )
    .bind(time::to_db(now))
    .bind(time::to_db(now))
    .fetch_all(pool)
    .await?;

    rows.iter().map(class_from_row).collect()
}

/// Classes whose window has elapsed but that are not yet marked completed
pub async fn classes_ended(pool: &SqlitePool, now: DateTime<Utc>) -> Result<Vec<ScheduledClass>> {
    let rows = sqlx::query(
        "SELECT * FROM scheduled_classes WHERE end_time < ? AND is_completed = 0",
    )
    .bind(time::to_db(now))
    .fetch_all(pool)
    .await?;

    rows.iter().map(class_from_row).collect()
}

/// Active classes that carry a provider meeting code (fetch-pass input)
pub async fn active_classes_with_code(pool: &SqlitePool) -> Result<Vec<ScheduledClass>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM scheduled_classes
        WHERE is_active = 1 AND is_completed = 0 AND meeting_code IS NOT NULL
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(class_from_row).collect()
}

/// Recently completed classes with a meeting code and a linked session
/// (retry-pass candidates; the caller filters for empty sessions)
pub async fn recently_completed(
    pool: &SqlitePool,
    now: DateTime<Utc>,
    window_days: i64,
) -> Result<Vec<ScheduledClass>> {
    let cutoff = now - Duration::days(window_days);
    let rows = sqlx::query(
        r#"
        SELECT * FROM scheduled_classes
        WHERE is_completed = 1 AND end_time >= ?
          AND meeting_code IS NOT NULL AND session_id IS NOT NULL
        "#,
    )
    .bind(time::to_db(cutoff))
    .fetch_all(pool)
    .await?;

    rows.iter().map(class_from_row).collect()
}

/// Mark a class active and link its session
pub async fn mark_active(pool: &SqlitePool, class_id: i64, session_id: i64) -> Result<()> {
    sqlx::query("UPDATE scheduled_classes SET is_active = 1, session_id = ? WHERE id = ?")
        .bind(session_id)
        .bind(class_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Mark a class terminal
pub async fn mark_completed(pool: &SqlitePool, class_id: i64) -> Result<()> {
    sqlx::query("UPDATE scheduled_classes SET is_active = 0, is_completed = 1 WHERE id = ?")
        .bind(class_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Students enrolled in a class (identity-resolution input)
pub async fn enrolled_students(pool: &SqlitePool, class_id: i64) -> Result<Vec<User>> {
    let rows = sqlx::query(
        r#"
        SELECT u.* FROM users u
        JOIN class_students cs ON cs.student_id = u.id
        WHERE cs.class_id = ?
        ORDER BY u.full_name ASC
        "#,
    )
    .bind(class_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let role: String = row.get("role");
            Ok(User {
                id: row.get("id"),
                email: row.get("email"),
                full_name: row.get("full_name"),
                role: crate::models::UserRole::parse(&role)?,
                hourly_rate: row.get("hourly_rate"),
                is_active: row.get::<i64, _>("is_active") != 0,
            })
        })
        .collect()
}

/// The class linked to a session, if any
pub async fn find_by_session(pool: &SqlitePool, session_id: i64) -> Result<Option<ScheduledClass>> {
    let row = sqlx::query("SELECT * FROM scheduled_classes WHERE session_id = ?")
        .bind(session_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(class_from_row).transpose()
}
