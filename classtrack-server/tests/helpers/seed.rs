//! Database seeding helpers for integration tests

use chrono::{DateTime, TimeZone, Utc};
use sqlx::SqlitePool;

use classtrack_server::db;
use classtrack_server::models::UserRole;

/// Timestamp builder: 2025-06-01 at the given hour/minute UTC
pub fn ts(hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, hour, min, 0).unwrap()
}

pub async fn seed_tutor(pool: &SqlitePool, email: &str, name: &str, rate: f64) -> i64 {
    db::users::create_user(pool, email, name, UserRole::Tutor, rate)
        .await
        .expect("seed tutor")
}

pub async fn seed_student(pool: &SqlitePool, email: &str, name: &str, rate: f64) -> i64 {
    db::users::create_user(pool, email, name, UserRole::Student, rate)
        .await
        .expect("seed student")
}

pub async fn seed_session(
    pool: &SqlitePool,
    meeting_code: &str,
    tutor_id: i64,
    start: DateTime<Utc>,
) -> i64 {
    db::sessions::create_session(pool, meeting_code, tutor_id, start)
        .await
        .expect("seed session")
}

pub async fn seed_class(
    pool: &SqlitePool,
    tutor_id: i64,
    subject: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    meeting_code: Option<&str>,
) -> i64 {
    db::classes::create_class(pool, tutor_id, subject, start, end, meeting_code)
        .await
        .expect("seed class")
}
