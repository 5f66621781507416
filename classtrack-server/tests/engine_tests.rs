//! Integration tests for join/exit processing and duration accounting

mod helpers;

use helpers::{seed_session, seed_student, seed_tutor, ts};

use classtrack_server::db;
use classtrack_server::models::Identity;
use classtrack_server::services::DurationEngine;

async fn setup() -> (sqlx::SqlitePool, DurationEngine, i64, i64) {
    let pool = db::init_memory_pool().await.expect("memory pool");
    let tutor_id = seed_tutor(&pool, "tutor@academy.test", "Maria Lopez", 30.0).await;
    let student_id = seed_student(&pool, "student@academy.test", "John Smith", 25.0).await;
    let session_id = seed_session(&pool, "abc-defg-hij", tutor_id, ts(10, 0)).await;
    let engine = DurationEngine::new(pool.clone());
    (pool, engine, session_id, student_id)
}

#[tokio::test]
async fn test_join_then_exit_records_duration() {
    let (pool, engine, session_id, student_id) = setup().await;

    engine
        .process_join(
            session_id,
            Identity::Student(student_id),
            "student@academy.test",
            Some("John Smith"),
            ts(10, 0),
        )
        .await
        .unwrap();

    let closed = engine
        .process_exit(session_id, "student@academy.test", ts(10, 28))
        .await
        .unwrap()
        .expect("open interval should close");

    assert_eq!(closed.duration_minutes, 28.0);
    assert!(!closed.needs_review);

    let intervals = db::intervals::list_for_user(&pool, session_id, "student@academy.test")
        .await
        .unwrap();
    assert_eq!(intervals.len(), 1);
    assert_eq!(intervals[0].exit_time, Some(ts(10, 28)));
}

#[tokio::test]
async fn test_join_for_unknown_session_is_rejected() {
    let (_pool, engine, _session_id, student_id) = setup().await;

    let result = engine
        .process_join(
            9999,
            Identity::Student(student_id),
            "student@academy.test",
            None,
            ts(10, 0),
        )
        .await;
    assert!(matches!(result, Err(classtrack_common::Error::NotFound(_))));
}

#[tokio::test]
async fn test_exit_without_open_interval_is_noop() {
    let (pool, engine, session_id, _student_id) = setup().await;

    let closed = engine
        .process_exit(session_id, "student@academy.test", ts(10, 30))
        .await
        .unwrap();
    assert!(closed.is_none());

    let intervals = db::intervals::list_for_session(&pool, session_id).await.unwrap();
    assert!(intervals.is_empty());
}

#[tokio::test]
async fn test_exit_before_join_clamps_and_flags() {
    let (_pool, engine, session_id, student_id) = setup().await;

    engine
        .process_join(
            session_id,
            Identity::Student(student_id),
            "student@academy.test",
            None,
            ts(10, 30),
        )
        .await
        .unwrap();

    let closed = engine
        .process_exit(session_id, "student@academy.test", ts(10, 15))
        .await
        .unwrap()
        .expect("interval should still close");

    assert_eq!(closed.duration_minutes, 0.0);
    assert!(closed.needs_review);
}

#[tokio::test]
async fn test_second_join_opens_separate_interval() {
    let (pool, engine, session_id, student_id) = setup().await;

    engine
        .process_join(
            session_id,
            Identity::Student(student_id),
            "student@academy.test",
            None,
            ts(10, 0),
        )
        .await
        .unwrap();
    engine
        .process_exit(session_id, "student@academy.test", ts(10, 10))
        .await
        .unwrap();

    // Reconnect after a drop
    engine
        .process_join(
            session_id,
            Identity::Student(student_id),
            "student@academy.test",
            None,
            ts(10, 13),
        )
        .await
        .unwrap();
    engine
        .process_exit(session_id, "student@academy.test", ts(10, 30))
        .await
        .unwrap();

    let intervals = db::intervals::list_for_user(&pool, session_id, "student@academy.test")
        .await
        .unwrap();
    assert_eq!(intervals.len(), 2);
}

#[tokio::test]
async fn test_exit_closes_most_recent_open_interval() {
    let (pool, engine, session_id, student_id) = setup().await;

    // Duplicate joins without an intervening exit leave two open intervals
    engine
        .process_join(
            session_id,
            Identity::Student(student_id),
            "student@academy.test",
            None,
            ts(10, 0),
        )
        .await
        .unwrap();
    engine
        .process_join(
            session_id,
            Identity::Student(student_id),
            "student@academy.test",
            None,
            ts(10, 5),
        )
        .await
        .unwrap();

    engine
        .process_exit(session_id, "student@academy.test", ts(10, 20))
        .await
        .unwrap();

    let intervals = db::intervals::list_for_user(&pool, session_id, "student@academy.test")
        .await
        .unwrap();
    let open: Vec<_> = intervals.iter().filter(|i| i.is_open()).collect();
    assert_eq!(open.len(), 1);
    // The earlier join is the one still open
    assert_eq!(open[0].join_time, ts(10, 0));
}

#[tokio::test]
async fn test_stitching_merges_brief_reconnects() {
    let (_pool, engine, session_id, student_id) = setup().await;

    for (join, exit) in [(ts(10, 0), ts(10, 10)), (ts(10, 13), ts(10, 30))] {
        engine
            .process_join(
                session_id,
                Identity::Student(student_id),
                "student@academy.test",
                None,
                join,
            )
            .await
            .unwrap();
        engine
            .process_exit(session_id, "student@academy.test", exit)
            .await
            .unwrap();
    }

    // 3-minute gap merges under a 5-minute threshold
    let stitched = engine
        .stitch_intervals(session_id, "student@academy.test", 5.0)
        .await
        .unwrap();
    assert_eq!(stitched.spans.len(), 1);
    assert_eq!(stitched.total_minutes, 30.0);

    // Same rows, tighter threshold: the gap stays a gap
    let stitched = engine
        .stitch_intervals(session_id, "student@academy.test", 2.0)
        .await
        .unwrap();
    assert_eq!(stitched.spans.len(), 2);
    assert_eq!(stitched.total_minutes, 27.0);
}

#[tokio::test]
async fn test_monthly_minutes_respects_month_boundary() {
    let pool = db::init_memory_pool().await.expect("memory pool");
    let tutor_id = seed_tutor(&pool, "tutor@academy.test", "Maria Lopez", 30.0).await;
    let student_id = seed_student(&pool, "student@academy.test", "John Smith", 25.0).await;
    let engine = DurationEngine::new(pool.clone());

    use chrono::{TimeZone, Utc};
    let may_session = seed_session(
        &pool,
        "may-code",
        tutor_id,
        Utc.with_ymd_and_hms(2025, 5, 31, 23, 0, 0).unwrap(),
    )
    .await;
    let june_session = seed_session(
        &pool,
        "june-code",
        tutor_id,
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
    )
    .await;

    // Joins at 23:30 May 31 and 00:00 June 1; attribution is by join time
    engine
        .process_join(
            may_session,
            Identity::Student(student_id),
            "student@academy.test",
            None,
            Utc.with_ymd_and_hms(2025, 5, 31, 23, 30, 0).unwrap(),
        )
        .await
        .unwrap();
    engine
        .process_exit(
            may_session,
            "student@academy.test",
            Utc.with_ymd_and_hms(2025, 6, 1, 0, 10, 0).unwrap(),
        )
        .await
        .unwrap();

    engine
        .process_join(
            june_session,
            Identity::Student(student_id),
            "student@academy.test",
            None,
            Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
        )
        .await
        .unwrap();
    engine
        .process_exit(
            june_session,
            "student@academy.test",
            Utc.with_ymd_and_hms(2025, 6, 1, 0, 45, 0).unwrap(),
        )
        .await
        .unwrap();

    let may = engine
        .monthly_minutes(Identity::Student(student_id), 2025, 5)
        .await
        .unwrap();
    let june = engine
        .monthly_minutes(Identity::Student(student_id), 2025, 6)
        .await
        .unwrap();

    assert_eq!(may, 40.0);
    assert_eq!(june, 45.0);
}

#[tokio::test]
async fn test_active_sessions_overview_lists_present_participants() {
    let (_pool, engine, session_id, student_id) = setup().await;

    engine
        .process_join(
            session_id,
            Identity::Student(student_id),
            "student@academy.test",
            Some("John Smith"),
            ts(10, 0),
        )
        .await
        .unwrap();

    let overview = engine.active_sessions_overview().await.unwrap();
    assert_eq!(overview.len(), 1);
    assert_eq!(overview[0].session_id, session_id);
    assert_eq!(overview[0].tutor_name, "Maria Lopez");
    assert_eq!(overview[0].participants.len(), 1);
    assert!(overview[0].participants[0].still_present);
}
