//! Integration tests for the class lifecycle sweeps
//!
//! The timer loops are not under test; each sweep is invoked directly.

mod helpers;

use std::sync::Arc;

use chrono::{Duration, Utc};

use helpers::{participant, seed_class, seed_session, seed_student, seed_tutor, span, ts, StubProvider};

use classtrack_common::config::MonitorConfig;
use classtrack_server::db;
use classtrack_server::models::Identity;
use classtrack_server::services::{DurationEngine, MeetingMonitor, Reconciler};

fn monitor(pool: &sqlx::SqlitePool, stub: StubProvider) -> MeetingMonitor {
    let reconciler = Arc::new(Reconciler::new(pool.clone(), Arc::new(stub)));
    MeetingMonitor::new(pool.clone(), reconciler, MonitorConfig::default())
}

#[tokio::test]
async fn test_sweep_activates_class_in_window() {
    let pool = db::init_memory_pool().await.expect("memory pool");
    let tutor_id = seed_tutor(&pool, "maria@academy.test", "Maria Lopez", 30.0).await;

    let now = Utc::now();
    let class_id = seed_class(
        &pool,
        tutor_id,
        "Algebra",
        now - Duration::minutes(10),
        now + Duration::minutes(50),
        Some("abc-defg-hij"),
    )
    .await;

    monitor(&pool, StubProvider::without_conference())
        .sweep_classes()
        .await
        .unwrap();

    let session = db::sessions::find_by_meeting_code(&pool, "abc-defg-hij")
        .await
        .unwrap()
        .expect("session created for active class");
    assert_eq!(session.tutor_id, tutor_id);

    let class = db::classes::find_by_session(&pool, session.id)
        .await
        .unwrap()
        .expect("class linked to session");
    assert_eq!(class.id, class_id);
    assert!(class.is_active);
    assert!(!class.is_completed);
}

#[tokio::test]
async fn test_sweep_adopts_session_created_by_webhook_join() {
    let pool = db::init_memory_pool().await.expect("memory pool");
    let tutor_id = seed_tutor(&pool, "maria@academy.test", "Maria Lopez", 30.0).await;

    let now = Utc::now();
    let class_id = seed_class(
        &pool,
        tutor_id,
        "Algebra",
        now - Duration::minutes(10),
        now + Duration::minutes(50),
        Some("abc-defg-hij"),
    )
    .await;

    // The tutor joined early; their webhook event already created the
    // session for this meeting code
    let session_id =
        seed_session(&pool, "abc-defg-hij", tutor_id, now - Duration::minutes(12)).await;

    monitor(&pool, StubProvider::without_conference())
        .sweep_classes()
        .await
        .unwrap();

    let class = db::classes::find_by_session(&pool, session_id)
        .await
        .unwrap()
        .expect("class linked to the existing session");
    assert_eq!(class.id, class_id);
    assert!(class.is_active);
    assert_eq!(class.session_id, Some(session_id));
}

#[tokio::test]
async fn test_sweep_uses_fallback_code_without_meeting_link() {
    let pool = db::init_memory_pool().await.expect("memory pool");
    let tutor_id = seed_tutor(&pool, "maria@academy.test", "Maria Lopez", 30.0).await;

    let now = Utc::now();
    let class_id = seed_class(
        &pool,
        tutor_id,
        "Geometry",
        now - Duration::minutes(5),
        now + Duration::minutes(55),
        None,
    )
    .await;

    monitor(&pool, StubProvider::without_conference())
        .sweep_classes()
        .await
        .unwrap();

    let session =
        db::sessions::find_by_meeting_code(&pool, &format!("scheduled-{class_id}"))
            .await
            .unwrap();
    assert!(session.is_some());
}

#[tokio::test]
async fn test_sweep_completes_ended_class_and_closes_open_intervals() {
    let pool = db::init_memory_pool().await.expect("memory pool");
    let tutor_id = seed_tutor(&pool, "maria@academy.test", "Maria Lopez", 30.0).await;
    let student_id = seed_student(&pool, "john@academy.test", "John Smith", 25.0).await;
    let engine = DurationEngine::new(pool.clone());

    let now = Utc::now();
    let start = now - Duration::minutes(60);
    let end = now - Duration::minutes(5);
    let class_id = seed_class(&pool, tutor_id, "Algebra", start, end, Some("abc-defg-hij")).await;
    let session_id = seed_session(&pool, "abc-defg-hij", tutor_id, start).await;
    db::classes::mark_active(&pool, class_id, session_id).await.unwrap();

    // Student joined but their exit webhook never arrived
    engine
        .process_join(session_id, Identity::Student(student_id), "john@academy.test", None, start)
        .await
        .unwrap();

    monitor(&pool, StubProvider::without_conference())
        .sweep_classes()
        .await
        .unwrap();

    let session = db::sessions::get_session(&pool, session_id).await.unwrap();
    assert_eq!(session.end_time, Some(end));

    let intervals = db::intervals::list_for_user(&pool, session_id, "john@academy.test")
        .await
        .unwrap();
    assert_eq!(intervals.len(), 1);
    assert_eq!(intervals[0].exit_time, Some(end));
    assert_eq!(intervals[0].duration_minutes, 55.0);

    let class = db::classes::find_by_session(&pool, session_id)
        .await
        .unwrap()
        .expect("class still linked");
    assert!(class.is_completed);
}

#[tokio::test]
async fn test_fetch_pass_reconciles_active_classes() {
    let pool = db::init_memory_pool().await.expect("memory pool");
    let tutor_id = seed_tutor(&pool, "maria@academy.test", "Maria Lopez", 30.0).await;
    let student_id = seed_student(&pool, "john@academy.test", "John Smith", 25.0).await;

    let now = Utc::now();
    let class_id = seed_class(
        &pool,
        tutor_id,
        "Algebra",
        now - Duration::minutes(10),
        now + Duration::minutes(50),
        Some("abc-defg-hij"),
    )
    .await;
    let session_id = seed_session(&pool, "abc-defg-hij", tutor_id, now - Duration::minutes(10)).await;
    db::classes::mark_active(&pool, class_id, session_id).await.unwrap();
    db::classes::enroll_student(&pool, class_id, student_id).await.unwrap();

    let stub = StubProvider::new(vec![participant(
        Some("john@academy.test"),
        "John Smith",
        vec![span(ts(10, 0), Some(ts(10, 28)))],
        0,
    )]);
    monitor(&pool, stub).fetch_active_sessions().await.unwrap();

    let intervals = db::intervals::list_for_user(&pool, session_id, "john@academy.test")
        .await
        .unwrap();
    assert_eq!(intervals.len(), 1);
    assert_eq!(intervals[0].duration_minutes, 28.0);
}

#[tokio::test]
async fn test_fetch_pass_isolates_provider_failures() {
    let pool = db::init_memory_pool().await.expect("memory pool");
    let tutor_id = seed_tutor(&pool, "maria@academy.test", "Maria Lopez", 30.0).await;
    let student_id = seed_student(&pool, "john@academy.test", "John Smith", 25.0).await;

    let now = Utc::now();
    let start = now - Duration::minutes(10);
    let end = now + Duration::minutes(50);

    // First class's provider lookup is scripted to fail; the second must
    // still get its participant data in the same pass
    let bad_class = seed_class(&pool, tutor_id, "Algebra", start, end, Some("bad-code")).await;
    let bad_session = seed_session(&pool, "bad-code", tutor_id, start).await;
    db::classes::mark_active(&pool, bad_class, bad_session).await.unwrap();
    db::classes::enroll_student(&pool, bad_class, student_id).await.unwrap();

    let good_class = seed_class(&pool, tutor_id, "Geometry", start, end, Some("good-code")).await;
    let good_session = seed_session(&pool, "good-code", tutor_id, start).await;
    db::classes::mark_active(&pool, good_class, good_session).await.unwrap();
    db::classes::enroll_student(&pool, good_class, student_id).await.unwrap();

    let stub = StubProvider::new(vec![participant(
        Some("john@academy.test"),
        "John Smith",
        vec![span(ts(10, 0), Some(ts(10, 28)))],
        0,
    )])
    .failing_for("bad-code");

    monitor(&pool, stub).fetch_active_sessions().await.unwrap();

    let good = db::intervals::list_for_user(&pool, good_session, "john@academy.test")
        .await
        .unwrap();
    assert_eq!(good.len(), 1);

    let bad = db::intervals::list_for_session(&pool, bad_session).await.unwrap();
    assert!(bad.is_empty());
}

#[tokio::test]
async fn test_retry_pass_fills_empty_completed_sessions() {
    let pool = db::init_memory_pool().await.expect("memory pool");
    let tutor_id = seed_tutor(&pool, "maria@academy.test", "Maria Lopez", 30.0).await;
    let student_id = seed_student(&pool, "john@academy.test", "John Smith", 25.0).await;

    let now = Utc::now();
    let start = now - Duration::hours(3);
    let end = now - Duration::hours(2);
    let class_id = seed_class(&pool, tutor_id, "Algebra", start, end, Some("abc-defg-hij")).await;
    let session_id = seed_session(&pool, "abc-defg-hij", tutor_id, start).await;
    db::classes::mark_active(&pool, class_id, session_id).await.unwrap();
    db::classes::enroll_student(&pool, class_id, student_id).await.unwrap();
    db::classes::mark_completed(&pool, class_id).await.unwrap();

    // Provider data arrived late, well after the class completed
    let stub = StubProvider::new(vec![participant(
        Some("john@academy.test"),
        "John Smith",
        vec![span(ts(10, 0), Some(ts(10, 28)))],
        0,
    )]);
    monitor(&pool, stub).retry_empty_sessions().await.unwrap();

    let intervals = db::intervals::list_for_user(&pool, session_id, "john@academy.test")
        .await
        .unwrap();
    assert_eq!(intervals.len(), 1);
}

#[tokio::test]
async fn test_retry_pass_skips_sessions_with_data() {
    let pool = db::init_memory_pool().await.expect("memory pool");
    let tutor_id = seed_tutor(&pool, "maria@academy.test", "Maria Lopez", 30.0).await;
    let student_id = seed_student(&pool, "john@academy.test", "John Smith", 25.0).await;
    let engine = DurationEngine::new(pool.clone());

    let now = Utc::now();
    let start = now - Duration::hours(3);
    let end = now - Duration::hours(2);
    let class_id = seed_class(&pool, tutor_id, "Algebra", start, end, Some("abc-defg-hij")).await;
    let session_id = seed_session(&pool, "abc-defg-hij", tutor_id, start).await;
    db::classes::mark_active(&pool, class_id, session_id).await.unwrap();
    db::classes::mark_completed(&pool, class_id).await.unwrap();

    engine
        .process_join(session_id, Identity::Student(student_id), "john@academy.test", None, start)
        .await
        .unwrap();
    engine
        .process_exit(session_id, "john@academy.test", end)
        .await
        .unwrap();

    // Provider would hand back a conflicting record; the retry pass must
    // not even ask for it
    let stub = StubProvider::new(vec![participant(
        Some("john@academy.test"),
        "John Smith",
        vec![span(ts(11, 0), Some(ts(11, 30)))],
        0,
    )]);
    monitor(&pool, stub).retry_empty_sessions().await.unwrap();

    let intervals = db::intervals::list_for_user(&pool, session_id, "john@academy.test")
        .await
        .unwrap();
    assert_eq!(intervals.len(), 1);
    assert_eq!(intervals[0].join_time, start);
}
