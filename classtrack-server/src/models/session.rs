//! Session and scheduled class models

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One meeting instance
///
/// Created when a tutor's meeting is detected as starting (webhook join, or
/// the scheduler entering the class window). A session with no end time is
/// active; setting `end_time` closes it.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: i64,
    /// Opaque provider meeting code
    pub meeting_code: String,
    pub tutor_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Reserved for a post-meeting summary pipeline; no writer exists yet,
    /// so this is always NULL
    pub ai_summary: Option<String>,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }
}

/// A scheduled class with its lifecycle flags
///
/// State machine: scheduled -> active (start time reached) -> completed
/// (end time reached). Completion triggers one final reconciliation pull
/// before the class is marked terminal.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledClass {
    pub id: i64,
    pub tutor_id: i64,
    pub subject: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub meeting_code: Option<String>,
    pub session_id: Option<i64>,
    pub is_active: bool,
    pub is_completed: bool,
}
