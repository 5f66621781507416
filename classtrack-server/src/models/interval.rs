//! Attendance interval model and stitched spans

use crate::models::UserRole;
use chrono::{DateTime, Utc};
use classtrack_common::time;
use serde::Serialize;

/// Resolved identity of a participant
///
/// Replaces the dual-nullable tutor/student foreign key pattern: exactly one
/// side is always set, enforced by the type rather than by convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "role", content = "user_id", rename_all = "lowercase")]
pub enum Identity {
    Tutor(i64),
    Student(i64),
}

impl Identity {
    pub fn role(&self) -> UserRole {
        match self {
            Identity::Tutor(_) => UserRole::Tutor,
            Identity::Student(_) => UserRole::Student,
        }
    }

    pub fn user_id(&self) -> i64 {
        match self {
            Identity::Tutor(id) | Identity::Student(id) => *id,
        }
    }
}

/// One contiguous span of a user's presence in a session
///
/// Multiple intervals for the same (session, user) pair are separate
/// connect/disconnect cycles; they are never silently collapsed. Merging
/// happens only in the read-time stitching computation.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceInterval {
    pub id: i64,
    pub session_id: i64,
    /// Email or opaque provider id
    pub user_email: String,
    pub display_name: Option<String>,
    pub identity: Identity,
    pub join_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    /// Minutes, non-negative, zero while the interval is open
    pub duration_minutes: f64,
    /// Set when an exit timestamp arrived before the join timestamp; the
    /// duration was clamped to zero and the row kept for audit
    pub needs_review: bool,
}

impl AttendanceInterval {
    pub fn is_open(&self) -> bool {
        self.exit_time.is_none()
    }
}

/// One merged presence span produced by stitching
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StitchedSpan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl StitchedSpan {
    pub fn duration_minutes(&self) -> f64 {
        time::minutes_between(self.start, self.end).max(0.0)
    }
}

/// Stitching output: merged spans plus their total duration
#[derive(Debug, Clone, Serialize)]
pub struct StitchResult {
    pub spans: Vec<StitchedSpan>,
    pub total_minutes: f64,
}
