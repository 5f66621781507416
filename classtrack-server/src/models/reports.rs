//! Read-side report types: billing, payroll, session overviews

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::UserRole;

/// Monthly billing figure for one student
#[derive(Debug, Clone, Serialize)]
pub struct StudentBilling {
    pub student_id: i64,
    pub student_name: String,
    pub student_email: String,
    pub total_minutes: f64,
    pub hourly_rate: f64,
    /// Rounded to 2 decimal places at the output edge only
    pub total_amount: f64,
    /// "YYYY-MM"
    pub period: String,
}

/// Per-student line in a tutor's payroll breakdown
#[derive(Debug, Clone, Serialize)]
pub struct PayrollLine {
    pub student_id: i64,
    pub student_name: String,
    pub student_email: String,
    pub total_minutes: f64,
}

/// Monthly payroll figure for one tutor
#[derive(Debug, Clone, Serialize)]
pub struct TutorPayroll {
    pub tutor_id: i64,
    pub tutor_name: String,
    pub tutor_email: String,
    pub total_minutes: f64,
    pub hourly_rate: f64,
    pub total_amount: f64,
    pub period: String,
    pub students: Vec<PayrollLine>,
}

/// Counts returned by one reconciliation pull
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ReconcileOutcome {
    pub created: usize,
    pub updated: usize,
    /// Participants whose display name matched no enrolled student or the
    /// session tutor; counted and skipped
    pub unmatched: usize,
}

/// One participant row in the active-session overview
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantPresence {
    pub user_email: String,
    pub role: UserRole,
    pub join_time: DateTime<Utc>,
    pub still_present: bool,
}

/// Live view of one active session
#[derive(Debug, Clone, Serialize)]
pub struct ActiveSessionOverview {
    pub session_id: i64,
    pub meeting_code: String,
    pub tutor_name: String,
    pub start_time: DateTime<Utc>,
    pub participants: Vec<ParticipantPresence>,
}
