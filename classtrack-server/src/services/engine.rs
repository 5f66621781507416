//! Duration calculation engine
//!
//! Translates raw join/exit signals into attendance interval state. Every
//! operation tolerates at-least-once delivery: duplicate or out-of-order
//! events degrade to no-ops or extra spans, never to errors.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{info, warn};

use classtrack_common::{time, Result};

use crate::db;
use crate::models::{
    ActiveSessionOverview, AttendanceInterval, Identity, ParticipantPresence, StitchResult,
    StitchedSpan,
};

/// Engine over the attendance interval store
#[derive(Clone)]
pub struct DurationEngine {
    pool: SqlitePool,
}

impl DurationEngine {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Process a join event: always opens a new interval
    ///
    /// A join starts a new connect cycle; merging with earlier cycles is
    /// deferred to reconciliation, which keeps this path O(1) and safe under
    /// concurrent pushes. Returns the new interval id.
    pub async fn process_join(
        &self,
        session_id: i64,
        identity: Identity,
        user_email: &str,
        display_name: Option<&str>,
        timestamp: DateTime<Utc>,
    ) -> Result<i64> {
        // Surface unknown sessions as NotFound before writing
        db::sessions::get_session(&self.pool, session_id).await?;

        db::intervals::insert_interval(
            &self.pool,
            session_id,
            user_email,
            display_name,
            identity,
            timestamp,
            None,
            0.0,
        )
        .await
    }

    /// Process an exit event: close the most recently joined open interval
    ///
    /// Returns `Ok(None)` when there is nothing to close. Exit events for
    /// users who never registered a join are expected under at-least-once
    /// delivery and are ignored rather than rejected.
    pub async fn process_exit(
        &self,
        session_id: i64,
        user_email: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<AttendanceInterval>> {
        let open = db::intervals::find_open_interval(&self.pool, session_id, user_email).await?;

        let Some(open) = open else {
            info!(session_id, user_email, "Exit event with no open interval, ignoring");
            return Ok(None);
        };

        let raw_minutes = time::minutes_between(open.join_time, timestamp);
        let needs_review = raw_minutes < 0.0;
        if needs_review {
            warn!(
                interval_id = open.id,
                session_id,
                user_email,
                "Exit timestamp precedes join, clamping duration to zero and flagging for audit"
            );
        }
        let duration_minutes = raw_minutes.max(0.0);

        db::intervals::close_interval(&self.pool, open.id, timestamp, duration_minutes, needs_review)
            .await?;

        Ok(Some(AttendanceInterval {
            exit_time: Some(timestamp),
            duration_minutes,
            needs_review,
            ..open
        }))
    }

    /// Stitch a user's closed intervals into merged presence spans
    ///
    /// Read-time computation only: rows are never mutated, so stitching can
    /// be recomputed idempotently with any gap threshold.
    pub async fn stitch_intervals(
        &self,
        session_id: i64,
        user_email: &str,
        max_gap_minutes: f64,
    ) -> Result<StitchResult> {
        let intervals = db::intervals::list_for_user(&self.pool, session_id, user_email).await?;

        let spans: Vec<(DateTime<Utc>, DateTime<Utc>)> = intervals
            .iter()
            .filter_map(|i| i.exit_time.map(|exit| (i.join_time, exit)))
            .collect();

        Ok(merge_spans(&spans, max_gap_minutes))
    }

    /// Raw monthly minutes for one user
    ///
    /// Billing policy: sums recorded durations as stored, without stitching.
    /// Stitching is an analysis/presentation concern and deliberately does
    /// not feed monetary totals.
    pub async fn monthly_minutes(&self, identity: Identity, year: i32, month: u32) -> Result<f64> {
        let window = time::month_window(year, month)?;
        db::intervals::sum_minutes(&self.pool, identity, window).await
    }

    /// Live overview of all active sessions and who is present
    pub async fn active_sessions_overview(&self) -> Result<Vec<ActiveSessionOverview>> {
        let sessions = db::sessions::active_sessions(&self.pool).await?;

        let mut overviews = Vec::with_capacity(sessions.len());
        for session in sessions {
            let tutor_name =
                match db::users::get_user(&self.pool, session.tutor_id, crate::models::UserRole::Tutor)
                    .await
                {
                    Ok(tutor) => tutor.full_name,
                    Err(_) => "Unknown".to_string(),
                };

            let intervals = db::intervals::list_for_session(&self.pool, session.id).await?;
            let participants = intervals
                .into_iter()
                .map(|i| ParticipantPresence {
                    user_email: i.user_email,
                    role: i.identity.role(),
                    join_time: i.join_time,
                    still_present: i.exit_time.is_none(),
                })
                .collect();

            overviews.push(ActiveSessionOverview {
                session_id: session.id,
                meeting_code: session.meeting_code,
                tutor_name,
                start_time: session.start_time,
                participants,
            });
        }

        Ok(overviews)
    }
}

/// Merge closed spans whose gap is within the threshold
///
/// Input must be sorted by start time ascending. Adjacent spans merge when
/// the gap between one span's end and the next span's start is at most
/// `max_gap_minutes`; brief reconnects then read as continuous presence.
/// Overlapping spans merge with the union of their extents.
pub fn merge_spans(
    spans: &[(DateTime<Utc>, DateTime<Utc>)],
    max_gap_minutes: f64,
) -> StitchResult {
    let Some(&(first_start, first_end)) = spans.first() else {
        return StitchResult { spans: Vec::new(), total_minutes: 0.0 };
    };

    let mut merged: Vec<StitchedSpan> = Vec::new();
    let mut current = StitchedSpan { start: first_start, end: first_end };

    for &(start, end) in &spans[1..] {
        let gap = time::minutes_between(current.end, start);
        if gap <= max_gap_minutes {
            if end > current.end {
                current.end = end;
            }
        } else {
            merged.push(current);
            current = StitchedSpan { start, end };
        }
    }
    merged.push(current);

    let total_minutes = merged.iter().map(|s| s.duration_minutes()).sum();
    StitchResult { spans: merged, total_minutes }
}
