//! Session endpoints
//!
//! Live-session overview and on-demand reconciliation against the meeting
//! platform's conference records.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::models::{ActiveSessionOverview, ReconcileOutcome, StitchedSpan};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ActiveSessionsResponse {
    pub sessions: Vec<ActiveSessionOverview>,
}

/// GET /sessions/active
///
/// All sessions without an end time, each with the participants currently
/// inside (open attendance intervals).
pub async fn active_sessions(
    State(state): State<AppState>,
) -> ApiResult<Json<ActiveSessionsResponse>> {
    let sessions = state.engine.active_sessions_overview().await?;
    Ok(Json(ActiveSessionsResponse { sessions }))
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub session_id: i64,
    pub outcome: ReconcileOutcome,
}

/// POST /sessions/{id}/reconcile
///
/// Pull the session's participant records from the meeting platform and fold
/// them into stored attendance. Returns 409 when a reconciliation for the
/// same session is already running.
pub async fn reconcile_session(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> ApiResult<Json<ReconcileResponse>> {
    let outcome = state
        .reconciler
        .try_reconcile(session_id)
        .await?
        .ok_or_else(|| {
            ApiError::Conflict(format!(
                "Reconciliation already in progress for session {session_id}"
            ))
        })?;

    info!(
        session_id,
        created = outcome.created,
        updated = outcome.updated,
        unmatched = outcome.unmatched,
        "Manual reconciliation complete"
    );

    Ok(Json(ReconcileResponse {
        session_id,
        outcome,
    }))
}

#[derive(Debug, Deserialize)]
pub struct StitchQuery {
    /// Override for the configured reconnect-gap threshold
    pub max_gap_minutes: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct StitchedAttendanceResponse {
    pub session_id: i64,
    pub user_email: String,
    pub max_gap_minutes: f64,
    pub spans: Vec<StitchedSpan>,
    pub total_minutes: f64,
}

/// GET /sessions/{id}/attendance/{email}?max_gap_minutes=
///
/// A user's presence in a session with brief reconnects stitched together.
/// Analysis view only; billing sums the raw stored durations.
pub async fn stitched_attendance(
    State(state): State<AppState>,
    Path((session_id, user_email)): Path<(i64, String)>,
    Query(query): Query<StitchQuery>,
) -> ApiResult<Json<StitchedAttendanceResponse>> {
    let max_gap = query
        .max_gap_minutes
        .unwrap_or(state.config.attendance.max_gap_minutes);
    let stitched = state
        .engine
        .stitch_intervals(session_id, &user_email, max_gap)
        .await?;

    Ok(Json(StitchedAttendanceResponse {
        session_id,
        user_email,
        max_gap_minutes: max_gap,
        spans: stitched.spans,
        total_minutes: stitched.total_minutes,
    }))
}

/// Build session routes
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions/active", get(active_sessions))
        .route("/sessions/:id/reconcile", post(reconcile_session))
        .route("/sessions/:id/attendance/:email", get(stitched_attendance))
}
