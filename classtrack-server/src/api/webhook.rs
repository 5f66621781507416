//! Meeting webhook endpoint
//!
//! Push-based join/exit events from the meeting platform (or a test harness
//! simulating one). Delivery is at-least-once: duplicate joins open extra
//! spans that reconciliation later accounts for, duplicate exits are no-ops.

use axum::{
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{Identity, UserRole};
use crate::AppState;

/// Join/exit event payload
#[derive(Debug, Deserialize)]
pub struct MeetEvent {
    pub meeting_code: String,
    pub user_email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub role: UserRole,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Join,
    Exit,
}

#[derive(Debug, Serialize)]
pub struct MeetEventResponse {
    pub status: &'static str,
    pub message: String,
    pub session_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<f64>,
}

/// POST /webhook/meet
pub async fn meet_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<MeetEvent>,
) -> ApiResult<Json<MeetEventResponse>> {
    verify_secret(&state, &headers)?;

    let session = match db::sessions::find_by_meeting_code(&state.db, &event.meeting_code).await? {
        Some(session) => session,
        None => {
            // A tutor's join is what brings a session into existence; any
            // other event against an unknown meeting code is an error
            if event.event_type != EventType::Join || event.role != UserRole::Tutor {
                return Err(ApiError::NotFound(format!(
                    "No session with meeting code {}",
                    event.meeting_code
                )));
            }
            let tutor = db::users::find_by_email(&state.db, &event.user_email, UserRole::Tutor)
                .await?
                .ok_or_else(|| {
                    ApiError::NotFound(format!("No tutor with email {}", event.user_email))
                })?;
            let session_id =
                db::sessions::create_session(&state.db, &event.meeting_code, tutor.id, event.timestamp)
                    .await?;
            info!(session_id, meeting_code = %event.meeting_code, "Session created from tutor join");
            db::sessions::get_session(&state.db, session_id).await?
        }
    };

    match event.event_type {
        EventType::Join => {
            let user = db::users::find_by_email(&state.db, &event.user_email, event.role)
                .await?
                .ok_or_else(|| {
                    ApiError::NotFound(format!(
                        "No {} with email {}",
                        event.role.as_str(),
                        event.user_email
                    ))
                })?;
            let identity = match event.role {
                UserRole::Tutor => Identity::Tutor(user.id),
                UserRole::Student => Identity::Student(user.id),
            };

            state
                .engine
                .process_join(
                    session.id,
                    identity,
                    &event.user_email,
                    event.display_name.as_deref(),
                    event.timestamp,
                )
                .await?;

            Ok(Json(MeetEventResponse {
                status: "success",
                message: format!("Join event processed for {}", event.user_email),
                session_id: session.id,
                duration_minutes: None,
            }))
        }
        EventType::Exit => {
            let closed = state
                .engine
                .process_exit(session.id, &event.user_email, event.timestamp)
                .await?;

            // The tutor leaving ends the session
            if event.role == UserRole::Tutor {
                db::sessions::set_end_time(&state.db, session.id, event.timestamp).await?;
            }

            let (message, duration) = match closed {
                Some(interval) => (
                    format!("Exit event processed for {}", event.user_email),
                    Some(interval.duration_minutes),
                ),
                None => (
                    format!("No open interval for {}, nothing to close", event.user_email),
                    None,
                ),
            };

            Ok(Json(MeetEventResponse {
                status: "success",
                message,
                session_id: session.id,
                duration_minutes: duration,
            }))
        }
    }
}

/// Check the shared webhook secret when one is configured
fn verify_secret(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let Some(expected) = &state.config.webhook.secret else {
        return Ok(());
    };

    let provided = headers
        .get("x-webhook-secret")
        .and_then(|v| v.to_str().ok());

    if provided != Some(expected.as_str()) {
        return Err(ApiError::Unauthorized("Invalid webhook secret".to_string()));
    }
    Ok(())
}

/// Build webhook routes
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/webhook/meet", post(meet_event))
}
