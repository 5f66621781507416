//! Participant reconciliation against the meeting provider
//!
//! Pulls ground-truth participant data for a session, resolves each
//! participant to a known identity, and merges the result into the interval
//! store as conservative upserts: join times only move earlier, exit times
//! are only set when unset. Polled data can therefore never clobber more
//! precise event-driven records arriving through the webhook path.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use sqlx::SqlitePool;
use tracing::{debug, info};

use classtrack_common::{time, Result};

use crate::db;
use crate::models::{ParticipantRecord, ReconcileOutcome, User};
use crate::services::matching;
use crate::services::meet_client::MeetProvider;

/// Reconciliation service
pub struct Reconciler {
    pool: SqlitePool,
    provider: Arc<dyn MeetProvider>,
    /// Sessions with a reconciliation pull currently running. A busy session
    /// is skipped for that pass only, preventing overlapping provider calls
    /// from piling up and serializing merges per session.
    in_flight: Mutex<HashSet<i64>>,
}

impl Reconciler {
    pub fn new(pool: SqlitePool, provider: Arc<dyn MeetProvider>) -> Self {
        Self {
            pool,
            provider,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Reconcile one session unless a pull for it is already running
    ///
    /// Returns `Ok(None)` when the session was skipped as busy.
    pub async fn try_reconcile(&self, session_id: i64) -> Result<Option<ReconcileOutcome>> {
        if !self.begin(session_id) {
            debug!(session_id, "Reconciliation already in flight, skipping");
            return Ok(None);
        }

        let result = self.reconcile_inner(session_id).await;
        self.end(session_id);
        result.map(Some)
    }

    fn begin(&self, session_id: i64) -> bool {
        self.in_flight.lock().expect("in_flight lock poisoned").insert(session_id)
    }

    fn end(&self, session_id: i64) {
        self.in_flight.lock().expect("in_flight lock poisoned").remove(&session_id);
    }

    async fn reconcile_inner(&self, session_id: i64) -> Result<ReconcileOutcome> {
        let session = db::sessions::get_session(&self.pool, session_id).await?;

        // Roster for identity resolution: the linked class's enrollment when
        // there is one, otherwise (ad-hoc webhook sessions) every active
        // student
        let class = db::classes::find_by_session(&self.pool, session_id).await?;
        let (students, tutor_id) = match &class {
            Some(class) => (
                db::classes::enrolled_students(&self.pool, class.id).await?,
                class.tutor_id,
            ),
            None => (
                db::users::list_active(&self.pool, crate::models::UserRole::Student).await?,
                session.tutor_id,
            ),
        };
        let tutor = db::users::get_user(&self.pool, tutor_id, crate::models::UserRole::Tutor)
            .await
            .ok();

        let Some(conference) = self.provider.find_conference(&session.meeting_code).await? else {
            debug!(
                session_id,
                meeting_code = %session.meeting_code,
                "No conference record yet, nothing to reconcile"
            );
            return Ok(ReconcileOutcome::default());
        };

        let participants = self.provider.list_participants(&conference).await?;

        let mut outcome = ReconcileOutcome::default();
        for participant in &participants {
            self.merge_participant(session_id, participant, &students, tutor.as_ref(), &mut outcome)
                .await?;
        }

        info!(
            session_id,
            created = outcome.created,
            updated = outcome.updated,
            unmatched = outcome.unmatched,
            "Reconciled session"
        );
        Ok(outcome)
    }

    /// Merge one provider participant into the interval store
    async fn merge_participant(
        &self,
        session_id: i64,
        participant: &ParticipantRecord,
        students: &[User],
        tutor: Option<&User>,
        outcome: &mut ReconcileOutcome,
    ) -> Result<()> {
        let Some(resolved) =
            matching::resolve_participant(&participant.display_name, students, tutor)
        else {
            outcome.unmatched += 1;
            return Ok(());
        };

        let Some(earliest) = participant.earliest_start() else {
            // Participant with no usable span data yet
            return Ok(());
        };
        let latest = participant.latest_end();

        // Stable key: provider email when signed in, otherwise the resolved
        // user's known email
        let email_key = participant
            .email
            .clone()
            .unwrap_or_else(|| resolved.user.email.clone());

        let existing =
            db::intervals::find_earliest_interval(&self.pool, session_id, &email_key).await?;

        match existing {
            Some(existing) => {
                let mut touched = false;

                let new_join = earliest.min(existing.join_time);

                // Set exit only when unset; event-driven exits win
                if existing.exit_time.is_none() {
                    if let Some(end) = latest {
                        let raw = time::minutes_between(new_join, end);
                        touched |= db::intervals::close_interval(
                            &self.pool,
                            existing.id,
                            end,
                            raw.max(0.0),
                            raw < 0.0,
                        )
                        .await?;
                    }
                }

                // Move join earlier only, never later
                if earliest < existing.join_time {
                    let effective_exit = existing.exit_time.or(latest);
                    let duration = effective_exit
                        .map(|e| time::minutes_between(earliest, e).max(0.0))
                        .unwrap_or(existing.duration_minutes);
                    touched |= db::intervals::move_join_earlier(
                        &self.pool,
                        existing.id,
                        earliest,
                        duration,
                    )
                    .await?;
                }

                touched |= db::intervals::fill_display_name(
                    &self.pool,
                    existing.id,
                    &participant.display_name,
                )
                .await?;

                if touched {
                    outcome.updated += 1;
                }
            }
            None => {
                // Aggregate across the participant's reconnect history: the
                // provider's cumulative figure when present, else wall-clock
                let duration = if participant.total_duration_seconds > 0 {
                    participant.total_duration_seconds as f64 / 60.0
                } else if let Some(end) = latest {
                    time::minutes_between(earliest, end).max(0.0)
                } else {
                    0.0
                };

                db::intervals::insert_interval(
                    &self.pool,
                    session_id,
                    &email_key,
                    Some(&participant.display_name),
                    resolved.identity,
                    earliest,
                    latest,
                    duration,
                )
                .await?;
                outcome.created += 1;
            }
        }

        Ok(())
    }
}
