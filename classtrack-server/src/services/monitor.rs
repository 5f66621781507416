//! Background monitoring of scheduled classes
//!
//! Three fixed-interval tasks drive the session lifecycle:
//! 1. class sweep: scheduled -> active at window start, active -> completed
//!    at window end (with one final reconciliation pull before terminal)
//! 2. fetch pass: reconcile every active session that has a meeting code
//! 3. retry pass: completed classes whose session still has zero attendance
//!    intervals (provider data lags behind meeting end)
//!
//! The monitor is an explicit collaborator spawned from main, never from
//! library construction, so tests exercise business logic without timers.
//! Per-session failures are logged and isolated; one bad provider call never
//! aborts the rest of a pass.

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tokio::time;
use tracing::{debug, error, info, warn};

use classtrack_common::config::MonitorConfig;
use classtrack_common::time as clock;
use classtrack_common::Result;

use crate::db;
use crate::models::ScheduledClass;
use crate::services::Reconciler;

/// Background class/session monitor
pub struct MeetingMonitor {
    pool: SqlitePool,
    reconciler: Arc<Reconciler>,
    config: MonitorConfig,
}

impl MeetingMonitor {
    pub fn new(pool: SqlitePool, reconciler: Arc<Reconciler>, config: MonitorConfig) -> Self {
        Self { pool, reconciler, config }
    }

    /// Spawn all monitoring tasks
    pub fn start(self: Arc<Self>) {
        info!(
            class_interval_secs = self.config.class_interval_secs,
            fetch_interval_secs = self.config.fetch_interval_secs,
            retry_interval_secs = self.config.retry_interval_secs,
            "Starting meeting monitor"
        );

        tokio::spawn(Arc::clone(&self).class_sweep_task());
        tokio::spawn(Arc::clone(&self).fetch_task());
        tokio::spawn(self.retry_task());
    }

    async fn class_sweep_task(self: Arc<Self>) {
        let mut interval = time::interval(Duration::from_secs(self.config.class_interval_secs));
        loop {
            interval.tick().await;
            if let Err(e) = self.sweep_classes().await {
                error!("Class sweep failed: {}", e);
            }
        }
    }

    async fn fetch_task(self: Arc<Self>) {
        let mut interval = time::interval(Duration::from_secs(self.config.fetch_interval_secs));
        loop {
            interval.tick().await;
            if let Err(e) = self.fetch_active_sessions().await {
                error!("Participant fetch pass failed: {}", e);
            }
        }
    }

    async fn retry_task(self: Arc<Self>) {
        let mut interval = time::interval(Duration::from_secs(self.config.retry_interval_secs));
        loop {
            interval.tick().await;
            if let Err(e) = self.retry_empty_sessions().await {
                error!("Retry pass failed: {}", e);
            }
        }
    }

    /// One class lifecycle sweep: activate classes whose window has started,
    /// complete classes whose window has elapsed
    pub async fn sweep_classes(&self) -> Result<()> {
        let now = clock::now();

        for class in db::classes::classes_in_window(&self.pool, now).await? {
            if !class.is_active {
                if let Err(e) = self.activate_class(&class).await {
                    warn!(class_id = class.id, "Failed to activate class: {}", e);
                }
            }
        }

        for class in db::classes::classes_ended(&self.pool, now).await? {
            if let Err(e) = self.complete_class(&class).await {
                warn!(class_id = class.id, "Failed to complete class: {}", e);
            }
        }

        Ok(())
    }

    /// Transition a class to active, creating and linking its session
    ///
    /// The tutor's webhook join may have created the session for this
    /// meeting code already; that session is adopted rather than violating
    /// the unique meeting_code constraint with a second insert.
    async fn activate_class(&self, class: &ScheduledClass) -> Result<()> {
        let session_id = match class.session_id {
            Some(id) => id,
            None => match &class.meeting_code {
                Some(code) => match db::sessions::find_by_meeting_code(&self.pool, code).await? {
                    Some(session) => session.id,
                    None => {
                        db::sessions::create_session(
                            &self.pool,
                            code,
                            class.tutor_id,
                            class.start_time,
                        )
                        .await?
                    }
                },
                None => {
                    // Ad-hoc fallback code keeps the meeting_code column
                    // unique for classes scheduled without a provider link
                    let code = format!("scheduled-{}", class.id);
                    db::sessions::create_session(&self.pool, &code, class.tutor_id, class.start_time)
                        .await?
                }
            },
        };

        db::classes::mark_active(&self.pool, class.id, session_id).await?;
        info!(class_id = class.id, session_id, subject = %class.subject, "Class is now active");
        Ok(())
    }

    /// Transition a class to completed: close the session, pull final
    /// participant data, auto-close any intervals still open
    async fn complete_class(&self, class: &ScheduledClass) -> Result<()> {
        if let Some(session_id) = class.session_id {
            db::sessions::set_end_time(&self.pool, session_id, class.end_time).await?;

            // Final reconciliation pull; provider failure here is retried by
            // the slower retry pass, not fatal to completion
            if class.meeting_code.is_some() {
                match self.reconciler.try_reconcile(session_id).await {
                    Ok(Some(outcome)) => {
                        debug!(session_id, created = outcome.created, updated = outcome.updated,
                            "Final reconciliation before completion");
                    }
                    Ok(None) => debug!(session_id, "Final reconciliation skipped, already in flight"),
                    Err(e) => warn!(session_id, "Final reconciliation failed: {}", e),
                }
            }

            // Participants who never sent an exit are closed at the window end
            for open in db::intervals::open_intervals_for_session(&self.pool, session_id).await? {
                let raw = clock::minutes_between(open.join_time, class.end_time);
                db::intervals::close_interval(
                    &self.pool,
                    open.id,
                    class.end_time,
                    raw.max(0.0),
                    raw < 0.0,
                )
                .await?;
            }
        }

        db::classes::mark_completed(&self.pool, class.id).await?;
        info!(class_id = class.id, subject = %class.subject, "Class completed");
        Ok(())
    }

    /// One fetch pass over all active classes with a meeting code
    pub async fn fetch_active_sessions(&self) -> Result<()> {
        let classes = db::classes::active_classes_with_code(&self.pool).await?;
        if classes.is_empty() {
            debug!("No active classes to fetch participant data for");
            return Ok(());
        }

        debug!(count = classes.len(), "Fetching participant data for active classes");
        for class in classes {
            let Some(session_id) = class.session_id else { continue };
            // Isolate per-session failures: log and continue the pass
            if let Err(e) = self.reconciler.try_reconcile(session_id).await {
                warn!(session_id, class_id = class.id, "Reconciliation failed: {}", e);
            }
        }

        Ok(())
    }

    /// One retry pass over recently completed classes with no attendance data
    pub async fn retry_empty_sessions(&self) -> Result<()> {
        let now = clock::now();
        let candidates =
            db::classes::recently_completed(&self.pool, now, self.config.retry_window_days).await?;

        let mut retried = 0usize;
        for class in candidates {
            let Some(session_id) = class.session_id else { continue };
            if db::intervals::session_has_intervals(&self.pool, session_id).await? {
                continue;
            }
            retried += 1;
            if let Err(e) = self.reconciler.try_reconcile(session_id).await {
                warn!(session_id, class_id = class.id, "Retry reconciliation failed: {}", e);
            }
        }

        if retried > 0 {
            info!(retried, "Retried participant fetch for empty completed sessions");
        }
        Ok(())
    }
}
