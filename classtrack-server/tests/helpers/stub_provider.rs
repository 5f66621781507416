//! Scripted meeting-provider stub

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use classtrack_common::{Error, Result};
use classtrack_server::models::{ConferenceId, ParticipantRecord, ParticipantSpan};
use classtrack_server::services::MeetProvider;

/// Provider stub returning scripted data
///
/// `find_conference` answers for any meeting code while `has_conference` is
/// set; `list_participants` returns whatever the test scripted. Meeting
/// codes in `fail_for` error instead, and a `gate` makes every lookup block
/// until the test releases it.
pub struct StubProvider {
    pub has_conference: bool,
    pub fail_for: HashSet<String>,
    pub gate: Option<Arc<Notify>>,
    pub participants: Mutex<Vec<ParticipantRecord>>,
}

impl StubProvider {
    pub fn new(participants: Vec<ParticipantRecord>) -> Self {
        Self {
            has_conference: true,
            fail_for: HashSet::new(),
            gate: None,
            participants: Mutex::new(participants),
        }
    }

    pub fn without_conference() -> Self {
        Self {
            has_conference: false,
            fail_for: HashSet::new(),
            gate: None,
            participants: Mutex::new(Vec::new()),
        }
    }

    /// Script a provider failure for one meeting code
    pub fn failing_for(mut self, meeting_code: &str) -> Self {
        self.fail_for.insert(meeting_code.to_string());
        self
    }

    /// Block every conference lookup until the gate is notified
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn set_participants(&self, participants: Vec<ParticipantRecord>) {
        *self.participants.lock().unwrap() = participants;
    }
}

#[async_trait]
impl MeetProvider for StubProvider {
    async fn find_conference(&self, meeting_code: &str) -> Result<Option<ConferenceId>> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail_for.contains(meeting_code) {
            return Err(Error::Provider(format!(
                "Scripted failure for {meeting_code}"
            )));
        }
        if self.has_conference {
            Ok(Some(ConferenceId(format!("conf-{meeting_code}"))))
        } else {
            Ok(None)
        }
    }

    async fn list_participants(&self, _conference: &ConferenceId) -> Result<Vec<ParticipantRecord>> {
        Ok(self.participants.lock().unwrap().clone())
    }
}

/// Build one closed participant span
pub fn span(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> ParticipantSpan {
    ParticipantSpan {
        start: Some(start),
        end,
    }
}

/// Build a participant record from spans
pub fn participant(
    email: Option<&str>,
    display_name: &str,
    spans: Vec<ParticipantSpan>,
    total_duration_seconds: i64,
) -> ParticipantRecord {
    ParticipantRecord {
        email: email.map(str::to_string),
        display_name: display_name.to_string(),
        spans,
        total_duration_seconds,
    }
}
