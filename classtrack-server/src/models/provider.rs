//! Types returned by the external meeting provider

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Provider-side conference record identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConferenceId(pub String);

/// One join/leave cycle in a participant's own reconnect history
#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantSpan {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Raw participant record from the provider
///
/// The provider exposes a free-text display name, not a stable identity;
/// `email` is present only for signed-in users.
#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantRecord {
    pub email: Option<String>,
    pub display_name: String,
    #[serde(default)]
    pub spans: Vec<ParticipantSpan>,
    #[serde(default)]
    pub total_duration_seconds: i64,
}

impl ParticipantRecord {
    /// Earliest join across all spans
    pub fn earliest_start(&self) -> Option<DateTime<Utc>> {
        self.spans.iter().filter_map(|s| s.start).min()
    }

    /// Latest exit across all spans; `None` while any span is still open
    /// or no span has ended yet
    pub fn latest_end(&self) -> Option<DateTime<Utc>> {
        if self.spans.iter().any(|s| s.start.is_some() && s.end.is_none()) {
            return None;
        }
        self.spans.iter().filter_map(|s| s.end).max()
    }
}
