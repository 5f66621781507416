//! Meeting provider client
//!
//! The external meeting platform is a collaborator behind the `MeetProvider`
//! trait: the reconciler only needs "is there a conference record for this
//! meeting code" and "who was in it, with their reconnect history". Tests
//! substitute a scripted implementation; production uses the HTTP client
//! below with a hard per-request timeout so an unresponsive provider cannot
//! stall the scheduler.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use classtrack_common::config::ProviderConfig;
use classtrack_common::{Error, Result};

use crate::models::{ConferenceId, ParticipantRecord};

/// Capability the reconciler consumes from the meeting platform
#[async_trait]
pub trait MeetProvider: Send + Sync {
    /// Resolve a meeting code to its most recent conference record, if the
    /// provider has one yet
    async fn find_conference(&self, meeting_code: &str) -> Result<Option<ConferenceId>>;

    /// All participants of a conference with their join/leave spans
    async fn list_participants(&self, conference: &ConferenceId) -> Result<Vec<ParticipantRecord>>;
}

/// HTTP implementation against the provider's REST API
pub struct HttpMeetProvider {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConferenceRecordsResponse {
    #[serde(default)]
    conference_records: Vec<ConferenceRecord>,
}

#[derive(Debug, Deserialize)]
struct ConferenceRecord {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ParticipantsResponse {
    #[serde(default)]
    participants: Vec<ParticipantRecord>,
}

impl HttpMeetProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Provider(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn get(&self, url: String) -> reqwest::RequestBuilder {
        let mut request = self.client.get(url);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }
        request
    }
}

#[async_trait]
impl MeetProvider for HttpMeetProvider {
    async fn find_conference(&self, meeting_code: &str) -> Result<Option<ConferenceId>> {
        let url = format!("{}/v2/conference-records", self.base_url);
        let response = self
            .get(url)
            .query(&[("meeting_code", meeting_code)])
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Conference lookup failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Provider(format!(
                "Conference lookup returned {}",
                response.status()
            )));
        }

        let body: ConferenceRecordsResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Malformed conference response: {}", e)))?;

        // Records are returned most recent first
        let id = body.conference_records.into_iter().next().map(|r| ConferenceId(r.id));
        debug!(meeting_code, found = id.is_some(), "Conference lookup");
        Ok(id)
    }

    async fn list_participants(&self, conference: &ConferenceId) -> Result<Vec<ParticipantRecord>> {
        let url = format!("{}/v2/conference-records/{}/participants", self.base_url, conference.0);
        let response = self
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Participant fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Provider(format!(
                "Participant fetch returned {}",
                response.status()
            )));
        }

        let body: ParticipantsResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Malformed participant response: {}", e)))?;

        debug!(conference = %conference.0, count = body.participants.len(), "Fetched participants");
        Ok(body.participants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_wire_format() {
        let json = r#"
        {
            "participants": [
                {
                    "email": "tutor@academy.test",
                    "display_name": "Carol Diaz",
                    "spans": [
                        {"start": "2025-06-01T10:00:00Z", "end": "2025-06-01T10:30:00Z"}
                    ],
                    "total_duration_seconds": 1800
                },
                {
                    "display_name": "Anonymous Bear"
                }
            ]
        }
        "#;
        let parsed: ParticipantsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.participants.len(), 2);
        assert_eq!(parsed.participants[0].total_duration_seconds, 1800);
        assert_eq!(parsed.participants[0].spans.len(), 1);
        assert!(parsed.participants[1].email.is_none());
        assert!(parsed.participants[1].spans.is_empty());
    }

    #[test]
    fn test_empty_conference_response() {
        let parsed: ConferenceRecordsResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.conference_records.is_empty());
    }
}
