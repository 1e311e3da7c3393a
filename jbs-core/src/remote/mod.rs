//! Outbound services.
//!
//! Every external collaborator sits behind an object-safe trait so the
//! server can hold them as `Arc<dyn ...>` and tests can swap in fakes.
//! Each HTTP implementation owns its own credential cache.

mod filemaker;
mod google_calendar;
mod records;
mod resend;
mod turnstile;
mod zoom;

pub use filemaker::FileMakerClient;
pub use google_calendar::GoogleCalendar;
pub use records::{EventRepository, ProgramRepository};
pub use resend::ResendMailer;
pub use turnstile::Turnstile;
pub use zoom::ZoomMeetings;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{JbsError, JbsResult};

// ============================================================================
// Record database
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascend,
    Descend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    pub field_name: String,
    pub sort_order: SortOrder,
}

impl SortSpec {
    pub fn ascend(field_name: &str) -> Self {
        SortSpec {
            field_name: field_name.to_string(),
            sort_order: SortOrder::Ascend,
        }
    }
}

/// Find access to a layout-based record database.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Raw records matching `query`; no match is an empty list, not an error.
    async fn find(&self, layout: &str, query: Value, sort: Vec<SortSpec>) -> JbsResult<Vec<Value>>;
}

// ============================================================================
// Calendar
// ============================================================================

/// An existing calendar entry. All-day entries have no timed start/end.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEntry {
    pub id: String,
    pub summary: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewCalendarEvent {
    pub summary: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub time_zone: String,
    /// Stored as private extended properties on the event.
    pub private_properties: BTreeMap<String, String>,
}

/// The calendar's answer to an insert, echoed back to the booking form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedCalendarEvent {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Entries intersecting `[start, end)`, recurring events expanded.
    async fn list_entries(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> JbsResult<Vec<CalendarEntry>>;

    async fn insert_event(&self, event: &NewCalendarEvent) -> JbsResult<CreatedCalendarEvent>;

    /// Deleting an event that is already gone succeeds.
    async fn delete_event(&self, event_id: &str) -> JbsResult<()>;
}

// ============================================================================
// Meetings
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct MeetingInvitee {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Meeting {
    pub id: String,
    pub join_url: String,
}

#[async_trait]
pub trait MeetingService: Send + Sync {
    async fn create_meeting(
        &self,
        topic: &str,
        start: DateTime<Utc>,
        duration_minutes: i64,
        invitees: &[MeetingInvitee],
    ) -> JbsResult<Meeting>;

    /// Deleting a meeting that is already gone succeeds.
    async fn delete_meeting(&self, meeting_id: &str) -> JbsResult<()>;
}

// ============================================================================
// Email and bot checks
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> JbsResult<()>;
}

#[async_trait]
pub trait HumanVerifier: Send + Sync {
    /// Whether the challenge `token` was solved by a human at `remote_ip`.
    async fn verify(&self, token: &str, remote_ip: &str) -> JbsResult<bool>;
}

// ============================================================================
// Helpers
// ============================================================================

/// Pass successful responses through; turn others into `JbsError::Remote`.
async fn check_status(response: reqwest::Response, service: &str) -> JbsResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(JbsError::Remote(format!("{service} returned {status}: {body}")))
}

/// Append literal path segments to `base`, percent-encoding each one.
fn join_segments(base: &str, segments: &[&str]) -> JbsResult<url::Url> {
    let mut url = url::Url::parse(base)
        .map_err(|e| JbsError::Config(format!("Invalid base URL '{base}': {e}")))?;
    url.path_segments_mut()
        .map_err(|_| JbsError::Config(format!("Base URL '{base}' cannot have a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_segments_encodes_each_segment() {
        let url = join_segments("https://fm.example.com/", &["fmi", "data", "My DB", "a/b"]).unwrap();
        assert_eq!(url.as_str(), "https://fm.example.com/fmi/data/My%20DB/a%2Fb");
    }

    #[test]
    fn test_sort_spec_wire_shape() {
        let json = serde_json::to_value(SortSpec::ascend("ID")).unwrap();
        assert_eq!(json, serde_json::json!({ "fieldName": "ID", "sortOrder": "ascend" }));
    }
}
