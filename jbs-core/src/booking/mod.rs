//! Free coaching bookings.
//!
//! A reschedule never edits a booking in place: it inserts a new row whose
//! `original_booking_id` points at the booking it replaces. Rows are never
//! deleted.

mod resolver;
mod token;

pub use resolver::{BookingLookup, BookingView, ManageView, resolve_booking, round_to_tenth};
pub use token::ManageToken;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Lifecycle tag stored as lowercase text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Rescheduled,
    /// Any tag this build does not know about. Never actionable.
    Other(String),
}

impl BookingStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Rescheduled => "rescheduled",
            BookingStatus::Other(s) => s,
        }
    }
}

impl From<String> for BookingStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "confirmed" => BookingStatus::Confirmed,
            "cancelled" => BookingStatus::Cancelled,
            "rescheduled" => BookingStatus::Rescheduled,
            _ => BookingStatus::Other(s),
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BookingStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BookingStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(BookingStatus::from)
    }
}

/// A stored booking row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    /// Unguessable public handle for the manage page (not the primary id).
    pub cancellation_token: Uuid,
    pub session_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub message: Option<String>,
    pub event_date: DateTime<Utc>,
    pub status: BookingStatus,
    pub google_calendar_event_id: Option<String>,
    pub zoom_meeting_id: Option<String>,
    pub zoom_join_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub rescheduled_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Set on the row created by a reschedule.
    pub original_booking_id: Option<i64>,
}

impl Booking {
    pub fn is_rescheduled_booking(&self) -> bool {
        self.original_booking_id.is_some()
    }
}

/// Fields for a booking row that does not exist yet.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub cancellation_token: Uuid,
    pub session_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub message: Option<String>,
    pub event_date: DateTime<Utc>,
    pub zoom_meeting_id: Option<String>,
    pub zoom_join_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub original_booking_id: Option<i64>,
}

impl NewBooking {
    /// The row that replaces `previous` at a new time.
    pub fn rescheduled_from(previous: &Booking, event_date: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        NewBooking {
            cancellation_token: Uuid::new_v4(),
            session_id: previous.session_id,
            first_name: previous.first_name.clone(),
            last_name: previous.last_name.clone(),
            email: previous.email.clone(),
            phone_number: previous.phone_number.clone(),
            message: previous.message.clone(),
            event_date,
            zoom_meeting_id: None,
            zoom_join_url: None,
            created_at: now,
            original_booking_id: Some(previous.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_known_tags() {
        for tag in ["confirmed", "cancelled", "rescheduled"] {
            assert_eq!(BookingStatus::from(tag.to_string()).as_str(), tag);
        }
    }

    #[test]
    fn test_unknown_status_is_preserved() {
        let status = BookingStatus::from("pending".to_string());
        assert_eq!(status, BookingStatus::Other("pending".into()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"pending\"");
    }
}
