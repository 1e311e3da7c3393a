//! Persistence seams. The server implements these over PostgreSQL; tests
//! use in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::booking::{Booking, BookingLookup, NewBooking};
use crate::error::JbsResult;
use crate::validation::ContactInput;

#[async_trait]
pub trait BookingStore: BookingLookup {
    async fn insert_booking(&self, booking: NewBooking) -> JbsResult<Booking>;

    async fn attach_calendar_event(&self, booking_id: i64, event_id: &str) -> JbsResult<()>;

    /// Mark a confirmed booking cancelled.
    ///
    /// Fails with `ActionNotAllowed` if the row is no longer confirmed.
    async fn cancel(&self, booking_id: i64, now: DateTime<Utc>) -> JbsResult<Booking>;

    /// Mark `previous_id` rescheduled and insert its replacement, atomically.
    ///
    /// Fails with `ActionNotAllowed` if `previous_id` is no longer confirmed,
    /// in which case nothing is written.
    async fn reschedule(&self, previous_id: i64, replacement: NewBooking, now: DateTime<Utc>) -> JbsResult<Booking>;
}

#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Store a contact message and return its id. The email is stored
    /// lowercased and trimmed.
    async fn insert_contact(&self, session_id: Uuid, contact: &ContactInput) -> JbsResult<i64>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Reuse `existing` when it names a known session, otherwise start a new one.
    async fn get_or_create(&self, existing: Option<Uuid>, now: DateTime<Utc>) -> JbsResult<Uuid>;
}

/// Normal form for stored email addresses.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
