//! In-memory fakes and request helpers for router tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::http::request::Builder;
use axum::response::Response;
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use jbs_core::booking::{Booking, BookingLookup, BookingStatus, ManageToken, NewBooking};
use jbs_core::config::{EmailConfig, SiteConfig};
use jbs_core::constants::{
    BOOKING_RATE_LIMIT, BOOKING_RATE_WINDOW_MINUTES, CONTACT_RATE_LIMIT, CONTACT_RATE_WINDOW_MINUTES,
};
use jbs_core::email::EmailTemplates;
use jbs_core::rate_limit::RateLimiter;
use jbs_core::remote::{
    CalendarEntry, CalendarService, CreatedCalendarEvent, HumanVerifier, Mailer, Meeting, MeetingInvitee,
    MeetingService, NewCalendarEvent, OutgoingEmail, RecordSource, SortSpec,
};
use jbs_core::store::{BookingStore, ContactStore, SessionStore, normalize_email};
use jbs_core::validation::ContactInput;
use jbs_core::{JbsError, JbsResult};

use crate::state::AppState;

// ============================================================================
// Store
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    bookings: Mutex<Vec<Booking>>,
    contacts: Mutex<Vec<(Uuid, ContactInput)>>,
    sessions: Mutex<Vec<Uuid>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    /// Insert a fully formed booking, assigning the next id.
    pub fn seed(&self, mut booking: Booking) -> Booking {
        let mut bookings = self.bookings.lock().unwrap();
        booking.id = bookings.len() as i64 + 1;
        bookings.push(booking.clone());
        booking
    }

    pub fn bookings(&self) -> Vec<Booking> {
        self.bookings.lock().unwrap().clone()
    }

    pub fn contacts(&self) -> Vec<(Uuid, ContactInput)> {
        self.contacts.lock().unwrap().clone()
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    /// Booking inserts and reschedules fail from now on.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    fn check_writes(&self) -> JbsResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(JbsError::Storage("connection refused".into()));
        }
        Ok(())
    }

    fn check_reads(&self) -> JbsResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(JbsError::Storage("connection refused".into()));
        }
        Ok(())
    }

    fn push(&self, new: NewBooking) -> Booking {
        self.seed(Booking {
            id: 0,
            cancellation_token: new.cancellation_token,
            session_id: new.session_id,
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            phone_number: new.phone_number,
            message: new.message,
            event_date: new.event_date,
            status: BookingStatus::Confirmed,
            google_calendar_event_id: None,
            zoom_meeting_id: new.zoom_meeting_id,
            zoom_join_url: new.zoom_join_url,
            created_at: new.created_at,
            rescheduled_at: None,
            cancelled_at: None,
            original_booking_id: new.original_booking_id,
        })
    }

    fn transition(&self, id: i64, to: BookingStatus, now: DateTime<Utc>) -> JbsResult<Booking> {
        let mut bookings = self.bookings.lock().unwrap();
        let booking = bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(JbsError::BookingNotFound)?;
        if booking.status != BookingStatus::Confirmed {
            return Err(JbsError::ActionNotAllowed("Booking can no longer be changed".into()));
        }
        match to {
            BookingStatus::Cancelled => booking.cancelled_at = Some(now),
            BookingStatus::Rescheduled => booking.rescheduled_at = Some(now),
            _ => {}
        }
        booking.status = to;
        Ok(booking.clone())
    }
}

#[async_trait]
impl BookingLookup for MemoryStore {
    async fn find_by_token(&self, token: &ManageToken) -> JbsResult<Option<Booking>> {
        self.check_reads()?;
        let bookings = self.bookings.lock().unwrap();
        Ok(bookings.iter().find(|b| &b.cancellation_token == token.as_uuid()).cloned())
    }

    async fn find_latest_descendant(&self, booking_id: i64) -> JbsResult<Option<Booking>> {
        self.check_reads()?;
        let bookings = self.bookings.lock().unwrap();
        Ok(bookings
            .iter()
            .filter(|b| b.original_booking_id == Some(booking_id))
            .max_by_key(|b| b.created_at)
            .cloned())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn insert_booking(&self, booking: NewBooking) -> JbsResult<Booking> {
        self.check_writes()?;
        Ok(self.push(booking))
    }

    async fn attach_calendar_event(&self, booking_id: i64, event_id: &str) -> JbsResult<()> {
        let mut bookings = self.bookings.lock().unwrap();
        if let Some(booking) = bookings.iter_mut().find(|b| b.id == booking_id) {
            booking.google_calendar_event_id = Some(event_id.to_string());
        }
        Ok(())
    }

    async fn cancel(&self, booking_id: i64, now: DateTime<Utc>) -> JbsResult<Booking> {
        self.transition(booking_id, BookingStatus::Cancelled, now)
    }

    async fn reschedule(&self, previous_id: i64, replacement: NewBooking, now: DateTime<Utc>) -> JbsResult<Booking> {
        self.check_writes()?;
        self.transition(previous_id, BookingStatus::Rescheduled, now)?;
        Ok(self.push(replacement))
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn insert_contact(&self, session_id: Uuid, contact: &ContactInput) -> JbsResult<i64> {
        let mut stored = contact.clone();
        stored.email = normalize_email(&contact.email);
        let mut contacts = self.contacts.lock().unwrap();
        contacts.push((session_id, stored));
        Ok(contacts.len() as i64)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get_or_create(&self, existing: Option<Uuid>, _now: DateTime<Utc>) -> JbsResult<Uuid> {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(id) = existing.filter(|id| sessions.contains(id)) {
            return Ok(id);
        }
        let id = Uuid::new_v4();
        sessions.push(id);
        Ok(id)
    }
}

// ============================================================================
// Remote services
// ============================================================================

#[derive(Default)]
pub struct FakeCalendar {
    entries: Mutex<Vec<CalendarEntry>>,
    inserted: Mutex<Vec<NewCalendarEvent>>,
    deleted: Mutex<Vec<String>>,
    fail_inserts: AtomicBool,
}

impl FakeCalendar {
    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    pub fn add_entry(&self, entry: CalendarEntry) {
        self.entries.lock().unwrap().push(entry);
    }

    pub fn inserted(&self) -> Vec<NewCalendarEvent> {
        self.inserted.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl CalendarService for FakeCalendar {
    async fn list_entries(&self, _start: DateTime<Utc>, _end: DateTime<Utc>) -> JbsResult<Vec<CalendarEntry>> {
        Ok(self.entries.lock().unwrap().clone())
    }

    async fn insert_event(&self, event: &NewCalendarEvent) -> JbsResult<CreatedCalendarEvent> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(JbsError::Remote("Google Calendar insert returned 503".into()));
        }
        let mut inserted = self.inserted.lock().unwrap();
        inserted.push(event.clone());
        Ok(CreatedCalendarEvent {
            id: format!("evt-{}", inserted.len()),
            html_link: None,
            status: Some("confirmed".into()),
            summary: Some(event.summary.clone()),
        })
    }

    async fn delete_event(&self, event_id: &str) -> JbsResult<()> {
        self.deleted.lock().unwrap().push(event_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeMeetings {
    topics: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
}

impl FakeMeetings {
    pub fn topics(&self) -> Vec<String> {
        self.topics.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl MeetingService for FakeMeetings {
    async fn create_meeting(
        &self,
        topic: &str,
        _start: DateTime<Utc>,
        _duration_minutes: i64,
        _invitees: &[MeetingInvitee],
    ) -> JbsResult<Meeting> {
        let mut topics = self.topics.lock().unwrap();
        topics.push(topic.to_string());
        let n = topics.len();
        Ok(Meeting {
            id: n.to_string(),
            join_url: format!("https://zoom.us/j/{n}"),
        })
    }

    async fn delete_meeting(&self, meeting_id: &str) -> JbsResult<()> {
        self.deleted.lock().unwrap().push(meeting_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: AtomicBool,
}

impl FakeMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_all(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, email: &OutgoingEmail) -> JbsResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(JbsError::Remote("Resend returned 500".into()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Accepts only the token `solved`.
pub struct FakeVerifier;

#[async_trait]
impl HumanVerifier for FakeVerifier {
    async fn verify(&self, token: &str, _remote_ip: &str) -> JbsResult<bool> {
        Ok(token == "solved")
    }
}

#[derive(Default)]
pub struct FakeRecords {
    layouts: Mutex<HashMap<String, Vec<Value>>>,
    queries: Mutex<Vec<(String, Value)>>,
    fail: AtomicBool,
}

impl FakeRecords {
    pub fn put(&self, layout: &str, record: Value) {
        self.layouts.lock().unwrap().entry(layout.to_string()).or_default().push(record);
    }

    pub fn last_query(&self) -> Option<(String, Value)> {
        self.queries.lock().unwrap().last().cloned()
    }

    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordSource for FakeRecords {
    async fn find(&self, layout: &str, query: Value, _sort: Vec<SortSpec>) -> JbsResult<Vec<Value>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(JbsError::Remote("FileMaker Find Error".into()));
        }
        self.queries.lock().unwrap().push((layout.to_string(), query));
        Ok(self.layouts.lock().unwrap().get(layout).cloned().unwrap_or_default())
    }
}

// ============================================================================
// Harness and requests
// ============================================================================

pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub calendar: Arc<FakeCalendar>,
    pub meetings: Arc<FakeMeetings>,
    pub mailer: Arc<FakeMailer>,
    pub records: Arc<FakeRecords>,
    state: AppState,
}

impl TestHarness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::default());
        let calendar = Arc::new(FakeCalendar::default());
        let meetings = Arc::new(FakeMeetings::default());
        let mailer = Arc::new(FakeMailer::default());
        let records = Arc::new(FakeRecords::default());

        let templates = EmailTemplates::new(
            &SiteConfig {
                base_url: "https://jbs.example".into(),
                zoom_link: String::new(),
            },
            &EmailConfig {
                resend_api_key: "re_test".into(),
                from: "JBS <noreply@jbs.example>".into(),
                lecturer_email: "lecturer@jbs.example".into(),
            },
        );

        let state = AppState {
            bookings: store.clone(),
            contacts: store.clone(),
            sessions: store.clone(),
            records: records.clone(),
            calendar: calendar.clone(),
            meetings: meetings.clone(),
            mailer: mailer.clone(),
            verifier: Arc::new(FakeVerifier),
            templates: Arc::new(templates),
            booking_limiter: Arc::new(RateLimiter::new(
                BOOKING_RATE_LIMIT,
                Duration::minutes(BOOKING_RATE_WINDOW_MINUTES),
            )),
            contact_limiter: Arc::new(RateLimiter::new(
                CONTACT_RATE_LIMIT,
                Duration::minutes(CONTACT_RATE_WINDOW_MINUTES),
            )),
        };

        TestHarness {
            store,
            calendar,
            meetings,
            mailer,
            records,
            state,
        }
    }

    /// A fresh router over the shared fakes.
    pub fn app(&self) -> Router {
        crate::app(self.state.clone())
    }
}

/// A confirmed booking at `event_date`, created three days ago.
pub fn sample_booking(event_date: DateTime<Utc>) -> Booking {
    Booking {
        id: 0,
        cancellation_token: Uuid::new_v4(),
        session_id: None,
        first_name: "Hana".into(),
        last_name: "Sato".into(),
        email: "hana@example.com".into(),
        phone_number: None,
        message: None,
        event_date,
        status: BookingStatus::Confirmed,
        google_calendar_event_id: None,
        zoom_meeting_id: Some("9001".into()),
        zoom_join_url: Some("https://zoom.us/j/9001".into()),
        created_at: Utc::now() - Duration::days(3),
        rescheduled_at: None,
        cancelled_at: None,
        original_booking_id: None,
    }
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
}

pub struct JsonRequest {
    builder: Builder,
    body: Vec<u8>,
}

impl JsonRequest {
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    pub fn build(self) -> Request<Body> {
        self.builder.body(Body::from(self.body)).unwrap()
    }
}

pub fn post_json(uri: &str, body: &Value) -> JsonRequest {
    JsonRequest {
        builder: Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json"),
        body: serde_json::to_vec(body).unwrap(),
    }
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
