//! Resolves a manage token to the booking that is authoritative now.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Booking, BookingStatus, ManageToken};
use crate::constants::MANAGE_CUTOFF_HOURS;
use crate::error::{JbsError, JbsResult};

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Read access to the booking table needed by the resolver.
#[async_trait]
pub trait BookingLookup: Send + Sync {
    /// The booking whose cancellation token equals `token`.
    async fn find_by_token(&self, token: &ManageToken) -> JbsResult<Option<Booking>>;

    /// The most recently created booking whose `original_booking_id` is `booking_id`.
    async fn find_latest_descendant(&self, booking_id: i64) -> JbsResult<Option<Booking>>;
}

/// Public fields of the authoritative booking.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub message: Option<String>,
    pub event_date: DateTime<Utc>,
    pub status: BookingStatus,
    pub zoom_join_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub rescheduled_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub is_rescheduled_booking: bool,
}

impl From<&Booking> for BookingView {
    fn from(b: &Booking) -> Self {
        BookingView {
            id: b.id,
            first_name: b.first_name.clone(),
            last_name: b.last_name.clone(),
            email: b.email.clone(),
            phone_number: b.phone_number.clone(),
            message: b.message.clone(),
            event_date: b.event_date,
            status: b.status.clone(),
            zoom_join_url: b.zoom_join_url.clone(),
            created_at: b.created_at,
            rescheduled_at: b.rescheduled_at,
            cancelled_at: b.cancelled_at,
            is_rescheduled_booking: b.is_rescheduled_booking(),
        }
    }
}

/// What the manage page may show and offer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManageView {
    pub booking: BookingView,
    pub can_reschedule: bool,
    pub can_cancel: bool,
    /// Rounded to one decimal place; negative once the session has started.
    pub hours_until_event: f64,
    pub is_redirected_from_old_booking: bool,
    /// The authoritative row itself, for callers acting on it.
    #[serde(skip)]
    pub current: Booking,
}

/// Resolve `token` against `lookup` as of `now`.
///
/// The token is checked before any lookup happens. When the booking has
/// been superseded by a reschedule, the latest descendant is reported
/// instead and `is_redirected_from_old_booking` is set.
pub async fn resolve_booking<L: BookingLookup + ?Sized>(
    lookup: &L,
    token: &str,
    now: DateTime<Utc>,
) -> JbsResult<ManageView> {
    let token = ManageToken::parse(token)?;

    let base = lookup
        .find_by_token(&token)
        .await?
        .ok_or(JbsError::BookingNotFound)?;

    let (booking, is_redirected_from_old_booking) =
        match lookup.find_latest_descendant(base.id).await? {
            Some(latest) => (latest, true),
            None => (base, false),
        };

    let is_past = booking.event_date < now;
    let hours_until_event =
        (booking.event_date - now).num_milliseconds() as f64 / MS_PER_HOUR;
    let within_time_limit = hours_until_event > MANAGE_CUTOFF_HOURS && !is_past;

    let is_confirmed = booking.status == BookingStatus::Confirmed;
    let can_reschedule = within_time_limit && is_confirmed && !booking.is_rescheduled_booking();
    let can_cancel = within_time_limit && is_confirmed;

    Ok(ManageView {
        booking: BookingView::from(&booking),
        can_reschedule,
        can_cancel,
        hours_until_event: round_to_tenth(hours_until_event),
        is_redirected_from_old_booking,
        current: booking,
    })
}

/// Round half up to one decimal place (`-0.25` → `-0.2`, `0.25` → `0.3`).
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0 + 0.5).floor() / 10.0
}
