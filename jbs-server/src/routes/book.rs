//! Free coaching booking endpoint and the steps it shares with rescheduling.

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use jbs_core::booking::{Booking, NewBooking};
use jbs_core::constants::SESSION_MINUTES;
use jbs_core::remote::{CreatedCalendarEvent, Meeting, MeetingInvitee, NewCalendarEvent};
use jbs_core::slot::{BOOKING_TZ, BookingSlot, find_conflict};
use jbs_core::validation::Validators;
use jbs_core::{JbsError, JbsResult};

use crate::routes::{AppError, client_ip, error_response, parse_body, request_locale};
use crate::session::{session_cookie, session_from_headers};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/free-coaching/book", post(book))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BookResponse {
    success: bool,
    event: CreatedCalendarEvent,
    session_id: Uuid,
}

/// POST /api/free-coaching/book - Book a free coaching session
async fn book(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<Response, AppError> {
    let ip = client_ip(&headers);
    if !state.booking_limiter.limit(&ip).success {
        return Ok(error_response(StatusCode::TOO_MANY_REQUESTS, "Too many requests. Try later."));
    }

    let locale = request_locale(&headers);
    let input = Validators::validate_booking(&parse_body(&body)?)?;
    let slot = BookingSlot::from_local(&input.date, &input.time)?;
    ensure_future(&slot, Utc::now())?;

    ensure_slot_free(&state, &slot, None).await?;

    let now = Utc::now();
    let session_id = state.sessions.get_or_create(session_from_headers(&headers), now).await?;

    let meeting = create_meeting(&state, &slot, &input.first_name, &input.last_name, &input.email).await?;
    let meeting_id = meeting.id.clone();

    let inserted = state
        .bookings
        .insert_booking(NewBooking {
            cancellation_token: Uuid::new_v4(),
            session_id: Some(session_id),
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            phone_number: input.phone,
            message: input.message,
            event_date: slot.start,
            zoom_meeting_id: Some(meeting.id),
            zoom_join_url: Some(meeting.join_url),
            created_at: now,
            original_booking_id: None,
        })
        .await;
    let booking = match inserted {
        Ok(booking) => booking,
        Err(e) => {
            discard_meeting(&state, &meeting_id).await;
            return Err(e.into());
        }
    };

    let event = add_calendar_event(&state, &booking).await?;
    send_booking_emails(&state, &locale, &booking).await;

    tracing::info!(booking = booking.id, start = %slot.start, "session booked");

    let cookie = session_cookie(session_id);
    let body = BookResponse {
        success: true,
        event,
        session_id,
    };
    Ok(([(SET_COOKIE, cookie)], Json(body)).into_response())
}

/// Fail with `SlotUnavailable` if the calendar has a timed entry overlapping
/// `slot`. `ignore_event` skips the caller's own existing entry.
pub(crate) async fn ensure_slot_free(
    state: &AppState,
    slot: &BookingSlot,
    ignore_event: Option<&str>,
) -> JbsResult<()> {
    let mut entries = state.calendar.list_entries(slot.start, slot.end).await?;
    if let Some(own) = ignore_event {
        entries.retain(|entry| entry.id != own);
    }

    match find_conflict(slot, &entries) {
        Some(conflict) => {
            tracing::info!(event = %conflict.id, start = %slot.start, "slot already taken");
            Err(JbsError::SlotUnavailable)
        }
        None => Ok(()),
    }
}

pub(crate) async fn create_meeting(
    state: &AppState,
    slot: &BookingSlot,
    first_name: &str,
    last_name: &str,
    email: &str,
) -> JbsResult<Meeting> {
    let invitees = [MeetingInvitee {
        email: email.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
    }];
    state
        .meetings
        .create_meeting(&session_title(first_name, last_name), slot.start, SESSION_MINUTES, &invitees)
        .await
}

/// Delete a meeting no booking refers to any more. Failures leave it orphaned
/// and are logged with its id.
pub(crate) async fn discard_meeting(state: &AppState, meeting_id: &str) {
    if let Err(e) = state.meetings.delete_meeting(meeting_id).await {
        tracing::warn!(meeting_id, "failed to delete zoom meeting, left orphaned: {e}");
    }
}

/// Insert the calendar entry for `booking` and remember its id on the row.
pub(crate) async fn add_calendar_event(state: &AppState, booking: &Booking) -> JbsResult<CreatedCalendarEvent> {
    let event = state.calendar.insert_event(&calendar_event(booking)).await?;
    state.bookings.attach_calendar_event(booking.id, &event.id).await?;
    Ok(event)
}

/// Customer confirmation and lecturer notice. Failures are logged; the
/// booking already exists at this point.
pub(crate) async fn send_booking_emails(state: &AppState, locale: &str, booking: &Booking) {
    let emails = [
        state.templates.booking_confirmation(locale, booking),
        state.templates.lecturer_notification(booking),
    ];
    for email in &emails {
        if let Err(e) = state.mailer.send(email).await {
            tracing::warn!(booking = booking.id, subject = %email.subject, "failed to send email: {e}");
        }
    }
}

fn session_title(first_name: &str, last_name: &str) -> String {
    format!("Free Coaching X {first_name} {last_name}")
}

fn calendar_event(booking: &Booking) -> NewCalendarEvent {
    let slot = BookingSlot::starting_at(booking.event_date);
    let phone = booking.phone_number.clone().unwrap_or_default();
    let message = booking.message.clone().unwrap_or_default();

    let mut description = format!(
        "Free coaching session with {} {}\nEmail: {}\n",
        booking.first_name, booking.last_name, booking.email
    );
    if !phone.is_empty() {
        description.push_str(&format!("Phone: {phone}\n"));
    }
    if !message.is_empty() {
        description.push_str(&format!("Message: {message}\n"));
    }
    description.push_str(&format!(
        "Zoom link: {}",
        booking.zoom_join_url.as_deref().unwrap_or_default()
    ));

    let private_properties = BTreeMap::from([
        ("firstName".to_string(), booking.first_name.clone()),
        ("lastName".to_string(), booking.last_name.clone()),
        ("email".to_string(), booking.email.clone()),
        ("phone".to_string(), phone),
        ("message".to_string(), message),
        ("bookingToken".to_string(), booking.cancellation_token.to_string()),
    ]);

    NewCalendarEvent {
        summary: session_title(&booking.first_name, &booking.last_name),
        description,
        start: slot.start,
        end: slot.end,
        time_zone: BOOKING_TZ.name().to_string(),
        private_properties,
    }
}

/// Slots must start in the future.
pub(crate) fn ensure_future(slot: &BookingSlot, now: DateTime<Utc>) -> JbsResult<()> {
    if slot.start <= now {
        return Err(JbsError::Validation("Selected time is in the past".into()));
    }
    Ok(())
}
