//! Booking management through the link in the confirmation email.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
};
use chrono::Utc;
use serde::Serialize;

use jbs_core::booking::{BookingView, ManageView, NewBooking, resolve_booking};
use jbs_core::slot::BookingSlot;
use jbs_core::validation::Validators;
use jbs_core::JbsError;

use crate::routes::book::{
    add_calendar_event, create_meeting, discard_meeting, ensure_future, ensure_slot_free, send_booking_emails,
};
use crate::routes::{AppError, parse_body, request_locale};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/free-coaching/manage/{token}", get(show))
        .route("/api/free-coaching/manage/{token}/cancel", post(cancel))
        .route("/api/free-coaching/manage/{token}/reschedule", post(reschedule))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChangeResponse {
    success: bool,
    booking: BookingView,
    /// Token for the booking's manage link after the change.
    manage_token: String,
}

/// GET /api/free-coaching/manage/{token} - Current state of a booking
async fn show(State(state): State<AppState>, Path(token): Path<String>) -> Result<Json<ManageView>, AppError> {
    let view = resolve_booking(&*state.bookings, &token, Utc::now()).await?;
    Ok(Json(view))
}

/// POST /api/free-coaching/manage/{token}/cancel - Cancel a booking
async fn cancel(State(state): State<AppState>, Path(token): Path<String>) -> Result<Json<ChangeResponse>, AppError> {
    let now = Utc::now();
    let view = resolve_booking(&*state.bookings, &token, now).await?;
    if !view.can_cancel {
        return Err(JbsError::ActionNotAllowed("This booking can no longer be cancelled".into()).into());
    }

    let cancelled = state.bookings.cancel(view.current.id, now).await?;

    if let Some(event_id) = &cancelled.google_calendar_event_id {
        if let Err(e) = state.calendar.delete_event(event_id).await {
            tracing::warn!(booking = cancelled.id, "failed to delete calendar event: {e}");
        }
    }
    if let Some(meeting_id) = &cancelled.zoom_meeting_id {
        discard_meeting(&state, meeting_id).await;
    }
    if let Err(e) = state.mailer.send(&state.templates.cancellation_notification(&cancelled)).await {
        tracing::warn!(booking = cancelled.id, "failed to send cancellation notice: {e}");
    }

    tracing::info!(booking = cancelled.id, "booking cancelled");

    Ok(Json(ChangeResponse {
        success: true,
        booking: BookingView::from(&cancelled),
        manage_token: cancelled.cancellation_token.to_string(),
    }))
}

/// POST /api/free-coaching/manage/{token}/reschedule - Move a booking to a new slot
async fn reschedule(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ChangeResponse>, AppError> {
    let now = Utc::now();
    let view = resolve_booking(&*state.bookings, &token, now).await?;
    if !view.can_reschedule {
        return Err(JbsError::ActionNotAllowed("This booking can no longer be rescheduled".into()).into());
    }

    let body = parse_body(&body)?;
    let date = Validators::required_string(body.get("date"), "Date")?;
    let time = Validators::required_string(body.get("time"), "Time")?;
    let slot = BookingSlot::from_local(date, time)?;
    ensure_future(&slot, now)?;

    let current = view.current;
    ensure_slot_free(&state, &slot, current.google_calendar_event_id.as_deref()).await?;

    let meeting = create_meeting(&state, &slot, &current.first_name, &current.last_name, &current.email).await?;
    let meeting_id = meeting.id.clone();
    let mut replacement = NewBooking::rescheduled_from(&current, slot.start, now);
    replacement.zoom_meeting_id = Some(meeting.id);
    replacement.zoom_join_url = Some(meeting.join_url);

    let booking = match state.bookings.reschedule(current.id, replacement, now).await {
        Ok(booking) => booking,
        Err(e) => {
            discard_meeting(&state, &meeting_id).await;
            return Err(e.into());
        }
    };

    // The change is committed; the remaining steps only log failures.
    if let Err(e) = add_calendar_event(&state, &booking).await {
        tracing::warn!(booking = booking.id, "failed to add calendar event, slot not blocked: {e}");
    }
    if let Some(event_id) = &current.google_calendar_event_id {
        if let Err(e) = state.calendar.delete_event(event_id).await {
            tracing::warn!(booking = current.id, "failed to delete calendar event: {e}");
        }
    }
    if let Some(old_meeting) = &current.zoom_meeting_id {
        discard_meeting(&state, old_meeting).await;
    }
    send_booking_emails(&state, &request_locale(&headers), &booking).await;

    tracing::info!(from = current.id, to = booking.id, start = %slot.start, "booking rescheduled");

    Ok(Json(ChangeResponse {
        success: true,
        booking: BookingView::from(&booking),
        manage_token: booking.cancellation_token.to_string(),
    }))
}
