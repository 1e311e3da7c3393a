//! Contact form endpoint.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State, rejection::BytesRejection},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header::{CONTENT_LENGTH, SET_COOKIE}},
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::Utc;
use serde_json::{Value, json};

use jbs_core::JbsError;
use jbs_core::constants::CONTACT_MAX_BODY_BYTES;
use jbs_core::rate_limit::LimitOutcome;
use jbs_core::validation::Validators;

use crate::routes::{AppError, client_ip, error_response, parse_body};
use crate::session::{session_cookie, session_from_headers};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/contact", post(contact))
        // Bodies without a Content-Length are capped while reading.
        .layer(DefaultBodyLimit::max(CONTACT_MAX_BODY_BYTES as usize))
}

/// POST /api/contact - Store a contact message and notify staff
async fn contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, AppError> {
    let declared_length = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);
    if declared_length > CONTACT_MAX_BODY_BYTES {
        return Ok(error_response(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large"));
    }
    let body = match body {
        Ok(body) => body,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return Ok(error_response(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large"));
        }
        Err(rejection) => return Ok(rejection.into_response()),
    };

    let ip = client_ip(&headers);
    let outcome = state.contact_limiter.limit(&format!("contact:{ip}"));
    if !outcome.success {
        let mut response = error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many messages. Please try again in 15 minutes.",
        );
        add_rate_limit_headers(response.headers_mut(), &outcome);
        return Ok(response);
    }

    let body = parse_body(&body)?;

    if is_filled(body.get("confirmEmail")) {
        tracing::info!(%ip, "contact honeypot triggered");
        return Ok(Json(json!({ "success": true })).into_response());
    }

    let Some(cf_token) = body.get("cfToken").and_then(Value::as_str).filter(|t| !t.is_empty()) else {
        return Err(JbsError::Validation("Security token missing".into()).into());
    };
    if !state.verifier.verify(cf_token, &ip).await? {
        return Ok(error_response(StatusCode::FORBIDDEN, "Invalid security token"));
    }

    let input = Validators::validate_contact(&body)?;

    let session_id = state.sessions.get_or_create(session_from_headers(&headers), Utc::now()).await?;
    let id = state.contacts.insert_contact(session_id, &input).await?;

    if let Err(e) = state.mailer.send(&state.templates.contact_notification(&input)).await {
        tracing::warn!(contact = id, "failed to send contact notification: {e}");
    }

    tracing::info!(contact = id, "contact message stored");

    Ok(([(SET_COOKIE, session_cookie(session_id))], Json(json!({ "success": true }))).into_response())
}

/// Any non-blank value counts as filled in.
fn is_filled(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn add_rate_limit_headers(headers: &mut HeaderMap, outcome: &LimitOutcome) {
    let values = [
        ("x-ratelimit-limit", outcome.limit.to_string()),
        ("x-ratelimit-remaining", outcome.remaining.to_string()),
        ("x-ratelimit-reset", outcome.reset.timestamp_millis().to_string()),
    ];
    for (name, value) in values {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    }
}
