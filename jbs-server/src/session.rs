//! The `sessionId` cookie shared by the booking and contact forms.

use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use uuid::Uuid;

use jbs_core::constants::SESSION_COOKIE_MAX_AGE_SECS;

pub const SESSION_COOKIE: &str = "sessionId";

/// The session id from the request cookies, if present and well formed.
pub fn session_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::try_parse(value.trim()).ok())
}

pub fn session_cookie(session_id: Uuid) -> String {
    format!("{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={SESSION_COOKIE_MAX_AGE_SECS}")
}
