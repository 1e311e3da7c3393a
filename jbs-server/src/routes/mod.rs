pub mod book;
pub mod contact;
pub mod manage;
pub mod programs;
pub mod records;

use axum::{
    Json,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

use jbs_core::JbsError;
use jbs_core::constants::DEFAULT_LOCALE;

/// Standard API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorResponse { error: message.to_string() })).into_response()
}

/// Convert core errors to HTTP responses
#[derive(Debug)]
pub struct AppError(JbsError);

impl AppError {
    fn status(&self) -> StatusCode {
        match self.0 {
            JbsError::InvalidToken | JbsError::Validation(_) => StatusCode::BAD_REQUEST,
            JbsError::BookingNotFound | JbsError::NotFound(_) => StatusCode::NOT_FOUND,
            JbsError::SlotUnavailable | JbsError::ActionNotAllowed(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.0.is_client_error() {
            return error_response(status, &self.0.to_string());
        }

        tracing::error!(error = %self.0, "request failed");
        error_response(status, "Internal server error")
    }
}

impl From<JbsError> for AppError {
    fn from(err: JbsError) -> Self {
        Self(err)
    }
}

/// First `X-Forwarded-For` hop, or `unknown`.
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

/// Locale requested through `X-Locale`.
pub fn request_locale(headers: &HeaderMap) -> String {
    headers
        .get("x-locale")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(DEFAULT_LOCALE)
        .to_string()
}

/// Parse a request body that must be a JSON object.
pub fn parse_body(body: &[u8]) -> Result<Value, AppError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) if value.is_object() => Ok(value),
        _ => Err(JbsError::Validation("Invalid request body".into()).into()),
    }
}

#[cfg(test)]
pub(crate) mod testing;
