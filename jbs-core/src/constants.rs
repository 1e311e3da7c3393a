use chrono::Duration;

/// Reschedule and cancel close this many hours before the session.
pub const MANAGE_CUTOFF_HOURS: f64 = 24.0;

/// Length of a free coaching session.
pub const SESSION_MINUTES: i64 = 30;

pub fn session_length() -> Duration {
    Duration::minutes(SESSION_MINUTES)
}

/// Storefront default when no locale is given.
pub const DEFAULT_LOCALE: &str = "ja";

/// Booking form: requests per window per IP.
pub const BOOKING_RATE_LIMIT: usize = 5;
pub const BOOKING_RATE_WINDOW_MINUTES: i64 = 30;

/// Contact form: requests per window per IP.
pub const CONTACT_RATE_LIMIT: usize = 5;
pub const CONTACT_RATE_WINDOW_MINUTES: i64 = 15;

/// Largest accepted contact form body, in bytes.
pub const CONTACT_MAX_BODY_BYTES: u64 = 15_000;

pub const MESSAGE_MIN_CHARS: usize = 10;
pub const MESSAGE_MAX_CHARS: usize = 2000;

/// Lifetime of the `sessionId` cookie.
pub const SESSION_COOKIE_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 30;
