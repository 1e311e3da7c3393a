use std::sync::Arc;

use chrono::Duration;

use jbs_core::config::AppConfig;
use jbs_core::constants::{
    BOOKING_RATE_LIMIT, BOOKING_RATE_WINDOW_MINUTES, CONTACT_RATE_LIMIT, CONTACT_RATE_WINDOW_MINUTES,
};
use jbs_core::email::EmailTemplates;
use jbs_core::rate_limit::RateLimiter;
use jbs_core::remote::{
    CalendarService, FileMakerClient, GoogleCalendar, HumanVerifier, Mailer, MeetingService, RecordSource,
    ResendMailer, Turnstile, ZoomMeetings,
};
use jbs_core::store::{BookingStore, ContactStore, SessionStore};

use crate::db::Database;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<dyn BookingStore>,
    pub contacts: Arc<dyn ContactStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub records: Arc<dyn RecordSource>,
    pub calendar: Arc<dyn CalendarService>,
    pub meetings: Arc<dyn MeetingService>,
    pub mailer: Arc<dyn Mailer>,
    pub verifier: Arc<dyn HumanVerifier>,
    pub templates: Arc<EmailTemplates>,
    pub booking_limiter: Arc<RateLimiter>,
    pub contact_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: &AppConfig, db: Database) -> Self {
        let http = reqwest::Client::new();
        let db = Arc::new(db);

        AppState {
            bookings: db.clone(),
            contacts: db.clone(),
            sessions: db,
            records: Arc::new(FileMakerClient::new(http.clone(), config.filemaker.clone())),
            calendar: Arc::new(GoogleCalendar::new(http.clone(), config.google.clone())),
            meetings: Arc::new(ZoomMeetings::new(http.clone(), config.zoom.clone())),
            mailer: Arc::new(ResendMailer::new(
                http.clone(),
                config.email.resend_api_key.clone(),
                config.email.from.clone(),
            )),
            verifier: Arc::new(Turnstile::new(http, config.turnstile.secret_key.clone())),
            templates: Arc::new(EmailTemplates::new(&config.site, &config.email)),
            booking_limiter: Arc::new(RateLimiter::new(
                BOOKING_RATE_LIMIT,
                Duration::minutes(BOOKING_RATE_WINDOW_MINUTES),
            )),
            contact_limiter: Arc::new(RateLimiter::new(
                CONTACT_RATE_LIMIT,
                Duration::minutes(CONTACT_RATE_WINDOW_MINUTES),
            )),
        }
    }
}
