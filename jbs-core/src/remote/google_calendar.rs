//! Google Calendar client for the lecturer's booking calendar.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;

use super::{
    CalendarEntry, CalendarService, CreatedCalendarEvent, NewCalendarEvent, check_status,
    join_segments,
};
use crate::config::GoogleConfig;
use crate::credentials::{CredentialCache, IssuedToken};
use crate::error::{JbsError, JbsResult};

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const API_BASE: &str = "https://www.googleapis.com/calendar/v3/";

/// Refresh slightly before Google's stated expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventList {
    #[serde(default)]
    items: Vec<GoogleEvent>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct GoogleEvent {
    #[serde(default)]
    id: String,
    summary: Option<String>,
    start: Option<GoogleTime>,
    end: Option<GoogleTime>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleTime {
    /// Absent for all-day events, which carry `date` instead.
    date_time: Option<DateTime<Utc>>,
}

impl From<GoogleEvent> for CalendarEntry {
    fn from(event: GoogleEvent) -> Self {
        CalendarEntry {
            id: event.id,
            summary: event.summary,
            start: event.start.and_then(|t| t.date_time),
            end: event.end.and_then(|t| t.date_time),
        }
    }
}

pub struct GoogleCalendar {
    http: reqwest::Client,
    config: GoogleConfig,
    access: CredentialCache,
}

impl GoogleCalendar {
    pub fn new(http: reqwest::Client, config: GoogleConfig) -> Self {
        GoogleCalendar {
            http,
            config,
            access: CredentialCache::new(),
        }
    }

    async fn access_token(&self) -> JbsResult<String> {
        let now = Utc::now();
        self.access
            .get_or_refresh(now, || async move {
                let tokens = self.refresh_access_token().await?;
                Ok(IssuedToken::expiring_in(
                    tokens.access_token,
                    now,
                    Duration::seconds(tokens.expires_in),
                    Duration::seconds(EXPIRY_SKEW_SECS),
                ))
            })
            .await
    }

    async fn refresh_access_token(&self) -> JbsResult<TokenResponse> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", self.config.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let response = check_status(response, "Google token endpoint").await?;
        Ok(response.json().await?)
    }

    fn events_url(&self, event_id: Option<&str>) -> JbsResult<url::Url> {
        let mut segments = vec!["calendars", self.config.calendar_id.as_str(), "events"];
        if let Some(id) = event_id {
            segments.push(id);
        }
        join_segments(API_BASE, &segments)
    }

    /// A 401 means the cached token went stale early; drop it so the next
    /// call refreshes.
    async fn checked(&self, response: reqwest::Response, what: &str) -> JbsResult<reqwest::Response> {
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.access.invalidate().await;
        }
        check_status(response, what).await
    }
}

#[async_trait]
impl CalendarService for GoogleCalendar {
    async fn list_entries(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> JbsResult<Vec<CalendarEntry>> {
        let token = self.access_token().await?;
        let url = self.events_url(None)?;
        let (time_min, time_max) = (start.to_rfc3339(), end.to_rfc3339());

        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http.get(url.clone()).bearer_auth(&token).query(&[
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ]);
            if let Some(page) = &page_token {
                request = request.query(&[("pageToken", page.as_str())]);
            }

            let response = self.checked(request.send().await?, "Google Calendar list").await?;
            let page: EventList = response.json().await?;

            entries.extend(page.items.into_iter().map(CalendarEntry::from));

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(entries)
    }

    async fn insert_event(&self, event: &NewCalendarEvent) -> JbsResult<CreatedCalendarEvent> {
        let token = self.access_token().await?;
        let url = self.events_url(None)?;

        let body = json!({
            "summary": event.summary,
            "description": event.description,
            "start": { "dateTime": event.start.to_rfc3339(), "timeZone": event.time_zone },
            "end": { "dateTime": event.end.to_rfc3339(), "timeZone": event.time_zone },
            "extendedProperties": { "private": event.private_properties },
        });

        let response = self
            .http
            .post(url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;

        let response = self.checked(response, "Google Calendar insert").await?;
        Ok(response.json().await?)
    }

    async fn delete_event(&self, event_id: &str) -> JbsResult<()> {
        let token = self.access_token().await?;
        let url = self.events_url(Some(event_id))?;

        let response = self.http.delete(url).bearer_auth(&token).send().await?;

        match response.status() {
            reqwest::StatusCode::GONE | reqwest::StatusCode::NOT_FOUND => {
                tracing::debug!(event_id, "calendar event already gone");
                Ok(())
            }
            _ => {
                self.checked(response, "Google Calendar delete").await?;
                Ok(())
            }
        }
    }
}
