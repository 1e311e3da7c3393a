//! Zoom meetings via server-to-server OAuth.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;

use super::{Meeting, MeetingInvitee, MeetingService, check_status, join_segments};
use crate::config::ZoomConfig;
use crate::credentials::{CredentialCache, IssuedToken};
use crate::error::JbsResult;
use crate::slot::BOOKING_TZ;

const TOKEN_URL: &str = "https://zoom.us/oauth/token";
const MEETINGS_URL: &str = "https://api.zoom.us/v2/users/me/meetings";
const MEETING_BASE: &str = "https://api.zoom.us/v2/meetings";

/// Zoom meeting type for a one-off scheduled meeting.
const SCHEDULED_MEETING: u8 = 2;

const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Deserialize)]
struct MeetingResponse {
    id: i64,
    join_url: String,
}

pub struct ZoomMeetings {
    http: reqwest::Client,
    config: ZoomConfig,
    access: CredentialCache,
}

impl ZoomMeetings {
    pub fn new(http: reqwest::Client, config: ZoomConfig) -> Self {
        ZoomMeetings {
            http,
            config,
            access: CredentialCache::new(),
        }
    }

    async fn access_token(&self) -> JbsResult<String> {
        let now = Utc::now();
        self.access
            .get_or_refresh(now, || async move {
                let response = self
                    .http
                    .post(TOKEN_URL)
                    .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
                    .query(&[
                        ("grant_type", "account_credentials"),
                        ("account_id", self.config.account_id.as_str()),
                    ])
                    .send()
                    .await?;

                let tokens: TokenResponse = check_status(response, "Zoom token endpoint")
                    .await?
                    .json()
                    .await?;

                Ok(IssuedToken::expiring_in(
                    tokens.access_token,
                    now,
                    Duration::seconds(tokens.expires_in),
                    Duration::seconds(EXPIRY_SKEW_SECS),
                ))
            })
            .await
    }
}

fn meeting_url(meeting_id: &str) -> JbsResult<url::Url> {
    join_segments(MEETING_BASE, &[meeting_id])
}

#[async_trait]
impl MeetingService for ZoomMeetings {
    async fn create_meeting(
        &self,
        topic: &str,
        start: DateTime<Utc>,
        duration_minutes: i64,
        invitees: &[MeetingInvitee],
    ) -> JbsResult<Meeting> {
        let token = self.access_token().await?;

        let body = json!({
            "topic": topic,
            "type": SCHEDULED_MEETING,
            "start_time": start.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            "duration": duration_minutes,
            "timezone": BOOKING_TZ.name(),
            "settings": {
                "join_before_host": false,
                "waiting_room": true,
                "meeting_invitees": invitees
                    .iter()
                    .map(|i| json!({ "email": i.email }))
                    .collect::<Vec<_>>(),
            },
        });

        let response = self
            .http
            .post(MEETINGS_URL)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.access.invalidate().await;
        }

        let meeting: MeetingResponse = check_status(response, "Zoom create meeting")
            .await?
            .json()
            .await?;

        tracing::info!(meeting_id = meeting.id, "zoom meeting created");

        Ok(Meeting {
            id: meeting.id.to_string(),
            join_url: meeting.join_url,
        })
    }

    async fn delete_meeting(&self, meeting_id: &str) -> JbsResult<()> {
        let token = self.access_token().await?;
        let url = meeting_url(meeting_id)?;

        let response = self.http.delete(url).bearer_auth(&token).send().await?;

        match response.status() {
            reqwest::StatusCode::NOT_FOUND => {
                tracing::debug!(meeting_id, "zoom meeting already gone");
                Ok(())
            }
            status => {
                if status == reqwest::StatusCode::UNAUTHORIZED {
                    self.access.invalidate().await;
                }
                check_status(response, "Zoom delete meeting").await?;
                tracing::info!(meeting_id, "zoom meeting deleted");
                Ok(())
            }
        }
    }
}
