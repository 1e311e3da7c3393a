//! FileMaker Data API client.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{RecordSource, SortSpec, join_segments};
use crate::config::FileMakerConfig;
use crate::credentials::{CredentialCache, IssuedToken};
use crate::error::{JbsError, JbsResult};

const SESSION_API_VERSION: &str = "v1";
const FIND_API_VERSION: &str = "vLatest";

/// Data API sessions idle out after 15 minutes.
const SESSION_LIFETIME_MINUTES: i64 = 14;

/// FileMaker's "No records match the request".
const NO_RECORDS_CODE: &str = "401";

#[derive(Deserialize)]
struct Envelope<T> {
    response: Option<T>,
    #[serde(default)]
    messages: Vec<FmMessage>,
}

#[derive(Deserialize)]
struct FmMessage {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct SessionResponse {
    token: String,
}

#[derive(Deserialize)]
struct FindResponse {
    #[serde(default)]
    data: Vec<Value>,
}

pub struct FileMakerClient {
    http: reqwest::Client,
    config: FileMakerConfig,
    session: CredentialCache,
}

impl FileMakerClient {
    pub fn new(http: reqwest::Client, config: FileMakerConfig) -> Self {
        FileMakerClient {
            http,
            config,
            session: CredentialCache::new(),
        }
    }

    async fn token(&self) -> JbsResult<String> {
        let now = Utc::now();
        self.session
            .get_or_refresh(now, || async move {
                let token = self.login().await?;
                Ok(IssuedToken::expiring_in(
                    token,
                    now,
                    Duration::minutes(SESSION_LIFETIME_MINUTES),
                    Duration::zero(),
                ))
            })
            .await
    }

    async fn login(&self) -> JbsResult<String> {
        let url = join_segments(
            &self.config.url,
            &["fmi", "data", SESSION_API_VERSION, "databases", &self.config.database, "sessions"],
        )?;

        // Secrets pasted into env files carry literal "\n" sequences.
        let password = self.config.password.replace("\\n", "\n");

        let response = self
            .http
            .post(url)
            .basic_auth(&self.config.user, Some(password))
            .json(&json!({}))
            .send()
            .await?;

        let status = response.status();
        let envelope: Envelope<SessionResponse> = response
            .json()
            .await
            .map_err(|e| JbsError::Remote(format!("FileMaker auth returned {status}: {e}")))?;

        match envelope.response {
            Some(session) if status.is_success() => Ok(session.token),
            _ => Err(JbsError::Remote(format!(
                "FileMaker auth failed ({status}): {}",
                first_message(&envelope.messages).unwrap_or("no token in response")
            ))),
        }
    }
}

#[async_trait]
impl RecordSource for FileMakerClient {
    async fn find(&self, layout: &str, query: Value, sort: Vec<SortSpec>) -> JbsResult<Vec<Value>> {
        let token = self.token().await?;

        let url = join_segments(
            &self.config.url,
            &["fmi", "data", FIND_API_VERSION, "databases", &self.config.database, "layouts", layout, "_find"],
        )?;

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&json!({ "query": [query], "sort": sort }))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.session.invalidate().await;
            return Err(JbsError::Remote("FileMaker rejected the session token".into()));
        }

        let envelope: Envelope<FindResponse> = response
            .json()
            .await
            .map_err(|e| JbsError::Remote(format!("FileMaker find returned {status}: {e}")))?;

        if envelope.messages.iter().any(|m| m.code == NO_RECORDS_CODE) {
            return Ok(Vec::new());
        }

        if !status.is_success() {
            return Err(JbsError::Remote(
                first_message(&envelope.messages)
                    .unwrap_or("FileMaker Find Error")
                    .to_string(),
            ));
        }

        Ok(envelope.response.map(|r| r.data).unwrap_or_default())
    }
}

fn first_message(messages: &[FmMessage]) -> Option<&str> {
    messages
        .first()
        .map(|m| m.message.as_str())
        .filter(|m| !m.is_empty())
}
