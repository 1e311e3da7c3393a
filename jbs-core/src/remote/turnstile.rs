//! Cloudflare Turnstile challenge verification.

use async_trait::async_trait;
use serde::Deserialize;

use super::{HumanVerifier, check_status};
use crate::error::JbsResult;

const SITEVERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

#[derive(Deserialize)]
struct Outcome {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

pub struct Turnstile {
    http: reqwest::Client,
    secret_key: String,
}

impl Turnstile {
    pub fn new(http: reqwest::Client, secret_key: String) -> Self {
        Turnstile { http, secret_key }
    }
}

#[async_trait]
impl HumanVerifier for Turnstile {
    async fn verify(&self, token: &str, remote_ip: &str) -> JbsResult<bool> {
        let response = self
            .http
            .post(SITEVERIFY_URL)
            .form(&[
                ("secret", self.secret_key.as_str()),
                ("response", token),
                ("remoteip", remote_ip),
            ])
            .send()
            .await?;

        let outcome: Outcome = check_status(response, "Turnstile").await?.json().await?;
        if !outcome.success {
            tracing::warn!(codes = ?outcome.error_codes, "turnstile verification failed");
        }
        Ok(outcome.success)
    }
}
