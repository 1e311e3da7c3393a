//! Transactional email through Resend.

use async_trait::async_trait;
use serde_json::json;

use super::{Mailer, OutgoingEmail, check_status};
use crate::error::JbsResult;

const SEND_URL: &str = "https://api.resend.com/emails";

pub struct ResendMailer {
    http: reqwest::Client,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(http: reqwest::Client, api_key: String, from: String) -> Self {
        ResendMailer { http, api_key, from }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> JbsResult<()> {
        let response = self
            .http
            .post(SEND_URL)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": email.to,
                "subject": email.subject,
                "html": email.html,
            }))
            .send()
            .await?;

        check_status(response, "Resend").await?;
        tracing::debug!(subject = %email.subject, recipients = email.to.len(), "email sent");
        Ok(())
    }
}
