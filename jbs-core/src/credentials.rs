//! Expiring access-token cache owned by a single service client.
//!
//! Each client holds its own `CredentialCache`; there is no process-wide
//! token. The lock is held across a refresh so concurrent callers wait for
//! the one refresh in flight instead of starting their own.

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::error::JbsResult;

/// A token handed out by an auth endpoint.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    /// Expiry `lifetime` after `now`, shortened by `skew` so the token is
    /// never presented right at its deadline.
    pub fn expiring_in(token: String, now: DateTime<Utc>, lifetime: Duration, skew: Duration) -> Self {
        let lifetime = if lifetime > skew { lifetime - skew } else { lifetime };
        IssuedToken {
            token,
            expires_at: now + lifetime,
        }
    }

    fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Default)]
pub struct CredentialCache {
    current: Mutex<Option<IssuedToken>>,
}

impl CredentialCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached token, or await `refresh` and cache what it yields.
    pub async fn get_or_refresh<F, Fut>(&self, now: DateTime<Utc>, refresh: F) -> JbsResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = JbsResult<IssuedToken>>,
    {
        let mut current = self.current.lock().await;

        if let Some(token) = current.as_ref().filter(|t| t.is_valid_at(now)) {
            return Ok(token.token.clone());
        }

        let issued = refresh().await?;
        tracing::debug!(expires_at = %issued.expires_at, "access token refreshed");
        let token = issued.token.clone();
        *current = Some(issued);
        Ok(token)
    }

    /// Forget the cached token, e.g. after the remote rejected it.
    pub async fn invalidate(&self) {
        *self.current.lock().await = None;
    }
}
