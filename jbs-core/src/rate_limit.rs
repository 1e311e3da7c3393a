//! In-memory sliding-window rate limiting.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// Result of one `limit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitOutcome {
    pub success: bool,
    pub limit: usize,
    pub remaining: usize,
    /// When the oldest counted request leaves the window.
    pub reset: DateTime<Utc>,
}

/// Allows `limit` hits per key within any trailing `window`.
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    hits: DashMap<String, VecDeque<DateTime<Utc>>>,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        RateLimiter {
            limit,
            window,
            hits: DashMap::new(),
        }
    }

    pub fn limit(&self, key: &str) -> LimitOutcome {
        self.limit_at(key, Utc::now())
    }

    /// Record a hit for `key` at `now` unless the window is already full.
    pub fn limit_at(&self, key: &str, now: DateTime<Utc>) -> LimitOutcome {
        let mut hits = self.hits.entry(key.to_string()).or_default();

        let cutoff = now - self.window;
        while hits.front().is_some_and(|t| *t <= cutoff) {
            hits.pop_front();
        }

        let success = hits.len() < self.limit;
        if success {
            hits.push_back(now);
        }

        let reset = hits.front().map_or(now, |oldest| *oldest) + self.window;

        LimitOutcome {
            success,
            limit: self.limit,
            remaining: self.limit.saturating_sub(hits.len()),
            reset,
        }
    }

    /// Drop keys with no hits inside the window.
    pub fn purge_at(&self, now: DateTime<Utc>) {
        let cutoff = now - self.window;
        self.hits
            .retain(|_, hits| hits.back().is_some_and(|t| *t > cutoff));
    }
}
