//! In-memory rate limiting
//!
//! Sliding-window counters keyed by string (username or client IP):
//! - failed logins per username
//! - login requests per IP
//! - public form submissions (contact, newsletter) per IP
//!
//! State lives in this process only and is swept by a periodic cleanup task.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::config::RateLimitConfig;

/// A request was refused; retry after the given number of seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Too many requests, retry after {retry_after} seconds")]
pub struct RateLimited {
    pub retry_after: i64,
}

/// Sliding-window counter: at most `limit` hits per key within `window`
pub struct SlidingWindow {
    limit: usize,
    window: Duration,
    hits: RwLock<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl SlidingWindow {
    pub fn new(limit: usize, window_seconds: i64) -> Self {
        Self {
            limit,
            window: Duration::seconds(window_seconds),
            hits: RwLock::new(HashMap::new()),
        }
    }

    /// Refuse if the key is at its limit; does not record
    pub async fn check(&self, key: &str) -> Result<(), RateLimited> {
        self.check_at(key, Utc::now()).await
    }

    pub async fn check_at(&self, key: &str, now: DateTime<Utc>) -> Result<(), RateLimited> {
        let mut hits = self.hits.write().await;
        let Some(times) = hits.get_mut(key) else {
            return Ok(());
        };
        let cutoff = now - self.window;
        times.retain(|time| *time > cutoff);
        self.verdict(times, now)
    }

    pub async fn record(&self, key: &str) {
        self.record_at(key, Utc::now()).await
    }

    pub async fn record_at(&self, key: &str, now: DateTime<Utc>) {
        let mut hits = self.hits.write().await;
        hits.entry(key.to_string()).or_default().push(now);
    }

    /// Check and record in one step. Refused hits are not recorded.
    pub async fn hit(&self, key: &str) -> Result<(), RateLimited> {
        self.hit_at(key, Utc::now()).await
    }

    pub async fn hit_at(&self, key: &str, now: DateTime<Utc>) -> Result<(), RateLimited> {
        let mut hits = self.hits.write().await;
        let times = hits.entry(key.to_string()).or_default();
        let cutoff = now - self.window;
        times.retain(|time| *time > cutoff);
        self.verdict(times, now)?;
        times.push(now);
        Ok(())
    }

    pub async fn clear(&self, key: &str) {
        self.hits.write().await.remove(key);
    }

    /// Drop expired hits and empty keys
    pub async fn cleanup_at(&self, now: DateTime<Utc>) {
        let cutoff = now - self.window;
        let mut hits = self.hits.write().await;
        hits.retain(|_, times| {
            times.retain(|time| *time > cutoff);
            !times.is_empty()
        });
    }

    pub async fn tracked_keys(&self) -> usize {
        self.hits.read().await.len()
    }

    fn verdict(&self, times: &[DateTime<Utc>], now: DateTime<Utc>) -> Result<(), RateLimited> {
        if times.len() < self.limit {
            return Ok(());
        }
        // The window frees up when the oldest retained hit ages out
        let oldest = times.iter().min().copied().unwrap_or(now);
        let remaining = (oldest + self.window - now).num_milliseconds();
        let retry_after = ((remaining + 999) / 1000).max(1);
        Err(RateLimited { retry_after })
    }
}

/// All limiters used by the public API
pub struct RateLimiter {
    login_failures: SlidingWindow,
    login_ip: SlidingWindow,
    forms: SlidingWindow,
}

impl RateLimiter {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            login_failures: SlidingWindow::new(config.login_attempts, config.login_window_seconds),
            login_ip: SlidingWindow::new(config.ip_requests, config.ip_window_seconds),
            forms: SlidingWindow::new(config.form_submissions, config.form_window_seconds),
        }
    }

    /// Gate a login request: counts the request against the IP and refuses
    /// if the username has too many recent failures.
    pub async fn check_login(&self, email: &str, ip: &str) -> Result<(), RateLimited> {
        self.login_ip.hit(ip).await?;
        self.login_failures.check(&email.to_lowercase()).await
    }

    pub async fn record_login_failure(&self, email: &str) {
        self.login_failures.record(&email.to_lowercase()).await
    }

    /// Successful login resets the username counter
    pub async fn clear_login_failures(&self, email: &str) {
        self.login_failures.clear(&email.to_lowercase()).await
    }

    /// Gate a public form submission from an IP
    pub async fn check_form(&self, ip: &str) -> Result<(), RateLimited> {
        self.forms.hit(ip).await
    }

    /// Clean up old entries (called periodically)
    pub async fn cleanup(&self) {
        let now = Utc::now();
        self.login_failures.cleanup_at(now).await;
        self.login_ip.cleanup_at(now).await;
        self.forms.cleanup_at(now).await;
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_hit_refuses_after_limit() {
        let window = SlidingWindow::new(3, 60);
        let now = Utc::now();

        for _ in 0..3 {
            assert!(window.hit_at("10.0.0.1", now).await.is_ok());
        }
        let err = window.hit_at("10.0.0.1", now).await.unwrap_err();
        assert_eq!(err.retry_after, 60);

        // Other keys are independent
        assert!(window.hit_at("10.0.0.2", now).await.is_ok());
    }

    #[tokio::test]
    async fn test_window_slides() {
        let window = SlidingWindow::new(2, 60);
        let start = Utc::now();

        window.hit_at("ip", start).await.unwrap();
        window.hit_at("ip", start + Duration::seconds(30)).await.unwrap();

        let err = window
            .hit_at("ip", start + Duration::seconds(45))
            .await
            .unwrap_err();
        assert_eq!(err.retry_after, 15);

        // First hit has aged out
        assert!(window.hit_at("ip", start + Duration::seconds(61)).await.is_ok());
    }

    #[tokio::test]
    async fn test_check_does_not_record() {
        let window = SlidingWindow::new(1, 60);
        for _ in 0..5 {
            assert!(window.check("user").await.is_ok());
        }
        window.record("user").await;
        assert!(window.check("user").await.is_err());
        window.clear("user").await;
        assert!(window.check("user").await.is_ok());
    }

    #[tokio::test]
    async fn test_cleanup_drops_expired_keys() {
        let window = SlidingWindow::new(5, 60);
        let start = Utc::now();
        window.record_at("old", start).await;
        window.record_at("fresh", start + Duration::seconds(100)).await;

        window.cleanup_at(start + Duration::seconds(120)).await;
        assert_eq!(window.tracked_keys().await, 1);
    }

    #[tokio::test]
    async fn test_login_failures_case_insensitive() {
        let limiter = RateLimiter::default();

        for email in ["Owner@Studio.Example", "owner@studio.example", "OWNER@STUDIO.EXAMPLE"] {
            limiter.record_login_failure(email).await;
        }
        limiter.record_login_failure("owner@studio.example").await;
        assert!(limiter.check_login("owner@studio.example", "1.1.1.1").await.is_ok());

        limiter.record_login_failure("owner@studio.example").await;
        assert!(limiter.check_login("Owner@studio.example", "1.1.1.1").await.is_err());

        limiter.clear_login_failures("owner@studio.example").await;
        assert!(limiter.check_login("owner@studio.example", "1.1.1.1").await.is_ok());
    }

    #[tokio::test]
    async fn test_login_ip_limit() {
        let limiter = RateLimiter::default();
        for i in 0..10 {
            let email = format!("user{}@studio.example", i);
            assert!(limiter.check_login(&email, "9.9.9.9").await.is_ok());
        }
        let err = limiter
            .check_login("someone@studio.example", "9.9.9.9")
            .await
            .unwrap_err();
        assert!(err.retry_after >= 1 && err.retry_after <= 60);
    }

    #[tokio::test]
    async fn test_form_limit() {
        let limiter = RateLimiter::default();
        for _ in 0..5 {
            limiter.check_form("2.2.2.2").await.unwrap();
        }
        assert!(limiter.check_form("2.2.2.2").await.is_err());
        assert!(limiter.check_form("3.3.3.3").await.is_ok());
    }

    proptest! {
        // Within any window, accepted hits never exceed the limit
        #[test]
        fn prop_accepted_hits_bounded(
            limit in 1usize..8,
            offsets in proptest::collection::vec(0i64..120, 1..40),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let window = SlidingWindow::new(limit, 60);
                let start = Utc::now();
                let mut offsets = offsets;
                offsets.sort_unstable();

                let mut accepted = Vec::new();
                for offset in offsets {
                    let at = start + Duration::seconds(offset);
                    if window.hit_at("k", at).await.is_ok() {
                        accepted.push(offset);
                    }
                }

                for (i, &t) in accepted.iter().enumerate() {
                    let in_window = accepted[i..].iter().filter(|&&u| u < t + 60).count();
                    assert!(in_window <= limit);
                }
            });
        }
    }
}
