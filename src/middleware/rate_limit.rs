use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use axum::http::HeaderMap;

use crate::error::ApiError;
use crate::services::metrics::RATE_LIMITED_COUNTER;

/// Sweep expired windows once the map grows past this many keys.
const SWEEP_THRESHOLD: usize = 10_000;

struct Window {
    count: u64,
    started: Instant,
    length: Duration,
}

impl Window {
    fn is_live(&self, now: Instant) -> bool {
        now.duration_since(self.started) < self.length
    }
}

/// Process-local fixed-window limiter.
///
/// Same strategy as an INCR + EXPIRE counter:
/// - the first hit for `key` opens a window of `window` length
/// - every hit increments the counter
/// - hits beyond `max_attempts` within the window are rejected
#[derive(Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, key: &str, max_attempts: u64, window: Duration) -> Result<(), ApiError> {
        self.check_at(key, max_attempts, window, Instant::now())
    }

    fn check_at(
        &self,
        key: &str,
        max_attempts: u64,
        window: Duration,
        now: Instant,
    ) -> Result<(), ApiError> {
        let mut windows = self
            .windows
            .lock()
            .map_err(|_| ApiError::Internal(anyhow::anyhow!("rate limiter lock poisoned")))?;

        if windows.len() >= SWEEP_THRESHOLD {
            windows.retain(|_, w| w.is_live(now));
        }

        let entry = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
            length: window,
        });
        if !entry.is_live(now) {
            entry.count = 0;
            entry.started = now;
        }
        entry.length = window;
        entry.count += 1;

        if entry.count > max_attempts {
            let scope = key.split(':').next().unwrap_or(key);
            RATE_LIMITED_COUNTER.with_label_values(&[scope]).inc();
            tracing::debug!("rate limit hit for {key}");
            return Err(ApiError::RateLimited);
        }

        Ok(())
    }
}

/// Client IP as reported by the reverse proxy.
pub fn client_ip(headers: &HeaderMap) -> String {
    if let Some(ip) = headers.get("X-Real-IP").and_then(|h| h.to_str().ok()) {
        return ip.trim().to_string();
    }
    headers
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_allows_up_to_max_then_rejects() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        let window = Duration::from_secs(60);

        for _ in 0..3 {
            assert!(limiter.check_at("login:a@b.c", 3, window, now).is_ok());
        }
        assert!(matches!(
            limiter.check_at("login:a@b.c", 3, window, now),
            Err(ApiError::RateLimited)
        ));
    }

    #[test]
    fn test_window_resets_after_expiry() {
        let limiter = RateLimiter::new();
        let start = Instant::now();
        let window = Duration::from_secs(60);

        assert!(limiter.check_at("k", 1, window, start).is_ok());
        assert!(limiter.check_at("k", 1, window, start + Duration::from_secs(59)).is_err());
        assert!(limiter.check_at("k", 1, window, start + Duration::from_secs(60)).is_ok());
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        let window = Duration::from_secs(60);

        assert!(limiter.check_at("form:1.1.1.1", 1, window, now).is_ok());
        assert!(limiter.check_at("form:2.2.2.2", 1, window, now).is_ok());
        assert!(limiter.check_at("form:1.1.1.1", 1, window, now).is_err());
    }

    #[test]
    fn test_sweep_keeps_longer_windows_alive() {
        let limiter = RateLimiter::new();
        let start = Instant::now();
        let login_window = Duration::from_secs(900);
        let view_window = Duration::from_secs(60);

        for _ in 0..5 {
            assert!(limiter.check_at("login:a@b.c", 5, login_window, start).is_ok());
        }
        assert!(limiter.check_at("login:a@b.c", 5, login_window, start).is_err());

        for i in 0..SWEEP_THRESHOLD {
            let key = format!("form_view:1.2.3.4:{i}");
            limiter.check_at(&key, 60, view_window, start).unwrap();
        }

        // Sweeps the short view windows, not the login lockout.
        let later = start + Duration::from_secs(61);
        assert!(limiter.check_at("form_view:1.2.3.4:x", 60, view_window, later).is_ok());
        assert!(limiter.check_at("login:a@b.c", 5, login_window, later).is_err());
        assert!(limiter.windows.lock().unwrap().len() < SWEEP_THRESHOLD);
    }

    #[test]
    fn test_client_ip_header_precedence() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers), "unknown");

        headers.insert("X-Forwarded-For", HeaderValue::from_static("10.0.0.1, 172.16.0.1"));
        assert_eq!(client_ip(&headers), "10.0.0.1");

        headers.insert("X-Real-IP", HeaderValue::from_static("203.0.113.7"));
        assert_eq!(client_ip(&headers), "203.0.113.7");
    }
}
