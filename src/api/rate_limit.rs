//! Cooperative sliding-window rate limiter shared through the cache.
//!
//! The window is a vector of request timestamps (epoch seconds) kept under a
//! single cache key so every process instance draws from the same budget.
//! This is a soft cap: concurrent callers can lose updates to each other,
//! which is acceptable by contract. Enforcement is by blocking, never by
//! dropping, and the limiter fails open when the store is unavailable.

use crate::cache::Cache;
use crate::config::AppConfig;
use chrono::Utc;
use std::time::Duration;
use tracing::debug;

const RATE_CACHE_KEY: &str = "pollu_api:rate_window";

/// Prunes entries older than `window_secs` from `window`. If the pruned
/// window is at or over `cap`, returns the seconds to wait until the oldest
/// entry ages out; the caller must wait, call `evict_oldest`, then record.
pub fn required_wait(window: &mut Vec<f64>, now: f64, cap: usize, window_secs: f64) -> Option<f64> {
    window.retain(|t| *t > now - window_secs);
    if window.len() >= cap {
        let wait = (window[0] + window_secs) - now;
        Some(wait.max(0.0))
    } else {
        None
    }
}

/// Drops the oldest timestamp after its slot has aged out.
pub fn evict_oldest(window: &mut Vec<f64>) {
    if !window.is_empty() {
        window.remove(0);
    }
}

/// Blocks callers until the trailing window has room for one more request.
pub struct RateLimiter {
    cache: Cache,
    cap: usize,
    window_secs: f64,
    window_ttl: Duration,
}

impl RateLimiter {
    pub fn new(cache: Cache, config: &AppConfig) -> Self {
        Self {
            cache,
            cap: config.rate_cap,
            window_secs: config.rate_window_secs,
            window_ttl: config.rate_window_ttl,
        }
    }

    /// Waits until a request slot is available, records the current
    /// timestamp in the shared window and returns. A cache miss (including
    /// an unreachable store) reads as an empty window, so the limiter never
    /// blocks a caller it cannot account for.
    pub async fn acquire_slot(&self) {
        let mut window: Vec<f64> = self.cache.read_json(RATE_CACHE_KEY).unwrap_or_default();

        let now = Utc::now().timestamp_millis() as f64 / 1000.0;
        if let Some(wait) = required_wait(&mut window, now, self.cap, self.window_secs) {
            debug!("Rate window full, waiting {:.2}s for a slot", wait);
            tokio::time::sleep(Duration::from_secs_f64(wait)).await;
            evict_oldest(&mut window);
        }

        window.push(Utc::now().timestamp_millis() as f64 / 1000.0);
        self.cache.write_json(RATE_CACHE_KEY, &window, self.window_ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_wait_below_cap() {
        let mut window = vec![100.0, 100.2, 100.4, 100.6];
        assert_eq!(required_wait(&mut window, 101.0, 5, 60.0), None);
        assert_eq!(window.len(), 4);
    }

    #[test]
    fn sixth_caller_waits_until_first_slot_ages_out() {
        // 5 requests within 1 second; the next caller must wait until 60s
        // after the first timestamp.
        let mut window = vec![100.0, 100.2, 100.4, 100.6, 100.8];
        let wait = required_wait(&mut window, 101.0, 5, 60.0).expect("window is full");
        assert!((wait - 59.0).abs() < 1e-9);
    }

    #[test]
    fn stale_entries_are_pruned_before_counting() {
        let mut window = vec![10.0, 20.0, 100.0, 100.5, 100.9];
        assert_eq!(required_wait(&mut window, 101.0, 5, 60.0), None);
        assert_eq!(window, vec![100.0, 100.5, 100.9]);
    }

    #[test]
    fn wait_never_negative() {
        let mut window = vec![50.0, 60.0, 70.0, 80.0, 90.0];
        // All entries are inside the window but the oldest is about to expire.
        let wait = required_wait(&mut window, 109.999, 5, 60.0).expect("window is full");
        assert!(wait >= 0.0);
    }

    #[test]
    fn evict_drops_only_the_oldest() {
        let mut window = vec![1.0, 2.0, 3.0];
        evict_oldest(&mut window);
        assert_eq!(window, vec![2.0, 3.0]);
    }

    #[test]
    fn empty_window_admits_immediately() {
        let mut window: Vec<f64> = Vec::new();
        assert_eq!(required_wait(&mut window, 42.0, 5, 60.0), None);
    }
}
