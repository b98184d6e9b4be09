//! Submission rate limiting
//!
//! The supervisor asks an injected [`RateLimiter`] before accepting a batch.
//! [`SlidingWindowLimiter`] keeps its counters in-process and suits
//! single-instance deployments; multi-instance deployments plug in an
//! implementation backed by a shared counter.

use crate::config::RateLimitConfig;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Decides whether a requester may submit more work
pub trait RateLimiter: Send + Sync {
    /// Records an attempt for `key` and returns whether it is allowed
    fn allow(&self, key: &str) -> bool;
}

/// Limiter that allows everything
#[derive(Debug, Default, Clone, Copy)]
pub struct Unlimited;

impl RateLimiter for Unlimited {
    fn allow(&self, _key: &str) -> bool {
        true
    }
}

/// At most `max_requests` allowed attempts per key within any `window`
///
/// Idle keys are dropped at most once per window, on the next `allow`, so
/// memory stays bounded by the keys seen within roughly two windows.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    max_requests: usize,
    window: Duration,
    hits: DashMap<String, VecDeque<Instant>>,
    last_purge: Mutex<Instant>,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests: max_requests as usize,
            window,
            hits: DashMap::new(),
            last_purge: Mutex::new(Instant::now()),
        }
    }

    /// Drops expired hits and every key left without any
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.hits.retain(|_, hits| {
            prune(hits, now, self.window);
            !hits.is_empty()
        });
    }

    fn purge_if_due(&self, now: Instant) {
        let due = match self.last_purge.lock() {
            Ok(mut last) if now.duration_since(*last) >= self.window => {
                *last = now;
                true
            }
            _ => false,
        };
        // Outside the lock and before any entry guard is held
        if due {
            self.purge_expired();
        }
    }
}

fn prune(hits: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = hits.front() {
        if now.duration_since(*oldest) >= window {
            hits.pop_front();
        } else {
            break;
        }
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        self.purge_if_due(now);

        let mut hits = self.hits.entry(key.to_string()).or_default();
        prune(&mut hits, now, self.window);

        if hits.len() >= self.max_requests {
            return false;
        }
        hits.push_back(now);
        true
    }
}

/// Builds the limiter described by the configuration
pub fn from_config(config: &RateLimitConfig) -> Arc<dyn RateLimiter> {
    if config.enabled {
        Arc::new(SlidingWindowLimiter::new(config.max_requests, config.window()))
    } else {
        Arc::new(Unlimited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_sliding_window() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_secs(10));

        assert!(limiter.allow("alice"));
        assert!(limiter.allow("alice"));
        assert!(!limiter.allow("alice"));
        // Keys are independent
        assert!(limiter.allow("bob"));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(limiter.allow("alice"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_attempts_do_not_extend_window() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_secs(5));
        assert!(limiter.allow("k"));

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(!limiter.allow("k"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(limiter.allow("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let limiter = SlidingWindowLimiter::new(5, Duration::from_secs(1));
        limiter.allow("a");
        limiter.allow("b");
        assert_eq!(limiter.hits.len(), 2);

        tokio::time::advance(Duration::from_secs(2)).await;
        limiter.purge_expired();
        assert!(limiter.hits.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_keys_are_dropped_without_explicit_purge() {
        let limiter = SlidingWindowLimiter::new(3, Duration::from_secs(1));
        for i in 0..1000 {
            assert!(limiter.allow(&format!("requester-{i}")));
        }
        assert_eq!(limiter.hits.len(), 1000);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(limiter.allow("fresh"));
        assert_eq!(limiter.hits.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_keeps_keys_with_live_hits() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_secs(10));
        assert!(limiter.allow("old"));
        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(limiter.allow("recent"));
        tokio::time::advance(Duration::from_secs(5)).await;

        limiter.purge_expired();
        assert!(!limiter.hits.contains_key("old"));
        // Still inside its window
        assert!(!limiter.allow("recent"));
    }

    #[test]
    fn test_from_config_disabled() {
        let config = RateLimitConfig {
            enabled: false,
            max_requests: 0,
            ..Default::default()
        };
        let limiter = from_config(&config);
        assert!(limiter.allow("anyone"));
    }
}
