// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Rate limiting for the turn endpoint.
//!
//! The orchestrator consumes an atomic admit/deny decision per call and never
//! mutates the limiter's storage directly; the counting lives behind the
//! [`RateLimiter`] trait. [`SlidingWindowLimiter`] is the reference
//! collaborator: a sliding-window log with a fixed capacity per identity
//! (reference configuration: 5 admits per 60 seconds).

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::http::HeaderMap;
use tokio::sync::Mutex;

/// Default admits per window.
pub const DEFAULT_CAPACITY: u32 = 5;
/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Admit calls between full sweeps of the identity map.
const SWEEP_INTERVAL: u64 = 64;

/// Bucket shared by all callers without identifying headers. A documented,
/// intentional limitation: unrelated anonymous callers share one quota.
pub const ANONYMOUS_IDENTITY: &str = "anonymous";

/// The limiter's verdict for one identity at one moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    /// Whether this call is admitted.
    pub admitted: bool,
    /// Quota left in the current window after this call.
    pub remaining: u32,
}

/// Admit/deny gatekeeper keyed by caller identity.
///
/// The store is treated as externally synchronized: one `admit` call is one
/// atomic decision, and this core takes no lock of its own around it.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn admit(&self, identity: &str) -> RateDecision;
}

/// Resolve the caller identity from request headers.
///
/// Preference order: first entry of `x-forwarded-for`, then `x-real-ip`, else
/// the shared [`ANONYMOUS_IDENTITY`] bucket.
pub fn resolve_identity(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real = real.trim();
        if !real.is_empty() {
            return real.to_string();
        }
    }
    ANONYMOUS_IDENTITY.to_string()
}

/// In-memory sliding-window limiter.
///
/// Keeps a per-identity log of admit timestamps; entries older than the
/// window are pruned on each call. Every [`SWEEP_INTERVAL`] admits the whole
/// map is swept and identities whose entire window has expired are evicted,
/// so one-shot callers (including rotated `x-forwarded-for` values, which
/// the client controls) cannot grow the map without bound. Suitable as the
/// single shared store for one server process; a multi-process deployment
/// would substitute a [`RateLimiter`] backed by a shared store.
pub struct SlidingWindowLimiter {
    capacity: u32,
    window: Duration,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
    admits: AtomicU64,
}

impl SlidingWindowLimiter {
    /// Create a limiter with the reference configuration (5 per 60 s).
    pub fn new() -> Self {
        Self::with_policy(DEFAULT_CAPACITY, DEFAULT_WINDOW)
    }

    /// Create a limiter with an explicit capacity and window.
    pub fn with_policy(capacity: u32, window: Duration) -> Self {
        Self {
            capacity,
            window,
            hits: Mutex::new(HashMap::new()),
            admits: AtomicU64::new(0),
        }
    }
}

fn prune(log: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = log.front() {
        if now.duration_since(*oldest) >= window {
            log.pop_front();
        } else {
            break;
        }
    }
}

impl Default for SlidingWindowLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateLimiter for SlidingWindowLimiter {
    async fn admit(&self, identity: &str) -> RateDecision {
        let now = Instant::now();
        let mut hits = self.hits.lock().await;

        if self.admits.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == 0 {
            let window = self.window;
            hits.retain(|_, log| {
                prune(log, now, window);
                !log.is_empty()
            });
        }

        let log = hits.entry(identity.to_string()).or_default();
        prune(log, now, self.window);

        if (log.len() as u32) < self.capacity {
            log.push_back(now);
            RateDecision {
                admitted: true,
                remaining: self.capacity - log.len() as u32,
            }
        } else {
            RateDecision {
                admitted: false,
                remaining: 0,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn admits_up_to_capacity_then_denies() {
        let limiter = SlidingWindowLimiter::with_policy(3, Duration::from_secs(60));

        for expected_remaining in [2, 1, 0] {
            let decision = limiter.admit("10.0.0.1").await;
            assert!(decision.admitted);
            assert_eq!(decision.remaining, expected_remaining);
        }

        let denied = limiter.admit("10.0.0.1").await;
        assert!(!denied.admitted);
        assert_eq!(denied.remaining, 0);
    }

    #[tokio::test]
    async fn identities_have_independent_quotas() {
        let limiter = SlidingWindowLimiter::with_policy(1, Duration::from_secs(60));

        assert!(limiter.admit("10.0.0.1").await.admitted);
        assert!(!limiter.admit("10.0.0.1").await.admitted);

        // A different identity in the same window is unaffected.
        assert!(limiter.admit("10.0.0.2").await.admitted);
    }

    #[tokio::test]
    async fn window_expiry_restores_quota() {
        let limiter = SlidingWindowLimiter::with_policy(1, Duration::from_millis(20));

        assert!(limiter.admit("a").await.admitted);
        assert!(!limiter.admit("a").await.admitted);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(limiter.admit("a").await.admitted);
    }

    #[tokio::test]
    async fn stale_identities_are_evicted_from_the_map() {
        let limiter = SlidingWindowLimiter::with_policy(5, Duration::from_millis(10));

        // Many distinct one-shot callers, as a rotated forwarded-for header
        // would produce.
        for i in 0..100 {
            limiter.admit(&format!("198.51.100.{i}")).await;
        }
        assert!(limiter.hits.lock().await.len() >= 100);

        tokio::time::sleep(Duration::from_millis(30)).await;

        // Enough traffic from one fresh caller to guarantee a sweep runs.
        for _ in 0..SWEEP_INTERVAL {
            limiter.admit("203.0.113.1").await;
        }

        let hits = limiter.hits.lock().await;
        assert_eq!(hits.len(), 1);
        assert!(hits.contains_key("203.0.113.1"));
    }

    #[test]
    fn identity_prefers_forwarded_for_first_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(resolve_identity(&headers), "203.0.113.9");
    }

    #[test]
    fn identity_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(resolve_identity(&headers), "10.0.0.2");
    }

    #[test]
    fn identity_falls_back_to_shared_anonymous_bucket() {
        let headers = HeaderMap::new();
        assert_eq!(resolve_identity(&headers), ANONYMOUS_IDENTITY);
    }

    #[test]
    fn empty_forwarded_header_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("  "));
        assert_eq!(resolve_identity(&headers), ANONYMOUS_IDENTITY);
    }
}
