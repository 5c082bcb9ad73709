//! Fixed-window rate limiting keyed by client identity.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// Per-client counter for the active window.
#[derive(Debug, Clone)]
struct RateWindow {
    window_start: Instant,
    count: u32,
    last_seen: Instant,
}

impl RateWindow {
    fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            count: 0,
            last_seen: now,
        }
    }

    fn try_admit(&mut self, now: Instant, limit: u32, window: Duration) -> RateDecision {
        self.last_seen = now;

        // Start a new window once the current one has elapsed
        if now.saturating_duration_since(self.window_start) >= window {
            self.window_start = now;
            self.count = 0;
        }

        if self.count < limit {
            self.count += 1;
            RateDecision::Admit {
                remaining: limit - self.count,
            }
        } else {
            let retry_after = match self.window_start.checked_add(window) {
                Some(reset_at) => reset_at.saturating_duration_since(now),
                None => window,
            };
            RateDecision::Limited { retry_after }
        }
    }
}

/// Outcome of a rate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Admit { remaining: u32 },
    Limited { retry_after: Duration },
}

/// Owner of all rate windows.
///
/// Each check runs under the shard lock of its key, so the
/// read-check-increment sequence for one client cannot race, and
/// clients on different shards never contend.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, RateWindow>,
    limit: u32,
    window: Duration,
    retention: Duration,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration, retention: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            limit,
            window,
            retention: retention.max(window),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.limit,
            Duration::from_secs(config.window_secs),
            Duration::from_secs(config.retention_secs),
        )
    }

    /// Count a request from `key` against the current window.
    pub fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    /// Same as [`check`](Self::check) with an explicit clock reading.
    pub fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        // Lookup-or-create and increment under one shard lock
        let mut window = self
            .windows
            .entry(key.to_owned())
            .or_insert_with(|| RateWindow::new(now));

        window.try_admit(now, self.limit, self.window)
    }

    /// Remove windows idle for longer than the retention horizon.
    /// Returns how many were evicted.
    pub fn evict_idle_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.last_seen) < self.retention);
        before.saturating_sub(self.windows.len())
    }

    /// Number of tracked clients.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

}

/// Spawn the background task that keeps the window table bounded.
pub fn spawn_sweeper(
    limiter: Arc<RateLimiter>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = limiter.evict_idle_at(Instant::now());
                    let tracked = limiter.tracked_clients();
                    metrics::record_rate_windows(tracked);
                    if evicted > 0 {
                        tracing::debug!(evicted, tracked, "Evicted idle rate windows");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Rate window sweeper stopping");
                    break;
                }
            }
        }
    })
}
