//! Sliding-window rate limiter for explorer API calls
//!
//! Free explorer tiers allow a handful of requests per second per key;
//! each explorer service gets its own limiter.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::time::sleep;

pub struct RateLimiter {
    /// Maximum requests per window
    max_requests: u32,
    window: Duration,
    /// Timestamps of requests inside the current window
    requests: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter allowing `max_requests` per `window`
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            requests: Mutex::new(VecDeque::new()),
        }
    }

    pub fn per_second(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(1))
    }

    /// Record a request if the window has room, otherwise return how long to wait
    fn reserve(&self, now: Instant) -> Option<Duration> {
        let mut requests = self.requests.lock();

        while let Some(&oldest) = requests.front() {
            if now.duration_since(oldest) >= self.window {
                requests.pop_front();
            } else {
                break;
            }
        }

        if (requests.len() as u32) < self.max_requests {
            requests.push_back(now);
            return None;
        }

        let wait = requests
            .front()
            .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
            .unwrap_or_default();
        Some(wait.max(Duration::from_millis(10)))
    }

    /// Wait until a request may be made
    pub async fn acquire(&self) {
        loop {
            match self.reserve(Instant::now()) {
                None => return,
                Some(wait) => {
                    tracing::trace!(wait_ms = wait.as_millis() as u64, "Rate limit reached, waiting");
                    sleep(wait).await;
                }
            }
        }
    }
}
