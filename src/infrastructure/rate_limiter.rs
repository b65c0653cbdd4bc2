//! Sliding-window call admission control for the web backend.
//!
//! The limiter is advisory at the adapter boundary: a rejected call is
//! reported as zero results, never an error. `is_allowed` and `record_call`
//! are deliberately separate so an admitted call that fails in transport can
//! skip recording and consume no budget.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Length of the rolling admission window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Default maximum calls per rolling minute.
pub const DEFAULT_MAX_CALLS_PER_MINUTE: usize = 10;

/// Admits at most `max_calls` calls within any rolling 60-second window.
///
/// Timestamps older than the window are pruned on each admission check. Safe
/// under concurrent admission checks during fan-out.
pub struct SlidingWindowRateLimiter {
    max_calls: usize,
    window: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl Default for SlidingWindowRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CALLS_PER_MINUTE)
    }
}

impl SlidingWindowRateLimiter {
    pub fn new(max_calls_per_minute: usize) -> Self {
        Self {
            max_calls: max_calls_per_minute,
            window: WINDOW,
            calls: Mutex::new(VecDeque::new()),
        }
    }

    /// Whether a new call may proceed right now.
    pub fn is_allowed(&self) -> bool {
        self.is_allowed_at(Instant::now())
    }

    /// Timestamps an admitted call.
    pub fn record_call(&self) {
        self.record_call_at(Instant::now());
    }

    /// Forgets all recorded calls.
    pub fn reset(&self) {
        self.calls.lock().expect("rate limiter lock poisoned").clear();
    }

    fn is_allowed_at(&self, now: Instant) -> bool {
        let mut calls = self.calls.lock().expect("rate limiter lock poisoned");
        let cutoff = now.checked_sub(self.window);
        if let Some(cutoff) = cutoff {
            while calls.front().is_some_and(|t| *t < cutoff) {
                calls.pop_front();
            }
        }
        calls.len() < self.max_calls
    }

    fn record_call_at(&self, now: Instant) {
        self.calls.lock().expect("rate limiter lock poisoned").push_back(now);
    }
}
