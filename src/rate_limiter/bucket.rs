//! Per-client token bucket.
//!
//! Tokens refill continuously by elapsed time on a monotonic clock
//! (`Instant`), never wall clock: a wall clock stepping backwards would
//! corrupt the count. All fields sit under one mutex so no two operations
//! on the same bucket interleave.

use std::sync::Mutex;
use std::time::Instant;

#[derive(Debug)]
struct BucketState {
    capacity: u32,
    rate_per_sec: f64,
    tokens: f64,
    last_refill: Instant,
}

impl BucketState {
    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.last_refill = now;
        // Tokens always land in [0, capacity], whatever the rate value.
        self.tokens = (self.tokens + self.rate_per_sec * elapsed).clamp(0.0, self.capacity as f64);
    }
}

/// Bounded, continuously-replenished permit count for one client.
#[derive(Debug)]
pub struct TokenBucket {
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Create a bucket that starts full.
    pub fn new(capacity: u32, rate_per_sec: f64) -> Self {
        Self {
            state: Mutex::new(BucketState {
                capacity,
                rate_per_sec,
                tokens: capacity as f64,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Refill, then consume `n` tokens if available.
    pub fn take(&self, n: f64) -> bool {
        let mut state = self.state.lock().expect("token bucket mutex poisoned");
        state.refill(Instant::now());
        if state.tokens >= n {
            state.tokens -= n;
            true
        } else {
            false
        }
    }

    /// Refill and report the current token count without consuming.
    pub fn available(&self) -> f64 {
        let mut state = self.state.lock().expect("token bucket mutex poisoned");
        state.refill(Instant::now());
        state.tokens
    }

    /// Update capacity. Tokens above the new capacity are clamped down;
    /// a capacity increase never grants tokens refill would not produce.
    pub fn set_capacity(&self, capacity: u32) {
        let mut state = self.state.lock().expect("token bucket mutex poisoned");
        state.capacity = capacity;
        state.tokens = state.tokens.min(capacity as f64);
    }

    /// Update the refill rate. Takes effect on the next refill.
    pub fn set_rate(&self, rate_per_sec: f64) {
        let mut state = self.state.lock().expect("token bucket mutex poisoned");
        state.rate_per_sec = rate_per_sec;
    }
}
