//! Circuit breaker around the routing provider
//!
//! After `threshold` consecutive failures the provider is skipped until
//! `recovery` has passed since the last failure. The next call after that is
//! a trial call: success closes the circuit, failure keeps it open for another
//! recovery period.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Default)]
struct BreakerState {
    consecutive_failures: u32,
    last_failure: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    threshold: u32,
    recovery: Duration,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, recovery: Duration) -> Self {
        Self {
            state: Mutex::new(BreakerState::default()),
            threshold: threshold.max(1),
            recovery,
        }
    }

    /// True while provider calls should be skipped
    pub fn is_open(&self) -> bool {
        let state = self.state.lock();
        state.consecutive_failures >= self.threshold
            && state
                .last_failure
                .map_or(false, |at| at.elapsed() < self.recovery)
    }

    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.last_failure = Some(Instant::now());
    }

    pub fn record_success(&self) {
        *self.state.lock() = BreakerState::default();
    }

    pub fn failures(&self) -> u32 {
        self.state.lock().consecutive_failures
    }
}
