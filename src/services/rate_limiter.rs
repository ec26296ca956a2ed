//! Request pacing for the external routing provider.
//!
//! Each `wait()` reserves the next free slot, at least `min_interval` after
//! the previous one, then sleeps until it. The lock is only held while
//! reserving, so concurrent callers queue up in reservation order.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct RateLimiter {
    next_slot: Arc<Mutex<Option<Instant>>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            next_slot: Arc::new(Mutex::new(None)),
            min_interval,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait for this caller's slot. The first call returns immediately.
    pub async fn wait(&self) {
        let slot = {
            let mut next = self.next_slot.lock();
            let now = Instant::now();
            let slot = next.map_or(now, |reserved| reserved.max(now));
            *next = Some(slot + self.min_interval);
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_call_waits_for_the_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(80));
        let start = Instant::now();

        limiter.wait().await;
        assert!(start.elapsed() < Duration::from_millis(40), "first call should not wait");

        limiter.wait().await;
        assert!(
            start.elapsed() >= Duration::from_millis(80),
            "second call returned after {:?}",
            start.elapsed()
        );
    }

    #[tokio::test]
    async fn idle_time_counts_toward_the_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(40));
        limiter.wait().await;
        tokio::time::sleep(Duration::from_millis(60)).await;

        let before = Instant::now();
        limiter.wait().await;
        assert!(before.elapsed() < Duration::from_millis(20));
    }

    #[tokio::test]
    async fn clones_share_one_schedule() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        let other = limiter.clone();
        let start = Instant::now();

        limiter.wait().await;
        other.wait().await;

        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn zero_interval_never_sleeps() {
        let limiter = RateLimiter::new(Duration::ZERO);
        let start = std::time::Instant::now();
        tokio_test::block_on(async {
            for _ in 0..3 {
                limiter.wait().await;
            }
        });
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
