//! Byte-rate limiter behind the throttled writer
//!
//! A token bucket refilled continuously at `limit` bytes per second. The
//! bucket starts empty and holds at most a tenth of a second of traffic, so
//! long-run throughput stays at or below the limit and bursts stay small.
//! Callers are delayed, data is never dropped.

use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Fraction of one second of traffic the bucket may hold
const BURST_DIVISOR: u64 = 10;

#[derive(Debug)]
pub struct RateLimiter {
    limit: u64,
    available: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// Create a limiter for `limit` bytes per second.
    ///
    /// `0` and `u64::MAX` both mean unlimited.
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            available: 0.0,
            last_refill: Instant::now(),
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn is_unlimited(&self) -> bool {
        self.limit == 0 || self.limit == u64::MAX
    }

    /// Largest burst the bucket can hold
    pub fn burst(&self) -> u64 {
        (self.limit / BURST_DIVISOR).max(1)
    }

    /// Change the limit; credit already earned is kept up to the new burst
    pub fn set_limit(&mut self, limit: u64) {
        self.refill();
        self.limit = limit;
        if self.is_unlimited() {
            self.available = 0.0;
        } else {
            self.available = self.available.min(self.burst() as f64);
        }
    }

    /// Largest piece of a `want`-byte write that can be granted in one step
    pub fn max_grant(&self, want: usize) -> usize {
        if self.is_unlimited() {
            want
        } else {
            want.min(usize::try_from(self.burst()).unwrap_or(usize::MAX))
        }
    }

    /// Wait until `bytes` may be sent, then consume them from the bucket.
    ///
    /// `bytes` should not exceed [`RateLimiter::max_grant`], otherwise the
    /// bucket can never fill far enough and the request is clamped to the burst.
    pub async fn acquire(&mut self, bytes: usize) {
        if self.is_unlimited() || bytes == 0 {
            return;
        }

        let wanted = (bytes as f64).min(self.burst() as f64);
        loop {
            self.refill();
            if self.available >= wanted {
                self.available -= wanted;
                return;
            }

            let deficit = wanted - self.available;
            sleep(Duration::from_secs_f64(deficit / self.limit as f64)).await;
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        if !self.is_unlimited() {
            let earned = now.duration_since(self.last_refill).as_secs_f64() * self.limit as f64;
            self.available = (self.available + earned).min(self.burst() as f64);
        }
        self.last_refill = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_unlimited_never_waits() {
        for limit in [0, u64::MAX] {
            let mut limiter = RateLimiter::new(limit);
            let start = Instant::now();
            limiter.acquire(1_000_000).await;
            assert_eq!(start.elapsed(), Duration::ZERO);
            assert_eq!(limiter.max_grant(1_000_000), 1_000_000);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sustained_rate_is_capped() {
        let mut limiter = RateLimiter::new(1000);
        let start = Instant::now();

        let mut remaining = 5000usize;
        while remaining > 0 {
            let piece = limiter.max_grant(remaining);
            limiter.acquire(piece).await;
            remaining -= piece;
        }

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(5), "took {elapsed:?}");
        assert!(elapsed < Duration::from_millis(5200), "took {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_credit_is_capped_at_burst() {
        let mut limiter = RateLimiter::new(1000);
        tokio::time::advance(Duration::from_secs(60)).await;

        let start = Instant::now();
        limiter.acquire(100).await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        // The minute of idle time bought one burst, not 60 seconds of traffic
        limiter.acquire(100).await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_max_grant_respects_burst() {
        let limiter = RateLimiter::new(1000);
        assert_eq!(limiter.burst(), 100);
        assert_eq!(limiter.max_grant(5000), 100);
        assert_eq!(limiter.max_grant(40), 40);

        let slow = RateLimiter::new(3);
        assert_eq!(slow.burst(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_limit_changes_rate() {
        let mut limiter = RateLimiter::new(1000);
        limiter.set_limit(100);
        assert_eq!(limiter.limit(), 100);

        let start = Instant::now();
        for _ in 0..10 {
            limiter.acquire(limiter.max_grant(10)).await;
        }
        assert!(start.elapsed() >= Duration::from_secs(1));
    }
}
