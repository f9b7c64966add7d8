//! Outbound call budget.
//!
//! At most `max_calls` requests per `window`. Calls are spaced evenly, one
//! every `window / max_calls`, so any window of that length admits at most
//! `max_calls` of them. A call over budget waits for its slot; it never fails.

use entsoe_shared::{EntsoeError, RateLimitConfig, Result};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tracing::debug;

/// Blocking rate limiter shared by all requests of one client.
pub struct CallLimiter {
    limiter: DefaultDirectRateLimiter,
    config: RateLimitConfig,
}

impl CallLimiter {
    pub fn new(config: RateLimitConfig) -> Result<Self> {
        if config.max_calls == 0 {
            return Err(EntsoeError::config("rate_limit.max_calls must be at least 1"));
        }
        let period = config.window() / config.max_calls;
        // Burst of one: a larger burst refills on top of the window budget.
        let quota = Quota::with_period(period)
            .ok_or_else(|| EntsoeError::config("rate_limit.window_secs must be positive"))?;

        Ok(Self {
            limiter: RateLimiter::direct(quota),
            config,
        })
    }

    /// Wait for a slot.
    pub async fn acquire(&self) {
        if self.limiter.check().is_ok() {
            return;
        }
        debug!(
            max_calls = self.config.max_calls,
            window_secs = self.config.window_secs,
            "call budget exhausted, waiting"
        );
        self.limiter.until_ready().await;
    }

    /// Take a slot without waiting, if one is free.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn config(max_calls: u32, window_secs: u64) -> RateLimitConfig {
        RateLimitConfig {
            max_calls,
            window_secs,
        }
    }

    #[test]
    fn next_slot_is_denied_until_spacing_elapses() {
        let limiter = CallLimiter::new(config(3, 60)).unwrap();
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn zero_budget_is_rejected() {
        assert!(CallLimiter::new(config(0, 60)).is_err());
        assert!(CallLimiter::new(config(5, 0)).is_err());
    }

    #[test]
    fn window_never_admits_more_than_budget() {
        let limiter = CallLimiter::new(config(3, 1)).unwrap();
        let start = Instant::now();
        let mut granted = 0;
        while start.elapsed() < Duration::from_millis(950) {
            if limiter.try_acquire() {
                granted += 1;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(granted <= 3, "granted {granted} calls in one window");
    }

    #[tokio::test]
    async fn acquire_waits_once_budget_is_spent() {
        let limiter = CallLimiter::new(config(4, 1)).unwrap();
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(100));

        for _ in 0..2 {
            limiter.acquire().await;
        }
        // Two further slots at 250ms spacing.
        assert!(start.elapsed() >= Duration::from_millis(400));
    }
}
