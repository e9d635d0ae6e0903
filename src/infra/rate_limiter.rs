use crate::app::ports::RateLimiterPort;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Spaces requests at least `delay` apart. The first request goes out immediately.
#[derive(Debug)]
pub struct FixedDelayLimiter {
    delay: Duration,
    last: Mutex<Option<Instant>>,
}

impl FixedDelayLimiter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last: Mutex::new(None),
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl RateLimiterPort for FixedDelayLimiter {
    async fn acquire(&self) {
        // Lock is held across the sleep so callers queue in order
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.delay;
            let now = Instant::now();
            if ready_at > now {
                tokio::time::sleep(ready_at - now).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// No throttling. Useful in tests and for local mirrors of the lookup service.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unthrottled;

#[async_trait]
impl RateLimiterPort for Unthrottled {
    async fn acquire(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_acquire_does_not_wait() {
        let limiter = FixedDelayLimiter::from_millis(500);
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(250));
    }

    #[tokio::test]
    async fn consecutive_acquires_are_spaced() {
        let limiter = FixedDelayLimiter::from_millis(30);
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(60));
    }
}
