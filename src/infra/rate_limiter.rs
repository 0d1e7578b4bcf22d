use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Token bucket over requests per minute. Starts full, refills continuously.
#[derive(Debug)]
pub struct RateLimiter {
    requests_per_min: u64,
    // tokens available and the time of the last refill
    bucket: Mutex<(f64, Instant)>,
}

impl RateLimiter {
    /// `requests_per_min == 0` never throttles.
    pub fn new(requests_per_min: u64) -> Self {
        Self {
            requests_per_min,
            bucket: Mutex::new((requests_per_min as f64, Instant::now())),
        }
    }

    pub fn requests_per_min(&self) -> u64 {
        self.requests_per_min
    }

    /// Waits until one request may be sent.
    pub async fn acquire(&self) {
        if self.requests_per_min == 0 {
            return;
        }
        let capacity = self.requests_per_min as f64;
        let refill_rate = capacity / 60.0; // tokens per second

        loop {
            let mut guard = self.bucket.lock().await;
            let (ref mut tokens, ref mut last) = *guard;
            let now = Instant::now();
            let elapsed = now.duration_since(*last).as_secs_f64();
            *tokens = (*tokens + elapsed * refill_rate).min(capacity);
            *last = now;
            if *tokens >= 1.0 {
                *tokens -= 1.0;
                break;
            }
            let secs = (1.0 - *tokens) / refill_rate;
            drop(guard);
            tokio::time::sleep(Duration::from_secs_f64(secs.max(0.001))).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_burst_up_to_capacity_then_waits() {
        let limiter = RateLimiter::new(2);
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(10));

        // Third request needs one token at 2/min
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(29));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_rate_never_waits() {
        let limiter = RateLimiter::new(0);
        let start = Instant::now();
        for _ in 0..100 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
