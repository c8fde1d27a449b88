//! Proactive request throttling.
//!
//! The retry layer only reacts to 429s after the remote has already
//! rejected a call. A [`RateLimiter`] spaces calls out up front using a
//! token bucket: `capacity` calls may burst, after which tokens refill at
//! a steady rate.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket shared by every call made through one
/// [`crate::ResilientCell`].
#[derive(Debug)]
pub struct RateLimiter {
    capacity: f64,
    refill_per_sec: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Create a limiter that starts full.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or `refill_per_sec` is not positive.
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        assert!(capacity > 0, "rate limiter capacity must be positive");
        assert!(refill_per_sec > 0.0, "rate limiter refill rate must be positive");
        Self {
            capacity: f64::from(capacity),
            refill_per_sec,
            bucket: Mutex::new(Bucket {
                tokens: f64::from(capacity),
                last_refill: Instant::now(),
            }),
        }
    }

    /// Allow `requests` calls per minute with an equal burst size.
    pub fn per_minute(requests: u32) -> Self {
        Self::new(requests.max(1), f64::from(requests.max(1)) / 60.0)
    }

    /// Wait until a token is available and take it.
    pub async fn acquire(&self) {
        let mut bucket = self.bucket.lock().await;
        self.refill(&mut bucket);

        if bucket.tokens < 1.0 {
            let missing = 1.0 - bucket.tokens;
            let wait = Duration::from_secs_f64(missing / self.refill_per_sec);
            debug!(wait_ms = wait.as_millis() as u64, "rate limiter waiting for a token");
            // Holding the lock while sleeping queues later callers behind us.
            tokio::time::sleep(wait).await;
            self.refill(&mut bucket);
        }

        bucket.tokens = (bucket.tokens - 1.0).max(0.0);
    }

    /// Tokens currently available (after refilling).
    pub async fn available(&self) -> f64 {
        let mut bucket = self.bucket.lock().await;
        self.refill(&mut bucket);
        bucket.tokens
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.last_refill = now;
    }
}
