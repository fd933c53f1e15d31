//! Per-client token bucket.
//!
//! Each client key owns a bucket of `burst` tokens that refills at `rps`
//! tokens per second. A request spends one token; an empty bucket means
//! the request is refused.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Buckets untouched for this long are forgotten.
const IDLE_AFTER: Duration = Duration::from_secs(3 * 60);
const SWEEP_EVERY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    last_seen: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    rps: f64,
    burst: f64,
    clients: Mutex<(HashMap<String, Bucket>, Instant)>,
}

impl RateLimiter {
    pub fn new(rps: f64, burst: u32) -> Self {
        Self {
            rps: rps.max(0.0),
            burst: f64::from(burst.max(1)),
            clients: Mutex::new((HashMap::new(), Instant::now())),
        }
    }

    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut guard = self.clients.lock();
        let (clients, last_sweep) = &mut *guard;

        if now.saturating_duration_since(*last_sweep) >= SWEEP_EVERY {
            clients.retain(|_, b| now.saturating_duration_since(b.last_seen) < IDLE_AFTER);
            *last_sweep = now;
        }

        let bucket = clients.entry(key.to_owned()).or_insert(Bucket {
            tokens: self.burst,
            last_seen: now,
        });
        let elapsed = now.saturating_duration_since(bucket.last_seen).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rps).min(self.burst);
        bucket.last_seen = now;

        if bucket.tokens < 1.0 {
            return false;
        }
        bucket.tokens -= 1.0;
        true
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.clients.lock().0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_then_refused() {
        let limiter = RateLimiter::new(2.0, 4);
        let now = Instant::now();
        for _ in 0..4 {
            assert!(limiter.allow_at("10.0.0.1", now));
        }
        assert!(!limiter.allow_at("10.0.0.1", now));
        assert!(limiter.allow_at("10.0.0.2", now));
    }

    #[test]
    fn refills_at_the_configured_rate() {
        let limiter = RateLimiter::new(2.0, 4);
        let start = Instant::now();
        for _ in 0..4 {
            limiter.allow_at("a", start);
        }
        assert!(!limiter.allow_at("a", start));

        let later = start + Duration::from_millis(500);
        assert!(limiter.allow_at("a", later));
        assert!(!limiter.allow_at("a", later));

        // Never more than a full burst, however long the client was away.
        let much_later = later + Duration::from_secs(60);
        for _ in 0..4 {
            assert!(limiter.allow_at("a", much_later));
        }
        assert!(!limiter.allow_at("a", much_later));
    }

    #[test]
    fn idle_clients_are_swept() {
        let limiter = RateLimiter::new(2.0, 4);
        let start = Instant::now();
        limiter.allow_at("a", start);
        limiter.allow_at("b", start + Duration::from_secs(150));
        assert_eq!(limiter.tracked(), 2);

        limiter.allow_at("b", start + Duration::from_secs(220));
        assert_eq!(limiter.tracked(), 1);
    }
}
