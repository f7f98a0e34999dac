use std::net::IpAddr;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::context::Context;
use crate::handler::Handler;

/// Buckets idle longer than this are dropped when the table grows too large.
const IDLE_EVICTION: Duration = Duration::from_secs(60);

/// Soft cap on tracked clients before idle buckets are evicted.
const MAX_TRACKED_CLIENTS: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    last: Instant,
}

/// Per-client token bucket.
///
/// Each client, keyed by [`Context::client_ip`], may make `rate` requests per
/// second on average and up to `burst` at once. A client with an empty bucket
/// gets 429 and the chain stops. Requests whose address cannot be determined
/// share a single bucket.
pub struct RateLimit {
    rate: f64,
    burst: f64,
    buckets: DashMap<Option<IpAddr>, Bucket>,
}

impl RateLimit {
    /// Allow `rate` requests per second per client, with a burst of the
    /// same size.
    #[must_use]
    pub fn new(rate: u32) -> Self {
        Self {
            rate: f64::from(rate),
            burst: f64::from(rate.max(1)),
            buckets: DashMap::new(),
        }
    }

    /// Set the bucket capacity.
    #[must_use]
    pub fn burst(mut self, burst: u32) -> Self {
        self.burst = f64::from(burst.max(1));
        self
    }

    /// Number of clients currently tracked.
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }

    fn acquire(&self, client: Option<IpAddr>, now: Instant) -> bool {
        if self.buckets.len() >= MAX_TRACKED_CLIENTS {
            self.evict_idle(now);
        }

        let mut bucket = self.buckets.entry(client).or_insert(Bucket {
            tokens: self.burst,
            last: now,
        });
        let elapsed = now.saturating_duration_since(bucket.last).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.burst);
        bucket.last = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn evict_idle(&self, now: Instant) {
        let before = self.buckets.len();
        self.buckets
            .retain(|_, b| now.saturating_duration_since(b.last) < IDLE_EVICTION);
        let after = self.buckets.len();
        if after >= MAX_TRACKED_CLIENTS {
            warn!(tracked = after, "Rate limiter still over capacity after eviction");
        } else {
            debug!(evicted = before - after, "Evicted idle rate limit buckets");
        }
    }
}

impl Handler for RateLimit {
    fn handle(&self, ctx: &mut Context) {
        let client = ctx.client_ip();
        if self.acquire(client, Instant::now()) {
            ctx.next();
        } else {
            debug!(request_id = %ctx.request_id(), client = ?client, "Rate limit exceeded");
            ctx.set_header("Retry-After", "1");
            ctx.fail(429, "Too Many Requests");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Request;
    use http::Method;
    use std::sync::Arc;

    fn ip(s: &str) -> Option<IpAddr> {
        s.parse().ok()
    }

    #[test]
    fn test_burst_then_reject() {
        let limit = RateLimit::new(1).burst(3);
        let now = Instant::now();
        assert!(limit.acquire(ip("10.0.0.1"), now));
        assert!(limit.acquire(ip("10.0.0.1"), now));
        assert!(limit.acquire(ip("10.0.0.1"), now));
        assert!(!limit.acquire(ip("10.0.0.1"), now));
    }

    #[test]
    fn test_tokens_refill_over_time() {
        let limit = RateLimit::new(2).burst(1);
        let start = Instant::now();
        assert!(limit.acquire(ip("10.0.0.1"), start));
        assert!(!limit.acquire(ip("10.0.0.1"), start));
        assert!(limit.acquire(ip("10.0.0.1"), start + Duration::from_millis(500)));
    }

    #[test]
    fn test_clients_are_independent() {
        let limit = RateLimit::new(1);
        let now = Instant::now();
        assert!(limit.acquire(ip("10.0.0.1"), now));
        assert!(!limit.acquire(ip("10.0.0.1"), now));
        assert!(limit.acquire(ip("10.0.0.2"), now));
        assert!(limit.acquire(None, now));
        assert_eq!(limit.tracked_clients(), 3);
    }

    #[test]
    fn test_idle_buckets_evicted() {
        let limit = RateLimit::new(1);
        let start = Instant::now();
        limit.acquire(ip("10.0.0.1"), start);
        limit.evict_idle(start + IDLE_EVICTION + Duration::from_secs(1));
        assert_eq!(limit.tracked_clients(), 0);
    }

    #[test]
    fn test_middleware_responds_429() {
        let limit: Arc<RateLimit> = Arc::new(RateLimit::new(1));
        let mut statuses = Vec::new();
        for _ in 0..2 {
            let mut ctx = Context::new(
                Request::new(Method::GET, "/").with_header("X-Forwarded-For", "192.0.2.1"),
            );
            ctx.push_handler(Arc::clone(&limit) as _);
            ctx.push_handler(Arc::new(|c: &mut Context| c.string(200, "ok")));
            ctx.next();
            statuses.push(ctx.status_code());
            if ctx.status_code() == 429 {
                assert_eq!(ctx.response().header("retry-after"), Some("1"));
            }
        }
        assert_eq!(statuses, vec![200, 429]);
    }
}
