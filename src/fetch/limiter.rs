//! Global request rate limiter
//!
//! Token bucket shared by every in-flight target task.

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorRateLimiter,
};
use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

/// Longest refill period accepted, so tiny rates stay representable
const MAX_PERIOD_SECONDS: f64 = 86_400.0;

/// Run-wide ceiling on outbound requests per second
pub struct RateLimiter {
    limiter: GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    requests_per_second: f64,
}

impl RateLimiter {
    /// Creates a limiter admitting `requests_per_second` on average
    ///
    /// One token is replenished every `1 / requests_per_second` seconds and
    /// up to `max(1, floor(requests_per_second))` may be taken in a burst.
    pub fn new(requests_per_second: f64) -> Self {
        let seconds = (1.0 / requests_per_second).clamp(0.0, MAX_PERIOD_SECONDS);
        let burst = NonZeroU32::new(requests_per_second.floor().min(u32::MAX as f64) as u32)
            .unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(Duration::from_secs_f64(seconds))
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MAX))
            .allow_burst(burst);

        Self {
            limiter: GovernorRateLimiter::direct(quota),
            requests_per_second,
        }
    }

    /// Waits until a request may be issued
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    /// Takes a token if one is available right now
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    pub fn requests_per_second(&self) -> f64 {
        self.requests_per_second
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("requests_per_second", &self.requests_per_second)
            .finish()
    }
}
