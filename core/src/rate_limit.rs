//! Rate-limit telemetry and the strategies that react to it.
//!
//! Every response may carry `X-Ratelimit-Limit`, `X-Ratelimit-Remaining` and
//! `X-Ratelimit-Period`. When all three parse, the client builds a
//! [`RateLimit`] snapshot and hands it to its [`RateLimitStrategy`] before
//! returning control to the caller. A strategy that sleeps therefore delays
//! every later call made through the same client.

use std::thread;
use std::time::Duration;

use crate::http::HttpResponse;

pub const HEADER_LIMIT: &str = "X-Ratelimit-Limit";
pub const HEADER_REMAINING: &str = "X-Ratelimit-Remaining";
pub const HEADER_PERIOD: &str = "X-Ratelimit-Period";

/// Snapshot of the server's rate-limit headers for one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Requests allowed per period.
    pub limit: u32,
    /// Requests left in the current period.
    pub remaining: u32,
    /// Period length in seconds.
    pub period: u32,
}

impl RateLimit {
    /// Parse the three rate-limit headers.
    ///
    /// Returns `None` when any header is missing or not an integer, when
    /// `remaining > limit`, or when `period` is zero.
    pub fn from_response(response: &HttpResponse) -> Option<Self> {
        let read = |name: &str| response.header(name)?.trim().parse::<u32>().ok();
        let rl = RateLimit {
            limit: read(HEADER_LIMIT)?,
            remaining: read(HEADER_REMAINING)?,
            period: read(HEADER_PERIOD)?,
        };
        (rl.remaining <= rl.limit && rl.period > 0).then_some(rl)
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(u64::from(self.period))
    }

    /// Share of the budget left, 0 to 100.
    pub fn percentage_left(&self) -> u32 {
        if self.limit == 0 {
            return 0;
        }
        (u64::from(self.remaining) * 100 / u64::from(self.limit)) as u32
    }

    /// Ideal spacing between requests to never exhaust the budget.
    pub fn wait_time(&self) -> Duration {
        if self.limit == 0 {
            return self.period();
        }
        self.period() / self.limit
    }

    /// Spacing that spreads the remaining budget over the period. With no
    /// budget left this is the full period.
    pub fn wait_time_remaining(&self) -> Duration {
        if self.remaining == 0 {
            return self.period();
        }
        self.period() / self.remaining
    }
}

/// Reaction to a rate-limit snapshot. Called synchronously after every
/// response that carried one.
pub trait RateLimitStrategy: Send + Sync {
    fn on_rate_limit(&self, rate_limit: &RateLimit);
}

impl<F> RateLimitStrategy for F
where
    F: Fn(&RateLimit) + Send + Sync,
{
    fn on_rate_limit(&self, rate_limit: &RateLimit) {
        self(rate_limit)
    }
}

/// Ignore rate-limit telemetry. The client default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStrategy;

impl RateLimitStrategy for NoopStrategy {
    fn on_rate_limit(&self, _rate_limit: &RateLimit) {}
}

/// Sleep `wait_time_remaining` after every response, pacing a single caller
/// so the budget lasts the whole period.
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepStrategy;

impl SleepStrategy {
    pub fn delay(&self, rate_limit: &RateLimit) -> Duration {
        rate_limit.wait_time_remaining()
    }
}

impl RateLimitStrategy for SleepStrategy {
    fn on_rate_limit(&self, rate_limit: &RateLimit) {
        let delay = self.delay(rate_limit);
        log::debug!("rate limit: sleeping {delay:?} ({rate_limit:?})");
        thread::sleep(delay);
    }
}

/// For `parallelism` workers sharing one API key: run unthrottled until the
/// remaining budget drops to `parallelism`, then sleep `wait_time *
/// parallelism` so the workers together stay within the limit.
#[derive(Debug, Clone, Copy)]
pub struct ConcurrentStrategy {
    pub parallelism: u32,
}

impl ConcurrentStrategy {
    pub fn new(parallelism: u32) -> Self {
        Self {
            parallelism: parallelism.max(1),
        }
    }

    pub fn delay(&self, rate_limit: &RateLimit) -> Option<Duration> {
        (rate_limit.remaining <= self.parallelism).then(|| rate_limit.wait_time() * self.parallelism)
    }
}

impl RateLimitStrategy for ConcurrentStrategy {
    fn on_rate_limit(&self, rate_limit: &RateLimit) {
        if let Some(delay) = self.delay(rate_limit) {
            log::debug!("rate limit: sleeping {delay:?} ({rate_limit:?})");
            thread::sleep(delay);
        }
    }
}
