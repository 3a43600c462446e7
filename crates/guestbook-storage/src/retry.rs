//! Retry policy for store connection attempts.
//!
//! A [`RetryPolicy`] is a plain value: it decides whether attempt `n` may run
//! and how long to wait before it. Sleeping is left to the caller, so the
//! policy itself is testable without timers.

use std::time::Duration;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed,
    /// Delay doubles after each failure, capped at `max`.
    Exponential { max: Duration },
}

/// Connection retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first. `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Base delay between attempts.
    pub delay: Duration,
    /// Delay growth strategy.
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Retry forever with a constant delay.
    #[must_use]
    pub const fn fixed(delay: Duration) -> Self {
        Self {
            max_attempts: None,
            delay,
            backoff: Backoff::Fixed,
        }
    }

    /// Retry forever, doubling the delay up to `max`.
    #[must_use]
    pub const fn exponential(delay: Duration, max: Duration) -> Self {
        Self {
            max_attempts: None,
            delay,
            backoff: Backoff::Exponential { max },
        }
    }

    /// Cap the total number of attempts. Zero means unbounded.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = if attempts == 0 { None } else { Some(attempts) };
        self
    }

    /// Drop any attempt cap.
    #[must_use]
    pub const fn unbounded(mut self) -> Self {
        self.max_attempts = None;
        self
    }

    /// Whether attempt number `attempt` (1-based) may run.
    #[must_use]
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt <= max)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { max } => {
                let shift = attempt.saturating_sub(1).min(31);
                self.delay.saturating_mul(1u32 << shift).min(max)
            }
        }
    }
}

impl Default for RetryPolicy {
    /// Five attempts, five seconds apart.
    fn default() -> Self {
        Self::fixed(Duration::from_secs(5)).with_max_attempts(5)
    }
}
