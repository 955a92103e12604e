use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryBackoff {
    Fixed,
    /// Doubles the delay after each failed attempt, capped at `max`.
    Exponential { max: Duration },
}

/// Bounded retry budget for one listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: RetryBackoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(15),
            backoff: RetryBackoff::Fixed,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the failed `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            RetryBackoff::Fixed => self.delay,
            RetryBackoff::Exponential { max } => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                self.delay.saturating_mul(factor).min(max)
            }
        }
    }
}
