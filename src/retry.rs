use std::time::Duration;

/// Bounded exponential backoff.
///
/// A failed attempt number `n` (0-based) is followed by a wait of
/// `base_delay * 2^n` as long as `n < max_retries`. With the defaults this
/// gives 1s, 2s and 4s, i.e. four attempts and at most 7s of waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Backoff before the retry that follows failed attempt `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Sum of every backoff wait when all attempts fail.
    pub fn total_backoff(&self) -> Duration {
        (0..self.max_retries).fold(Duration::ZERO, |total, attempt| {
            total.saturating_add(self.delay_for(attempt))
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Fresh counters for one delivery.
    pub fn start(&self) -> RetryState {
        RetryState {
            policy: *self,
            attempt: 0,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

/// Retry counters for a single delivery. Never shared between submissions.
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    attempt: u32,
}

impl RetryState {
    /// 0-based number of the attempt currently in flight.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Attempts issued so far, counting the one in flight.
    pub fn attempts_made(&self) -> u32 {
        self.attempt + 1
    }

    /// Delay the next retry would wait, if one is still allowed.
    pub fn current_delay(&self) -> Option<Duration> {
        (self.attempt < self.policy.max_retries).then(|| self.policy.delay_for(self.attempt))
    }

    /// Records a failed attempt. Returns the wait before the next attempt, or
    /// `None` once the budget is spent.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        let delay = self.current_delay()?;
        self.attempt += 1;
        Some(delay)
    }
}
