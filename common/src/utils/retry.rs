use std::time::Duration;

use tokio_retry::strategy::{jitter, ExponentialBackoff};

/// Explicit retry policy applied at the orchestrator boundary. Components
/// below it never retry on their own.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: usize,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// No retries; the first failure is surfaced directly.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Backoff schedule for the attempts after the first.
    pub fn backoff(&self) -> impl Iterator<Item = Duration> {
        let millis = self.base_delay.as_millis().max(1) as u64;
        ExponentialBackoff::from_millis(millis)
            .map(jitter)
            .take(self.max_attempts.saturating_sub(1))
    }
}
