use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-node retry policy.
///
/// `max_attempts` counts every attempt including the first, and is never
/// below one. Only transient failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
  max_attempts: u32,
  retry_delay: Duration,
}

impl RetryPolicy {
  pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
    Self {
      max_attempts: max_attempts.max(1),
      retry_delay,
    }
  }

  /// Run once, never retry.
  pub fn once() -> Self {
    Self::new(1, Duration::ZERO)
  }

  pub fn max_attempts(&self) -> u32 {
    self.max_attempts
  }

  pub fn retry_delay(&self) -> Duration {
    self.retry_delay
  }

  /// Whether a transient failure on `attempt` (1-based) may be retried.
  pub fn allows_retry_after(&self, attempt: u32) -> bool {
    attempt < self.max_attempts
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self::once()
  }
}
