use std::time::Duration;

use crate::data::TransportOptions;

/// Calculate the delay before a retry attempt using exponential backoff.
///
/// The delay formula is: `min(base * 2^retry_count, max)`
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use snapfetch_fetch::retry_delay;
///
/// let base = Duration::from_secs(3);
/// let max = Duration::from_secs(120);
///
/// assert_eq!(retry_delay(0, base, max), Duration::from_secs(3));
/// assert_eq!(retry_delay(1, base, max), Duration::from_secs(6));
/// assert_eq!(retry_delay(6, base, max), Duration::from_secs(120));
/// ```
pub fn retry_delay(retry_count: u32, base: Duration, max: Duration) -> Duration {
    let multiplier = 2_u32.saturating_pow(retry_count);
    base.saturating_mul(multiplier).min(max)
}

/// Why a request is being retried. Each kind draws from its own budget as well
/// as the shared total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryKind {
    Connect,
    Read,
    Status,
}

/// Remaining retries for a single logical request.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    total:    u32,
    connect:  u32,
    read:     u32,
    attempts: u32,
    base:     Duration,
    max:      Duration,
}

impl RetryBudget {
    pub fn new(options: &TransportOptions) -> Self {
        Self {
            total:    options.total_retries,
            connect:  options.connect_retries,
            read:     options.read_retries,
            attempts: 0,
            base:     options.backoff_factor,
            max:      options.max_backoff,
        }
    }

    /// Spend one retry of `kind`. Returns the delay to wait before retrying, or
    /// `None` once the relevant budget is exhausted.
    pub fn consume(&mut self, kind: RetryKind) -> Option<Duration> {
        if self.total == 0 {
            return None;
        }

        let per_kind = match kind {
            RetryKind::Connect => Some(&mut self.connect),
            RetryKind::Read => Some(&mut self.read),
            RetryKind::Status => None,
        };

        if let Some(left) = per_kind {
            if *left == 0 {
                return None;
            }
            *left -= 1;
        }

        self.total -= 1;
        let delay = retry_delay(self.attempts, self.base, self.max);
        self.attempts += 1;
        Some(delay)
    }

    /// Retries spent so far.
    pub fn attempts(&self) -> u32 { self.attempts }
}
