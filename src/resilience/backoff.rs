//! Retry delays: fixed, or exponential with optional jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::{BackoffStrategy, RetryConfig};

/// Delay inserted before each retry of a call group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// Same delay before every retry.
    Fixed(Duration),
    /// `base * 2^(retry - 1)`, capped at `max`, plus up to 10% jitter when enabled.
    Exponential {
        base: Duration,
        max: Duration,
        jitter: bool,
    },
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::Fixed(Duration::from_secs(1))
    }
}

impl BackoffPolicy {
    /// Delay before retry number `retry` (1 = first retry).
    pub fn delay(&self, retry: u32) -> Duration {
        match self {
            BackoffPolicy::Fixed(delay) => *delay,
            BackoffPolicy::Exponential { base, max, jitter } => {
                let base_ms = base.as_millis() as u64;
                let max_ms = max.as_millis() as u64;
                if *jitter {
                    calculate_backoff(retry, base_ms, max_ms)
                } else {
                    Duration::from_millis(exponential_ms(retry, base_ms, max_ms))
                }
            }
        }
    }
}

impl From<&RetryConfig> for BackoffPolicy {
    fn from(config: &RetryConfig) -> Self {
        match config.strategy {
            BackoffStrategy::Fixed => {
                BackoffPolicy::Fixed(Duration::from_millis(config.base_delay_ms))
            }
            BackoffStrategy::Exponential => BackoffPolicy::Exponential {
                base: Duration::from_millis(config.base_delay_ms),
                max: Duration::from_millis(config.max_delay_ms),
                jitter: config.jitter,
            },
        }
    }
}

fn exponential_ms(attempt: u32, base_ms: u64, max_ms: u64) -> u64 {
    if attempt == 0 {
        return 0;
    }
    let exponential_base = 2u64.saturating_pow(attempt - 1);
    base_ms.saturating_mul(exponential_base).min(max_ms)
}

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let capped_delay = exponential_ms(attempt, base_ms, max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
