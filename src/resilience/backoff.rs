//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// Backoff schedule between retry attempts.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
}

impl Backoff {
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self { base_ms, max_ms }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.base_delay_ms, config.max_delay_ms)
    }

    /// Delay before retry number `retry` (1-based).
    ///
    /// `base * 2^(retry-1)`, capped at `max`, plus up to 10% jitter.
    pub fn delay(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let exponential = 2u64.saturating_pow(retry - 1);
        let capped = self.base_ms.saturating_mul(exponential).min(self.max_ms);

        let jitter_range = capped / 10;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..jitter_range)
        } else {
            0
        };

        Duration::from_millis(capped.saturating_add(jitter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        let backoff = Backoff::new(100, 1000);

        assert_eq!(backoff.delay(0), Duration::ZERO);

        let b1 = backoff.delay(1);
        assert!(b1 >= Duration::from_millis(100) && b1 < Duration::from_millis(110));

        let b2 = backoff.delay(2);
        assert!(b2 >= Duration::from_millis(200) && b2 < Duration::from_millis(220));

        let capped = backoff.delay(10);
        assert!(capped >= Duration::from_millis(1000) && capped < Duration::from_millis(1100));
    }

    #[test]
    fn test_huge_retry_count_does_not_overflow() {
        let backoff = Backoff::new(u64::MAX / 2, u64::MAX);
        let _ = backoff.delay(u32::MAX);
    }
}
