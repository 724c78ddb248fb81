//! Requeue backoff for keys whose fetch failed.

use std::time::Duration;

use rand::Rng;

use crate::config::WorkerConfig;

/// Exponential requeue delay with jitter, shaped by the worker settings.
///
/// Attempt 1 waits `base_delay_ms`, each further attempt doubles it, and the
/// result is capped at `max_delay_ms`. Up to 10% jitter is added on top of the
/// capped delay so keys that failed together do not retry together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequeueBackoff {
    base: Duration,
    max: Duration,
}

impl RequeueBackoff {
    pub fn new(config: &WorkerConfig) -> Self {
        Self {
            base: Duration::from_millis(config.base_delay_ms),
            max: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Delay before requeue attempt `attempt`; attempt 0 is not delayed.
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        let delay = self
            .base
            .checked_mul(factor)
            .map_or(self.max, |d| d.min(self.max));
        delay + jitter(delay)
    }
}

fn jitter(delay: Duration) -> Duration {
    let spread = (delay.as_millis() / 10) as u64;
    if spread == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..spread))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff(base_delay_ms: u64, max_delay_ms: u64) -> RequeueBackoff {
        RequeueBackoff::new(&WorkerConfig {
            count: 1,
            base_delay_ms,
            max_delay_ms,
        })
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let b = backoff(100, 2000);
        assert_eq!(b.delay(0), Duration::ZERO);

        let d1 = b.delay(1);
        assert!(d1 >= Duration::from_millis(100) && d1 < Duration::from_millis(110));

        let d3 = b.delay(3);
        assert!(d3 >= Duration::from_millis(400) && d3 < Duration::from_millis(440));

        let capped = backoff(100, 1000).delay(40);
        assert!(capped >= Duration::from_millis(1000) && capped < Duration::from_millis(1100));
    }

    #[test]
    fn test_huge_attempt_counts_stay_capped() {
        let d = backoff(30_000, 60_000).delay(u32::MAX);
        assert!(d >= Duration::from_secs(60) && d < Duration::from_secs(66));
    }

    #[test]
    fn test_small_delays_have_no_jitter() {
        assert_eq!(backoff(5, 1000).delay(1), Duration::from_millis(5));
    }
}
