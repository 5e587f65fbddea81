//! Backoff policy for transient publish failures
//!
//! Transient errors back off exponentially with uniform jitter, capped at a
//! fixed attempt count. Authoritative rate-limit rejections are paced by the
//! server's own reset signal instead and never count against the cap; this
//! policy only adds jitter to that wait so restarts don't retry in lockstep.

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum call attempts per operation before giving up
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub jitter_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(15),
            jitter_max: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, jitter_max: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            jitter_max,
        }
    }

    /// Backoff before retry number `attempt` (0-based), without jitter.
    pub fn base_backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Backoff with uniform jitter added.
    pub fn backoff_delay(&self, attempt: u32, rng: &mut impl Rng) -> Duration {
        self.base_backoff(attempt) + self.jitter(rng)
    }

    /// Jittered wait after an authoritative rate-limit rejection.
    pub fn reject_wait(&self, wait: Duration, rng: &mut impl Rng) -> Duration {
        wait + self.jitter(rng)
    }

    fn jitter(&self, rng: &mut impl Rng) -> Duration {
        let max_ms = self.jitter_max.as_millis() as u64;
        if max_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rng.gen_range(0..max_ms))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_base_backoff_strictly_increasing() {
        let policy = RetryPolicy::default();
        for attempt in 0..policy.max_attempts - 1 {
            assert!(
                policy.base_backoff(attempt + 1) > policy.base_backoff(attempt),
                "backoff must grow from attempt {} to {}",
                attempt,
                attempt + 1
            );
        }
    }

    #[test]
    fn test_base_backoff_doubles() {
        let policy = RetryPolicy::new(5, Duration::from_secs(15), Duration::ZERO);
        assert_eq!(policy.base_backoff(0), Duration::from_secs(15));
        assert_eq!(policy.base_backoff(1), Duration::from_secs(30));
        assert_eq!(policy.base_backoff(2), Duration::from_secs(60));
        assert_eq!(policy.base_backoff(3), Duration::from_secs(120));
    }

    #[test]
    fn test_backoff_jitter_within_bounds() {
        let policy = RetryPolicy::new(5, Duration::from_secs(1), Duration::from_secs(3));
        let mut rng = StdRng::seed_from_u64(42);

        for attempt in 0..5 {
            let base = policy.base_backoff(attempt);
            let delay = policy.backoff_delay(attempt, &mut rng);
            assert!(delay >= base);
            assert!(delay < base + Duration::from_secs(3));
        }
    }

    #[test]
    fn test_backoff_deterministic_with_seed() {
        let policy = RetryPolicy::default();
        let delay1 = policy.backoff_delay(2, &mut StdRng::seed_from_u64(7));
        let delay2 = policy.backoff_delay(2, &mut StdRng::seed_from_u64(7));
        assert_eq!(delay1, delay2);
    }

    #[test]
    fn test_zero_jitter() {
        let policy = RetryPolicy::new(5, Duration::from_secs(2), Duration::ZERO);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(policy.backoff_delay(0, &mut rng), Duration::from_secs(2));
        assert_eq!(
            policy.reject_wait(Duration::from_secs(9), &mut rng),
            Duration::from_secs(9)
        );
    }

    #[test]
    fn test_reject_wait_preserves_server_signal() {
        let policy = RetryPolicy::new(5, Duration::from_secs(15), Duration::from_secs(3));
        let mut rng = StdRng::seed_from_u64(3);
        let wait = policy.reject_wait(Duration::from_secs(100), &mut rng);
        assert!(wait >= Duration::from_secs(100));
        assert!(wait < Duration::from_secs(103));
    }
}
