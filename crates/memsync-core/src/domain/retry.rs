//! Retry policy: dead-letter threshold and dead-letter backoff.

use std::time::Duration;

/// Retry policy for failed uploads.
///
/// - Pending entries are retried once per worker cycle (the cycle interval is
///   their only backoff) until `dead_letter_threshold` failures.
/// - Dead-lettered entries back off exponentially, capped at `max_delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Failed attempts after which a pending entry moves to the dead-letter store.
    pub dead_letter_threshold: u32,

    /// Delay for the first dead-letter retry.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Upper bound for any dead-letter delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            dead_letter_threshold: 5,
            base_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_delay: Duration::from_secs(3600),
        }
    }
}

impl RetryPolicy {
    /// Has a pending entry used up its normal retries?
    pub fn is_exhausted(&self, retry_count: u32) -> bool {
        retry_count >= self.dead_letter_threshold
    }

    /// Delay before the next dead-letter retry.
    ///
    /// delay = min(base_delay * multiplier^exponent, max_delay)
    ///
    /// With the defaults (30s, 2.0, 1h):
    /// - exponent 0: 30s
    /// - exponent 1: 60s
    /// - exponent 2: 120s
    /// - exponent 7 and above: 3600s
    pub fn next_delay(&self, exponent: u32) -> Duration {
        let exponent = i32::try_from(exponent).unwrap_or(i32::MAX);
        let delay_secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !delay_secs.is_finite() || delay_secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(delay_secs)
    }

    /// Is a dead-letter entry eligible for another attempt at `now`?
    ///
    /// All times are seconds since epoch.
    pub fn is_due(&self, exponent: u32, last_attempt: i64, now: i64) -> bool {
        let elapsed = now.saturating_sub(last_attempt).max(0) as u64;
        elapsed >= self.next_delay(exponent).as_secs()
    }

    /// Seconds until a dead-letter entry becomes eligible (0 when already due).
    pub fn remaining_secs(&self, exponent: u32, last_attempt: i64, now: i64) -> u64 {
        let elapsed = now.saturating_sub(last_attempt).max(0) as u64;
        self.next_delay(exponent).as_secs().saturating_sub(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_policy_has_reasonable_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.dead_letter_threshold, 5);
        assert_eq!(policy.base_delay, Duration::from_secs(30));
        assert_eq!(policy.max_delay, Duration::from_secs(3600));
    }

    #[rstest]
    #[case(0, 30)]
    #[case(1, 60)]
    #[case(2, 120)]
    #[case(6, 1920)]
    #[case(7, 3600)]
    #[case(64, 3600)]
    #[case(u32::MAX, 3600)]
    fn exponential_backoff_is_capped(#[case] exponent: u32, #[case] secs: u64) {
        let policy = RetryPolicy::default();
        assert_eq!(policy.next_delay(exponent), Duration::from_secs(secs));
    }

    #[test]
    fn exponent_two_waits_two_minutes() {
        let policy = RetryPolicy::default();
        let last_attempt = 1_000;

        assert!(!policy.is_due(2, last_attempt, last_attempt + 119));
        assert!(policy.is_due(2, last_attempt, last_attempt + 120));
        assert_eq!(policy.remaining_secs(2, last_attempt, last_attempt + 100), 20);
    }

    #[test]
    fn threshold_is_reached_exactly_at_five() {
        let policy = RetryPolicy::default();
        assert!(!policy.is_exhausted(4));
        assert!(policy.is_exhausted(5));
    }
}
