//! Bounded retry policy handed to the job queue.

use std::time::Duration;

/// Maximum attempts plus a backoff schedule.
///
/// The schedule is indexed by the number of attempts already consumed; once
/// it runs out the last entry repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    schedule: Vec<Duration>,
}

impl RetryPolicy {
    /// Build a policy. `max_attempts` is clamped to at least 1.
    pub fn new(max_attempts: u32, schedule: Vec<Duration>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            schedule,
        }
    }

    /// Exponential schedule: `base * 2^n`, capped at `max`, `steps` entries.
    pub fn exponential(max_attempts: u32, base: Duration, max: Duration, steps: u32) -> Self {
        let schedule = (0..steps)
            .map(|n| base.saturating_mul(2u32.saturating_pow(n)).min(max))
            .collect();
        Self::new(max_attempts, schedule)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether a job that has consumed `attempts` attempts may run again.
    pub fn allows_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Delay before the job becomes claimable again after its
    /// `attempts`-th failed attempt.
    pub fn delay_for(&self, attempts: u32) -> Duration {
        if attempts == 0 || self.schedule.is_empty() {
            return Duration::ZERO;
        }
        let idx = (attempts as usize - 1).min(self.schedule.len() - 1);
        self.schedule[idx]
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(3, Duration::from_secs(30), Duration::from_secs(600), 5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_attempts_is_at_least_one() {
        let p = RetryPolicy::new(0, vec![]);
        assert_eq!(p.max_attempts(), 1);
        assert!(p.allows_retry(0));
        assert!(!p.allows_retry(1));
    }

    #[test]
    fn schedule_repeats_last_entry() {
        let p = RetryPolicy::new(5, vec![Duration::from_secs(1), Duration::from_secs(7)]);
        assert_eq!(p.delay_for(0), Duration::ZERO);
        assert_eq!(p.delay_for(1), Duration::from_secs(1));
        assert_eq!(p.delay_for(2), Duration::from_secs(7));
        assert_eq!(p.delay_for(9), Duration::from_secs(7));
    }

    #[test]
    fn exponential_is_capped() {
        let p = RetryPolicy::exponential(4, Duration::from_secs(10), Duration::from_secs(35), 4);
        assert_eq!(p.delay_for(1), Duration::from_secs(10));
        assert_eq!(p.delay_for(2), Duration::from_secs(20));
        assert_eq!(p.delay_for(3), Duration::from_secs(35));
        assert_eq!(p.delay_for(4), Duration::from_secs(35));
    }

    #[test]
    fn empty_schedule_means_no_delay() {
        let p = RetryPolicy::new(3, vec![]);
        assert_eq!(p.delay_for(2), Duration::ZERO);
    }
}
