//! Failed-unlock counter with a timed lockout.
//!
//! State lives in memory only; a process restart clears it.

use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::error::{Result, VaultError};

/// Consecutive failures before the lockout starts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// How long the lockout lasts.
pub const DEFAULT_LOCKOUT: Duration = Duration::from_secs(15 * 60);

/// Longest lockout a policy may ask for.
pub const MAX_LOCKOUT: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    pub max_attempts: u32,
    pub lockout: Duration,
}

impl ThrottlePolicy {
    /// Reject policies that would disable the throttle.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(VaultError::InvalidThrottle(
                "max_attempts must be at least 1".into(),
            ));
        }
        if self.lockout.is_zero() {
            return Err(VaultError::InvalidThrottle(
                "lockout must be longer than zero".into(),
            ));
        }
        if self.lockout > MAX_LOCKOUT {
            return Err(VaultError::InvalidThrottle(format!(
                "lockout must be at most {} seconds",
                MAX_LOCKOUT.as_secs()
            )));
        }
        Ok(())
    }
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            lockout: DEFAULT_LOCKOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    Allowed,
    Denied { retry_after: Duration },
}

/// Tracks consecutive failed unlocks.
///
/// Callers must check [`UnlockThrottle::check_at`] before doing any
/// passphrase work and report the outcome afterwards.
#[derive(Debug)]
pub struct UnlockThrottle {
    policy: ThrottlePolicy,
    failed_attempts: u32,
    /// When the current lockout started. Elapsed time is compared against
    /// the policy, so no deadline is ever computed by addition.
    locked_at: Option<Instant>,
}

impl UnlockThrottle {
    #[must_use]
    pub fn new(policy: ThrottlePolicy) -> Self {
        Self {
            policy,
            failed_attempts: 0,
            locked_at: None,
        }
    }

    #[must_use]
    pub fn policy(&self) -> ThrottlePolicy {
        self.policy
    }

    /// Number of consecutive failures since the last reset.
    #[must_use]
    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// Whether an attempt may proceed at `now`.
    ///
    /// An expired lockout is cleared here, together with the failure count.
    pub fn check_at(&mut self, now: Instant) -> ThrottleDecision {
        let Some(locked_at) = self.locked_at else {
            return ThrottleDecision::Allowed;
        };
        let elapsed = now.saturating_duration_since(locked_at);
        match self.policy.lockout.checked_sub(elapsed) {
            Some(retry_after) if !retry_after.is_zero() => {
                ThrottleDecision::Denied { retry_after }
            },
            _ => {
                info!("unlock lockout expired");
                self.reset();
                ThrottleDecision::Allowed
            },
        }
    }

    /// Record a failed attempt at `now`.
    ///
    /// Returns the lockout duration when this failure starts a lockout.
    pub fn record_failure_at(&mut self, now: Instant) -> Option<Duration> {
        self.failed_attempts = self.failed_attempts.saturating_add(1);
        if self.failed_attempts < self.policy.max_attempts {
            return None;
        }
        self.locked_at = Some(now);
        warn!(
            attempts = self.failed_attempts,
            lockout_secs = self.policy.lockout.as_secs(),
            "too many failed unlock attempts, locking out"
        );
        Some(self.policy.lockout)
    }

    /// Record a successful attempt; clears all throttle state.
    pub fn record_success(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.failed_attempts = 0;
        self.locked_at = None;
    }
}

impl Default for UnlockThrottle {
    fn default() -> Self {
        Self::new(ThrottlePolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[test]
    fn allows_until_threshold() {
        let mut throttle = UnlockThrottle::default();
        let now = Instant::now();

        for _ in 0..DEFAULT_MAX_ATTEMPTS - 1 {
            assert_eq!(throttle.check_at(now), ThrottleDecision::Allowed);
            assert_eq!(throttle.record_failure_at(now), None);
        }
        assert_eq!(throttle.check_at(now), ThrottleDecision::Allowed);
        assert_eq!(throttle.record_failure_at(now), Some(DEFAULT_LOCKOUT));
        assert_eq!(throttle.check_at(now), ThrottleDecision::Denied {
            retry_after: DEFAULT_LOCKOUT,
        });
    }

    #[test]
    fn retry_after_counts_down() {
        let mut throttle = UnlockThrottle::new(ThrottlePolicy {
            max_attempts: 1,
            lockout: Duration::from_secs(60),
        });
        let start = Instant::now();
        throttle.record_failure_at(start);

        assert_eq!(
            throttle.check_at(start + Duration::from_secs(45)),
            ThrottleDecision::Denied {
                retry_after: Duration::from_secs(15),
            }
        );
    }

    #[test]
    fn lockout_expiry_resets_counter() {
        let mut throttle = UnlockThrottle::default();
        let start = Instant::now();
        for _ in 0..DEFAULT_MAX_ATTEMPTS {
            throttle.record_failure_at(start);
        }

        let later = start + DEFAULT_LOCKOUT;
        assert_eq!(throttle.check_at(later), ThrottleDecision::Allowed);
        assert_eq!(throttle.failed_attempts(), 0);

        // A single failure after expiry does not re-lock.
        assert_eq!(throttle.record_failure_at(later), None);
        assert_eq!(throttle.check_at(later), ThrottleDecision::Allowed);
    }

    #[test]
    fn success_resets_counter() {
        let mut throttle = UnlockThrottle::default();
        let now = Instant::now();
        for _ in 0..DEFAULT_MAX_ATTEMPTS - 1 {
            throttle.record_failure_at(now);
        }
        throttle.record_success();
        assert_eq!(throttle.failed_attempts(), 0);

        for _ in 0..DEFAULT_MAX_ATTEMPTS - 1 {
            assert_eq!(throttle.record_failure_at(now), None);
        }
    }

    #[test]
    fn huge_lockout_does_not_overflow() {
        let mut throttle = UnlockThrottle::new(ThrottlePolicy {
            max_attempts: 1,
            lockout: Duration::MAX,
        });
        let now = Instant::now();

        assert_eq!(throttle.record_failure_at(now), Some(Duration::MAX));
        assert!(matches!(
            throttle.check_at(now + Duration::from_secs(3600)),
            ThrottleDecision::Denied { .. }
        ));
    }

    #[rstest]
    #[case::no_attempts(0, Duration::from_secs(60))]
    #[case::zero_lockout(5, Duration::ZERO)]
    #[case::too_long(5, MAX_LOCKOUT + Duration::from_secs(1))]
    #[case::unrepresentable(5, Duration::from_secs(u64::MAX))]
    fn policies_that_disable_the_throttle_are_rejected(
        #[case] max_attempts: u32,
        #[case] lockout: Duration,
    ) {
        let policy = ThrottlePolicy {
            max_attempts,
            lockout,
        };
        assert!(matches!(
            policy.validate(),
            Err(VaultError::InvalidThrottle(_))
        ));
    }

    #[test]
    fn default_policy_is_valid() {
        assert!(ThrottlePolicy::default().validate().is_ok());
        assert!(
            ThrottlePolicy {
                max_attempts: 1,
                lockout: MAX_LOCKOUT,
            }
            .validate()
            .is_ok()
        );
    }
}
