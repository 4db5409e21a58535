//! Per-source login lockout state machine.
//!
//! A source moves `Clean -> Failing(n) -> Locked(until)` on consecutive
//! failures. The failure that reaches the threshold also sets the lock.
//! Locks expire lazily: once `now >= until` the record reads as `Clean`.

use chrono::{DateTime, TimeDelta, Utc};
use rantboard_core::{AppError, AppResult};

/// Threshold and duration of login lockouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    max_attempts: u32,
    lockout_duration: TimeDelta,
}

impl LockoutPolicy {
    /// Creates a validated lockout policy.
    pub fn new(max_attempts: u32, lockout_duration: TimeDelta) -> AppResult<Self> {
        if max_attempts == 0 {
            return Err(AppError::Validation(
                "login max attempts must be greater than zero".to_owned(),
            ));
        }

        if lockout_duration <= TimeDelta::zero() {
            return Err(AppError::Validation(
                "login lockout duration must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            max_attempts,
            lockout_duration,
        })
    }

    /// Consecutive failures that trigger a lock.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// How long a lock lasts.
    #[must_use]
    pub fn lockout_duration(&self) -> TimeDelta {
        self.lockout_duration
    }
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            lockout_duration: TimeDelta::hours(24),
        }
    }
}

/// Observable lockout state of a login source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutState {
    /// No failures since the last success or expired lock.
    Clean,
    /// Consecutive failures below the threshold.
    Failing(u32),
    /// Logins are rejected without checking credentials.
    Locked(DateTime<Utc>),
}

/// Failure history of one login source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAttemptRecord {
    failure_count: u32,
    last_attempt_at: DateTime<Utc>,
    locked_until: Option<DateTime<Utc>>,
}

impl LoginAttemptRecord {
    /// Applies one failed credential check to an optional previous record.
    ///
    /// A record that is still locked comes back unchanged: locked sources
    /// never reach credential verification, so they never count failures.
    #[must_use]
    pub fn register_failure(
        previous: Option<&Self>,
        now: DateTime<Utc>,
        policy: &LockoutPolicy,
    ) -> Self {
        let previous_state = previous.map(|record| record.state(now));

        if let (Some(record), Some(LockoutState::Locked(_))) = (previous, previous_state) {
            return record.clone();
        }

        let failure_count = match previous_state {
            Some(LockoutState::Failing(count)) => count.saturating_add(1),
            _ => 1,
        };

        let locked_until =
            (failure_count >= policy.max_attempts()).then(|| now + policy.lockout_duration());

        Self {
            failure_count,
            last_attempt_at: now,
            locked_until,
        }
    }

    /// Reads the state of this record at `now`.
    #[must_use]
    pub fn state(&self, now: DateTime<Utc>) -> LockoutState {
        match self.locked_until {
            Some(until) if now < until => LockoutState::Locked(until),
            Some(_) => LockoutState::Clean,
            None if self.failure_count == 0 => LockoutState::Clean,
            None => LockoutState::Failing(self.failure_count),
        }
    }

    /// Returns the lock expiry while the lock is active.
    #[must_use]
    pub fn active_lock(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.state(now) {
            LockoutState::Locked(until) => Some(until),
            LockoutState::Clean | LockoutState::Failing(_) => None,
        }
    }

    /// Attempts left before the next failure locks the source.
    #[must_use]
    pub fn remaining_attempts(&self, policy: &LockoutPolicy) -> u32 {
        policy.max_attempts().saturating_sub(self.failure_count)
    }

    /// Whether a sweep may drop this record without changing behaviour.
    #[must_use]
    pub fn is_reclaimable(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until <= now)
    }

    /// Consecutive failures recorded.
    #[must_use]
    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    /// Time of the most recent failure.
    #[must_use]
    pub fn last_attempt_at(&self) -> DateTime<Utc> {
        self.last_attempt_at
    }

    /// Lock expiry, including an already elapsed one.
    #[must_use]
    pub fn locked_until(&self) -> Option<DateTime<Utc>> {
        self.locked_until
    }
}
