//! Login lockout bookkeeping per source address.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use rantboard_core::{AppError, AppResult};
use rantboard_domain::{LockoutPolicy, LoginAttemptRecord};

use crate::Clock;

type RecordMap = HashMap<String, LoginAttemptRecord>;

/// Result of recording a failed credential check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// The source may try again.
    Remaining {
        /// Attempts left before the source is locked.
        remaining_attempts: u32,
    },
    /// The source is locked out.
    Locked {
        /// When the lock expires.
        locked_until: DateTime<Utc>,
        /// Whether this failure set the lock, as opposed to finding the
        /// source already locked.
        newly_locked: bool,
    },
}

/// Diagnostic snapshot of tracked login sources.
#[derive(Debug, Clone, Serialize)]
pub struct LockoutStats {
    /// Number of sources with failure history.
    pub total_records: usize,
    /// Records ordered by source.
    pub records: Vec<LockoutRecordSnapshot>,
}

/// One source in a [`LockoutStats`] snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct LockoutRecordSnapshot {
    /// Source address.
    pub source: String,
    /// Consecutive failures.
    pub failure_count: u32,
    /// Most recent failure.
    pub last_attempt_at: DateTime<Utc>,
    /// Active lock expiry, if locked.
    pub locked_until: Option<DateTime<Utc>>,
}

/// Tracks consecutive login failures per source and locks sources that
/// reach the policy threshold.
///
/// Clones share the same state.
#[derive(Clone)]
pub struct LoginLockoutTracker {
    policy: LockoutPolicy,
    clock: Arc<dyn Clock>,
    records: Arc<Mutex<RecordMap>>,
}

impl LoginLockoutTracker {
    /// Creates a tracker with no history.
    #[must_use]
    pub fn new(policy: LockoutPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the configured policy.
    #[must_use]
    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    /// Returns the lock expiry if `source` is currently locked.
    pub fn active_lock(&self, source: &str) -> AppResult<Option<DateTime<Utc>>> {
        let now = self.clock.now();
        Ok(self
            .lock_records()?
            .get(source)
            .and_then(|record| record.active_lock(now)))
    }

    /// Records a failed credential check for `source`.
    pub fn record_failure(&self, source: &str) -> AppResult<FailureOutcome> {
        let now = self.clock.now();
        let mut records = self.lock_records()?;

        let previous = records.get(source);
        let already_locked = previous.and_then(|record| record.active_lock(now)).is_some();
        let record = LoginAttemptRecord::register_failure(previous, now, &self.policy);
        let outcome = match record.active_lock(now) {
            Some(locked_until) => FailureOutcome::Locked {
                locked_until,
                newly_locked: !already_locked,
            },
            None => FailureOutcome::Remaining {
                remaining_attempts: record.remaining_attempts(&self.policy),
            },
        };
        let failure_count = record.failure_count();
        records.insert(source.to_owned(), record);
        drop(records);

        match outcome {
            FailureOutcome::Locked {
                locked_until,
                newly_locked: true,
            } => warn!(
                source,
                failure_count,
                %locked_until,
                "login source locked out"
            ),
            FailureOutcome::Locked {
                locked_until,
                newly_locked: false,
            } => warn!(
                source,
                %locked_until,
                "failed login attempt against locked source"
            ),
            FailureOutcome::Remaining { remaining_attempts } => warn!(
                source,
                failure_count,
                remaining_attempts,
                "failed login attempt"
            ),
        }

        Ok(outcome)
    }

    /// Clears the history of `source` after a successful credential check.
    ///
    /// If a concurrent failure locked the source in the meantime the lock
    /// wins: the record is kept and its expiry returned.
    pub fn record_success(&self, source: &str) -> AppResult<Option<DateTime<Utc>>> {
        let now = self.clock.now();
        let mut records = self.lock_records()?;

        if let Some(locked_until) = records.get(source).and_then(|record| record.active_lock(now))
        {
            return Ok(Some(locked_until));
        }

        records.remove(source);
        Ok(None)
    }

    /// Drops the record of `source`, lifting any lock. Returns whether one
    /// existed.
    pub fn clear(&self, source: &str) -> AppResult<bool> {
        let removed = self.lock_records()?.remove(source).is_some();
        if removed {
            info!(source, "login lockout record cleared");
        }

        Ok(removed)
    }

    /// Drops every record, lifting all locks. Returns how many were removed.
    pub fn clear_all(&self) -> AppResult<usize> {
        let mut records = self.lock_records()?;
        let removed = records.len();
        records.clear();
        info!(removed, "login lockout records cleared");
        Ok(removed)
    }

    /// Returns sources with failure history. Records whose lock has expired
    /// read as clean and are left out.
    pub fn stats(&self) -> AppResult<LockoutStats> {
        let now = self.clock.now();
        let records = self.lock_records()?;

        let mut snapshots: Vec<LockoutRecordSnapshot> = records
            .iter()
            .filter(|(_, record)| !record.is_reclaimable(now))
            .map(|(source, record)| LockoutRecordSnapshot {
                source: source.clone(),
                failure_count: record.failure_count(),
                last_attempt_at: record.last_attempt_at(),
                locked_until: record.active_lock(now),
            })
            .collect();
        drop(records);

        snapshots.sort_by(|left, right| left.source.cmp(&right.source));

        Ok(LockoutStats {
            total_records: snapshots.len(),
            records: snapshots,
        })
    }

    /// Removes records whose lock has expired. Intended for periodic cleanup.
    pub fn sweep_expired(&self) -> AppResult<usize> {
        let now = self.clock.now();
        let mut records = self.lock_records()?;
        let before = records.len();
        records.retain(|_, record| !record.is_reclaimable(now));
        Ok(before - records.len())
    }

    fn lock_records(&self) -> AppResult<MutexGuard<'_, RecordMap>> {
        self.records
            .lock()
            .map_err(|error| AppError::Internal(format!("lockout state is poisoned: {error}")))
    }
}
