//! Submission rate limiting.
//!
//! Implements a fixed-window counter per [`RateLimitKey`] held in process
//! memory. Anonymous and authenticated callers get separate allowances;
//! every endpoint class is an independent quota because the key carries it.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use rantboard_core::{AppError, AppResult};
use rantboard_domain::{RateLimitDecision, RateLimitEntry, RateLimitKey, RateLimitPolicy};

use crate::Clock;


type EntryMap = HashMap<RateLimitKey, RateLimitEntry>;

/// Diagnostic snapshot of the limiter state.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStats {
    /// Number of live buckets.
    pub total_entries: usize,
    /// Live buckets ordered by identifier.
    pub entries: Vec<RateLimitEntrySnapshot>,
}

/// One live bucket in a [`RateLimitStats`] snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitEntrySnapshot {
    /// Display form of the bucket key, e.g. `comment:user:42`.
    pub identifier: String,
    /// Accepted requests in the current window.
    pub count: u32,
    /// When the window closes.
    pub reset_at: DateTime<Utc>,
}

/// Application service for submission rate limiting.
///
/// Clones share the same state. All access goes through one mutex, held
/// only for a map lookup and a few comparisons.
#[derive(Clone)]
pub struct RateLimitService {
    policy: RateLimitPolicy,
    clock: Arc<dyn Clock>,
    entries: Arc<Mutex<EntryMap>>,
}

impl RateLimitService {
    /// Creates a rate limiter with an empty bucket map.
    #[must_use]
    pub fn new(policy: RateLimitPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the configured policy.
    #[must_use]
    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Counts a request against the bucket for `key`.
    ///
    /// A missing or expired bucket opens a fresh window. Over-quota requests
    /// are reported as [`RateLimitDecision::Denied`], never as an error; only
    /// a poisoned lock fails.
    pub fn check(&self, key: &RateLimitKey) -> AppResult<RateLimitDecision> {
        let now = self.clock.now();
        let limit = self.policy.max_for(key.caller());
        let mut entries = self.lock_entries()?;

        let decision = match entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) if !occupied.get().is_expired(now) => {
                occupied.get_mut().admit(limit)
            }
            Entry::Occupied(mut occupied) => {
                occupied.insert(RateLimitEntry::open(now, &self.policy));
                RateLimitDecision::Allowed
            }
            Entry::Vacant(vacant) => {
                vacant.insert(RateLimitEntry::open(now, &self.policy));
                RateLimitDecision::Allowed
            }
        };

        match decision {
            RateLimitDecision::Allowed => debug!(identifier = %key, "rate limit check passed"),
            RateLimitDecision::Denied { reset_at } => warn!(
                identifier = %key,
                limit,
                %reset_at,
                "rate limit exceeded"
            ),
        }

        Ok(decision)
    }

    /// Drops the bucket for `key`. Returns whether one existed.
    pub fn reset(&self, key: &RateLimitKey) -> AppResult<bool> {
        let removed = self.lock_entries()?.remove(key).is_some();
        if removed {
            info!(identifier = %key, "rate limit bucket reset");
        }

        Ok(removed)
    }

    /// Drops every bucket. Returns how many were removed.
    pub fn clear_all(&self) -> AppResult<usize> {
        let mut entries = self.lock_entries()?;
        let removed = entries.len();
        entries.clear();
        info!(removed, "rate limit buckets cleared");
        Ok(removed)
    }

    /// Returns the live buckets. Expired buckets that have not been swept
    /// yet are left out, matching how [`Self::check`] treats them.
    pub fn stats(&self) -> AppResult<RateLimitStats> {
        let now = self.clock.now();
        let entries = self.lock_entries()?;

        let mut snapshots: Vec<RateLimitEntrySnapshot> = entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, entry)| RateLimitEntrySnapshot {
                identifier: key.to_string(),
                count: entry.count(),
                reset_at: entry.window_reset_at(),
            })
            .collect();
        drop(entries);

        snapshots.sort_by(|left, right| left.identifier.cmp(&right.identifier));

        Ok(RateLimitStats {
            total_entries: snapshots.len(),
            entries: snapshots,
        })
    }

    /// Removes expired buckets. Intended for periodic cleanup.
    pub fn sweep_expired(&self) -> AppResult<usize> {
        let now = self.clock.now();
        let mut entries = self.lock_entries()?;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok(before - entries.len())
    }

    fn lock_entries(&self) -> AppResult<MutexGuard<'_, EntryMap>> {
        self.entries
            .lock()
            .map_err(|error| AppError::Internal(format!("rate limit state is poisoned: {error}")))
    }
}
