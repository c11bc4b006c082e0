//! Replay cache for assertion identifiers (`jti`).
//!
//! An entry lives until the assertion's own `exp`. Expired entries are
//! treated as absent on lookup; [`ReplayCache::purge_expired`] only reclaims
//! memory.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReplayCacheError {
    #[error("Replay cache is full ({0} entries)")]
    CapacityExceeded(usize),

    #[error("Replay cache backend unavailable: {0}")]
    Unavailable(String),
}

/// Store of assertion identifiers already accepted.
pub trait ReplayCache: Send + Sync {
    /// Record `jti` unless an unexpired entry for it exists.
    ///
    /// Returns `Ok(true)` if this call recorded the identifier. The check and
    /// the insert are one atomic step: of any number of concurrent calls for
    /// the same `jti`, at most one returns `Ok(true)`.
    fn remember_if_unseen(
        &self,
        jti: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, ReplayCacheError>;

    /// Whether an unexpired entry for `jti` exists.
    fn is_known(&self, jti: &str, now: DateTime<Utc>) -> bool;

    /// Drop entries that expired at or before `now`. Returns how many.
    fn purge_expired(&self, now: DateTime<Utc>) -> usize;
}

/// Process-local replay cache backed by a sharded concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryReplayCache {
    entries: DashMap<String, DateTime<Utc>>,
    max_entries: Option<usize>,
}

impl InMemoryReplayCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of live entries. When full, inserts fail (and the
    /// assertion is rejected) until expired entries are purged.
    ///
    /// This is a soft cap: the size check is not taken under the entry lock,
    /// so concurrent inserts of distinct ids can overshoot it slightly.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: Some(max_entries),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn ensure_capacity(&self, now: DateTime<Utc>) -> Result<(), ReplayCacheError> {
        let Some(max) = self.max_entries else {
            return Ok(());
        };

        if self.entries.len() < max {
            return Ok(());
        }

        self.purge_expired(now);
        if self.entries.len() < max {
            Ok(())
        } else {
            Err(ReplayCacheError::CapacityExceeded(max))
        }
    }
}

impl ReplayCache for InMemoryReplayCache {
    fn remember_if_unseen(
        &self,
        jti: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, ReplayCacheError> {
        // Capacity is checked outside the shard lock; purging takes locks too.
        if !self.entries.contains_key(jti) {
            self.ensure_capacity(now)?;
        }

        match self.entries.entry(jti.to_string()) {
            Entry::Occupied(mut occupied) => {
                if *occupied.get() > now {
                    return Ok(false);
                }
                occupied.insert(expires_at);
                Ok(true)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(expires_at);
                Ok(true)
            }
        }
    }

    fn is_known(&self, jti: &str, now: DateTime<Utc>) -> bool {
        self.entries
            .get(jti)
            .is_some_and(|expires_at| *expires_at > now)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| *expires_at > now);
        before.saturating_sub(self.entries.len())
    }
}
