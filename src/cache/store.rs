//! Keyed in-memory storage of fetched payloads
//!
//! One `CachePartitionStore` is owned by one controller instance. Entries are
//! replaced wholesale by `put` and invalidated by `clear`; nothing else mutates
//! them, and callers only ever receive shared references.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use super::fingerprint::{fingerprint, Fingerprint};
use super::policy::FreshnessPolicy;
use crate::fetch::Payload;
use crate::partition::PartitionKey;

/// A cached payload and the metadata needed to judge its freshness
#[derive(Debug, Clone)]
pub struct CacheEntry<P> {
    payload: P,
    fetched_at: Instant,
    fingerprint: Fingerprint,
    invalidated: bool,
}

impl<P> CacheEntry<P> {
    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Whether the entry was explicitly invalidated with `clear`
    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }
}

/// Partitioned cache with TTL validity per partition class
#[derive(Debug)]
pub struct CachePartitionStore<P> {
    entries: HashMap<PartitionKey, CacheEntry<P>>,
    policy: FreshnessPolicy,
}

impl<P: Payload> CachePartitionStore<P> {
    pub fn new(policy: FreshnessPolicy) -> Self {
        Self {
            entries: HashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> &FreshnessPolicy {
        &self.policy
    }

    pub fn get(&self, key: &PartitionKey) -> Option<&CacheEntry<P>> {
        self.entries.get(key)
    }

    /// Returns true if an entry exists, was not invalidated, and is younger than its TTL
    pub fn is_valid(&self, key: &PartitionKey, now: Instant) -> bool {
        match self.entries.get(key) {
            Some(entry) if !entry.invalidated => {
                now.saturating_duration_since(entry.fetched_at) < self.policy.ttl_for(key)
            }
            _ => false,
        }
    }

    /// Age of the entry at `now`, if one exists
    pub fn age(&self, key: &PartitionKey, now: Instant) -> Option<Duration> {
        self.entries
            .get(key)
            .map(|entry| now.saturating_duration_since(entry.fetched_at))
    }

    /// Replaces the entry for `key` and reports whether its fingerprint changed
    ///
    /// A key seen for the first time always counts as changed.
    pub fn put(&mut self, key: PartitionKey, payload: P, now: Instant) -> bool {
        let fingerprint = fingerprint(&payload);
        let changed = self
            .entries
            .get(&key)
            .map_or(true, |previous| previous.fingerprint != fingerprint);

        self.entries.insert(
            key,
            CacheEntry {
                payload,
                fetched_at: now,
                fingerprint,
                invalidated: false,
            },
        );
        changed
    }

    /// Invalidates the entry so the next foreground fetch goes to the network
    ///
    /// The payload is kept as a stale-on-error fallback. Returns false if there
    /// was nothing to invalidate.
    pub fn clear(&mut self, key: &PartitionKey) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.invalidated = true;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
