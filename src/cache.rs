//! TTL-aware record cache.
//!
//! Every record observed in any response section lands here, keyed by
//! `(host, type)`. Expiry is lazy: entries whose deadline has passed are
//! dropped whenever their key is read, and the diagnostic iteration purges
//! the whole map as it walks. There is no capacity bound; the working set of
//! a lookup client is bounded by query volume.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::record::{RecordKey, ResourceRecord};

#[derive(Debug, Clone)]
struct CachedRecord {
    record: ResourceRecord,
    expires_at: Instant,
}

impl CachedRecord {
    fn live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Shared record store.
///
/// Clones share the same underlying map, so the resolver and the shell can
/// each hold a handle. Mutation is serialized by a single lock; contention is
/// negligible since resolution runs one query at a time.
#[derive(Clone, Default)]
pub struct RecordCache {
    inner: Arc<Mutex<HashMap<RecordKey, Vec<CachedRecord>>>>,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live records for `key`, purging any that have expired.
    pub fn lookup(&self, key: &RecordKey) -> HashSet<ResourceRecord> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let Some(entries) = inner.get_mut(key) else {
            return HashSet::new();
        };
        entries.retain(|entry| entry.live(now));
        let records = entries
            .iter()
            .map(|entry| entry.record.clone())
            .collect::<HashSet<_>>();
        if entries.is_empty() {
            inner.remove(key);
        }
        records
    }

    /// Store one record, expiring `ttl` seconds from now.
    ///
    /// Re-inserting a record that is already present keeps the later of the
    /// two deadlines, so repeats across responses are deduplicated.
    pub fn insert(&self, record: ResourceRecord) {
        let expires_at = Instant::now() + Duration::from_secs(u64::from(record.ttl));
        let mut inner = self.inner.lock();
        let entries = inner.entry(record.key()).or_default();
        match entries.iter_mut().find(|entry| entry.record == record) {
            Some(entry) => entry.expires_at = entry.expires_at.max(expires_at),
            None => entries.push(CachedRecord { record, expires_at }),
        }
    }

    /// Snapshot of every live entry, purging expired ones as it walks.
    ///
    /// Sorted by host then type code so `dump` output is stable.
    pub fn entries(&self) -> Vec<(RecordKey, Vec<ResourceRecord>)> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        inner.retain(|_, entries| {
            entries.retain(|entry| entry.live(now));
            !entries.is_empty()
        });
        let mut snapshot: Vec<(RecordKey, Vec<ResourceRecord>)> = inner
            .iter()
            .map(|(key, entries)| {
                (
                    key.clone(),
                    entries.iter().map(|entry| entry.record.clone()).collect(),
                )
            })
            .collect();
        snapshot.sort_by(|a, b| {
            (a.0.host.as_str(), a.0.rtype.code()).cmp(&(b.0.host.as_str(), b.0.rtype.code()))
        });
        snapshot
    }

    /// Number of live records across all keys.
    pub fn record_count(&self) -> usize {
        let now = Instant::now();
        self.inner
            .lock()
            .values()
            .map(|entries| entries.iter().filter(|entry| entry.live(now)).count())
            .sum()
    }
}
