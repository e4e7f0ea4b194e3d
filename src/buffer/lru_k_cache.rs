use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use crate::common::{Result, StorageError, Timestamp};

/// Values stored in an `LruKCache` report whether they may be evicted.
pub trait Evictable {
    /// A pinned value is never chosen as an eviction victim.
    fn is_pinned(&self) -> bool;
}

/// A cached value with its access history
#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    /// Timestamps of the last k accesses (most recent at back)
    history: VecDeque<Timestamp>,
}

impl<V> CacheEntry<V> {
    fn new(value: V) -> Self {
        Self {
            value,
            history: VecDeque::new(),
        }
    }

    /// Records an access at the given timestamp, keeping only the last k
    fn record_access(&mut self, timestamp: Timestamp, k: usize) {
        self.history.push_back(timestamp);
        while self.history.len() > k {
            self.history.pop_front();
        }
    }

    /// Returns the backward k-distance, or None (+inf) with fewer than k accesses
    fn k_distance(&self, now: Timestamp, k: usize) -> Option<Timestamp> {
        if self.history.len() < k {
            None
        } else {
            Some(now - self.history[self.history.len() - k])
        }
    }

    fn earliest_timestamp(&self) -> Timestamp {
        self.history.front().copied().unwrap_or(0)
    }
}

/// LRU-K cache
///
/// Evicts the unpinned entry whose backward k-distance is the maximum of all
/// entries. Backward k-distance is the difference between the current
/// timestamp and the timestamp of the kth previous access.
///
/// An entry with fewer than k recorded accesses has +inf backward k-distance.
/// If several entries have +inf distance, the one with the earliest recorded
/// access goes first, which is plain LRU among them.
///
/// The cache is not synchronized. Owners wrap it in their own lock.
pub struct LruKCache<K, V> {
    /// K value for the LRU-K algorithm
    k: usize,
    /// Maximum number of entries
    capacity: usize,
    /// Logical clock, advanced on every recorded access
    current_timestamp: Timestamp,
    entries: HashMap<K, CacheEntry<V>>,
    hits: u64,
    misses: u64,
}

impl<K, V> LruKCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Evictable,
{
    /// Creates a new cache holding at most `capacity` entries.
    pub fn new(capacity: usize, k: usize) -> Self {
        Self {
            k: k.max(1),
            capacity,
            current_timestamp: 0,
            entries: HashMap::with_capacity(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Looks up `key`, recording an access on a hit.
    pub fn get(&mut self, key: &K) -> Option<&mut V> {
        let timestamp = self.tick();
        match self.entries.get_mut(key) {
            Some(entry) => {
                self.hits += 1;
                entry.record_access(timestamp, self.k);
                Some(&mut entry.value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Looks up `key` without recording an access or touching the counters.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    /// Like `peek`, with mutable access.
    pub fn peek_mut(&mut self, key: &K) -> Option<&mut V> {
        self.entries.get_mut(key).map(|entry| &mut entry.value)
    }

    /// Inserts or replaces `key` and records an access.
    ///
    /// Inserting a new key into a full cache evicts first; the evicted pair
    /// is returned. Fails with `CacheFull` if every entry is pinned.
    pub fn put(&mut self, key: K, value: V) -> Result<Option<(K, V)>> {
        let timestamp = self.tick();

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.value = value;
            entry.record_access(timestamp, self.k);
            return Ok(None);
        }

        let evicted = if self.entries.len() >= self.capacity {
            Some(self.evict().ok_or(StorageError::CacheFull)?)
        } else {
            None
        };

        let mut entry = CacheEntry::new(value);
        entry.record_access(timestamp, self.k);
        self.entries.insert(key, entry);

        Ok(evicted)
    }

    /// Removes and returns the unpinned entry with the largest backward
    /// k-distance. Returns None if every entry is pinned.
    pub fn evict(&mut self) -> Option<(K, V)> {
        let victim = self.find_victim()?;
        self.entries
            .remove(&victim)
            .map(|entry| (victim, entry.value))
    }

    /// Chooses the eviction victim without removing it.
    pub fn find_victim(&self) -> Option<K> {
        let now = self.current_timestamp;

        let mut victim: Option<&K> = None;
        let mut victim_k_dist: Option<Timestamp> = None;
        let mut victim_earliest_ts: Timestamp = 0;

        for (key, entry) in self.entries.iter() {
            if entry.value.is_pinned() {
                continue;
            }

            let k_dist = entry.k_distance(now, self.k);
            let earliest_ts = entry.earliest_timestamp();

            let should_replace = match (victim_k_dist, k_dist) {
                // current victim has +inf, candidate finite -> keep victim
                (None, Some(_)) => false,
                // current victim finite, candidate +inf -> replace
                (Some(_), None) => true,
                // both +inf -> earliest access loses
                (None, None) => earliest_ts < victim_earliest_ts,
                // both finite -> larger distance loses
                (Some(v_dist), Some(c_dist)) => c_dist > v_dist,
            };

            if victim.is_none() || should_replace {
                victim = Some(key);
                victim_k_dist = k_dist;
                victim_earliest_ts = earliest_ts;
            }
        }

        victim.cloned()
    }

    /// Removes `key` regardless of its pin state.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|entry| entry.value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the k value of this cache.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Drops every entry. Hit and miss counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Removes every entry and returns them.
    pub fn drain(&mut self) -> impl Iterator<Item = (K, V)> + '_ {
        self.entries.drain().map(|(key, entry)| (key, entry.value))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values().map(|entry| &entry.value)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.values_mut().map(|entry| &mut entry.value)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> {
        self.entries
            .iter_mut()
            .map(|(key, entry)| (key, &mut entry.value))
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Percentage of lookups that hit, or 0 before any lookup.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64 * 100.0
        }
    }

    fn tick(&mut self) -> Timestamp {
        self.current_timestamp += 1;
        self.current_timestamp
    }
}
