//! Integration tests for the LRU-K cache

use litestore::buffer::{Evictable, LruKCache};
use litestore::common::StorageError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Default)]
struct Entry {
    pinned: bool,
}

impl Evictable for Entry {
    fn is_pinned(&self) -> bool {
        self.pinned
    }
}

fn unpinned() -> Entry {
    Entry::default()
}

#[test]
fn test_lru_k_size_never_exceeds_capacity() {
    let mut rng = StdRng::seed_from_u64(7);

    for capacity in [1, 3, 8] {
        let mut cache: LruKCache<u32, Entry> = LruKCache::new(capacity, 2);
        for _ in 0..2_000 {
            let key = rng.gen_range(0..24);
            match rng.gen_range(0..10) {
                0..=5 => {
                    cache.put(key, unpinned()).unwrap();
                }
                6..=8 => {
                    cache.get(&key);
                }
                _ => {
                    cache.remove(&key);
                }
            }
            assert!(cache.len() <= capacity);
        }
    }
}

#[test]
fn test_lru_k_prefers_entries_with_fewer_than_k_accesses() {
    let mut cache: LruKCache<&str, Entry> = LruKCache::new(3, 2);

    // "hot" reaches K accesses early; "cold" is touched once, later
    cache.put("hot", unpinned()).unwrap();
    cache.get(&"hot");
    cache.put("warm", unpinned()).unwrap();
    cache.get(&"warm");
    cache.put("cold", unpinned()).unwrap();

    // cold has +inf distance and goes first even though it is the newest
    let evicted = cache.put("new", unpinned()).unwrap().map(|(k, _)| k);
    assert_eq!(evicted, Some("cold"));

    // among finite distances the larger one goes: hot was accessed longest ago
    cache.get(&"new");
    let evicted = cache.put("newer", unpinned()).unwrap().map(|(k, _)| k);
    assert_eq!(evicted, Some("hot"));
    assert!(cache.contains(&"warm"));
    assert!(cache.contains(&"new"));
}

#[test]
fn test_lru_k_constructed_access_sequence() {
    // K = 3: a, b, c accessed as a b c a b a c
    let mut cache: LruKCache<char, Entry> = LruKCache::new(3, 3);
    cache.put('a', unpinned()).unwrap();
    cache.put('b', unpinned()).unwrap();
    cache.put('c', unpinned()).unwrap();
    cache.get(&'a');
    cache.get(&'b');
    cache.get(&'a');
    cache.get(&'c');

    // a has 3 accesses; b and c have 2 (+inf), b's earliest is older
    assert_eq!(cache.find_victim(), Some('b'));
    cache.get(&'b');
    // now a and b have finite distances; c alone is +inf
    assert_eq!(cache.find_victim(), Some('c'));
}

#[test]
fn test_lru_k_all_pinned_is_full() {
    let mut cache: LruKCache<u32, Entry> = LruKCache::new(2, 2);
    cache.put(1, Entry { pinned: true }).unwrap();
    cache.put(2, Entry { pinned: true }).unwrap();

    assert!(matches!(
        cache.put(3, unpinned()),
        Err(StorageError::CacheFull)
    ));
    assert_eq!(cache.len(), 2);
    assert!(!cache.contains(&3));

    // unpinning one makes room
    cache.peek_mut(&2).unwrap().pinned = false;
    let evicted = cache.put(3, unpinned()).unwrap().map(|(k, _)| k);
    assert_eq!(evicted, Some(2));
}

#[test]
fn test_lru_k_hit_ratio() {
    let mut cache: LruKCache<u32, Entry> = LruKCache::new(4, 2);
    assert_eq!(cache.hit_ratio(), 0.0);

    cache.put(1, unpinned()).unwrap();
    cache.get(&1);
    cache.get(&1);
    cache.get(&1);
    cache.get(&2);
    assert_eq!(cache.hits(), 3);
    assert_eq!(cache.misses(), 1);
    assert!((cache.hit_ratio() - 75.0).abs() < f64::EPSILON);
}
