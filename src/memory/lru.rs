//! Bounded keyed cache with least-recently-used eviction.
//!
//! This is the single eviction primitive shared by every bounded
//! collection in Threadkeeper: conversation history, name resolution,
//! and user preferences all wrap an [`LruCache`] instead of keeping
//! their own ad hoc trimming loops.
//!
//! Recency is tracked with a monotonically increasing touch counter
//! stamped on every `get` and `put`. Eviction removes the entry with
//! the lowest stamp; because the counter never repeats, insertion
//! order is the natural tie-break.
//!
//! The cache does no I/O and never suspends — callers that share one
//! across tasks wrap it in a `tokio::sync::Mutex`.

use std::collections::HashMap;
use std::hash::Hash;

// ── Cache entry ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Slot<V> {
    value: V,
    /// Touch stamp — higher means more recently used.
    touched: u64,
}

// ── LruCache ─────────────────────────────────────────────────────

/// Fixed-capacity map that evicts the least-recently-used key on overflow.
///
/// `get` and `put` both count as a touch; `peek` does not.
#[derive(Debug)]
pub struct LruCache<K, V> {
    capacity: usize,
    clock: u64,
    entries: HashMap<K, Slot<V>>,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    /// Create a cache holding at most `capacity` entries.
    ///
    /// A zero capacity is clamped to 1 so `put` always succeeds.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            clock: 0,
            entries: HashMap::new(),
        }
    }

    /// Maximum number of entries this cache will hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Look up a key and mark it most-recently-used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.clock += 1;
        let clock = self.clock;
        self.entries.get_mut(key).map(|slot| {
            slot.touched = clock;
            &slot.value
        })
    }

    /// Mutable lookup — also a touch.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.clock += 1;
        let clock = self.clock;
        self.entries.get_mut(key).map(|slot| {
            slot.touched = clock;
            &mut slot.value
        })
    }

    /// Look up a key without affecting recency.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|slot| &slot.value)
    }

    /// Insert or replace a value, marking the key most-recently-used.
    ///
    /// Returns the evicted `(key, value)` pair when the insert pushed the
    /// cache over capacity. Replacing an existing key never evicts.
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        self.clock += 1;
        let stamp = self.clock;

        if let Some(slot) = self.entries.get_mut(&key) {
            slot.value = value;
            slot.touched = stamp;
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.pop_lru()
        } else {
            None
        };

        self.entries.insert(
            key,
            Slot {
                value,
                touched: stamp,
            },
        );

        evicted
    }

    /// Remove a key, returning its value if present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|slot| slot.value)
    }

    /// Iterate over keys in arbitrary order (no touch).
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// Iterate over `(key, value)` pairs in arbitrary order (no touch).
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, slot)| (k, &slot.value))
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Remove and return the least-recently-touched entry.
    fn pop_lru(&mut self) -> Option<(K, V)> {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, slot)| slot.touched)
            .map(|(k, _)| k.clone())?;
        let slot = self.entries.remove(&oldest)?;
        Some((oldest, slot.value))
    }
}

// ── Tests ────────────────────────────────────────────────────────
