// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    borrow::Borrow,
    collections::{BTreeMap, HashMap},
    hash::Hash,
};

use melodex_core::MemoryTierStatistics;

#[derive(Debug)]
struct Entry<V> {
    value: V,
    weight: u64,
    tick: u64,
}

/// A least-recently-used cache that is bounded by the sum of entry weights.
///
/// Bounding by the number of entries is achieved by assigning a
/// weight of 1 to all entries.
#[derive(Debug)]
pub struct WeightedLru<K, V> {
    capacity: u64,
    total_weight: u64,
    entries: HashMap<K, Entry<V>>,
    /// Keys ordered by the tick of their last access, oldest first.
    recency: BTreeMap<u64, K>,
    next_tick: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<K, V> WeightedLru<K, V>
where
    K: Eq + Hash + Clone,
{
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            total_weight: 0,
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            next_tick: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> u64 {
        self.capacity
    }

    #[must_use]
    pub const fn total_weight(&self) -> u64 {
        self.total_weight
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn next_tick(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    /// Insert or replace an entry.
    ///
    /// Entries that are heavier than the capacity are rejected and
    /// any existing entry for the key is removed. Returns `false` if
    /// the entry has been rejected.
    pub fn insert(&mut self, key: K, value: V, weight: u64) -> bool {
        self.remove(&key);
        if weight > self.capacity {
            return false;
        }
        while self.total_weight + weight > self.capacity {
            if !self.evict_least_recently_used() {
                break;
            }
        }
        let tick = self.next_tick();
        self.recency.insert(tick, key.clone());
        self.entries.insert(
            key,
            Entry {
                value,
                weight,
                tick,
            },
        );
        self.total_weight += weight;
        true
    }

    fn evict_least_recently_used(&mut self) -> bool {
        let Some((_, key)) = self.recency.pop_first() else {
            return false;
        };
        if let Some(entry) = self.entries.remove(&key) {
            self.total_weight -= entry.weight;
            self.evictions += 1;
        }
        true
    }

    /// Look up an entry and mark it as most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let tick = self.next_tick();
        let Some(entry) = self.entries.get_mut(key) else {
            self.misses += 1;
            return None;
        };
        self.hits += 1;
        if let Some(key) = self.recency.remove(&entry.tick) {
            self.recency.insert(tick, key);
        }
        entry.tick = tick;
        Some(&entry.value)
    }

    /// Look up an entry without affecting the recency order or statistics.
    #[must_use]
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.get(key).map(|entry| &entry.value)
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.tick);
        self.total_weight -= entry.weight;
        Some(entry.value)
    }

    /// Keep only the entries that match the predicate.
    ///
    /// Returns the number of removed entries.
    pub fn retain(&mut self, mut predicate: impl FnMut(&K, &V) -> bool) -> usize {
        let len_before = self.entries.len();
        let recency = &mut self.recency;
        let total_weight = &mut self.total_weight;
        self.entries.retain(|key, entry| {
            if predicate(key, &entry.value) {
                return true;
            }
            recency.remove(&entry.tick);
            *total_weight -= entry.weight;
            false
        });
        len_before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
        self.total_weight = 0;
    }

    /// All values, least recently used first.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.recency
            .values()
            .filter_map(|key| self.entries.get(key))
            .map(|entry| &entry.value)
    }

    #[must_use]
    pub fn statistics(&self) -> MemoryTierStatistics {
        let Self {
            capacity,
            total_weight,
            entries,
            recency: _,
            next_tick: _,
            hits,
            misses,
            evictions,
        } = self;
        MemoryTierStatistics {
            entries: entries.len(),
            weight: *total_weight,
            capacity: *capacity,
            hits: *hits,
            misses: *misses,
            evictions: *evictions,
        }
    }
}
