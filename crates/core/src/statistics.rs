// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryTierStatistics {
    pub entries: usize,

    /// Sum of the weights of all entries.
    pub weight: u64,

    pub capacity: u64,

    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl MemoryTierStatistics {
    /// Fraction of lookups that have been served from the cache.
    #[must_use]
    pub fn hit_ratio(&self) -> Option<f64> {
        let lookups = self.hits + self.misses;
        (lookups > 0).then(|| self.hits as f64 / lookups as f64)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskTierStatistics {
    pub files: usize,
    pub bytes: u64,
    pub capacity_bytes: u64,
}

impl DiskTierStatistics {
    #[must_use]
    pub const fn exceeds_capacity(&self) -> bool {
        self.bytes > self.capacity_bytes
    }
}

/// A snapshot of all cache tiers, computed on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStatistics {
    pub tracks: MemoryTierStatistics,
    pub artwork_refs: MemoryTierStatistics,
    pub search_results: MemoryTierStatistics,
    pub disk: DiskTierStatistics,

    /// Number of tracks that are marked as failed.
    pub negative_marks: usize,

    pub in_flight_requests: usize,

    /// Total number of extraction attempts across all strategies.
    pub extraction_attempts: u64,
}
