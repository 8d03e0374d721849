// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use melodex_core::{CacheStatistics, CachedArtworkRef, MediaId, TrackRecord};

use crate::WeightedLru;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheManagerConfig {
    /// Maximum number of cached tracks.
    pub track_capacity: u64,

    /// Maximum total file size of all referenced artwork images.
    pub artwork_ref_capacity_bytes: u64,

    /// Maximum number of cached search queries.
    pub search_result_capacity: u64,
}

pub const DEFAULT_TRACK_CAPACITY: u64 = 100_000;

pub const DEFAULT_ARTWORK_REF_CAPACITY_BYTES: u64 = 32 * 1024 * 1024;

pub const DEFAULT_SEARCH_RESULT_CAPACITY: u64 = 64;

impl Default for CacheManagerConfig {
    fn default() -> Self {
        Self {
            track_capacity: DEFAULT_TRACK_CAPACITY,
            artwork_ref_capacity_bytes: DEFAULT_ARTWORK_REF_CAPACITY_BYTES,
            search_result_capacity: DEFAULT_SEARCH_RESULT_CAPACITY,
        }
    }
}

pub type SearchResults = Arc<[TrackRecord]>;

/// Normalized key of a search query.
#[must_use]
pub fn search_query_key(query: &str) -> String {
    query.trim().to_lowercase()
}

fn lock_tier<T>(tier: &Mutex<T>) -> MutexGuard<'_, T> {
    tier.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Memory tiers for tracks, artwork references, and search results.
///
/// Each tier is protected by its own lock. No operation locks more
/// than a single tier at a time.
#[derive(Debug)]
pub struct CacheManager {
    tracks: Mutex<WeightedLru<MediaId, TrackRecord>>,
    artwork_refs: Mutex<WeightedLru<MediaId, CachedArtworkRef>>,
    search_results: Mutex<WeightedLru<String, SearchResults>>,
}

impl CacheManager {
    #[must_use]
    pub fn new(config: &CacheManagerConfig) -> Self {
        let CacheManagerConfig {
            track_capacity,
            artwork_ref_capacity_bytes,
            search_result_capacity,
        } = config;
        Self {
            tracks: Mutex::new(WeightedLru::new(*track_capacity)),
            artwork_refs: Mutex::new(WeightedLru::new(*artwork_ref_capacity_bytes)),
            search_results: Mutex::new(WeightedLru::new(*search_result_capacity)),
        }
    }

    pub fn cache_track(&self, track: TrackRecord) {
        lock_tier(&self.tracks).insert(track.media_id.clone(), track, 1);
    }

    pub fn cache_tracks(&self, tracks: impl IntoIterator<Item = TrackRecord>) {
        let mut tier = lock_tier(&self.tracks);
        for track in tracks {
            tier.insert(track.media_id.clone(), track, 1);
        }
    }

    #[must_use]
    pub fn get_track(&self, media_id: &MediaId) -> Option<TrackRecord> {
        lock_tier(&self.tracks).get(media_id).cloned()
    }

    /// All cached tracks, least recently used first.
    #[must_use]
    pub fn get_all_cached_tracks(&self) -> Vec<TrackRecord> {
        lock_tier(&self.tracks).values().cloned().collect()
    }

    pub fn remove_tracks<'a>(&self, media_ids: impl IntoIterator<Item = &'a MediaId>) -> usize {
        let mut tier = lock_tier(&self.tracks);
        media_ids
            .into_iter()
            .filter(|media_id| tier.remove(*media_id).is_some())
            .count()
    }

    /// Returns `false` if the image is too large for the tier.
    pub fn cache_artwork_ref(&self, media_id: MediaId, artwork_ref: CachedArtworkRef) -> bool {
        // Empty files still occupy a slot
        let weight = artwork_ref.byte_size.max(1);
        lock_tier(&self.artwork_refs).insert(media_id, artwork_ref, weight)
    }

    #[must_use]
    pub fn get_artwork_ref(&self, media_id: &MediaId) -> Option<CachedArtworkRef> {
        lock_tier(&self.artwork_refs).get(media_id).cloned()
    }

    /// Returns the number of dropped references.
    pub fn retain_artwork_refs(
        &self,
        predicate: impl FnMut(&MediaId, &CachedArtworkRef) -> bool,
    ) -> usize {
        lock_tier(&self.artwork_refs).retain(predicate)
    }

    pub fn cache_search_results(&self, query: &str, results: SearchResults) {
        lock_tier(&self.search_results).insert(search_query_key(query), results, 1);
    }

    #[must_use]
    pub fn get_search_results(&self, query: &str) -> Option<SearchResults> {
        lock_tier(&self.search_results)
            .get(search_query_key(query).as_str())
            .cloned()
    }

    pub fn clear_tracks(&self) {
        lock_tier(&self.tracks).clear();
    }

    pub fn clear_artwork_refs(&self) {
        lock_tier(&self.artwork_refs).clear();
    }

    pub fn clear_search_results(&self) {
        lock_tier(&self.search_results).clear();
    }

    pub fn clear_all(&self) {
        self.clear_tracks();
        self.clear_artwork_refs();
        self.clear_search_results();
    }

    /// Statistics of the memory tiers.
    ///
    /// The tiers are inspected one after another and the snapshot
    /// might not be consistent across tiers.
    #[must_use]
    pub fn statistics(&self) -> CacheStatistics {
        let tracks = lock_tier(&self.tracks).statistics();
        let artwork_refs = lock_tier(&self.artwork_refs).statistics();
        let search_results = lock_tier(&self.search_results).statistics();
        CacheStatistics {
            tracks,
            artwork_refs,
            search_results,
            ..Default::default()
        }
    }
}
