// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{collections::HashSet, io, path::PathBuf, sync::Arc, time::Duration};

use tokio::task::{JoinSet, spawn_blocking};

use melodex_core::{CacheStatistics, CachedArtworkRef, MediaId, TrackRecord};

use crate::{
    ArtworkRequest, ArtworkResolver, CacheManager, CacheResult, DiskTier, disk::RemovedFiles,
};

pub const DEFAULT_DISK_CAPACITY_BYTES: u64 = 100 * 1024 * 1024;

pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub const DEFAULT_PRELOAD_BATCH_SIZE: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyConfig {
    pub disk_capacity_bytes: u64,

    /// Files that have not been used for this duration are deleted.
    pub expiry: Duration,

    /// Disk usage after a normal cleanup.
    pub normal_target_percent: u8,

    /// Disk usage after an aggressive cleanup.
    pub aggressive_target_percent: u8,

    /// Maximum number of concurrent requests while preloading.
    pub preload_batch_size: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            disk_capacity_bytes: DEFAULT_DISK_CAPACITY_BYTES,
            expiry: DEFAULT_EXPIRY,
            normal_target_percent: 70,
            aggressive_target_percent: 30,
            preload_batch_size: DEFAULT_PRELOAD_BATCH_SIZE,
        }
    }
}

impl StrategyConfig {
    #[must_use]
    pub fn target_bytes(&self, percent: u8) -> u64 {
        self.disk_capacity_bytes * u64::from(percent.min(100)) / 100
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupLevel {
    /// Delete expired files.
    Light,

    /// Delete expired files and trim the disk tier.
    Normal,

    /// Drop search results and trim the disk tier even further.
    Aggressive,

    /// Drop everything.
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupOutcome {
    pub level: CleanupLevel,
    pub removed_files: usize,
    pub removed_bytes: u64,
    pub dropped_artwork_refs: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreloadStrategy {
    /// The most recently added tracks.
    Recent(usize),

    /// The first tracks in list order.
    Frequent(usize),

    /// The tracks that follow the current position in a queue.
    UpNext { position: usize, count: usize },

    All,
}

impl PreloadStrategy {
    fn select<'a>(self, tracks: &'a [TrackRecord]) -> Vec<&'a TrackRecord> {
        match self {
            Self::Recent(count) => {
                let mut selected = tracks.iter().collect::<Vec<_>>();
                selected.sort_by(|lhs, rhs| rhs.date_added_sec.cmp(&lhs.date_added_sec));
                selected.truncate(count);
                selected
            }
            Self::Frequent(count) => tracks.iter().take(count).collect(),
            Self::UpNext { position, count } => tracks
                .iter()
                .skip(position.saturating_add(1))
                .take(count)
                .collect(),
            Self::All => tracks.iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreloadOutcome {
    pub requested: usize,
    pub already_cached: usize,
    pub resolved: usize,
    pub failed: usize,
}

async fn run_blocking<T>(
    blocking_fn: impl FnOnce() -> io::Result<T> + Send + 'static,
) -> CacheResult<T>
where
    T: Send + 'static,
{
    let result = spawn_blocking(blocking_fn)
        .await
        .map_err(anyhow::Error::from)?;
    Ok(result?)
}

/// Policies for populating and cleaning up the cache tiers.
#[derive(Debug, Clone)]
pub struct CacheStrategy {
    config: StrategyConfig,
    manager: Arc<CacheManager>,
    resolver: Arc<ArtworkResolver>,
}

impl CacheStrategy {
    #[must_use]
    pub const fn new(
        config: StrategyConfig,
        manager: Arc<CacheManager>,
        resolver: Arc<ArtworkResolver>,
    ) -> Self {
        Self {
            config,
            manager,
            resolver,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &StrategyConfig {
        &self.config
    }

    #[must_use]
    pub fn manager(&self) -> &Arc<CacheManager> {
        &self.manager
    }

    #[must_use]
    pub fn resolver(&self) -> &Arc<ArtworkResolver> {
        &self.resolver
    }

    fn disk(&self) -> Arc<DiskTier> {
        Arc::clone(self.resolver.disk())
    }

    pub async fn cleanup(&self, level: CleanupLevel) -> CacheResult<CleanupOutcome> {
        log::info!("Cleaning up caches: {level:?}");
        let disk = self.disk();
        let expiry = self.config.expiry;
        let removed = match level {
            CleanupLevel::Light => run_blocking(move || disk.remove_older_than(expiry)).await?,
            CleanupLevel::Normal => {
                let target_bytes = self.config.target_bytes(self.config.normal_target_percent);
                run_blocking(move || {
                    let mut removed = disk.remove_older_than(expiry)?;
                    removed.append(disk.trim_to(target_bytes)?);
                    Ok(removed)
                })
                .await?
            }
            CleanupLevel::Aggressive => {
                self.manager.clear_search_results();
                let target_bytes = self
                    .config
                    .target_bytes(self.config.aggressive_target_percent);
                run_blocking(move || disk.trim_to(target_bytes)).await?
            }
            CleanupLevel::Complete => {
                self.manager.clear_all();
                self.resolver.clear_negative_marks();
                run_blocking(move || disk.clear()).await?
            }
        };
        let dropped_artwork_refs = self.drop_removed_artwork_refs(&removed);
        let outcome = CleanupOutcome {
            level,
            removed_files: removed.len(),
            removed_bytes: removed.bytes,
            dropped_artwork_refs,
        };
        log::info!("Cleaned up caches: {outcome:?}");
        Ok(outcome)
    }

    fn drop_removed_artwork_refs(&self, removed: &RemovedFiles) -> usize {
        if removed.is_empty() {
            return 0;
        }
        let removed_paths = removed.paths.iter().collect::<HashSet<_>>();
        self.manager
            .retain_artwork_refs(|_, artwork_ref| !removed_paths.contains(&artwork_ref.path))
    }

    /// Trigger a normal cleanup if the disk tier exceeds its capacity.
    pub async fn check_capacity(&self) -> CacheResult<Option<CleanupOutcome>> {
        let disk = self.disk();
        let capacity_bytes = self.config.disk_capacity_bytes;
        let statistics = run_blocking(move || disk.statistics(capacity_bytes)).await?;
        if !statistics.exceeds_capacity() {
            return Ok(None);
        }
        log::info!(
            "Disk cache exceeds capacity: {bytes} > {capacity_bytes} byte(s)",
            bytes = statistics.bytes
        );
        self.cleanup(CleanupLevel::Normal).await.map(Some)
    }

    /// Load the artwork of a track from the memory tier or resolve it.
    pub async fn load_artwork(&self, request: ArtworkRequest) -> Option<CachedArtworkRef> {
        let key = self.resolver.request_key(&request);
        if let Some(artwork_ref) = self
            .manager
            .get_artwork_ref(&request.media_id)
            .filter(|artwork_ref| artwork_ref.key == key)
        {
            return Some(artwork_ref);
        }
        let media_id = request.media_id.clone();
        let artwork_ref = self.resolver.resolve(request).await?;
        self.cache_artwork_ref(media_id, &artwork_ref);
        Some(artwork_ref)
    }

    /// Only images of the configured size are kept in the memory tier.
    fn cache_artwork_ref(&self, media_id: MediaId, artwork_ref: &CachedArtworkRef) {
        if artwork_ref.key != self.resolver.artwork_key(&media_id, None) {
            return;
        }
        self.manager.cache_artwork_ref(media_id, artwork_ref.clone());
    }

    /// Clear the negative mark of a track and resolve its artwork again.
    pub async fn retry_artwork(&self, request: ArtworkRequest) -> Option<CachedArtworkRef> {
        let media_id = request.media_id.clone();
        let artwork_ref = self.resolver.retry(request).await?;
        self.cache_artwork_ref(media_id, &artwork_ref);
        Some(artwork_ref)
    }

    /// Resolve the artwork of the selected tracks in bounded batches.
    pub async fn preload(&self, tracks: &[TrackRecord], strategy: PreloadStrategy) -> PreloadOutcome {
        let selected = strategy.select(tracks);
        let mut outcome = PreloadOutcome {
            requested: selected.len(),
            ..Default::default()
        };
        let pending = selected
            .into_iter()
            .filter(|track| {
                if self.manager.get_artwork_ref(&track.media_id).is_some() {
                    outcome.already_cached += 1;
                    false
                } else {
                    true
                }
            })
            .map(ArtworkRequest::from_track)
            .collect::<Vec<_>>();
        for batch in pending.chunks(self.config.preload_batch_size.max(1)) {
            let mut join_set = JoinSet::new();
            for request in batch {
                let resolver = Arc::clone(&self.resolver);
                let request = request.clone();
                join_set.spawn(async move {
                    let media_id = request.media_id.clone();
                    (media_id, resolver.resolve(request).await)
                });
            }
            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok((media_id, Some(artwork_ref))) => {
                        self.manager.cache_artwork_ref(media_id, artwork_ref);
                        outcome.resolved += 1;
                    }
                    Ok((_, None)) => {
                        outcome.failed += 1;
                    }
                    Err(err) => {
                        log::error!("Failed to preload artwork: {err}");
                        outcome.failed += 1;
                    }
                }
            }
        }
        log::debug!("Preloaded artwork ({strategy:?}): {outcome:?}");
        outcome
    }

    /// Path of the cached artwork image without resolving it.
    #[must_use]
    pub fn cached_artwork_path(&self, media_id: &MediaId) -> Option<PathBuf> {
        if let Some(artwork_ref) = self.manager.get_artwork_ref(media_id) {
            return Some(artwork_ref.path);
        }
        self.resolver.lookup_cached(media_id, None)
    }

    /// Collect the statistics of all tiers.
    pub async fn statistics(&self) -> CacheResult<CacheStatistics> {
        let disk = self.disk();
        let capacity_bytes = self.config.disk_capacity_bytes;
        let disk_statistics = run_blocking(move || disk.statistics(capacity_bytes)).await?;
        Ok(CacheStatistics {
            disk: disk_statistics,
            negative_marks: self.resolver.negative_marks(),
            in_flight_requests: self.resolver.in_flight_count(),
            extraction_attempts: self.resolver.attempts().extraction_attempts(),
            ..self.manager.statistics()
        })
    }
}
