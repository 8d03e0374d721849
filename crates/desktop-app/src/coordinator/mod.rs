// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Keeps the published track list in sync with the media index.
//!
//! The media index offers no delta queries. Each scan enumerates all
//! entries and reconciles them with the previously published tracks.
//! Only a single scan is running at any time. Change notifications that
//! arrive while scanning are coalesced into a single follow-up scan.

use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use discro::Subscriber;
use tokio::{
    sync::Mutex as AsyncMutex,
    task::{JoinHandle, spawn_blocking},
};

use melodex_cache::{
    ArtworkRequest, CacheResult, CacheStrategy, CleanupLevel, CleanupOutcome, PreloadOutcome,
    PreloadStrategy,
    manager::{SearchResults, search_query_key},
};
use melodex_core::{
    CacheStatistics, EmbeddedArtworkHint, MediaId, ScanMode, ScanState, TrackRecord,
};
use melodex_media_index::{
    AccessStatus, IndexError, IndexFilter, IndexSubscription, PlatformIndexClient, RawRow,
};
use melodex_repo::{RepoError, RepoResult, track::TrackStore};

use crate::{JoinedTask, Observable, ObservableRef};

pub mod tasklet;

pub const DEFAULT_PREFETCH_COUNT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub filter: IndexFilter,

    /// Mode of scans that are not requested explicitly.
    pub scan_mode: ScanMode,

    /// Number of leading tracks with artwork resolved while scanning.
    pub prefetch_count: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            filter: IndexFilter::default(),
            scan_mode: ScanMode::default(),
            prefetch_count: DEFAULT_PREFETCH_COUNT,
        }
    }
}

/// The published tracks in index order.
pub type TrackList = Arc<[TrackRecord]>;

/// Differences between two consecutive scans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
}

impl ScanReport {
    #[must_use]
    pub const fn track_count(&self) -> usize {
        self.added + self.updated + self.unchanged
    }

    #[must_use]
    pub const fn has_changes(&self) -> bool {
        self.added > 0 || self.updated > 0 || self.removed > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed(ScanReport),
    PermissionRequired,
    Failed(String),
}

pub type ScanTask = JoinHandle<ScanOutcome>;

/// Normalize all rows and drop duplicates, keeping the first occurrence.
fn normalize_rows(rows: Vec<RawRow>) -> Vec<TrackRecord> {
    let mut media_ids = HashSet::with_capacity(rows.len());
    rows.into_iter()
        .filter(|row| {
            if media_ids.contains(&row.media_id) {
                log::warn!("Skipping duplicate entry: {}", row.media_id);
                return false;
            }
            media_ids.insert(row.media_id.clone());
            true
        })
        .map(RawRow::normalize)
        .collect()
}

/// Returns the report and the ids of all removed tracks.
fn reconcile(previous: &[TrackRecord], current: &[TrackRecord]) -> (ScanReport, Vec<MediaId>) {
    let previous_by_id = previous
        .iter()
        .map(|track| (&track.media_id, track))
        .collect::<HashMap<_, _>>();
    let mut report = ScanReport::default();
    for track in current {
        match previous_by_id.get(&track.media_id) {
            None => report.added += 1,
            Some(previous) if *previous == track => report.unchanged += 1,
            Some(_) => report.updated += 1,
        }
    }
    let current_ids = current
        .iter()
        .map(|track| &track.media_id)
        .collect::<HashSet<_>>();
    let removed_ids = previous
        .iter()
        .filter(|track| !current_ids.contains(&track.media_id))
        .map(|track| track.media_id.clone())
        .collect::<Vec<_>>();
    report.removed = removed_ids.len();
    (report, removed_ids)
}

/// Returns the number of updated tracks.
fn update_artwork_paths_blocking(
    store: &dyn TrackStore,
    artwork_paths: Vec<(MediaId, PathBuf)>,
) -> RepoResult<usize> {
    let mut updated = 0;
    for (media_id, artwork_path) in artwork_paths {
        match store.update_track_artwork_path(&media_id, &artwork_path) {
            Ok(()) => {
                updated += 1;
            }
            Err(RepoError::NotFound) => {
                log::debug!("Track {media_id} has not been persisted");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(updated)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Releases the scan gate when dropped.
struct ScanGateGuard<'a>(&'a AtomicBool);

impl Drop for ScanGateGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Synchronizes the media index with the caches and the durable store.
///
/// The coordinator is the only writer of the published track list and
/// the scan state. Both are totally ordered by the scan lock.
#[allow(missing_debug_implementations)]
pub struct IndexCoordinator {
    config: CoordinatorConfig,
    index_client: Arc<dyn PlatformIndexClient>,
    store: Arc<dyn TrackStore>,
    strategy: CacheStrategy,
    track_list: Observable<TrackList>,
    scan_state: Observable<ScanState>,
    scanning: AtomicBool,
    rescan_requested: AtomicBool,
    scan_lock: AsyncMutex<()>,
    last_scan_report: Mutex<Option<ScanReport>>,
    subscription: Mutex<Option<IndexSubscription>>,
}

impl IndexCoordinator {
    #[must_use]
    pub fn new(
        config: CoordinatorConfig,
        index_client: Arc<dyn PlatformIndexClient>,
        store: Arc<dyn TrackStore>,
        strategy: CacheStrategy,
    ) -> Self {
        Self {
            config,
            index_client,
            store,
            strategy,
            track_list: Observable::new(TrackList::from([])),
            scan_state: Observable::new(ScanState::Idle),
            scanning: AtomicBool::new(false),
            rescan_requested: AtomicBool::new(false),
            scan_lock: AsyncMutex::new(()),
            last_scan_report: Mutex::new(None),
            subscription: Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    #[must_use]
    pub const fn strategy(&self) -> &CacheStrategy {
        &self.strategy
    }

    #[must_use]
    pub fn track_list(&self) -> ObservableRef<'_, TrackList> {
        self.track_list.read()
    }

    #[must_use]
    pub fn subscribe_track_list_changed(&self) -> Subscriber<TrackList> {
        self.track_list.subscribe_changed()
    }

    #[must_use]
    pub fn scan_state(&self) -> ObservableRef<'_, ScanState> {
        self.scan_state.read()
    }

    #[must_use]
    pub fn subscribe_scan_state_changed(&self) -> Subscriber<ScanState> {
        self.scan_state.subscribe_changed()
    }

    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn last_scan_report(&self) -> Option<ScanReport> {
        *lock(&self.last_scan_report)
    }

    fn update_scan_state(&self, next_state: ScanState) -> bool {
        self.scan_state.modify(|state| {
            if *state == next_state {
                return false;
            }
            if !state.can_transition_to(&next_state) {
                log::warn!("Rejecting scan state transition: {state} -> {next_state}");
                return false;
            }
            log::debug!("Scan state: {state} -> {next_state}");
            *state = next_state;
            true
        })
    }

    fn publish_track_list(&self, new_track_list: TrackList) {
        self.track_list.modify(|track_list| {
            *track_list = new_track_list;
            true
        });
    }

    /// Publish the persisted tracks, subscribe to changes, and
    /// start the initial scan.
    ///
    /// Must be invoked within the context of a Tokio runtime.
    pub async fn start(self: &Arc<Self>) -> Option<ScanTask> {
        log::info!("Starting index coordinator");
        self.restore_from_store().await;
        self.subscribe_to_changes().await;
        self.try_spawn_scan(self.config.scan_mode)
    }

    /// Stop listening for changes of the media index.
    ///
    /// Pending scans are not aborted.
    pub fn shutdown(&self) {
        if lock(&self.subscription).take().is_some() {
            log::info!("Unsubscribed from media index changes");
        }
    }

    async fn restore_from_store(&self) {
        let _lock = self.scan_lock.lock().await;
        if !self.track_list.read().is_empty() {
            return;
        }
        let store = Arc::clone(&self.store);
        match spawn_blocking(move || store.load_all_tracks()).await {
            Ok(Ok(tracks)) => {
                if tracks.is_empty() {
                    return;
                }
                log::info!("Restored {count} track(s) from store", count = tracks.len());
                self.strategy.manager().cache_tracks(tracks.iter().cloned());
                self.publish_track_list(tracks.into());
            }
            Ok(Err(err)) => {
                log::warn!("Failed to restore tracks from store: {err}");
            }
            Err(err) => {
                log::error!("Failed to restore tracks from store: {err}");
            }
        }
    }

    async fn subscribe_to_changes(self: &Arc<Self>) {
        let runtime = tokio::runtime::Handle::current();
        let coordinator = Arc::downgrade(self);
        let on_changed = Box::new(move || {
            let coordinator = upgrade_or_return!(coordinator);
            let _enter = runtime.enter();
            coordinator.on_index_changed();
        });
        let index_client = Arc::clone(&self.index_client);
        match spawn_blocking(move || index_client.subscribe_to_changes(on_changed)).await {
            Ok(Ok(subscription)) => {
                *lock(&self.subscription) = Some(subscription);
            }
            Ok(Err(err)) => {
                log::warn!("Failed to subscribe to media index changes: {err}");
            }
            Err(err) => {
                log::error!("Failed to subscribe to media index changes: {err}");
            }
        }
    }

    /// Spawn a new scan unless a scan is already running.
    fn try_spawn_scan(self: &Arc<Self>, mode: ScanMode) -> Option<ScanTask> {
        if self
            .scanning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("Scan is already running");
            return None;
        }
        let coordinator = Arc::clone(self);
        let task = tokio::spawn(async move {
            let gate_guard = ScanGateGuard(&coordinator.scanning);
            let outcome = coordinator.scan(mode).await;
            drop(gate_guard);
            if coordinator.rescan_requested.load(Ordering::Acquire) {
                log::debug!("Starting follow-up scan");
                // The follow-up scan is detached
                drop(coordinator.try_spawn_scan(mode));
            }
            outcome
        });
        Some(task)
    }

    /// Scan the media index and wait for the outcome.
    ///
    /// Returns `None` without waiting if another scan is already
    /// running. The scan continues if the returned future is dropped.
    pub async fn run_full_scan(self: &Arc<Self>, mode: ScanMode) -> Option<ScanOutcome> {
        let task = self.try_spawn_scan(mode)?;
        match JoinedTask::join(task).await {
            JoinedTask::Completed(outcome) => Some(outcome),
            JoinedTask::Cancelled => None,
            JoinedTask::Panicked(err) => {
                log::error!("Scan panicked: {err}");
                None
            }
        }
    }

    /// Scan the media index after any running scan has finished.
    pub async fn force_full_rescan(self: &Arc<Self>) -> Option<ScanOutcome> {
        self.rescan_requested.store(true, Ordering::Release);
        self.run_full_scan(self.config.scan_mode).await
    }

    /// Handle a change notification of the media index.
    ///
    /// Notifications that arrive while scanning are coalesced into
    /// a single follow-up scan. Must be invoked within the context
    /// of a Tokio runtime.
    pub fn on_index_changed(self: &Arc<Self>) {
        self.rescan_requested.store(true, Ordering::Release);
        if self.try_spawn_scan(self.config.scan_mode).is_none() {
            log::debug!("Deferring scan after media index changed");
        }
    }

    /// Re-evaluate the access to the media index.
    ///
    /// Starts a new scan if access has been granted.
    pub async fn on_permissions_changed(self: &Arc<Self>) -> Option<ScanTask> {
        let index_client = Arc::clone(&self.index_client);
        let access = spawn_blocking(move || index_client.check_access()).await;
        let _lock = self.scan_lock.lock().await;
        match access {
            Ok(Ok(AccessStatus::Granted)) => {
                log::info!("Access to media index granted");
                if self.scan_state.read().is_permission_required() {
                    self.update_scan_state(ScanState::Idle);
                }
                self.try_spawn_scan(self.config.scan_mode)
            }
            Ok(Ok(AccessStatus::Denied) | Err(IndexError::PermissionDenied)) => {
                log::info!("Access to media index denied");
                self.update_scan_state(ScanState::PermissionRequired);
                None
            }
            Ok(Err(err)) => {
                log::warn!("Failed to check access to media index: {err}");
                None
            }
            Err(err) => {
                log::error!("Failed to check access to media index: {err}");
                None
            }
        }
    }

    fn permission_required(&self) -> ScanOutcome {
        log::warn!("Access to media index has not been granted");
        self.update_scan_state(ScanState::PermissionRequired);
        ScanOutcome::PermissionRequired
    }

    fn scan_failed(&self, message: String) -> ScanOutcome {
        log::warn!("Scanning media index failed: {message}");
        self.update_scan_state(ScanState::Error(message.clone()));
        ScanOutcome::Failed(message)
    }

    async fn scan(&self, mode: ScanMode) -> ScanOutcome {
        let _lock = self.scan_lock.lock().await;
        // All pending notifications are covered by this scan
        self.rescan_requested.store(false, Ordering::Release);
        log::info!("Scanning media index: {mode:?}");
        // Without access the scan never enters the scanning state
        let index_client = Arc::clone(&self.index_client);
        let access = spawn_blocking(move || index_client.check_access()).await;
        if matches!(
            access,
            Ok(Ok(AccessStatus::Denied) | Err(IndexError::PermissionDenied))
        ) {
            return self.permission_required();
        }
        self.update_scan_state(ScanState::Scanning("Querying media index".to_owned()));
        match access {
            Ok(Ok(_)) => (),
            Ok(Err(err)) => return self.scan_failed(err.to_string()),
            Err(err) => return self.scan_failed(err.to_string()),
        }
        let index_client = Arc::clone(&self.index_client);
        let filter = self.config.filter.clone();
        let rows = match spawn_blocking(move || index_client.query_all(&filter)).await {
            Ok(Ok(rows)) => rows,
            Ok(Err(IndexError::PermissionDenied)) => return self.permission_required(),
            Ok(Err(err)) => return self.scan_failed(err.to_string()),
            Err(err) => return self.scan_failed(err.to_string()),
        };

        self.update_scan_state(ScanState::Scanning(format!(
            "Reconciling {count} entries",
            count = rows.len()
        )));
        let tracks = TrackList::from(normalize_rows(rows));
        let previous_tracks = Arc::clone(&self.track_list.read());
        let (report, removed_ids) = reconcile(&previous_tracks, &tracks);
        log::info!("Reconciled media index: {report:?}");

        let manager = self.strategy.manager();
        if !removed_ids.is_empty() {
            manager.remove_tracks(&removed_ids);
        }
        manager.cache_tracks(tracks.iter().cloned());
        if report.has_changes() {
            manager.clear_search_results();
        }
        self.persist_tracks(Arc::clone(&tracks), removed_ids).await;

        if mode == ScanMode::WithArtwork && self.config.prefetch_count > 0 {
            self.update_scan_state(ScanState::Scanning("Loading artwork".to_owned()));
            let prefetch_count = self.config.prefetch_count;
            let outcome = self
                .strategy
                .preload(&tracks, PreloadStrategy::Frequent(prefetch_count))
                .await;
            log::debug!("Prefetched artwork: {outcome:?}");
            let artwork_paths = self.artwork_paths_of(tracks.iter().take(prefetch_count));
            self.persist_missing_artwork_paths(artwork_paths).await;
        }

        let track_count = tracks.len();
        if previous_tracks[..] != tracks[..] {
            self.publish_track_list(tracks);
        }
        self.update_scan_state(ScanState::Completed(track_count));
        *lock(&self.last_scan_report) = Some(report);

        match self.strategy.check_capacity().await {
            Ok(Some(outcome)) => {
                log::info!("Cleaned up disk cache: {outcome:?}");
            }
            Ok(None) => (),
            Err(err) => {
                log::warn!("Failed to check disk cache capacity: {err}");
            }
        }
        ScanOutcome::Completed(report)
    }

    async fn persist_tracks(&self, tracks: TrackList, removed_ids: Vec<MediaId>) {
        let store = Arc::clone(&self.store);
        let persisted = spawn_blocking(move || -> RepoResult<_> {
            let upserted = store.upsert_tracks(&tracks)?;
            let deleted = if removed_ids.is_empty() {
                0
            } else {
                store.delete_tracks(&removed_ids)?
            };
            Ok((upserted, deleted))
        })
        .await;
        match persisted {
            Ok(Ok((upserted, deleted))) => {
                log::debug!("Persisted {upserted} and deleted {deleted} track(s)");
            }
            Ok(Err(err)) => {
                log::warn!("Failed to persist tracks: {err}");
            }
            Err(err) => {
                log::error!("Failed to persist tracks: {err}");
            }
        }
    }

    fn artwork_paths_of<'a>(
        &self,
        tracks: impl IntoIterator<Item = &'a TrackRecord>,
    ) -> Vec<(MediaId, PathBuf)> {
        let manager = self.strategy.manager();
        tracks
            .into_iter()
            .filter_map(|track| {
                manager
                    .get_artwork_ref(&track.media_id)
                    .map(|artwork_ref| (track.media_id.clone(), artwork_ref.path))
            })
            .collect()
    }

    /// Only updates tracks that have no artwork path yet.
    async fn persist_missing_artwork_paths(&self, artwork_paths: Vec<(MediaId, PathBuf)>) {
        if artwork_paths.is_empty() {
            return;
        }
        let store = Arc::clone(&self.store);
        let persisted = spawn_blocking(move || -> RepoResult<usize> {
            let missing_ids = store
                .load_tracks_missing_artwork()?
                .into_iter()
                .map(|track| track.media_id)
                .collect::<HashSet<_>>();
            let artwork_paths = artwork_paths
                .into_iter()
                .filter(|(media_id, _)| missing_ids.contains(media_id))
                .collect();
            update_artwork_paths_blocking(store.as_ref(), artwork_paths)
        })
        .await;
        Self::log_persisted_artwork_paths(persisted);
    }

    async fn persist_artwork_paths(&self, artwork_paths: Vec<(MediaId, PathBuf)>) {
        if artwork_paths.is_empty() {
            return;
        }
        let store = Arc::clone(&self.store);
        let persisted =
            spawn_blocking(move || update_artwork_paths_blocking(store.as_ref(), artwork_paths))
                .await;
        Self::log_persisted_artwork_paths(persisted);
    }

    fn log_persisted_artwork_paths(
        persisted: Result<RepoResult<usize>, tokio::task::JoinError>,
    ) {
        match persisted {
            Ok(Ok(updated)) => {
                log::debug!("Persisted {updated} artwork path(s)");
            }
            Ok(Err(err)) => {
                log::warn!("Failed to persist artwork paths: {err}");
            }
            Err(err) => {
                log::error!("Failed to persist artwork paths: {err}");
            }
        }
    }

    fn find_track(&self, media_id: &MediaId) -> Option<TrackRecord> {
        if let Some(track) = self.strategy.manager().get_track(media_id) {
            return Some(track);
        }
        let track = self
            .track_list
            .read()
            .iter()
            .find(|track| track.media_id == *media_id)
            .cloned();
        if let Some(track) = &track {
            self.strategy.manager().cache_track(track.clone());
        } else {
            log::debug!("Unknown track: {media_id}");
        }
        track
    }

    fn artwork_request(
        &self,
        media_id: &MediaId,
        hint: EmbeddedArtworkHint,
    ) -> Option<ArtworkRequest> {
        let track = self.find_track(media_id)?;
        let mut request = ArtworkRequest::from_track(&track);
        if hint != EmbeddedArtworkHint::Unknown {
            request.embedded_artwork = hint;
        }
        Some(request)
    }

    /// Path of the cached artwork image without resolving it.
    #[must_use]
    pub fn cached_artwork_path(&self, media_id: &MediaId) -> Option<PathBuf> {
        self.strategy.cached_artwork_path(media_id)
    }

    /// Resolve the artwork of a track.
    ///
    /// A hint other than [`EmbeddedArtworkHint::Unknown`] overrides
    /// what is known about the embedded artwork of the track.
    pub async fn load_artwork(
        &self,
        media_id: &MediaId,
        hint: EmbeddedArtworkHint,
    ) -> Option<PathBuf> {
        let request = self.artwork_request(media_id, hint)?;
        let artwork_ref = self.strategy.load_artwork(request).await?;
        self.persist_artwork_paths(vec![(media_id.clone(), artwork_ref.path.clone())])
            .await;
        Some(artwork_ref.path)
    }

    /// Resolve the artwork of a track that has failed before.
    pub async fn retry_artwork(&self, media_id: &MediaId) -> Option<PathBuf> {
        let request = self.artwork_request(media_id, EmbeddedArtworkHint::Unknown)?;
        let artwork_ref = self.strategy.retry_artwork(request).await?;
        self.persist_artwork_paths(vec![(media_id.clone(), artwork_ref.path.clone())])
            .await;
        Some(artwork_ref.path)
    }

    /// Resolve the artwork of the selected tracks in the background.
    pub async fn preload_artwork(
        &self,
        tracks: &[TrackRecord],
        preload_strategy: PreloadStrategy,
    ) -> PreloadOutcome {
        let outcome = self.strategy.preload(tracks, preload_strategy).await;
        if outcome.resolved > 0 {
            let artwork_paths = self.artwork_paths_of(tracks);
            self.persist_missing_artwork_paths(artwork_paths).await;
        }
        outcome
    }

    /// Resolve the artwork of the given tracks.
    ///
    /// Unknown tracks are ignored.
    pub async fn prefetch_artwork(&self, media_ids: &[MediaId]) -> PreloadOutcome {
        let tracks = media_ids
            .iter()
            .filter_map(|media_id| self.find_track(media_id))
            .collect::<Vec<_>>();
        self.preload_artwork(&tracks, PreloadStrategy::All).await
    }

    /// Drop the contents of all cache tiers.
    ///
    /// The published track list is not affected.
    pub async fn clear_all_caches(&self) -> CacheResult<CleanupOutcome> {
        self.strategy.cleanup(CleanupLevel::Complete).await
    }

    pub async fn cache_statistics(&self) -> CacheResult<CacheStatistics> {
        self.strategy.statistics().await
    }

    /// Search the published tracks.
    ///
    /// Matches the title, artist, album, or genre case-insensitively.
    /// An empty query matches all tracks.
    #[must_use]
    pub fn search(&self, query: &str) -> SearchResults {
        let manager = self.strategy.manager();
        if let Some(results) = manager.get_search_results(query) {
            return results;
        }
        let query_key = search_query_key(query);
        let track_list = Arc::clone(&self.track_list.read());
        let results = if query_key.is_empty() {
            track_list
        } else {
            track_list
                .iter()
                .filter(|track| track.matches_query(&query_key))
                .cloned()
                .collect::<SearchResults>()
        };
        manager.cache_search_results(query, Arc::clone(&results));
        results
    }
}

#[cfg(test)]
mod tests;
