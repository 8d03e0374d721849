// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    collections::HashMap,
    io::Cursor,
    path::{Path, PathBuf},
    sync::{
        Arc, Condvar, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use image::{ImageFormat, Rgb, RgbImage};

use melodex_cache::{
    ArtworkResolver, CacheManager, CacheManagerConfig, CacheStrategy, DiskTier, ResolverConfig,
    StrategyConfig,
};
use melodex_core::{
    MediaId, TrackRecord,
    media::{AlbumId, Locator},
};
use melodex_media_file::extract::EmbeddedArtworkExtractor;
use melodex_media_index::{
    AccessStatus, ChangeCallback, IndexError, IndexFilter, IndexResult, IndexSubscription,
    MediaCategory, PlatformIndexClient, RawRow,
};
use melodex_repo::{RepoError, RepoResult, track::TrackStore};

use crate::{CoordinatorConfig, IndexCoordinator};

pub(crate) fn new_jpeg_image_data(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([0, 128, 255]));
    let mut image_data = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut image_data), ImageFormat::Jpeg)
        .unwrap();
    image_data
}

pub(crate) fn new_row(index: usize) -> RawRow {
    RawRow {
        media_id: MediaId::new(format!("media-{index}")),
        locator: Locator::decode(&format!("content://media/{index}")),
        category: MediaCategory::Music,
        title: Some(format!("Title {index:03}")),
        artist: Some("Artist".to_owned()),
        album: Some("Album".to_owned()),
        album_id: None,
        duration_ms: 180_000,
        date_added_sec: 0,
        genre: None,
        year: None,
        track_number: None,
        has_embedded_artwork: None,
    }
}

#[derive(Debug)]
struct Gate {
    open: Mutex<bool>,
    opened: Condvar,
}

impl Gate {
    fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.opened.wait(open).unwrap();
        }
    }

    fn set_open(&self, open: bool) {
        *self.open.lock().unwrap() = open;
        self.opened.notify_all();
    }
}

/// An in-memory media index.
#[allow(missing_debug_implementations)]
pub(crate) struct FakeIndexClient {
    rows: Mutex<Vec<RawRow>>,
    access: Mutex<AccessStatus>,
    query_error: Mutex<Option<String>>,
    access_gate: Gate,
    query_gate: Gate,
    queries: AtomicUsize,
    on_changed: Mutex<Option<ChangeCallback>>,
}

impl Default for FakeIndexClient {
    fn default() -> Self {
        Self {
            rows: Mutex::default(),
            access: Mutex::new(AccessStatus::Granted),
            query_error: Mutex::default(),
            access_gate: Gate {
                open: Mutex::new(true),
                opened: Condvar::new(),
            },
            query_gate: Gate {
                open: Mutex::new(true),
                opened: Condvar::new(),
            },
            queries: AtomicUsize::new(0),
            on_changed: Mutex::default(),
        }
    }
}

impl FakeIndexClient {
    pub(crate) fn set_rows(&self, rows: Vec<RawRow>) {
        *self.rows.lock().unwrap() = rows;
    }

    pub(crate) fn set_access(&self, access: AccessStatus) {
        *self.access.lock().unwrap() = access;
    }

    pub(crate) fn set_query_error(&self, message: Option<&str>) {
        *self.query_error.lock().unwrap() = message.map(ToOwned::to_owned);
    }

    /// Access checks block while the gate is closed.
    pub(crate) fn set_access_gate_open(&self, open: bool) {
        self.access_gate.set_open(open);
    }

    /// Queries block while the gate is closed.
    pub(crate) fn set_query_gate_open(&self, open: bool) {
        self.query_gate.set_open(open);
    }

    pub(crate) fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub(crate) fn is_subscribed(&self) -> bool {
        self.on_changed.lock().unwrap().is_some()
    }

    /// Invokes the change callback on the current thread.
    pub(crate) fn notify_changed(&self) {
        if let Some(on_changed) = &*self.on_changed.lock().unwrap() {
            on_changed();
        }
    }
}

impl PlatformIndexClient for FakeIndexClient {
    fn check_access(&self) -> IndexResult<AccessStatus> {
        self.access_gate.wait();
        Ok(*self.access.lock().unwrap())
    }

    fn query_all(&self, filter: &IndexFilter) -> IndexResult<Vec<RawRow>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.query_gate.wait();
        if let Some(message) = &*self.query_error.lock().unwrap() {
            return Err(IndexError::Other(anyhow::anyhow!("{message}")));
        }
        let mut rows = self.rows.lock().unwrap().clone();
        filter.apply(&mut rows);
        Ok(rows)
    }

    fn album_thumbnail(&self, _album_id: &AlbumId) -> IndexResult<Option<Vec<u8>>> {
        Ok(None)
    }

    fn subscribe_to_changes(&self, on_changed: ChangeCallback) -> IndexResult<IndexSubscription> {
        *self.on_changed.lock().unwrap() = Some(on_changed);
        Ok(IndexSubscription::inactive())
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeExtractor {
    images: Mutex<HashMap<Locator, Vec<u8>>>,
    attempts: AtomicUsize,
}

impl FakeExtractor {
    pub(crate) fn insert_image(&self, locator: Locator, image_data: Vec<u8>) {
        self.images.lock().unwrap().insert(locator, image_data);
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl EmbeddedArtworkExtractor for FakeExtractor {
    fn extract_embedded(&self, locator: &Locator) -> melodex_media_file::Result<Option<Vec<u8>>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Ok(self.images.lock().unwrap().get(locator).cloned())
    }
}

/// Keeps tracks in insertion order.
#[derive(Debug, Default)]
pub(crate) struct FakeTrackStore {
    tracks: Mutex<Vec<TrackRecord>>,
    artwork_paths: Mutex<HashMap<MediaId, PathBuf>>,
}

impl FakeTrackStore {
    pub(crate) fn artwork_path(&self, media_id: &MediaId) -> Option<PathBuf> {
        self.artwork_paths.lock().unwrap().get(media_id).cloned()
    }
}

impl TrackStore for FakeTrackStore {
    fn upsert_tracks(&self, tracks: &[TrackRecord]) -> RepoResult<usize> {
        let mut stored = self.tracks.lock().unwrap();
        for track in tracks {
            if let Some(stored_track) = stored
                .iter_mut()
                .find(|stored_track| stored_track.media_id == track.media_id)
            {
                *stored_track = track.clone();
            } else {
                stored.push(track.clone());
            }
        }
        Ok(tracks.len())
    }

    fn load_all_tracks(&self) -> RepoResult<Vec<TrackRecord>> {
        Ok(self.tracks.lock().unwrap().clone())
    }

    fn load_tracks_missing_artwork(&self) -> RepoResult<Vec<TrackRecord>> {
        let artwork_paths = self.artwork_paths.lock().unwrap();
        Ok(self
            .tracks
            .lock()
            .unwrap()
            .iter()
            .filter(|track| !artwork_paths.contains_key(&track.media_id))
            .cloned()
            .collect())
    }

    fn update_track_artwork_path(&self, media_id: &MediaId, artwork_path: &Path) -> RepoResult<()> {
        if !self
            .tracks
            .lock()
            .unwrap()
            .iter()
            .any(|track| track.media_id == *media_id)
        {
            return Err(RepoError::NotFound);
        }
        self.artwork_paths
            .lock()
            .unwrap()
            .insert(media_id.clone(), artwork_path.to_path_buf());
        Ok(())
    }

    fn delete_tracks(&self, media_ids: &[MediaId]) -> RepoResult<usize> {
        let mut tracks = self.tracks.lock().unwrap();
        let count_before = tracks.len();
        tracks.retain(|track| !media_ids.contains(&track.media_id));
        let mut artwork_paths = self.artwork_paths.lock().unwrap();
        for media_id in media_ids {
            artwork_paths.remove(media_id);
        }
        Ok(count_before - tracks.len())
    }
}

pub(crate) struct Fixture {
    pub(crate) index_client: Arc<FakeIndexClient>,
    pub(crate) extractor: Arc<FakeExtractor>,
    pub(crate) store: Arc<FakeTrackStore>,
    pub(crate) coordinator: Arc<IndexCoordinator>,
    pub(crate) _temp_dir: tempfile::TempDir,
}

impl Fixture {
    pub(crate) fn new(config: CoordinatorConfig) -> Self {
        Self::with_store(config, Arc::default())
    }

    pub(crate) fn with_store(config: CoordinatorConfig, store: Arc<FakeTrackStore>) -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        let index_client = Arc::new(FakeIndexClient::default());
        let extractor = Arc::new(FakeExtractor::default());
        let disk_tier = Arc::new(DiskTier::new(temp_dir.path().join("artwork")));
        disk_tier.create_dir_all().unwrap();
        let resolver = Arc::new(ArtworkResolver::new(
            ResolverConfig::default(),
            disk_tier,
            Arc::clone(&extractor) as _,
            Arc::clone(&index_client) as _,
        ));
        let manager = Arc::new(CacheManager::new(&CacheManagerConfig::default()));
        let strategy = CacheStrategy::new(StrategyConfig::default(), manager, resolver);
        let coordinator = Arc::new(IndexCoordinator::new(
            config,
            Arc::clone(&index_client) as _,
            Arc::clone(&store) as _,
            strategy,
        ));
        Self {
            index_client,
            extractor,
            store,
            coordinator,
            _temp_dir: temp_dir,
        }
    }
}
