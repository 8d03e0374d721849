// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    collections::{HashMap, HashSet},
    fmt,
    path::PathBuf,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{sync::watch, task::spawn_blocking, time::timeout};

use melodex_core::{
    ArtworkKey, ArtworkSource, CachedArtworkRef, EmbeddedArtworkHint, MediaId, TrackRecord,
    artwork::ImageDimension,
    media::{AlbumId, Locator},
};
use melodex_media_file::{
    artwork::{
        DEFAULT_JPEG_QUALITY, EncodedArtworkImage, encode_jpeg_thumbnail, find_sibling_cover_file, image_size_of,
        load_artwork_picture, load_artwork_picture_from_file_path,
    },
    extract::EmbeddedArtworkExtractor,
};
use melodex_media_index::PlatformIndexClient;

use crate::{CacheResult, DiskTier};

pub const DEFAULT_MAX_DIM: ImageDimension = 512;

pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Maximum width and height of cached images.
    pub max_dim: ImageDimension,

    /// Upper bound for each strategy attempt.
    pub attempt_timeout: Duration,

    pub jpeg_quality: u8,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_dim: DEFAULT_MAX_DIM,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtworkRequest {
    pub media_id: MediaId,
    pub locator: Locator,
    pub album_id: Option<AlbumId>,
    pub embedded_artwork: EmbeddedArtworkHint,

    /// Overrides the configured maximum width and height.
    pub max_dim: Option<ImageDimension>,
}

impl ArtworkRequest {
    #[must_use]
    pub fn from_track(track: &TrackRecord) -> Self {
        let TrackRecord {
            media_id,
            locator,
            album_id,
            embedded_artwork,
            ..
        } = track;
        Self {
            media_id: media_id.clone(),
            locator: locator.clone(),
            album_id: album_id.clone(),
            embedded_artwork: *embedded_artwork,
            max_dim: None,
        }
    }

    #[must_use]
    pub fn with_max_dim(self, max_dim: ImageDimension) -> Self {
        Self {
            max_dim: Some(max_dim),
            ..self
        }
    }
}

/// Number of attempts per strategy since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverAttempts {
    pub disk_cache: u64,
    pub embedded: u64,
    pub album_thumbnail: u64,
    pub sibling_file: u64,
}

impl ResolverAttempts {
    /// Attempts that needed to extract and encode an image.
    #[must_use]
    pub const fn extraction_attempts(&self) -> u64 {
        self.embedded + self.album_thumbnail + self.sibling_file
    }
}

#[derive(Debug, Default)]
struct AttemptCounters {
    disk_cache: AtomicU64,
    embedded: AtomicU64,
    album_thumbnail: AtomicU64,
    sibling_file: AtomicU64,
}

impl AttemptCounters {
    fn counter(&self, source: ArtworkSource) -> &AtomicU64 {
        match source {
            ArtworkSource::DiskCache => &self.disk_cache,
            ArtworkSource::Embedded => &self.embedded,
            ArtworkSource::AlbumThumbnail => &self.album_thumbnail,
            ArtworkSource::SiblingFile => &self.sibling_file,
        }
    }

    fn increment(&self, source: ArtworkSource) {
        self.counter(source).fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ResolverAttempts {
        let load = |source| self.counter(source).load(Ordering::Relaxed);
        ResolverAttempts {
            disk_cache: load(ArtworkSource::DiskCache),
            embedded: load(ArtworkSource::Embedded),
            album_thumbnail: load(ArtworkSource::AlbumThumbnail),
            sibling_file: load(ArtworkSource::SiblingFile),
        }
    }
}

/// The strategies in order of precedence.
const STRATEGIES: [ArtworkSource; 4] = [
    ArtworkSource::DiskCache,
    ArtworkSource::Embedded,
    ArtworkSource::AlbumThumbnail,
    ArtworkSource::SiblingFile,
];

fn is_applicable(source: ArtworkSource, request: &ArtworkRequest) -> bool {
    match source {
        ArtworkSource::DiskCache => true,
        ArtworkSource::Embedded => request.embedded_artwork.may_be_present(),
        ArtworkSource::AlbumThumbnail => request.album_id.is_some(),
        ArtworkSource::SiblingFile => request.locator.is_direct_path(),
    }
}

/// Output of a strategy attempt on the blocking pool.
enum Attempted {
    Cached(CachedArtworkRef),
    Encoded(EncodedArtworkImage),
}

/// `None` while pending, then the final result.
type PendingResult = Option<Option<CachedArtworkRef>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resolves artwork images through a chain of strategies.
///
/// Concurrent requests for the same track are deduplicated and share
/// a single result. Tracks for which all strategies failed are marked
/// and not attempted again until [`ArtworkResolver::retry`] is invoked.
pub struct ArtworkResolver {
    config: ResolverConfig,
    disk: Arc<DiskTier>,
    extractor: Arc<dyn EmbeddedArtworkExtractor>,
    index_client: Arc<dyn PlatformIndexClient>,
    negative_marks: Mutex<HashSet<MediaId>>,
    in_flight: Mutex<HashMap<ArtworkKey, watch::Receiver<PendingResult>>>,
    attempts: AttemptCounters,
}

impl fmt::Debug for ArtworkResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtworkResolver")
            .field("config", &self.config)
            .field("disk", &self.disk)
            .field("attempts", &self.attempts)
            .finish_non_exhaustive()
    }
}

/// Removes the in-flight entry when the request task finishes,
/// even if it panics.
struct InFlightGuard {
    resolver: Arc<ArtworkResolver>,
    key: ArtworkKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.resolver.in_flight).remove(&self.key);
    }
}

impl ArtworkResolver {
    #[must_use]
    pub fn new(
        config: ResolverConfig,
        disk: Arc<DiskTier>,
        extractor: Arc<dyn EmbeddedArtworkExtractor>,
        index_client: Arc<dyn PlatformIndexClient>,
    ) -> Self {
        Self {
            config,
            disk,
            extractor,
            index_client,
            negative_marks: Default::default(),
            in_flight: Default::default(),
            attempts: Default::default(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    #[must_use]
    pub fn disk(&self) -> &Arc<DiskTier> {
        &self.disk
    }

    /// The requested or otherwise the configured maximum dimension.
    #[must_use]
    pub fn max_dim(&self, max_dim: Option<ImageDimension>) -> ImageDimension {
        max_dim.unwrap_or(self.config.max_dim)
    }

    #[must_use]
    pub fn artwork_key(&self, media_id: &MediaId, max_dim: Option<ImageDimension>) -> ArtworkKey {
        ArtworkKey::new(media_id, self.max_dim(max_dim))
    }

    #[must_use]
    pub fn request_key(&self, request: &ArtworkRequest) -> ArtworkKey {
        self.artwork_key(&request.media_id, request.max_dim)
    }

    /// Path of a previously cached image.
    ///
    /// Only checks for the existence of the file without decoding it.
    #[must_use]
    pub fn lookup_cached(
        &self,
        media_id: &MediaId,
        max_dim: Option<ImageDimension>,
    ) -> Option<PathBuf> {
        self.disk.lookup(&self.artwork_key(media_id, max_dim))
    }

    #[must_use]
    pub fn is_marked_failed(&self, media_id: &MediaId) -> bool {
        lock(&self.negative_marks).contains(media_id)
    }

    #[must_use]
    pub fn negative_marks(&self) -> usize {
        lock(&self.negative_marks).len()
    }

    pub fn clear_negative_marks(&self) {
        lock(&self.negative_marks).clear();
    }

    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        lock(&self.in_flight).len()
    }

    #[must_use]
    pub fn attempts(&self) -> ResolverAttempts {
        self.attempts.snapshot()
    }

    /// Resolve the artwork image of a track.
    ///
    /// The work is done on a spawned task. Dropping the returned future
    /// does not affect other callers that are waiting for the same track.
    pub async fn resolve(self: &Arc<Self>, request: ArtworkRequest) -> Option<CachedArtworkRef> {
        if self.is_marked_failed(&request.media_id) {
            log::debug!("Skipping artwork of {media_id}", media_id = request.media_id);
            return None;
        }
        let key = self.request_key(&request);
        let mut pending = {
            let mut in_flight = lock(&self.in_flight);
            if let Some(pending) = in_flight.get(&key) {
                log::debug!(
                    "Awaiting pending artwork of {media_id}",
                    media_id = request.media_id
                );
                pending.clone()
            } else {
                // The previous request might have finished in between.
                if self.is_marked_failed(&request.media_id) {
                    return None;
                }
                let (tx, rx) = watch::channel(None);
                in_flight.insert(key.clone(), rx.clone());
                let guard = InFlightGuard {
                    resolver: Arc::clone(self),
                    key: key.clone(),
                };
                let resolver = Arc::clone(self);
                tokio::spawn(async move {
                    let result = resolver.resolve_uncached(request, key).await;
                    tx.send_replace(Some(result));
                    drop(guard);
                });
                rx
            }
        };
        // A closed channel without a result indicates a panic.
        let result = pending.wait_for(Option::is_some).await.ok()?;
        (*result).clone().flatten()
    }

    /// Clear the negative mark and try again.
    pub async fn retry(self: &Arc<Self>, request: ArtworkRequest) -> Option<CachedArtworkRef> {
        if lock(&self.negative_marks).remove(&request.media_id) {
            log::info!(
                "Retrying artwork of {media_id}",
                media_id = request.media_id
            );
        }
        self.resolve(request).await
    }

    async fn resolve_uncached(
        self: &Arc<Self>,
        request: ArtworkRequest,
        key: ArtworkKey,
    ) -> Option<CachedArtworkRef> {
        let request = Arc::new(request);
        for source in STRATEGIES {
            if !is_applicable(source, &request) {
                continue;
            }
            if let Some(artwork_ref) = self.attempt(source, &request, &key).await {
                log::debug!(
                    "Resolved artwork of {media_id} from {source}: {path}",
                    media_id = request.media_id,
                    path = artwork_ref.path.display(),
                );
                return Some(artwork_ref);
            }
        }
        log::info!(
            "No artwork found for {media_id}",
            media_id = request.media_id
        );
        // Marked before the result is published to prevent
        // subsequent requests from starting another attempt.
        lock(&self.negative_marks).insert(request.media_id.clone());
        None
    }

    async fn attempt(
        self: &Arc<Self>,
        source: ArtworkSource,
        request: &Arc<ArtworkRequest>,
        key: &ArtworkKey,
    ) -> Option<CachedArtworkRef> {
        self.attempts.increment(source);
        let resolver = Arc::clone(self);
        let request_clone = Arc::clone(request);
        let key_clone = key.clone();
        let task =
            spawn_blocking(move || resolver.attempt_blocking(source, &request_clone, key_clone));
        // The blocking task is abandoned but not cancelled on timeout.
        // It never writes into the disk tier.
        let attempted = match timeout(self.config.attempt_timeout, task).await {
            Ok(Ok(Ok(attempted))) => attempted?,
            Ok(Ok(Err(err))) => {
                log::warn!(
                    "Failed to load artwork of {media_id} from {source}: {err}",
                    media_id = request.media_id
                );
                return None;
            }
            Ok(Err(err)) => {
                log::error!(
                    "Failed to load artwork of {media_id} from {source}: {err}",
                    media_id = request.media_id
                );
                return None;
            }
            Err(_) => {
                log::warn!(
                    "Loading artwork of {media_id} from {source} timed out after {timeout:?}",
                    media_id = request.media_id,
                    timeout = self.config.attempt_timeout,
                );
                return None;
            }
        };
        let encoded = match attempted {
            Attempted::Cached(artwork_ref) => return Some(artwork_ref),
            Attempted::Encoded(encoded) => encoded,
        };
        let disk = Arc::clone(&self.disk);
        let key = key.clone();
        match spawn_blocking(move || store_encoded(&disk, key, encoded, source)).await {
            Ok(Ok(artwork_ref)) => Some(artwork_ref),
            Ok(Err(err)) => {
                log::warn!(
                    "Failed to store artwork of {media_id}: {err}",
                    media_id = request.media_id
                );
                None
            }
            Err(err) => {
                log::error!(
                    "Failed to store artwork of {media_id}: {err}",
                    media_id = request.media_id
                );
                None
            }
        }
    }

    fn attempt_blocking(
        &self,
        source: ArtworkSource,
        request: &ArtworkRequest,
        key: ArtworkKey,
    ) -> CacheResult<Option<Attempted>> {
        let picture = match source {
            ArtworkSource::DiskCache => return Ok(self.load_from_disk(key).map(Attempted::Cached)),
            ArtworkSource::Embedded => {
                let Some(image_data) = self.extractor.extract_embedded(&request.locator)? else {
                    return Ok(None);
                };
                load_artwork_picture(&image_data)?
            }
            ArtworkSource::AlbumThumbnail => {
                let Some(album_id) = &request.album_id else {
                    return Ok(None);
                };
                let Some(image_data) = self.index_client.album_thumbnail(album_id)? else {
                    return Ok(None);
                };
                load_artwork_picture(&image_data)?
            }
            ArtworkSource::SiblingFile => {
                let Some(file_path) = request.locator.file_path() else {
                    return Ok(None);
                };
                let Some(cover_file_path) = find_sibling_cover_file(&file_path)? else {
                    return Ok(None);
                };
                load_artwork_picture_from_file_path(&cover_file_path)?
            }
        };
        let encoded = encode_jpeg_thumbnail(
            &picture,
            self.max_dim(request.max_dim),
            self.config.jpeg_quality,
        )?;
        Ok(Some(Attempted::Encoded(encoded)))
    }

    fn load_from_disk(&self, key: ArtworkKey) -> Option<CachedArtworkRef> {
        let path = self.disk.lookup(&key)?;
        let picture = match load_artwork_picture_from_file_path(&path) {
            Ok(picture) => picture,
            Err(err) => {
                log::warn!(
                    "Deleting corrupt file {path}: {err}",
                    path = path.display()
                );
                if let Err(err) = self.disk.remove(&key) {
                    log::warn!("Failed to delete {path}: {err}", path = path.display());
                }
                return None;
            }
        };
        let image_size = image_size_of(&picture).ok()?;
        let byte_size = path.metadata().ok()?.len();
        if let Err(err) = self.disk.touch(&key) {
            log::debug!(
                "Failed to touch {path}: {err}",
                path = path.display()
            );
        }
        Some(CachedArtworkRef {
            key,
            path,
            byte_size,
            image_size,
            source: ArtworkSource::DiskCache,
        })
    }
}

fn store_encoded(
    disk: &DiskTier,
    key: ArtworkKey,
    encoded: EncodedArtworkImage,
    source: ArtworkSource,
) -> CacheResult<CachedArtworkRef> {
    let EncodedArtworkImage {
        image_data,
        image_size,
    } = encoded;
    let path = disk.write_atomic(&key, &image_data)?;
    Ok(CachedArtworkRef {
        key,
        path,
        byte_size: image_data.len() as u64,
        image_size,
        source,
    })
}
