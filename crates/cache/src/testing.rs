// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    collections::HashMap,
    io::Cursor,
    path::Path,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use image::{ImageFormat, Rgb, RgbImage};

use melodex_core::{
    EmbeddedArtworkHint, MediaId, TrackRecord,
    media::{AlbumId, Locator},
};
use melodex_media_file::extract::EmbeddedArtworkExtractor;
use melodex_media_index::{
    AccessStatus, ChangeCallback, IndexFilter, IndexResult, IndexSubscription,
    PlatformIndexClient, RawRow,
};

pub(crate) const RED: Rgb<u8> = Rgb([255, 0, 0]);

pub(crate) const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

pub(crate) fn new_image_data(
    width: u32,
    height: u32,
    color: Rgb<u8>,
    format: ImageFormat,
) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, color);
    let mut image_data = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut image_data), format)
        .unwrap();
    image_data
}

pub(crate) fn new_track(title: &str) -> TrackRecord {
    TrackRecord {
        media_id: MediaId::new(format!("media-{title}")),
        locator: Locator::decode(&format!("content://media/{title}")),
        title: title.to_owned(),
        artist: "Artist".to_owned(),
        album: "Album".to_owned(),
        album_id: None,
        duration_ms: 180_000,
        date_added_sec: 0,
        genre: None,
        year: None,
        track_number: None,
        embedded_artwork: EmbeddedArtworkHint::Unknown,
    }
}

pub(crate) fn new_track_at_path(title: &str, file_path: &Path) -> TrackRecord {
    TrackRecord {
        locator: Locator::Path(file_path.to_path_buf()),
        ..new_track(title)
    }
}

/// Returns configurable image data and counts all invocations.
#[derive(Debug, Default)]
pub(crate) struct FakeExtractor {
    images: Mutex<HashMap<Locator, Vec<u8>>>,
    delay: Duration,
    attempts: AtomicUsize,
}

impl FakeExtractor {
    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

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
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        Ok(self.images.lock().unwrap().get(locator).cloned())
    }
}

/// Serves album thumbnails only.
#[derive(Debug, Default)]
pub(crate) struct FakeIndexClient {
    album_thumbnails: Mutex<HashMap<AlbumId, Vec<u8>>>,
}

impl FakeIndexClient {
    pub(crate) fn insert_album_thumbnail(&self, album_id: AlbumId, image_data: Vec<u8>) {
        self.album_thumbnails
            .lock()
            .unwrap()
            .insert(album_id, image_data);
    }
}

impl PlatformIndexClient for FakeIndexClient {
    fn check_access(&self) -> IndexResult<AccessStatus> {
        Ok(AccessStatus::Granted)
    }

    fn query_all(&self, _filter: &IndexFilter) -> IndexResult<Vec<RawRow>> {
        Ok(Vec::new())
    }

    fn album_thumbnail(&self, album_id: &AlbumId) -> IndexResult<Option<Vec<u8>>> {
        Ok(self.album_thumbnails.lock().unwrap().get(album_id).cloned())
    }

    fn subscribe_to_changes(&self, _on_changed: ChangeCallback) -> IndexResult<IndexSubscription> {
        Ok(IndexSubscription::inactive())
    }
}
