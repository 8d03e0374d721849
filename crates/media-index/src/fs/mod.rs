// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Media index that is backed by directories of the local file system.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use data_encoding::HEXLOWER;
use notify::{RecursiveMode, Watcher as _};
use walkdir::{DirEntry, WalkDir};

use melodex_core::{
    media::{AlbumId, Locator, MediaId},
    util::clock::{TimestampSecs, unix_timestamp_secs},
};
use melodex_media_file::{
    io::import::{
        ProbedAudioFile, load_embedded_artwork_image_data_from_file_path, probe_audio_file,
    },
    util::{digest::MediaDigest, guess_mime_from_file_path},
};

use crate::{
    AccessStatus, ChangeCallback, IndexError, IndexFilter, IndexResult, IndexSubscription,
    MediaCategory, PlatformIndexClient, RawRow,
};

/// Number of digest bytes that are encoded into an [`AlbumId`].
const ALBUM_ID_DIGEST_LEN: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FsMediaIndexConfig {
    /// Music directories that are scanned recursively.
    pub root_dirs: Vec<PathBuf>,

    pub follow_links: bool,
}

fn is_hidden_dir_entry(dir_entry: &DirEntry) -> bool {
    dir_entry.depth() > 0
        && dir_entry.file_type().is_dir()
        && dir_entry
            .file_name()
            .to_str()
            .is_some_and(|dir_name| dir_name.starts_with('.'))
}

/// Classify by the innermost conventional directory name.
fn category_of_relative_path(relative_path: &Path) -> MediaCategory {
    let Some(parent_path) = relative_path.parent() else {
        return MediaCategory::Music;
    };
    parent_path
        .components()
        .rev()
        .filter_map(|component| component.as_os_str().to_str())
        .find_map(MediaCategory::from_dir_name)
        .unwrap_or(MediaCategory::Music)
}

/// Derive a stable album identifier from the album artist and title.
#[must_use]
pub fn album_id_of(album_artist: Option<&str>, album: &str) -> AlbumId {
    let mut digest = MediaDigest::new();
    let digest = digest
        .digest_field(&album_artist.unwrap_or_default().to_lowercase())
        .digest_field(&album.to_lowercase())
        .finalize_reset();
    AlbumId::new(HEXLOWER.encode(&digest[..ALBUM_ID_DIGEST_LEN]))
}

fn date_added_sec(metadata: &fs::Metadata) -> TimestampSecs {
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .map(unix_timestamp_secs)
        .unwrap_or_default()
}

/// Enumerates and watches audio files below the configured root directories.
#[derive(Debug)]
pub struct FsMediaIndex {
    config: FsMediaIndexConfig,

    /// Files with embedded artwork per album, recorded during
    /// the last enumeration.
    album_artwork_files: Mutex<HashMap<AlbumId, Vec<PathBuf>>>,
}

impl FsMediaIndex {
    #[must_use]
    pub fn new(config: FsMediaIndexConfig) -> Self {
        Self {
            config,
            album_artwork_files: Default::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &FsMediaIndexConfig {
        &self.config
    }

    fn read_row(root_dir: &Path, dir_entry: &DirEntry) -> IndexResult<Option<RawRow>> {
        let path = dir_entry.path();
        if guess_mime_from_file_path(path).is_err() {
            log::debug!("Skipping non-audio file {}", path.display());
            return Ok(None);
        }
        let file_path = path.canonicalize()?;
        let Some(media_id) = MediaId::from_file_path(&file_path) else {
            log::warn!("Skipping file with unsupported path {}", file_path.display());
            return Ok(None);
        };
        let probed = match probe_audio_file(&file_path) {
            Ok(probed) => probed,
            Err(melodex_media_file::Error::Io(err)) => return Err(err.into()),
            Err(err) => {
                log::warn!("Skipping unreadable file {}: {err}", file_path.display());
                return Ok(None);
            }
        };
        let category = category_of_relative_path(path.strip_prefix(root_dir).unwrap_or(path));
        let date_added_sec = date_added_sec(&dir_entry.metadata().map_err(io::Error::from)?);
        let ProbedAudioFile {
            title,
            artist,
            album,
            album_artist,
            genre,
            year,
            track_number,
            duration,
            has_embedded_artwork,
        } = probed;
        let album_id = album.as_deref().map(|album| {
            album_id_of(album_artist.as_deref().or(artist.as_deref()), album)
        });
        let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        Ok(Some(RawRow {
            media_id,
            locator: Locator::Path(file_path),
            category,
            title,
            artist,
            album,
            album_id,
            duration_ms,
            date_added_sec,
            genre,
            year,
            track_number,
            has_embedded_artwork: Some(has_embedded_artwork),
        }))
    }

    fn visit_root_dir(&self, root_dir: &Path, rows: &mut Vec<RawRow>) -> IndexResult<()> {
        let walkdir = WalkDir::new(root_dir)
            .follow_links(self.config.follow_links)
            .min_depth(0);
        for dir_entry in walkdir
            .into_iter()
            .filter_entry(|dir_entry| !is_hidden_dir_entry(dir_entry))
        {
            let dir_entry = match dir_entry {
                Ok(dir_entry) => dir_entry,
                Err(err) => {
                    if let Some(loop_ancestor) = err.loop_ancestor() {
                        log::info!(
                            "Cycle detected while visiting directory: {path}",
                            path = loop_ancestor.display()
                        );
                        continue;
                    }
                    if err.depth() == 0 {
                        // The root directory itself is inaccessible
                        return Err(io::Error::from(err).into());
                    }
                    if let Some(path) = err.path() {
                        log::warn!("Failed to visit {path}: {err}", path = path.display());
                    }
                    continue;
                }
            };
            if !dir_entry.file_type().is_file() {
                continue;
            }
            match Self::read_row(root_dir, &dir_entry) {
                Ok(Some(row)) => rows.push(row),
                Ok(None) => (),
                Err(err) => {
                    log::warn!(
                        "Failed to read {path}: {err}",
                        path = dir_entry.path().display()
                    );
                }
            }
        }
        Ok(())
    }

    fn update_album_artwork_files(&self, rows: &[RawRow]) {
        let mut album_artwork_files = HashMap::<_, Vec<_>>::new();
        for row in rows {
            let (Some(album_id), Some(true), Locator::Path(file_path)) =
                (&row.album_id, row.has_embedded_artwork, &row.locator)
            else {
                continue;
            };
            album_artwork_files
                .entry(album_id.clone())
                .or_default()
                .push(file_path.clone());
        }
        *self
            .album_artwork_files
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = album_artwork_files;
    }
}

impl PlatformIndexClient for FsMediaIndex {
    fn check_access(&self) -> IndexResult<AccessStatus> {
        if self.config.root_dirs.is_empty() {
            log::info!("No music directories configured");
            return Ok(AccessStatus::Denied);
        }
        for root_dir in &self.config.root_dirs {
            match fs::read_dir(root_dir) {
                Ok(_) => (),
                Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                    log::info!("Access to {} denied", root_dir.display());
                    return Ok(AccessStatus::Denied);
                }
                Err(err) => return Err(IndexError::Io(err)),
            }
        }
        Ok(AccessStatus::Granted)
    }

    fn query_all(&self, filter: &IndexFilter) -> IndexResult<Vec<RawRow>> {
        let mut rows = Vec::new();
        for root_dir in &self.config.root_dirs {
            self.visit_root_dir(root_dir, &mut rows)?;
        }
        // Overlapping root directories must not produce duplicates
        rows.sort_by(|lhs, rhs| lhs.media_id.cmp(&rhs.media_id));
        rows.dedup_by(|lhs, rhs| lhs.media_id == rhs.media_id);
        self.update_album_artwork_files(&rows);
        let total_count = rows.len();
        filter.apply(&mut rows);
        log::debug!(
            "Found {accepted_count} of {total_count} audio file(s)",
            accepted_count = rows.len()
        );
        Ok(rows)
    }

    fn album_thumbnail(&self, album_id: &AlbumId) -> IndexResult<Option<Vec<u8>>> {
        let file_paths = self
            .album_artwork_files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(album_id)
            .cloned()
            .unwrap_or_default();
        for file_path in file_paths {
            match load_embedded_artwork_image_data_from_file_path(&file_path) {
                Ok(Some(image_data)) => return Ok(Some(image_data)),
                Ok(None) => (),
                Err(err) => {
                    log::debug!(
                        "Failed to load album artwork from {path}: {err}",
                        path = file_path.display()
                    );
                }
            }
        }
        Ok(None)
    }

    fn subscribe_to_changes(&self, on_changed: ChangeCallback) -> IndexResult<IndexSubscription> {
        let mut watcher = notify::recommended_watcher(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    if !event.kind.is_access() {
                        on_changed();
                    }
                }
                Err(err) => {
                    log::warn!("File system watcher failed: {err}");
                }
            },
        )
        .map_err(|err| IndexError::Other(err.into()))?;
        for root_dir in &self.config.root_dirs {
            watcher
                .watch(root_dir, RecursiveMode::Recursive)
                .map_err(|err| IndexError::Other(err.into()))?;
        }
        Ok(IndexSubscription::new(watcher))
    }
}
