// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::{Path, PathBuf};

use melodex_core::{MediaId, TrackRecord, util::clock::TimestampMillis};

use crate::RepoResult;

/// Track persistence on top of a single database connection.
///
/// Tracks are only ever written as a whole, keyed by their media id.
/// The artwork path is maintained separately and survives upserts.
pub trait TrackRepo {
    /// Insert new or replace existing tracks.
    ///
    /// Returns the number of affected rows.
    fn upsert_tracks(
        &mut self,
        updated_at: TimestampMillis,
        tracks: &[TrackRecord],
    ) -> RepoResult<usize>;

    /// Load all tracks in insertion order.
    fn load_all_tracks(&mut self) -> RepoResult<Vec<TrackRecord>>;

    /// Load all tracks without an artwork path.
    fn load_tracks_missing_artwork(&mut self) -> RepoResult<Vec<TrackRecord>>;

    /// Fails with [`crate::RepoError::NotFound`] for unknown tracks.
    fn load_track_artwork_path(&mut self, media_id: &MediaId) -> RepoResult<Option<PathBuf>>;

    /// Fails with [`crate::RepoError::NotFound`] for unknown tracks.
    fn update_track_artwork_path(
        &mut self,
        updated_at: TimestampMillis,
        media_id: &MediaId,
        artwork_path: Option<&Path>,
    ) -> RepoResult<()>;

    /// Returns the number of deleted rows.
    fn delete_tracks(&mut self, media_ids: &[MediaId]) -> RepoResult<usize>;
}

/// Thread-safe, shared access to the durable track store.
///
/// All operations are blocking and must not be invoked on an async
/// executor thread. Each operation is executed atomically.
pub trait TrackStore: Send + Sync + 'static {
    fn upsert_tracks(&self, tracks: &[TrackRecord]) -> RepoResult<usize>;

    fn load_all_tracks(&self) -> RepoResult<Vec<TrackRecord>>;

    fn load_tracks_missing_artwork(&self) -> RepoResult<Vec<TrackRecord>>;

    fn update_track_artwork_path(&self, media_id: &MediaId, artwork_path: &Path)
    -> RepoResult<()>;

    fn delete_tracks(&self, media_ids: &[MediaId]) -> RepoResult<usize>;
}
