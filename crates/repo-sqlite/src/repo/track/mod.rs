// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::{Path, PathBuf};

use melodex_core::util::clock::TimestampMillis;
use melodex_repo::track::TrackRepo;

use crate::{
    db::track::{models::*, schema::*},
    prelude::*,
};

/// Keeps the number of bound parameters per statement well below
/// the limits of SQLite.
const DELETE_CHUNK_SIZE: usize = 512;

fn load_records(
    connection: &mut DbConnection,
    query: track::BoxedQuery<'_, DbBackend>,
) -> RepoResult<Vec<TrackRecord>> {
    let records = query
        .order_by(track::row_id)
        .load::<QueryableRecord>(connection)
        .map_err(repo_error)?;
    records
        .into_iter()
        .map(TrackRecord::try_from)
        .collect::<anyhow::Result<_>>()
        .map_err(Into::into)
}

impl TrackRepo for Connection<'_> {
    fn upsert_tracks(
        &mut self,
        updated_at: TimestampMillis,
        tracks: &[TrackRecord],
    ) -> RepoResult<usize> {
        let mut rows_affected = 0;
        for record in tracks {
            let insertable = InsertableRecord::bind(updated_at, record)?;
            let updatable = UpdatableRecord::from(&insertable);
            rows_affected += diesel::insert_into(track::table)
                .values(&insertable)
                .on_conflict(track::media_id)
                .do_update()
                .set(&updatable)
                .execute(self.as_mut())
                .map_err(repo_error)?;
        }
        log::debug!("Upserted {rows_affected} of {count} track(s)", count = tracks.len());
        Ok(rows_affected)
    }

    fn load_all_tracks(&mut self) -> RepoResult<Vec<TrackRecord>> {
        load_records(self.as_mut(), track::table.into_boxed())
    }

    fn load_tracks_missing_artwork(&mut self) -> RepoResult<Vec<TrackRecord>> {
        load_records(
            self.as_mut(),
            track::table
                .filter(track::artwork_path.is_null())
                .into_boxed(),
        )
    }

    fn load_track_artwork_path(&mut self, media_id: &MediaId) -> RepoResult<Option<PathBuf>> {
        track::table
            .select(track::artwork_path)
            .filter(track::media_id.eq(media_id.as_str()))
            .first::<Option<String>>(self.as_mut())
            .map(|artwork_path| artwork_path.map(PathBuf::from))
            .map_err(repo_error)
    }

    fn update_track_artwork_path(
        &mut self,
        updated_at: TimestampMillis,
        media_id: &MediaId,
        artwork_path: Option<&Path>,
    ) -> RepoResult<()> {
        let artwork_path = artwork_path
            .map(|path| {
                path.to_str().ok_or_else(|| {
                    anyhow::anyhow!("unsupported artwork path: {}", path.display())
                })
            })
            .transpose()?;
        let target = track::table.filter(track::media_id.eq(media_id.as_str()));
        let rows_affected = diesel::update(target)
            .set((
                track::row_updated_ms.eq(updated_at),
                track::artwork_path.eq(artwork_path),
            ))
            .execute(self.as_mut())
            .map_err(repo_error)?;
        debug_assert!(rows_affected <= 1);
        if rows_affected < 1 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    fn delete_tracks(&mut self, media_ids: &[MediaId]) -> RepoResult<usize> {
        let mut rows_affected = 0;
        for chunk in media_ids.chunks(DELETE_CHUNK_SIZE) {
            let target =
                track::table.filter(track::media_id.eq_any(chunk.iter().map(MediaId::as_str)));
            rows_affected += diesel::delete(target)
                .execute(self.as_mut())
                .map_err(repo_error)?;
        }
        Ok(rows_affected)
    }
}
