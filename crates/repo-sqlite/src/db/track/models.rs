// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use anyhow::anyhow;

use melodex_core::util::clock::{TimestampMillis, TimestampSecs};

use crate::prelude::*;

use super::schema::*;

#[derive(Debug, Queryable)]
#[allow(dead_code)] // row_ members are required for Diesel but never read
pub(crate) struct QueryableRecord {
    pub(crate) row_id: RowId,
    pub(crate) row_created_ms: TimestampMillis,
    pub(crate) row_updated_ms: TimestampMillis,
    pub(crate) media_id: String,
    pub(crate) locator: String,
    pub(crate) title: String,
    pub(crate) artist: String,
    pub(crate) album: String,
    pub(crate) album_id: Option<String>,
    pub(crate) duration_ms: i64,
    pub(crate) date_added_sec: TimestampSecs,
    pub(crate) genre: Option<String>,
    pub(crate) year: Option<i16>,
    pub(crate) track_number: Option<i32>,
    pub(crate) has_embedded_artwork: Option<bool>,
    pub(crate) artwork_path: Option<String>,
}

impl TryFrom<QueryableRecord> for TrackRecord {
    type Error = anyhow::Error;

    fn try_from(from: QueryableRecord) -> anyhow::Result<Self> {
        let QueryableRecord {
            row_id: _,
            row_created_ms: _,
            row_updated_ms: _,
            media_id,
            locator,
            title,
            artist,
            album,
            album_id,
            duration_ms,
            date_added_sec,
            genre,
            year,
            track_number,
            has_embedded_artwork,
            artwork_path: _,
        } = from;
        let duration_ms = u64::try_from(duration_ms)
            .map_err(|_| anyhow!("invalid duration of track {media_id}: {duration_ms} ms"))?;
        let track_number = track_number
            .map(|track_number| {
                u16::try_from(track_number).map_err(|_| {
                    anyhow!("invalid track number of track {media_id}: {track_number}")
                })
            })
            .transpose()?;
        let into = Self {
            media_id: MediaId::new(media_id),
            locator: Locator::decode(&locator),
            title,
            artist,
            album,
            album_id: album_id.map(AlbumId::new),
            duration_ms,
            date_added_sec,
            genre,
            year,
            track_number,
            embedded_artwork: EmbeddedArtworkHint::from_option(has_embedded_artwork),
        };
        Ok(into)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = track)]
pub(crate) struct InsertableRecord<'a> {
    pub(crate) row_created_ms: TimestampMillis,
    pub(crate) row_updated_ms: TimestampMillis,
    pub(crate) media_id: &'a str,
    pub(crate) locator: String,
    pub(crate) title: &'a str,
    pub(crate) artist: &'a str,
    pub(crate) album: &'a str,
    pub(crate) album_id: Option<&'a str>,
    pub(crate) duration_ms: i64,
    pub(crate) date_added_sec: TimestampSecs,
    pub(crate) genre: Option<&'a str>,
    pub(crate) year: Option<i16>,
    pub(crate) track_number: Option<i32>,
    pub(crate) has_embedded_artwork: Option<bool>,
}

impl<'a> InsertableRecord<'a> {
    pub(crate) fn bind(created_at: TimestampMillis, track: &'a TrackRecord) -> anyhow::Result<Self> {
        let TrackRecord {
            media_id,
            locator,
            title,
            artist,
            album,
            album_id,
            duration_ms,
            date_added_sec,
            genre,
            year,
            track_number,
            embedded_artwork,
        } = track;
        let duration_ms = i64::try_from(*duration_ms)
            .map_err(|_| anyhow!("invalid duration of track {media_id}: {duration_ms} ms"))?;
        Ok(Self {
            row_created_ms: created_at,
            row_updated_ms: created_at,
            media_id: media_id.as_str(),
            locator: locator.encode(),
            title,
            artist,
            album,
            album_id: album_id.as_ref().map(AlbumId::as_str),
            duration_ms,
            date_added_sec: *date_added_sec,
            genre: genre.as_deref(),
            year: *year,
            track_number: track_number.map(i32::from),
            has_embedded_artwork: embedded_artwork.to_option(),
        })
    }
}

/// All columns that are replaced when re-inserting an existing track.
///
/// The artwork path is not touched.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = track, treat_none_as_null = true)]
pub(crate) struct UpdatableRecord<'a> {
    pub(crate) row_updated_ms: TimestampMillis,
    pub(crate) locator: &'a str,
    pub(crate) title: &'a str,
    pub(crate) artist: &'a str,
    pub(crate) album: &'a str,
    pub(crate) album_id: Option<&'a str>,
    pub(crate) duration_ms: i64,
    pub(crate) date_added_sec: TimestampSecs,
    pub(crate) genre: Option<&'a str>,
    pub(crate) year: Option<i16>,
    pub(crate) track_number: Option<i32>,
    pub(crate) has_embedded_artwork: Option<bool>,
}

impl<'a> From<&'a InsertableRecord<'a>> for UpdatableRecord<'a> {
    fn from(from: &'a InsertableRecord<'a>) -> Self {
        let InsertableRecord {
            row_created_ms: _,
            row_updated_ms,
            media_id: _,
            locator,
            title,
            artist,
            album,
            album_id,
            duration_ms,
            date_added_sec,
            genre,
            year,
            track_number,
            has_embedded_artwork,
        } = from;
        Self {
            row_updated_ms: *row_updated_ms,
            locator,
            title,
            artist,
            album,
            album_id: *album_id,
            duration_ms: *duration_ms,
            date_added_sec: *date_added_sec,
            genre: *genre,
            year: *year,
            track_number: *track_number,
            has_embedded_artwork: *has_embedded_artwork,
        }
    }
}
