// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use melodex_core::{
    media::{AlbumId, Locator, MediaId},
    track::{
        DurationMs, EmbeddedArtworkHint, TrackNumber, TrackRecord, UNKNOWN_ALBUM, UNKNOWN_ARTIST,
        Year,
    },
    util::clock::TimestampSecs,
};

use crate::MediaCategory;

/// An entry of the media index as reported by the platform.
///
/// Textual fields might be missing or contain garbage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub media_id: MediaId,
    pub locator: Locator,
    pub category: MediaCategory,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_id: Option<AlbumId>,
    pub duration_ms: DurationMs,
    pub date_added_sec: TimestampSecs,
    pub genre: Option<String>,
    pub year: Option<Year>,
    pub track_number: Option<TrackNumber>,

    /// `None` if unknown.
    pub has_embedded_artwork: Option<bool>,
}

fn normalize_text(text: Option<String>) -> Option<String> {
    let text = text?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.len() == text.len() {
        Some(text)
    } else {
        Some(trimmed.to_owned())
    }
}

impl RawRow {
    /// The title or a replacement derived from the locator.
    #[must_use]
    pub fn display_title(&self) -> String {
        if let Some(title) = self
            .title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
        {
            return title.to_owned();
        }
        match &self.locator {
            Locator::Path(path) => path.file_stem().map_or_else(
                || self.media_id.to_string(),
                |stem| stem.to_string_lossy().into_owned(),
            ),
            Locator::Uri(_) => self.media_id.to_string(),
        }
    }

    #[must_use]
    pub(crate) fn title_sort_key(&self) -> String {
        self.display_title().to_lowercase()
    }

    /// Normalize into a track record.
    ///
    /// Missing titles are replaced by the file name and missing
    /// artists and albums by placeholders.
    #[must_use]
    pub fn normalize(self) -> TrackRecord {
        let title = self.display_title();
        let Self {
            media_id,
            locator,
            category: _,
            title: _,
            artist,
            album,
            album_id,
            duration_ms,
            date_added_sec,
            genre,
            year,
            track_number,
            has_embedded_artwork,
        } = self;
        TrackRecord {
            media_id,
            locator,
            title,
            artist: normalize_text(artist).unwrap_or_else(|| UNKNOWN_ARTIST.to_owned()),
            album: normalize_text(album).unwrap_or_else(|| UNKNOWN_ALBUM.to_owned()),
            album_id,
            duration_ms,
            date_added_sec,
            genre: normalize_text(genre),
            year,
            track_number,
            embedded_artwork: EmbeddedArtworkHint::from_option(has_embedded_artwork),
        }
    }
}
