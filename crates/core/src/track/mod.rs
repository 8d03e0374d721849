// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::{
    media::{AlbumId, Locator, MediaId},
    util::clock::TimestampSecs,
};

pub type DurationMs = u64;

pub type TrackNumber = u16;

pub type Year = i16;

/// Does the audio file contain an embedded artwork image?
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EmbeddedArtworkHint {
    /// Not (yet) known.
    #[default]
    Unknown,

    /// The tags contain at least one picture.
    Present,

    /// The tags contain no pictures.
    Absent,
}

impl EmbeddedArtworkHint {
    #[must_use]
    pub const fn from_option(value: Option<bool>) -> Self {
        match value {
            None => Self::Unknown,
            Some(true) => Self::Present,
            Some(false) => Self::Absent,
        }
    }

    #[must_use]
    pub const fn to_option(self) -> Option<bool> {
        match self {
            Self::Unknown => None,
            Self::Present => Some(true),
            Self::Absent => Some(false),
        }
    }

    /// Is it worth trying to extract an embedded image?
    #[must_use]
    pub const fn may_be_present(self) -> bool {
        !matches!(self, Self::Absent)
    }
}

pub const UNKNOWN_ARTIST: &str = "<unknown>";

pub const UNKNOWN_ALBUM: &str = "<unknown>";

/// A normalized track as published by the media index synchronization.
///
/// Records are immutable snapshots. Each scan supersedes the
/// record with the same [`MediaId`] as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackRecord {
    pub media_id: MediaId,

    pub locator: Locator,

    pub title: String,

    pub artist: String,

    pub album: String,

    pub album_id: Option<AlbumId>,

    pub duration_ms: DurationMs,

    /// Seconds since the Unix epoch.
    pub date_added_sec: TimestampSecs,

    pub genre: Option<String>,

    pub year: Option<Year>,

    pub track_number: Option<TrackNumber>,

    pub embedded_artwork: EmbeddedArtworkHint,
}

impl TrackRecord {
    /// Case-insensitive sort key for ordering by title.
    #[must_use]
    pub fn title_sort_key(&self) -> (String, &MediaId) {
        (self.title.to_lowercase(), &self.media_id)
    }

    /// Does any of the textual fields contain the (lower-case) query?
    #[must_use]
    pub fn matches_query(&self, lowercase_query: &str) -> bool {
        debug_assert_eq!(lowercase_query, lowercase_query.to_lowercase());
        [&self.title, &self.artist, &self.album]
            .into_iter()
            .chain(self.genre.as_ref())
            .any(|field| field.to_lowercase().contains(lowercase_query))
    }
}
