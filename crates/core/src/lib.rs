// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

pub mod artwork;
pub use self::artwork::{ArtworkKey, ArtworkSource, CachedArtworkRef, ImageSize};

pub mod media;
pub use self::media::{AlbumId, Locator, MediaId};

pub mod scan;
pub use self::scan::{ScanMode, ScanState};

mod statistics;
pub use self::statistics::{CacheStatistics, DiskTierStatistics, MemoryTierStatistics};

pub mod track;
pub use self::track::{EmbeddedArtworkHint, TrackRecord};

pub mod util;

pub mod prelude {
    pub use crate::{
        AlbumId, ArtworkKey, ArtworkSource, CachedArtworkRef, EmbeddedArtworkHint, Locator,
        MediaId, ScanMode, ScanState, TrackRecord,
    };
}
