// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{fmt, path::PathBuf};

use data_encoding::HEXLOWER;

use crate::media::MediaId;

pub type ImageDimension = u16;

pub const ARTWORK_FILE_EXTENSION: &str = "jpg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageSize {
    pub width: ImageDimension,
    pub height: ImageDimension,
}

impl ImageSize {
    #[must_use]
    pub const fn max_dim(self) -> ImageDimension {
        if self.width > self.height {
            self.width
        } else {
            self.height
        }
    }

    /// Scale down to fit into a square of `max_dim` while preserving
    /// the aspect ratio.
    ///
    /// Images that already fit are never upsized.
    #[must_use]
    pub fn fit_into(self, max_dim: ImageDimension) -> Self {
        let Self { width, height } = self;
        if max_dim == 0 || self.max_dim() <= max_dim {
            return self;
        }
        let scale = |dim: ImageDimension, ref_dim: ImageDimension| {
            let scaled = u32::from(dim) * u32::from(max_dim) / u32::from(ref_dim);
            // The result never exceeds max_dim and is at least 1
            ImageDimension::try_from(scaled.max(1)).unwrap_or(max_dim)
        };
        if width >= height {
            Self {
                width: max_dim,
                height: scale(height, width),
            }
        } else {
            Self {
                width: scale(width, height),
                height: max_dim,
            }
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { width, height } = self;
        write!(f, "{width}x{height}")
    }
}

/// Identifies a cached artwork image.
///
/// Derived from the media id and the requested maximum dimension. The
/// same track might be cached with different sizes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArtworkKey(String);

impl ArtworkKey {
    #[must_use]
    pub fn new(media_id: &MediaId, max_dim: ImageDimension) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(media_id.as_str().as_bytes());
        hasher.update(&max_dim.to_be_bytes());
        Self(HEXLOWER.encode(hasher.finalize().as_bytes()))
    }

    /// Lower-case hex digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the shard directory.
    #[must_use]
    pub fn shard(&self) -> &str {
        &self.0[..2]
    }

    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{key}.{ARTWORK_FILE_EXTENSION}", key = self.0)
    }

    /// Recover the key from a cached file name.
    #[must_use]
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let hex = file_name
            .strip_suffix(ARTWORK_FILE_EXTENSION)?
            .strip_suffix('.')?;
        let decoded = HEXLOWER.decode(hex.as_bytes()).ok()?;
        (decoded.len() == blake3::OUT_LEN).then(|| Self(hex.to_owned()))
    }
}

impl fmt::Display for ArtworkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The strategy that produced a cached artwork image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArtworkSource {
    Embedded,
    AlbumThumbnail,
    SiblingFile,

    /// Found in the disk tier of a previous session.
    DiskCache,
}

impl ArtworkSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Embedded => "embedded",
            Self::AlbumThumbnail => "album-thumbnail",
            Self::SiblingFile => "sibling-file",
            Self::DiskCache => "disk-cache",
        }
    }
}

impl fmt::Display for ArtworkSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to an artwork image in the disk tier.
///
/// Entries are replaced as a whole and never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedArtworkRef {
    pub key: ArtworkKey,

    /// Path of the cached JPEG file.
    pub path: PathBuf,

    /// The size of the file, used as the weight.
    pub byte_size: u64,

    pub image_size: ImageSize,

    pub source: ArtworkSource,
}
