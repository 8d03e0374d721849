// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Caching of tracks and artwork images.
//!
//! Tracks, artwork references and search results are kept in separate,
//! bounded memory tiers. Resized artwork images are stored as JPEG files
//! in a disk tier that is shared across sessions.

use std::{io, result::Result as StdResult};

use thiserror::Error;

use melodex_media_index::IndexError;

pub mod disk;
pub use self::disk::DiskTier;

pub mod manager;
pub use self::manager::{CacheManager, CacheManagerConfig};

pub mod memory;
pub use self::memory::WeightedLru;

pub mod resolver;
pub use self::resolver::{ArtworkRequest, ArtworkResolver, ResolverAttempts, ResolverConfig};

pub mod strategy;
pub use self::strategy::{
    CacheStrategy, CleanupLevel, CleanupOutcome, PreloadOutcome, PreloadStrategy, StrategyConfig,
};

#[cfg(test)]
mod testing;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Media(#[from] melodex_media_file::Error),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type CacheResult<T> = StdResult<T, CacheError>;
