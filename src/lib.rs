// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Media index synchronization and artwork caching.
//!
//! Re-exports the sub-crates that are enabled by features.

pub use melodex_core::*;

#[cfg(feature = "media-file")]
pub use melodex_media_file as media_file;

#[cfg(feature = "media-index")]
pub use melodex_media_index as media_index;

#[cfg(feature = "cache")]
pub use melodex_cache as cache;

#[cfg(feature = "repo")]
pub use melodex_repo as repo;

#[cfg(feature = "sqlite")]
pub use melodex_repo_sqlite as repo_sqlite;

#[cfg(feature = "desktop-app")]
pub use melodex_desktop_app as desktop_app;
