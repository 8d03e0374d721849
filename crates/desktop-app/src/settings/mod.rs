// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use discro::Subscriber;
use serde::{Deserialize, Serialize};
use url::Url;

use melodex_cache::{ResolverConfig, StrategyConfig, resolver::DEFAULT_MAX_DIM};
use melodex_core::{ScanMode, artwork::ImageDimension};
use melodex_media_index::{IndexFilter, fs::FsMediaIndexConfig};
use melodex_repo_sqlite::store::DatabaseConfig;

use crate::{CoordinatorConfig, Observable, ObservableRef, coordinator::DEFAULT_PREFETCH_COUNT};

pub const FILE_NAME: &str = "melodex_settings";

pub const FILE_SUFFIX: &str = "ron";

pub const DEFAULT_DATABASE_FILE_NAME: &str = "melodex";

pub const DEFAULT_DATABASE_FILE_SUFFIX: &str = "sqlite";

pub const DEFAULT_ARTWORK_CACHE_DIR_NAME: &str = "artwork";

pub const DEFAULT_DISK_CACHE_CAPACITY_MIB: u32 = 100;

pub const DEFAULT_MIN_DURATION_SECS: u32 = 30;

const BYTES_PER_MIB: u64 = 1024 * 1024;

pub mod tasklet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct State {
    /// File path of the SQLite database.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<Url>,

    /// Directories that are scanned for music files.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub music_dirs: Vec<PathBuf>,

    /// Root directory of the disk tier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artwork_cache_dir: Option<PathBuf>,

    pub disk_cache_capacity_mib: u32,

    /// Maximum width and height of cached artwork images.
    pub artwork_max_dim: ImageDimension,

    /// Shorter tracks are ignored.
    pub min_duration_secs: u32,

    pub scan_mode: ScanMode,

    /// Number of tracks with artwork resolved while scanning.
    pub prefetch_count: usize,
}

impl Default for State {
    fn default() -> Self {
        Self {
            database_url: None,
            music_dirs: Vec::new(),
            artwork_cache_dir: None,
            disk_cache_capacity_mib: DEFAULT_DISK_CACHE_CAPACITY_MIB,
            artwork_max_dim: DEFAULT_MAX_DIM,
            min_duration_secs: DEFAULT_MIN_DURATION_SECS,
            scan_mode: ScanMode::default(),
            prefetch_count: DEFAULT_PREFETCH_COUNT,
        }
    }
}

impl State {
    pub fn restore_from_parent_dir(parent_dir: &Path) -> anyhow::Result<Self> {
        log::info!("Loading saved settings from: {}", parent_dir.display());
        let mut settings = Self::load(parent_dir)
            .map_err(|err| {
                log::warn!("Failed to load saved settings: {err}");
            })
            .unwrap_or_default();
        if settings.database_url.is_none() {
            let database_file_path = default_database_file_path(parent_dir.to_path_buf());
            log::info!(
                "Using default SQLite database: {}",
                database_file_path.display()
            );
            settings.database_url = Url::from_file_path(&database_file_path).ok();
        }
        if settings.artwork_cache_dir.is_none() {
            let artwork_cache_dir = parent_dir.join(DEFAULT_ARTWORK_CACHE_DIR_NAME);
            log::info!(
                "Using default artwork cache directory: {}",
                artwork_cache_dir.display()
            );
            settings.artwork_cache_dir = Some(artwork_cache_dir);
        }
        Ok(settings)
    }

    pub fn load(parent_dir: &Path) -> anyhow::Result<State> {
        let file_path = new_settings_file_path(parent_dir.to_path_buf());
        log::info!("Loading settings from file: {}", file_path.display());
        match fs::read(&file_path) {
            Ok(bytes) => ron::de::from_bytes(&bytes).map_err(Into::into),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Default::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn save(&self, parent_dir: &Path) -> anyhow::Result<()> {
        let file_path = new_settings_file_path(parent_dir.to_path_buf());
        log::info!("Saving current settings into file: {}", file_path.display());
        let bytes = ron::ser::to_string_pretty(self, Default::default())?.into_bytes();
        if let Some(parent_path) = file_path.parent() {
            fs::create_dir_all(parent_path)?;
        }
        fs::write(&file_path, &bytes)?;
        Ok(())
    }

    pub async fn save_spawn_blocking(self, parent_dir: PathBuf) -> anyhow::Result<()> {
        match tokio::task::spawn_blocking(move || self.save(&parent_dir)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                anyhow::bail!("failed to save: {err}");
            }
            Err(err) => {
                anyhow::bail!("failed to join blocking task after saving: {err}");
            }
        }
    }

    pub fn create_database_config(&self) -> anyhow::Result<DatabaseConfig> {
        let url = self
            .database_url
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("missing database URL"))?;
        let file_path = url
            .to_file_path()
            .map_err(|()| anyhow::anyhow!("unsupported database URL: {url}"))?;
        Ok(DatabaseConfig::new(file_path.to_string_lossy()))
    }

    pub fn artwork_cache_dir(&self) -> anyhow::Result<&Path> {
        self.artwork_cache_dir
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("missing artwork cache directory"))
    }

    #[must_use]
    pub fn index_filter(&self) -> IndexFilter {
        IndexFilter {
            min_duration: Duration::from_secs(self.min_duration_secs.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn fs_index_config(&self) -> FsMediaIndexConfig {
        FsMediaIndexConfig {
            root_dirs: self.music_dirs.clone(),
            follow_links: false,
        }
    }

    #[must_use]
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            max_dim: self.artwork_max_dim,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn strategy_config(&self) -> StrategyConfig {
        StrategyConfig {
            disk_capacity_bytes: u64::from(self.disk_cache_capacity_mib) * BYTES_PER_MIB,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            filter: self.index_filter(),
            scan_mode: self.scan_mode,
            prefetch_count: self.prefetch_count,
        }
    }

    pub fn update_music_dirs(&mut self, new_music_dirs: Vec<PathBuf>) -> bool {
        if self.music_dirs == new_music_dirs {
            // No effect
            return false;
        }
        log::info!("Updating music directories: {new_music_dirs:?}");
        self.music_dirs = new_music_dirs;
        true
    }
}

#[must_use]
fn new_settings_file_path(parent_dir: PathBuf) -> PathBuf {
    let mut path_buf = parent_dir;
    path_buf.push(FILE_NAME);
    path_buf.set_extension(FILE_SUFFIX);
    path_buf
}

#[must_use]
fn default_database_file_path(parent_dir: PathBuf) -> PathBuf {
    let mut path_buf = parent_dir;
    path_buf.push(DEFAULT_DATABASE_FILE_NAME);
    path_buf.set_extension(DEFAULT_DATABASE_FILE_SUFFIX);
    path_buf
}

/// Manages the mutable, observable settings
#[derive(Debug, Default)]
pub struct ObservableState(Observable<State>);

impl ObservableState {
    #[must_use]
    pub fn new(initial_state: State) -> Self {
        Self(Observable::new(initial_state))
    }

    #[must_use]
    pub fn read(&self) -> ObservableRef<'_, State> {
        self.0.read()
    }

    #[must_use]
    pub fn subscribe_changed(&self) -> Subscriber<State> {
        self.0.subscribe_changed()
    }

    #[allow(clippy::must_use_candidate)]
    pub fn modify(&self, modify_state: impl FnOnce(&mut State) -> bool) -> bool {
        self.0.modify(modify_state)
    }

    #[allow(clippy::must_use_candidate)]
    pub fn update_music_dirs(&self, new_music_dirs: Vec<PathBuf>) -> bool {
        self.modify(|state| state.update_music_dirs(new_music_dirs))
    }
}

#[cfg(test)]
mod tests;
