// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::Arc;

use melodex_cache::{
    ArtworkResolver, CacheManager, CacheManagerConfig, CacheStrategy, DiskTier,
};
use melodex_media_file::extract::{EmbeddedArtworkExtractor, LoftyExtractor};
use melodex_media_index::{PlatformIndexClient, fs::FsMediaIndex};
use melodex_repo_sqlite::store::SqliteTrackStore;

use crate::{IndexCoordinator, settings};

/// Runtime environment of a desktop app.
///
/// All components are wired once when commissioning. Modifying the
/// settings at runtime requires to commission a new environment.
#[allow(missing_debug_implementations)]
pub struct Environment {
    settings: settings::State,
    coordinator: Arc<IndexCoordinator>,
}

impl Environment {
    /// Set up the runtime environment for indexing local files.
    pub fn commission(settings: &settings::State) -> anyhow::Result<Self> {
        let index_client = Arc::new(FsMediaIndex::new(settings.fs_index_config()));
        Self::commission_with(settings, index_client, Arc::new(LoftyExtractor))
    }

    /// Set up the runtime environment for the given platform services.
    pub fn commission_with(
        settings: &settings::State,
        index_client: Arc<dyn PlatformIndexClient>,
        extractor: Arc<dyn EmbeddedArtworkExtractor>,
    ) -> anyhow::Result<Self> {
        log::info!("Commissioning runtime environment");
        let database_config = settings.create_database_config()?;
        let store = SqliteTrackStore::provision(&database_config)?;
        let disk_tier = DiskTier::new(settings.artwork_cache_dir()?.to_path_buf());
        disk_tier.create_dir_all()?;
        let resolver = ArtworkResolver::new(
            settings.resolver_config(),
            Arc::new(disk_tier),
            extractor,
            Arc::clone(&index_client),
        );
        let manager = CacheManager::new(&CacheManagerConfig::default());
        let strategy = CacheStrategy::new(
            settings.strategy_config(),
            Arc::new(manager),
            Arc::new(resolver),
        );
        let coordinator = IndexCoordinator::new(
            settings.coordinator_config(),
            index_client,
            Arc::new(store),
            strategy,
        );
        Ok(Self {
            settings: settings.clone(),
            coordinator: Arc::new(coordinator),
        })
    }

    /// Prepare for tear down.
    ///
    /// Stops listening for changes. Pending scans could still proceed
    /// until finished.
    pub fn decommission(&self) {
        log::info!("Decommissioning runtime environment");
        self.coordinator.shutdown();
    }

    /// The settings at the time of commissioning.
    #[must_use]
    pub const fn settings(&self) -> &settings::State {
        &self.settings
    }

    #[must_use]
    pub const fn coordinator(&self) -> &Arc<IndexCoordinator> {
        &self.coordinator
    }
}

#[cfg(test)]
mod tests {
    use melodex_core::{ScanMode, ScanState};

    use super::*;
    use crate::testing::{FakeExtractor, FakeIndexClient, new_row};

    #[tokio::test(flavor = "multi_thread")]
    async fn commission_and_restart() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let mut settings = settings::State::restore_from_parent_dir(temp_dir.path())?;
        settings.scan_mode = ScanMode::MetadataOnly;
        let index_client = Arc::new(FakeIndexClient::default());
        index_client.set_rows((0..3).map(new_row).collect());

        let environment = Environment::commission_with(
            &settings,
            Arc::clone(&index_client) as _,
            Arc::new(FakeExtractor::default()),
        )?;
        let initial_scan = environment.coordinator().start().await.unwrap();
        initial_scan.await?;
        assert_eq!(ScanState::Completed(3), *environment.coordinator().scan_state());
        environment.decommission();
        drop(environment);

        // The tracks are restored from the database before scanning
        index_client.set_query_gate_open(false);
        let environment = Environment::commission_with(
            &settings,
            Arc::clone(&index_client) as _,
            Arc::new(FakeExtractor::default()),
        )?;
        let initial_scan = environment.coordinator().start().await.unwrap();
        assert_eq!(3, environment.coordinator().track_list().len());
        index_client.set_query_gate_open(true);
        initial_scan.await?;
        assert_eq!(
            Some(crate::ScanReport {
                unchanged: 3,
                ..Default::default()
            }),
            environment.coordinator().last_scan_report()
        );

        Ok(())
    }
}
