// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{num::NonZeroU32, path::Path};

use diesel::Connection as _;

use melodex_core::{MediaId, TrackRecord, util::clock::now_unix_timestamp_millis};
use melodex_repo::{RepoError, RepoResult, track::TrackRepo as _, track::TrackStore};

use crate::{
    DbConnection, initialize_database,
    pool::{ConnectionPool, create_connection_pool, get_pooled_connection},
    prelude::{Connection, DieselTransactionError, RepoTransactionError},
    run_migrations,
};

pub const DEFAULT_MAX_CONNECTIONS: NonZeroU32 = NonZeroU32::MIN.saturating_add(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// A file path or `:memory:`.
    pub database_url: String,

    pub max_connections: NonZeroU32,
}

impl DatabaseConfig {
    #[must_use]
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

/// Durable track store backed by an SQLite database file.
#[allow(missing_debug_implementations)]
pub struct SqliteTrackStore {
    connection_pool: ConnectionPool,
}

impl SqliteTrackStore {
    /// Open the database, create it if missing, and migrate the schema.
    pub fn provision(config: &DatabaseConfig) -> crate::Result<Self> {
        let DatabaseConfig {
            database_url,
            max_connections,
        } = config;
        log::info!("Provisioning SQLite database: {database_url}");
        let connection_pool = create_connection_pool(database_url, *max_connections)?;
        let mut pooled_connection = get_pooled_connection(&connection_pool)?;
        let connection: &mut DbConnection = &mut pooled_connection;
        initialize_database(connection)?;
        let migrations = run_migrations(connection)
            .map_err(|err| anyhow::anyhow!(err.to_string()))?
            .len();
        if migrations > 0 {
            log::info!("Applied {migrations} database migration(s)");
        }
        Ok(Self { connection_pool })
    }

    fn with_transaction<T>(
        &self,
        transaction_fn: impl FnOnce(&mut Connection<'_>) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let mut pooled_connection = get_pooled_connection(&self.connection_pool)
            .map_err(|err| RepoError::Other(err.into()))?;
        let connection: &mut DbConnection = &mut pooled_connection;
        connection
            .transaction::<_, RepoTransactionError, _>(|connection| {
                transaction_fn(&mut Connection::new(connection)).map_err(Into::into)
            })
            .map_err(DieselTransactionError::into_inner)
    }
}

impl TrackStore for SqliteTrackStore {
    fn upsert_tracks(&self, tracks: &[TrackRecord]) -> RepoResult<usize> {
        let updated_at = now_unix_timestamp_millis();
        self.with_transaction(|connection| connection.upsert_tracks(updated_at, tracks))
    }

    fn load_all_tracks(&self) -> RepoResult<Vec<TrackRecord>> {
        self.with_transaction(|connection| connection.load_all_tracks())
    }

    fn load_tracks_missing_artwork(&self) -> RepoResult<Vec<TrackRecord>> {
        self.with_transaction(|connection| connection.load_tracks_missing_artwork())
    }

    fn update_track_artwork_path(&self, media_id: &MediaId, artwork_path: &Path) -> RepoResult<()> {
        let updated_at = now_unix_timestamp_millis();
        self.with_transaction(|connection| {
            connection.update_track_artwork_path(updated_at, media_id, Some(artwork_path))
        })
    }

    fn delete_tracks(&self, media_ids: &[MediaId]) -> RepoResult<usize> {
        self.with_transaction(|connection| connection.delete_tracks(media_ids))
    }
}
