// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{num::NonZeroU32, time::Duration};

use diesel::{Connection as _, connection::SimpleConnection as _, r2d2};

use crate::{DbConnection, Result};

pub type ConnectionManager = r2d2::ConnectionManager<DbConnection>;

pub type ConnectionPool = r2d2::Pool<ConnectionManager>;

pub type PooledConnection = r2d2::PooledConnection<ConnectionManager>;

const BUSY_TIMEOUT: Duration = Duration::from_millis(1500);

/// Applies the settings that SQLite only maintains per connection.
#[derive(Debug, Clone, Copy)]
struct ConnectionCustomizer;

impl r2d2::CustomizeConnection<DbConnection, r2d2::Error> for ConnectionCustomizer {
    fn on_acquire(&self, connection: &mut DbConnection) -> std::result::Result<(), r2d2::Error> {
        connection
            .batch_execute(&format!(
                r"
PRAGMA busy_timeout = {busy_timeout_ms};
PRAGMA synchronous = NORMAL;      -- fsync only in critical moments, safe for journal_mode = WAL
PRAGMA secure_delete = 0;         -- avoid some disk I/O
PRAGMA foreign_keys = 1;          -- check foreign key constraints
",
                busy_timeout_ms = BUSY_TIMEOUT.as_millis(),
            ))
            .map_err(r2d2::Error::QueryError)
    }
}

pub fn create_connection_pool(database_url: &str, max_size: NonZeroU32) -> Result<ConnectionPool> {
    // Establish a test connection before creating the connection pool to fail early.
    // If the given file is inaccessible r2d2 seems to do multiple retries
    // and logs errors instead of simply failing and returning and error immediately.
    std::mem::drop(DbConnection::establish(database_url)?);
    // The test connection is dropped immediately without using it
    // and missing files should have been created after reaching
    // this point.
    let manager = ConnectionManager::new(database_url);
    let pool = ConnectionPool::builder()
        .max_size(max_size.get())
        .connection_customizer(Box::new(ConnectionCustomizer))
        .build(manager)?;
    Ok(pool)
}

pub fn get_pooled_connection(pool: &ConnectionPool) -> Result<PooledConnection> {
    pool.get().map_err(Into::into)
}
