// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Access to the media index of the platform.
//!
//! The index offers no cheap delta queries. Clients have to enumerate
//! all entries and reconcile the results themselves.

use std::{any::Any, fmt, io, result::Result as StdResult};

use thiserror::Error;

use melodex_core::media::AlbumId;

mod filter;
pub use self::filter::{IndexFilter, MediaCategory, SortOrder};

mod row;
pub use self::row::RawRow;

pub mod fs;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("permission denied")]
    PermissionDenied,

    #[error(transparent)]
    Io(io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<io::Error> for IndexError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::PermissionDenied {
            Self::PermissionDenied
        } else {
            Self::Io(err)
        }
    }
}

impl From<melodex_media_file::Error> for IndexError {
    fn from(err: melodex_media_file::Error) -> Self {
        match err {
            melodex_media_file::Error::Io(err) => err.into(),
            err => Self::Other(err.into()),
        }
    }
}

pub type IndexResult<T> = StdResult<T, IndexError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessStatus {
    Granted,
    Denied,
}

impl AccessStatus {
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Invoked when the contents of the media index might have changed.
///
/// Invoked on an arbitrary thread. Notifications are not debounced.
pub type ChangeCallback = Box<dyn Fn() + Send + Sync + 'static>;

/// Keeps a change subscription alive.
///
/// Dropping the subscription unsubscribes.
pub struct IndexSubscription {
    _guard: Box<dyn Any + Send>,
}

impl IndexSubscription {
    #[must_use]
    pub fn new(guard: impl Any + Send) -> Self {
        Self {
            _guard: Box::new(guard),
        }
    }

    /// A subscription that never notifies.
    #[must_use]
    pub fn inactive() -> Self {
        Self::new(())
    }
}

impl fmt::Debug for IndexSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexSubscription").finish_non_exhaustive()
    }
}

/// Read-only client of the platform media index.
///
/// All operations are blocking and must not be invoked on an
/// async executor thread. Implementations never panic across this
/// boundary but return an [`IndexError`] instead.
pub trait PlatformIndexClient: Send + Sync + 'static {
    fn check_access(&self) -> IndexResult<AccessStatus>;

    /// Enumerate all entries that are accepted by the filter.
    ///
    /// The results are ordered according to the filter.
    fn query_all(&self, filter: &IndexFilter) -> IndexResult<Vec<RawRow>>;

    /// Look up the thumbnail image of an album.
    fn album_thumbnail(&self, album_id: &AlbumId) -> IndexResult<Option<Vec<u8>>>;

    fn subscribe_to_changes(&self, on_changed: ChangeCallback) -> IndexResult<IndexSubscription>;
}

pub mod prelude {
    pub use super::{
        AccessStatus, ChangeCallback, IndexError, IndexFilter, IndexResult, IndexSubscription,
        PlatformIndexClient, RawRow,
    };
}
