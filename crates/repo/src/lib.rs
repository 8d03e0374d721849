// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use thiserror::Error;

pub mod track;

pub type RecordId = i64;

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("aborted")]
    Aborted,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

pub trait OptionalRepoResult<T> {
    fn optional(self) -> RepoResult<Option<T>>;
}

impl<T> OptionalRepoResult<T> for RepoResult<T> {
    fn optional(self) -> RepoResult<Option<T>> {
        self.map_or_else(
            |err| {
                if matches!(err, RepoError::NotFound) {
                    Ok(None)
                } else {
                    Err(err)
                }
            },
            |val| Ok(Some(val)),
        )
    }
}

pub mod prelude {
    pub use crate::{
        OptionalRepoResult, RecordId, RepoError, RepoResult,
        track::{TrackRepo, TrackStore},
    };
}
