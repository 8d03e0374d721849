// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::fmt;

/// Controls if artwork is resolved while scanning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScanMode {
    /// Only enumerate and publish track metadata.
    ///
    /// Artwork is resolved lazily on demand.
    MetadataOnly,

    /// Additionally resolve artwork for the first visible
    /// tracks before publishing the results.
    #[default]
    WithArtwork,
}

/// State of the media index synchronization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ScanState {
    #[default]
    Idle,

    Scanning(String),

    /// Number of published tracks.
    Completed(usize),

    Error(String),

    /// The required access grant is absent.
    PermissionRequired,
}

impl ScanState {
    #[must_use]
    pub const fn is_scanning(&self) -> bool {
        matches!(self, Self::Scanning(_))
    }

    #[must_use]
    pub const fn is_permission_required(&self) -> bool {
        matches!(self, Self::PermissionRequired)
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            Self::Idle | Self::Scanning(_) | Self::Completed(_) | Self::PermissionRequired => None,
        }
    }

    /// Transitions that are accepted by the state machine.
    ///
    /// Updating the progress message while scanning is permitted.
    /// Terminal results can only be reached from [`ScanState::Scanning`].
    #[must_use]
    pub const fn can_transition_to(&self, next: &Self) -> bool {
        match next {
            Self::Idle => !self.is_scanning(),
            Self::Scanning(_) => true,
            Self::Completed(_) | Self::Error(_) => self.is_scanning(),
            Self::PermissionRequired => !self.is_permission_required(),
        }
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Scanning(message) => write!(f, "scanning: {message}"),
            Self::Completed(count) => write!(f, "completed: {count} track(s)"),
            Self::Error(message) => write!(f, "error: {message}"),
            Self::PermissionRequired => f.write_str("permission required"),
        }
    }
}
