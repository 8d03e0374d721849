// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    borrow::Borrow,
    fmt,
    path::{Path, PathBuf},
};

use url::Url;

/// Stable, external identifier of a track in the media index.
///
/// The contents are opaque. For file-based media indexes the
/// identifier is the `file://` URL of the canonical file path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct MediaId(String);

impl MediaId {
    #[must_use]
    pub fn new(inner: impl Into<String>) -> Self {
        Self(inner.into())
    }

    #[must_use]
    pub fn from_file_path(path: &Path) -> Option<Self> {
        Url::from_file_path(path).ok().map(|url| Self(url.into()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        let Self(inner) = self;
        inner
    }
}

impl AsRef<str> for MediaId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for MediaId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl From<String> for MediaId {
    fn from(from: String) -> Self {
        Self(from)
    }
}

impl From<&str> for MediaId {
    fn from(from: &str) -> Self {
        Self(from.to_owned())
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies an album within the media index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct AlbumId(String);

impl AlbumId {
    #[must_use]
    pub fn new(inner: impl Into<String>) -> Self {
        Self(inner.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlbumId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the audio content of a track could be found.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Locator {
    /// A direct file system path.
    Path(PathBuf),

    /// Any other resource that is not accessible through
    /// the local file system.
    Uri(Url),
}

impl Locator {
    /// The file path, if the content is directly accessible.
    ///
    /// `file://` URLs are converted into file paths.
    #[must_use]
    pub fn file_path(&self) -> Option<PathBuf> {
        match self {
            Self::Path(path) => Some(path.clone()),
            Self::Uri(url) => {
                if url.scheme() == "file" {
                    url.to_file_path().ok()
                } else {
                    None
                }
            }
        }
    }

    /// `true` if and only if the locator is a direct file system path.
    #[must_use]
    pub const fn is_direct_path(&self) -> bool {
        matches!(self, Self::Path(_))
    }

    /// Stable string representation, e.g. for persistence.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Uri(url) => url.to_string(),
        }
    }

    /// Inverse of [`Self::encode()`].
    ///
    /// Strings that parse as URLs with a scheme other than `file` are
    /// decoded as [`Locator::Uri`], everything else as a file path.
    #[must_use]
    pub fn decode(encoded: &str) -> Self {
        match Url::parse(encoded) {
            // Single letter schemes are Windows drive letters.
            Ok(url) if url.scheme().len() > 1 && url.scheme() != "file" => Self::Uri(url),
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map_or_else(|()| Self::Uri(url), Self::Path),
            _ => Self::Path(PathBuf::from(encoded)),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => path.display().fmt(f),
            Self::Uri(url) => url.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests;
