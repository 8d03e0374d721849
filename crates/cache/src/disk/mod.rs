// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    fs::{self, File},
    io::{self, Write as _},
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use tempfile::NamedTempFile;

use melodex_core::{ArtworkKey, DiskTierStatistics};

/// A file in the disk tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskEntry {
    pub key: ArtworkKey,
    pub path: PathBuf,
    pub byte_size: u64,

    /// Updated on every cache hit.
    pub modified: SystemTime,
}

/// Files that have been removed from the disk tier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovedFiles {
    pub paths: Vec<PathBuf>,
    pub bytes: u64,
}

impl RemovedFiles {
    fn push(&mut self, entry: DiskEntry) {
        let DiskEntry {
            path, byte_size, ..
        } = entry;
        self.paths.push(path);
        self.bytes += byte_size;
    }

    pub fn append(&mut self, other: Self) {
        let Self { mut paths, bytes } = other;
        self.paths.append(&mut paths);
        self.bytes += bytes;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Directory with cached JPEG files.
///
/// Files are sharded into subdirectories by the first two hex digits
/// of their key. The directory is owned exclusively by this cache.
/// Unrecognized files are ignored and never deleted, except when
/// clearing the whole directory.
#[derive(Debug, Clone)]
pub struct DiskTier {
    root_dir: PathBuf,
}

impl DiskTier {
    #[must_use]
    pub const fn new(root_dir: PathBuf) -> Self {
        Self { root_dir }
    }

    #[must_use]
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn create_dir_all(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root_dir)
    }

    #[must_use]
    pub fn file_path(&self, key: &ArtworkKey) -> PathBuf {
        self.root_dir.join(key.shard()).join(key.file_name())
    }

    /// Returns the path of an existing file.
    #[must_use]
    pub fn lookup(&self, key: &ArtworkKey) -> Option<PathBuf> {
        let file_path = self.file_path(key);
        file_path.is_file().then_some(file_path)
    }

    /// Mark a file as recently used.
    pub fn touch(&self, key: &ArtworkKey) -> io::Result<()> {
        File::options()
            .write(true)
            .open(self.file_path(key))?
            .set_modified(SystemTime::now())
    }

    /// Write the contents of a file atomically.
    ///
    /// Readers either see the previous file or the complete new file,
    /// never a partially written one.
    pub fn write_atomic(&self, key: &ArtworkKey, data: &[u8]) -> io::Result<PathBuf> {
        let file_path = self.file_path(key);
        let Some(shard_dir) = file_path.parent() else {
            return Err(io::Error::other("missing shard directory"));
        };
        fs::create_dir_all(shard_dir)?;
        let mut temp_file = NamedTempFile::new_in(shard_dir)?;
        temp_file.write_all(data)?;
        temp_file.as_file().sync_all()?;
        temp_file.persist(&file_path).map_err(|err| err.error)?;
        Ok(file_path)
    }

    /// Returns `false` if the file did not exist.
    pub fn remove(&self, key: &ArtworkKey) -> io::Result<bool> {
        match fs::remove_file(self.file_path(key)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Enumerate all cached files.
    ///
    /// A missing root directory is treated as empty.
    pub fn scan(&self) -> io::Result<Vec<DiskEntry>> {
        let mut entries = Vec::new();
        let shard_dirs = match fs::read_dir(&self.root_dir) {
            Ok(shard_dirs) => shard_dirs,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(entries),
            Err(err) => return Err(err),
        };
        for shard_dir in shard_dirs {
            let shard_dir = shard_dir?;
            if !shard_dir.file_type()?.is_dir() {
                continue;
            }
            for dir_entry in fs::read_dir(shard_dir.path())? {
                let dir_entry = dir_entry?;
                let Some(key) = dir_entry
                    .file_name()
                    .to_str()
                    .and_then(ArtworkKey::from_file_name)
                else {
                    // Leftovers of interrupted writes or foreign files
                    continue;
                };
                let metadata = match dir_entry.metadata() {
                    Ok(metadata) => metadata,
                    // Concurrently removed
                    Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                    Err(err) => return Err(err),
                };
                if !metadata.is_file() {
                    continue;
                }
                entries.push(DiskEntry {
                    key,
                    path: dir_entry.path(),
                    byte_size: metadata.len(),
                    modified: metadata.modified()?,
                });
            }
        }
        Ok(entries)
    }

    pub fn statistics(&self, capacity_bytes: u64) -> io::Result<DiskTierStatistics> {
        let entries = self.scan()?;
        Ok(DiskTierStatistics {
            files: entries.len(),
            bytes: entries.iter().map(|entry| entry.byte_size).sum(),
            capacity_bytes,
        })
    }

    fn remove_entry(entry: &DiskEntry) -> io::Result<bool> {
        match fs::remove_file(&entry.path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Remove all files that have not been used for the given duration.
    pub fn remove_older_than(&self, max_age: Duration) -> io::Result<RemovedFiles> {
        let now = SystemTime::now();
        let mut removed = RemovedFiles::default();
        for entry in self.scan()? {
            let age = now.duration_since(entry.modified).unwrap_or_default();
            if age <= max_age {
                continue;
            }
            if Self::remove_entry(&entry)? {
                removed.push(entry);
            }
        }
        log::debug!(
            "Removed {count} expired file(s) with {bytes} byte(s) from {root_dir}",
            count = removed.len(),
            bytes = removed.bytes,
            root_dir = self.root_dir.display(),
        );
        Ok(removed)
    }

    /// Remove the least recently used files until the total size
    /// does not exceed the target.
    pub fn trim_to(&self, target_bytes: u64) -> io::Result<RemovedFiles> {
        let mut entries = self.scan()?;
        let mut total_bytes: u64 = entries.iter().map(|entry| entry.byte_size).sum();
        let mut removed = RemovedFiles::default();
        if total_bytes <= target_bytes {
            return Ok(removed);
        }
        entries.sort_by(|lhs, rhs| {
            lhs.modified
                .cmp(&rhs.modified)
                .then_with(|| lhs.key.cmp(&rhs.key))
        });
        for entry in entries {
            if total_bytes <= target_bytes {
                break;
            }
            total_bytes -= entry.byte_size;
            if Self::remove_entry(&entry)? {
                removed.push(entry);
            }
        }
        log::debug!(
            "Trimmed {root_dir} to {total_bytes} byte(s) by removing {count} file(s)",
            root_dir = self.root_dir.display(),
            count = removed.len(),
        );
        Ok(removed)
    }

    /// Remove and recreate the whole directory.
    ///
    /// Returns the cache files that have been removed.
    pub fn clear(&self) -> io::Result<RemovedFiles> {
        let mut removed = RemovedFiles::default();
        for entry in self.scan()? {
            removed.push(entry);
        }
        match fs::remove_dir_all(&self.root_dir) {
            Ok(()) => (),
            Err(err) if err.kind() == io::ErrorKind::NotFound => (),
            Err(err) => return Err(err),
        }
        self.create_dir_all()?;
        Ok(removed)
    }
}
