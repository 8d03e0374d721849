// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    fs::read_dir,
    path::{Path, PathBuf},
};

use crate::Result;

/// File stems of image files that are recognized as album covers,
/// in order of preference.
pub const SIBLING_COVER_FILE_STEMS: [&str; 4] = ["cover", "folder", "album", "front"];

/// Supported file extensions in order of preference.
pub const SIBLING_COVER_FILE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

fn rank_of(candidates: &[&str], value: &str) -> Option<usize> {
    candidates
        .iter()
        .position(|candidate| candidate.eq_ignore_ascii_case(value))
}

/// Find a cover image in the directory of an audio file.
///
/// File names are matched case-insensitively. If multiple candidates
/// exist the one with the preferred stem and extension wins.
pub fn find_sibling_cover_file(audio_file_path: &Path) -> Result<Option<PathBuf>> {
    let Some(dir_path) = audio_file_path.parent() else {
        return Ok(None);
    };
    let mut best_match: Option<((usize, usize), PathBuf)> = None;
    for dir_entry in read_dir(dir_path)? {
        let dir_entry = dir_entry?;
        if !dir_entry.file_type()?.is_file() {
            continue;
        }
        let path = dir_entry.path();
        let (Some(stem), Some(extension)) = (
            path.file_stem().and_then(|stem| stem.to_str()),
            path.extension().and_then(|ext| ext.to_str()),
        ) else {
            continue;
        };
        let (Some(stem_rank), Some(extension_rank)) = (
            rank_of(&SIBLING_COVER_FILE_STEMS, stem),
            rank_of(&SIBLING_COVER_FILE_EXTENSIONS, extension),
        ) else {
            continue;
        };
        let rank = (stem_rank, extension_rank);
        if best_match
            .as_ref()
            .is_none_or(|(best_rank, _)| rank < *best_rank)
        {
            best_match = Some((rank, path));
        }
    }
    Ok(best_match.map(|(_, path)| path))
}
