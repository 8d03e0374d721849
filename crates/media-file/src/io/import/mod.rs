// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{fs::File, io::BufReader, path::Path, time::Duration};

use lofty::{
    file::{AudioFile as _, TaggedFile},
    probe::Probe,
    tag::{Accessor as _, ItemKey, Tag},
};

use melodex_core::track::{TrackNumber, Year};

use crate::{
    Error, Result,
    fmt::{find_embedded_artwork_image, parse_options, take_primary_or_first_tag},
    util::{parse_year_tag, trimmed_non_empty},
};

/// Read a file with all its tags.
///
/// The file is closed before returning, even on error.
fn read_tagged_file(file_path: &Path, read_properties: bool) -> Result<TaggedFile> {
    let reader = BufReader::new(File::open(file_path)?);
    let probe = Probe::new(reader)
        .options(parse_options().read_properties(read_properties))
        .guess_file_type()?;
    if probe.file_type().is_none() {
        return Err(Error::UnknownContentType(format!(
            "file path \"{path}\"",
            path = file_path.display()
        )));
    }
    probe.read().map_err(Into::into)
}

/// Metadata of an audio file as needed for indexing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbedAudioFile {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub genre: Option<String>,
    pub year: Option<Year>,
    pub track_number: Option<TrackNumber>,
    pub duration: Duration,
    pub has_embedded_artwork: bool,
}

fn import_year(tag: &Tag) -> Option<Year> {
    [ItemKey::Year, ItemKey::RecordingDate, ItemKey::OriginalReleaseDate]
        .iter()
        .filter_map(|key| tag.get_string(key))
        .find_map(parse_year_tag)
}

impl ProbedAudioFile {
    fn import_tag(&mut self, tag: &Tag) {
        self.title = tag.title().as_deref().and_then(trimmed_non_empty);
        self.artist = tag.artist().as_deref().and_then(trimmed_non_empty);
        self.album = tag.album().as_deref().and_then(trimmed_non_empty);
        self.album_artist = tag
            .get_string(&ItemKey::AlbumArtist)
            .and_then(trimmed_non_empty);
        self.genre = tag.genre().as_deref().and_then(trimmed_non_empty);
        self.year = import_year(tag);
        self.track_number = tag
            .track()
            .and_then(|track| TrackNumber::try_from(track).ok())
            .filter(|track| *track > 0);
        self.has_embedded_artwork = find_embedded_artwork_image(tag).is_some();
    }
}

/// Probe tags and audio properties.
pub fn probe_audio_file(file_path: &Path) -> Result<ProbedAudioFile> {
    let mut tagged_file = read_tagged_file(file_path, true)?;
    let mut probed = ProbedAudioFile {
        duration: tagged_file.properties().duration(),
        ..Default::default()
    };
    if let Some(tag) = take_primary_or_first_tag(&mut tagged_file) {
        probed.import_tag(&tag);
    } else {
        log::debug!("No tags found in {}", file_path.display());
    }
    Ok(probed)
}

/// Load the data of the preferred embedded artwork image.
///
/// The image data is not decoded.
pub fn load_embedded_artwork_image_data_from_file_path(
    file_path: &Path,
) -> Result<Option<Vec<u8>>> {
    let tag = {
        let mut tagged_file = read_tagged_file(file_path, false)?;
        take_primary_or_first_tag(&mut tagged_file)
    };
    let image_data = tag
        .as_ref()
        .and_then(find_embedded_artwork_image)
        .map(|picture| picture.data().to_owned());
    Ok(image_data)
}
