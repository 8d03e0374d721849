// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use lofty::{
    config::ParseOptions,
    file::{TaggedFile, TaggedFileExt as _},
    picture::{Picture, PictureType},
    tag::Tag,
};

pub(crate) fn parse_options() -> ParseOptions {
    ParseOptions::new()
        // Workaround for <https://github.com/Serial-ATA/lofty-rs/issues/260>
        .max_junk_bytes(usize::MAX)
}

pub(crate) fn take_primary_or_first_tag(tagged_file: &mut TaggedFile) -> Option<Tag> {
    if let Some(tag) = tagged_file.remove(tagged_file.primary_tag_type()) {
        return Some(tag);
    }
    let first_tag_type = tagged_file.first_tag().map(Tag::tag_type)?;
    tagged_file.remove(first_tag_type)
}

/// Picture types in order of preference.
const PREFERRED_PICTURE_TYPES: [PictureType; 4] = [
    PictureType::CoverFront,
    PictureType::Media,
    PictureType::Leaflet,
    PictureType::Other,
];

fn is_loadable(picture: &Picture) -> bool {
    !picture.data().is_empty()
}

/// Select the artwork image among all pictures of a tag.
#[must_use]
pub(crate) fn find_embedded_artwork_image(tag: &Tag) -> Option<&Picture> {
    PREFERRED_PICTURE_TYPES
        .iter()
        .find_map(|pic_type| {
            tag.pictures()
                .iter()
                .find(|p| p.pic_type() == *pic_type && is_loadable(p))
        })
        // otherwise take the first picture that could be loaded
        .or_else(|| tag.pictures().iter().find(|p| is_loadable(p)))
}
