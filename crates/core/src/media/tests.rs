// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::PathBuf;

use super::*;

#[test]
fn decode_encoded_file_path() {
    let locator = Locator::Path(PathBuf::from("/music/Artist/Album/01 Track.flac"));
    assert_eq!(locator, Locator::decode(&locator.encode()));
}

#[test]
fn decode_encoded_uri() {
    let locator = Locator::Uri("content://media/external/audio/media/42".parse().unwrap());
    assert_eq!(locator, Locator::decode(&locator.encode()));
    assert!(!locator.is_direct_path());
    assert!(locator.file_path().is_none());
}

#[test]
fn file_url_is_decoded_as_path() {
    let locator = Locator::decode("file:///music/track.mp3");
    assert_eq!(Locator::Path(PathBuf::from("/music/track.mp3")), locator);
}

#[test]
fn media_id_from_file_path() {
    let media_id = MediaId::from_file_path(std::path::Path::new("/music/a b.mp3")).unwrap();
    assert_eq!("file:///music/a%20b.mp3", media_id.as_str());
}
