// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::Path;

use mime::Mime;

use crate::{Error, Result};

pub mod digest;

#[must_use]
pub fn trim_readable(input: &str) -> &str {
    input.trim_matches(|c: char| c.is_whitespace() || c.is_control())
}

/// Trimmed, non-empty text.
#[must_use]
pub fn trimmed_non_empty(input: &str) -> Option<String> {
    let trimmed = trim_readable(input);
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Guess the audio content type from the file extension.
///
/// Video types are accepted as a fallback, e.g. for `.mp4` files
/// that only contain an audio stream.
pub fn guess_mime_from_file_path(path: impl AsRef<Path>) -> Result<Mime> {
    let mime_guess = mime_guess::from_path(path.as_ref());
    mime_guess
        .iter()
        .filter(|mime| mime.type_() == mime::AUDIO)
        .chain(mime_guess.iter().filter(|mime| mime.type_() == mime::VIDEO))
        .next()
        .ok_or_else(|| {
            Error::UnknownContentType(format!(
                "file path \"{path}\"",
                path = path.as_ref().display()
            ))
        })
}

/// Parse the leading year of a date string, e.g. `1999` or `1999-12-31`.
#[must_use]
pub fn parse_year_tag(input: &str) -> Option<i16> {
    let input = trim_readable(input);
    let digits = input
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(index, c)| &input[..index + c.len_utf8()])?;
    if digits.len() != 4 {
        return None;
    }
    digits.parse().ok()
}
