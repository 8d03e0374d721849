// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use melodex_core::media::Locator;

use crate::{Result, io::import::load_embedded_artwork_image_data_from_file_path};

/// Extracts the raw data of an embedded artwork image.
///
/// Implementations are stateless. Each invocation is a single attempt
/// without retries. All resources that are acquired while extracting
/// must be released before returning, including the error path.
pub trait EmbeddedArtworkExtractor: Send + Sync + 'static {
    /// Returns `Ok(None)` if the media contains no image.
    fn extract_embedded(&self, locator: &Locator) -> Result<Option<Vec<u8>>>;
}

/// Reads embedded pictures from the tags of local files.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyExtractor;

impl EmbeddedArtworkExtractor for LoftyExtractor {
    fn extract_embedded(&self, locator: &Locator) -> Result<Option<Vec<u8>>> {
        let Some(file_path) = locator.file_path() else {
            log::debug!("Cannot extract embedded artwork from {locator}");
            return Ok(None);
        };
        load_embedded_artwork_image_data_from_file_path(&file_path)
    }
}
