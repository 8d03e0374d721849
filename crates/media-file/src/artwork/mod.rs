// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{io::Cursor, path::Path};

use image::{
    DynamicImage, GenericImageView as _, ImageReader, codecs::jpeg::JpegEncoder, guess_format,
    imageops::FilterType, load_from_memory, load_from_memory_with_format,
};

use melodex_core::artwork::{ImageDimension, ImageSize};

use crate::{Error, Result};

mod sibling;
pub use self::sibling::{
    SIBLING_COVER_FILE_EXTENSIONS, SIBLING_COVER_FILE_STEMS, find_sibling_cover_file,
};

pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// The dimensions of a decoded, non-empty picture.
pub fn image_size_of(picture: &DynamicImage) -> Result<ImageSize> {
    let (width, height) = picture.dimensions();
    let (Ok(width), Ok(height)) = (
        ImageDimension::try_from(width),
        ImageDimension::try_from(height),
    ) else {
        return Err(Error::Metadata(anyhow::anyhow!(
            "unsupported image size: {width}x{height}"
        )));
    };
    if width == 0 || height == 0 {
        return Err(Error::Metadata(anyhow::anyhow!(
            "empty image: {width}x{height}"
        )));
    }
    Ok(ImageSize { width, height })
}

/// Decode an image from memory.
///
/// The format is guessed from the contents.
pub fn load_artwork_picture(image_data: &[u8]) -> Result<DynamicImage> {
    let picture = if let Ok(image_format) = guess_format(image_data) {
        load_from_memory_with_format(image_data, image_format)
    } else {
        load_from_memory(image_data)
    }?;
    image_size_of(&picture)?;
    Ok(picture)
}

/// Decode an image file.
///
/// The format is guessed from the contents, not from the file extension.
pub fn load_artwork_picture_from_file_path(file_path: &Path) -> Result<DynamicImage> {
    let picture = ImageReader::open(file_path)?
        .with_guessed_format()?
        .decode()?;
    image_size_of(&picture)?;
    Ok(picture)
}

#[derive(Debug, Clone)]
pub struct EncodedArtworkImage {
    pub image_data: Vec<u8>,
    pub image_size: ImageSize,
}

/// Scale down and encode a picture as JPEG.
///
/// The aspect ratio is preserved and pictures are never upsized.
/// The alpha channel is discarded.
pub fn encode_jpeg_thumbnail(
    picture: &DynamicImage,
    max_dim: ImageDimension,
    quality: u8,
) -> Result<EncodedArtworkImage> {
    let original_size = image_size_of(picture)?;
    let image_size = original_size.fit_into(max_dim);
    let rgb_picture = if image_size == original_size {
        DynamicImage::ImageRgb8(picture.to_rgb8())
    } else {
        log::debug!("Resizing artwork image from {original_size} to {image_size}");
        DynamicImage::ImageRgb8(
            picture
                .resize_exact(
                    image_size.width.into(),
                    image_size.height.into(),
                    FilterType::Triangle,
                )
                .to_rgb8(),
        )
    };
    let mut image_data = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut image_data), quality);
    rgb_picture.write_with_encoder(encoder)?;
    Ok(EncodedArtworkImage {
        image_data,
        image_size,
    })
}
