// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{fs, io::Cursor, path::Path};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lofty::{
    config::WriteOptions,
    picture::{MimeType, Picture, PictureType},
    tag::{Tag, TagExt as _},
};

const SAMPLE_RATE: u32 = 8_000;

/// Write a silent, mono 16-bit PCM WAV file.
pub(crate) fn write_silent_wav_file(file_path: &Path, duration_secs: u32) {
    let data_len = SAMPLE_RATE * 2 * duration_secs;
    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    // PCM
    bytes.extend_from_slice(&1u16.to_le_bytes());
    // channels
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    // byte rate
    bytes.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes());
    // block align
    bytes.extend_from_slice(&2u16.to_le_bytes());
    // bits per sample
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.resize(bytes.len() + data_len as usize, 0);
    fs::write(file_path, bytes).unwrap();
}

pub(crate) fn new_png_image_data(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let mut image_data = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
        .write_to(&mut Cursor::new(&mut image_data), ImageFormat::Png)
        .unwrap();
    image_data
}

pub(crate) fn new_cover_front_picture(image_data: Vec<u8>) -> Picture {
    Picture::new_unchecked(
        PictureType::CoverFront,
        Some(MimeType::Png),
        None,
        image_data,
    )
}

pub(crate) fn save_tag(file_path: &Path, tag: &Tag) {
    tag.save_to_path(file_path, WriteOptions::default())
        .unwrap();
}
