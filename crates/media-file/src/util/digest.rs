// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

pub type DigestBytes = [u8; blake3::OUT_LEN];

/// Incremental, content-based digest.
#[derive(Debug, Default)]
pub struct MediaDigest {
    hasher: blake3::Hasher,
}

impl MediaDigest {
    #[must_use]
    pub fn new() -> Self {
        Default::default()
    }

    pub fn digest_content(&mut self, content_data: &[u8]) -> &mut Self {
        self.hasher.update(content_data);
        self
    }

    /// Digest a text field, delimited from the following content.
    pub fn digest_field(&mut self, field: &str) -> &mut Self {
        self.hasher.update(field.as_bytes());
        self.hasher.update(&[0]);
        self
    }

    pub fn finalize_reset(&mut self) -> DigestBytes {
        let digest = self.hasher.finalize().into();
        self.hasher.reset();
        digest
    }
}
