// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

///////////////////////////////////////////////////////////////////////

diesel::table! {
    track (row_id) {
        row_id -> BigInt,
        row_created_ms -> BigInt,
        row_updated_ms -> BigInt,
        media_id -> Text,
        locator -> Text,
        title -> Text,
        artist -> Text,
        album -> Text,
        album_id -> Nullable<Text>,
        duration_ms -> BigInt,
        date_added_sec -> BigInt,
        genre -> Nullable<Text>,
        year -> Nullable<SmallInt>,
        track_number -> Nullable<Integer>,
        has_embedded_artwork -> Nullable<Bool>,
        artwork_path -> Nullable<Text>,
    }
}
