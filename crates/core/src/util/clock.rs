// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub type TimestampMillis = i64;

pub type TimestampSecs = i64;

/// Milliseconds since the Unix epoch.
///
/// Points in time before the epoch are mapped to negative values.
#[must_use]
pub fn unix_timestamp_millis(system_time: SystemTime) -> TimestampMillis {
    match system_time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_millis()).unwrap_or(TimestampMillis::MAX),
        Err(err) => -i64::try_from(err.duration().as_millis()).unwrap_or(TimestampMillis::MAX),
    }
}

#[must_use]
pub fn unix_timestamp_secs(system_time: SystemTime) -> TimestampSecs {
    unix_timestamp_millis(system_time).div_euclid(1000)
}

#[must_use]
pub fn now_unix_timestamp_millis() -> TimestampMillis {
    unix_timestamp_millis(SystemTime::now())
}

/// Inverse of [`unix_timestamp_millis()`].
#[must_use]
pub fn system_time_from_unix_timestamp_millis(millis: TimestampMillis) -> SystemTime {
    if millis >= 0 {
        UNIX_EPOCH + Duration::from_millis(millis.unsigned_abs())
    } else {
        UNIX_EPOCH - Duration::from_millis(millis.unsigned_abs())
    }
}
