// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{cmp::Ordering, time::Duration};

use crate::RawRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaCategory {
    Music,
    Ringtone,
    Alarm,
    Notification,
    Podcast,
}

impl MediaCategory {
    /// Classify by the name of a conventional directory.
    #[must_use]
    pub fn from_dir_name(dir_name: &str) -> Option<Self> {
        let category = match dir_name.to_ascii_lowercase().as_str() {
            "ringtones" => Self::Ringtone,
            "alarms" => Self::Alarm,
            "notifications" => Self::Notification,
            "podcasts" => Self::Podcast,
            _ => return None,
        };
        Some(category)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Case-insensitive
    #[default]
    Title,

    /// Most recently added first.
    DateAddedDesc,
}

impl SortOrder {
    fn compare(self, lhs: &RawRow, rhs: &RawRow) -> Ordering {
        match self {
            Self::Title => lhs
                .title_sort_key()
                .cmp(&rhs.title_sort_key())
                .then_with(|| lhs.media_id.cmp(&rhs.media_id)),
            Self::DateAddedDesc => rhs
                .date_added_sec
                .cmp(&lhs.date_added_sec)
                .then_with(|| lhs.media_id.cmp(&rhs.media_id)),
        }
    }
}

pub const DEFAULT_MIN_DURATION: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFilter {
    pub excluded_categories: Vec<MediaCategory>,

    /// Shorter entries are skipped.
    pub min_duration: Duration,

    pub sort_order: SortOrder,
}

impl Default for IndexFilter {
    fn default() -> Self {
        Self {
            excluded_categories: vec![
                MediaCategory::Ringtone,
                MediaCategory::Alarm,
                MediaCategory::Notification,
            ],
            min_duration: DEFAULT_MIN_DURATION,
            sort_order: SortOrder::default(),
        }
    }
}

impl IndexFilter {
    #[must_use]
    pub fn accepts(&self, row: &RawRow) -> bool {
        if self.excluded_categories.contains(&row.category) {
            return false;
        }
        u128::from(row.duration_ms) >= self.min_duration.as_millis()
    }

    /// Remove rejected rows and sort the remaining rows.
    pub fn apply(&self, rows: &mut Vec<RawRow>) {
        rows.retain(|row| self.accepts(row));
        rows.sort_by(|lhs, rhs| self.sort_order.compare(lhs, rhs));
    }
}
