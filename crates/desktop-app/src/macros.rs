// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

macro_rules! upgrade_or_return {
    ($var:ident) => {
        if let Some($var) = $var.upgrade() {
            $var
        } else {
            return;
        }
    };
}
