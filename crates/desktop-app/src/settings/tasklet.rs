// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{future::Future, path::PathBuf};

use discro::{Subscriber, tasklet::OnChanged};

use super::State;

/// Save the settings after changed.
///
/// The current settings at the time of invocation are not saved.
pub fn on_state_changed_save_to_file(
    mut subscriber: Subscriber<State>,
    settings_dir: PathBuf,
    mut report_error: impl FnMut(anyhow::Error) + Send + 'static,
) -> impl Future<Output = ()> + Send + 'static {
    // Read and acknowledge the initial settings immediately before spawning
    // the async task. Only subsequent changes are saved.
    let mut old_settings = subscriber.read_ack().clone();
    async move {
        log::debug!("Starting on_state_changed_save_to_file");
        loop {
            if subscriber.changed().await.is_err() {
                // Publisher has disappeared
                log::debug!("Aborting on_state_changed_save_to_file");
                break;
            }
            {
                let new_settings = subscriber.read_ack();
                if old_settings == *new_settings {
                    log::debug!("Settings unchanged: {old_settings:?}");
                    continue;
                }
                old_settings = new_settings.clone();
            }
            log::info!("Saving changed settings: {old_settings:?}");
            let new_settings = old_settings.clone();
            if let Err(err) = new_settings.save_spawn_blocking(settings_dir.clone()).await {
                report_error(err);
            }
        }
    }
}

/// Listen for changes of the music directories.
///
/// Changing the music directories requires to commission a new
/// environment.
pub fn on_music_dirs_changed(
    mut subscriber: Subscriber<State>,
    mut on_changed: impl FnMut(&[PathBuf]) -> OnChanged + Send + 'static,
) -> impl Future<Output = ()> + Send + 'static {
    // Read the initial value immediately before spawning the async task
    let mut value = subscriber.read_ack().music_dirs.clone();
    async move {
        log::debug!("Starting on_music_dirs_changed");
        // Enforce initial update
        let mut value_changed = true;
        loop {
            if value_changed {
                log::debug!("on_music_dirs_changed({value:?})");
                match on_changed(&value) {
                    OnChanged::Continue => (),
                    OnChanged::Abort => {
                        // Consumer has rejected the notification
                        log::debug!("Aborting on_music_dirs_changed");
                        return;
                    }
                }
            }
            value_changed = false;
            if subscriber.changed().await.is_err() {
                // Publisher has disappeared
                log::debug!("Aborting on_music_dirs_changed");
                break;
            }
            let settings = subscriber.read_ack();
            if value != settings.music_dirs {
                value.clone_from(&settings.music_dirs);
                value_changed = true;
            }
        }
        log::debug!("Stopping on_music_dirs_changed");
    }
}
