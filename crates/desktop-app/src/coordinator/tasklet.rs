// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{future::Future, sync::Arc};

use discro::{Subscriber, tasklet::OnChanged};

use melodex_cache::PreloadStrategy;
use melodex_core::ScanState;

use super::{IndexCoordinator, TrackList};

/// Listen for changes of the scan state.
pub fn on_scan_state_changed(
    mut subscriber: Subscriber<ScanState>,
    mut on_changed: impl FnMut(&ScanState) -> OnChanged + Send + 'static,
) -> impl Future<Output = ()> + Send + 'static {
    // Read the initial value immediately before spawning the async task
    let mut value = subscriber.read_ack().clone();
    async move {
        log::debug!("Starting on_scan_state_changed");
        // Enforce initial update
        let mut value_changed = true;
        loop {
            if value_changed {
                log::debug!("on_scan_state_changed({value:?})");
                match on_changed(&value) {
                    OnChanged::Continue => (),
                    OnChanged::Abort => {
                        // Consumer has rejected the notification
                        log::debug!("Aborting on_scan_state_changed");
                        return;
                    }
                }
            }
            value_changed = false;
            if subscriber.changed().await.is_err() {
                // Publisher has disappeared
                log::debug!("Aborting on_scan_state_changed");
                break;
            }
            let new_value = subscriber.read_ack();
            if value != *new_value {
                value = new_value.clone();
                value_changed = true;
            }
        }
        log::debug!("Stopping on_scan_state_changed");
    }
}

/// Listen for newly published track lists.
pub fn on_track_list_changed(
    mut subscriber: Subscriber<TrackList>,
    mut on_changed: impl FnMut(&TrackList) -> OnChanged + Send + 'static,
) -> impl Future<Output = ()> + Send + 'static {
    let mut value = Arc::clone(&subscriber.read_ack());
    async move {
        log::debug!("Starting on_track_list_changed");
        let mut value_changed = true;
        loop {
            if value_changed {
                log::debug!("on_track_list_changed({count} track(s))", count = value.len());
                match on_changed(&value) {
                    OnChanged::Continue => (),
                    OnChanged::Abort => {
                        log::debug!("Aborting on_track_list_changed");
                        return;
                    }
                }
            }
            value_changed = false;
            if subscriber.changed().await.is_err() {
                log::debug!("Aborting on_track_list_changed");
                break;
            }
            let new_value = subscriber.read_ack();
            if !Arc::ptr_eq(&value, &new_value) {
                value = Arc::clone(&new_value);
                value_changed = true;
            }
        }
        log::debug!("Stopping on_track_list_changed");
    }
}

/// Preload artwork whenever a new track list has been published.
///
/// Stops after the coordinator has been dropped.
pub fn on_track_list_changed_preload_artwork(
    coordinator: &Arc<IndexCoordinator>,
    preload_strategy: PreloadStrategy,
) -> impl Future<Output = ()> + Send + 'static {
    let mut subscriber = coordinator.subscribe_track_list_changed();
    let mut track_list = Arc::clone(&subscriber.read_ack());
    let coordinator = Arc::downgrade(coordinator);
    async move {
        log::debug!("Starting on_track_list_changed_preload_artwork");
        loop {
            if !track_list.is_empty() {
                let Some(coordinator) = coordinator.upgrade() else {
                    log::debug!("Aborting on_track_list_changed_preload_artwork");
                    return;
                };
                let outcome = coordinator
                    .preload_artwork(&track_list, preload_strategy)
                    .await;
                log::debug!("Preloaded artwork: {outcome:?}");
            }
            if subscriber.changed().await.is_err() {
                break;
            }
            track_list = Arc::clone(&subscriber.read_ack());
        }
        log::debug!("Stopping on_track_list_changed_preload_artwork");
    }
}
