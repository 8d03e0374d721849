// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{sync::Mutex, time::Duration};

use discro::tasklet::OnChanged;
use test_log::test;

use melodex_cache::PreloadStrategy;

use melodex_media_index::{AccessStatus, RawRow};

use super::*;
use crate::testing::{FakeTrackStore, Fixture, new_jpeg_image_data, new_row};

fn metadata_only() -> CoordinatorConfig {
    CoordinatorConfig {
        scan_mode: ScanMode::MetadataOnly,
        ..Default::default()
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out");
}

#[test]
fn reconcile_tracks() {
    let previous = (0..3).map(|index| new_row(index).normalize()).collect::<Vec<_>>();
    let mut current = previous[1..].to_vec();
    current[1].title = "Renamed".to_owned();
    current.push(new_row(3).normalize());

    let (report, removed_ids) = reconcile(&previous, &current);

    assert_eq!(
        ScanReport {
            added: 1,
            updated: 1,
            removed: 1,
            unchanged: 1,
        },
        report
    );
    assert_eq!(3, report.track_count());
    assert_eq!(vec![previous[0].media_id.clone()], removed_ids);
}

#[test]
fn normalize_rows_skips_duplicates() {
    let duplicate = RawRow {
        title: Some("Duplicate".to_owned()),
        ..new_row(1)
    };
    let tracks = normalize_rows(vec![new_row(1), new_row(2), duplicate]);

    assert_eq!(2, tracks.len());
    assert_eq!("Title 001", tracks[0].title);
}

#[tokio::test]
async fn scan_empty_index_then_one_track() {
    let fixture = Fixture::new(metadata_only());

    let outcome = fixture
        .coordinator
        .run_full_scan(ScanMode::MetadataOnly)
        .await;

    assert_eq!(
        Some(ScanOutcome::Completed(ScanReport::default())),
        outcome
    );
    assert_eq!(ScanState::Completed(0), *fixture.coordinator.scan_state());
    assert!(fixture.coordinator.track_list().is_empty());
    assert!(!fixture.coordinator.is_scanning());

    fixture.index_client.set_rows(vec![new_row(1)]);
    let outcome = fixture
        .coordinator
        .run_full_scan(ScanMode::MetadataOnly)
        .await;

    assert_eq!(
        Some(ScanOutcome::Completed(ScanReport {
            added: 1,
            ..Default::default()
        })),
        outcome
    );
    assert_eq!(ScanState::Completed(1), *fixture.coordinator.scan_state());
    assert_eq!(1, fixture.store.load_all_tracks().unwrap().len());
}

#[tokio::test(flavor = "multi_thread")]
async fn scan_with_artwork_is_idempotent() {
    let fixture = Fixture::new(CoordinatorConfig::default());
    let row = new_row(1);
    fixture
        .extractor
        .insert_image(row.locator.clone(), new_jpeg_image_data(64, 64));
    fixture.index_client.set_rows(vec![row.clone()]);

    let outcome = fixture
        .coordinator
        .run_full_scan(ScanMode::WithArtwork)
        .await;
    assert_eq!(
        Some(ScanOutcome::Completed(ScanReport {
            added: 1,
            ..Default::default()
        })),
        outcome
    );
    let artwork_path = fixture
        .coordinator
        .cached_artwork_path(&row.media_id)
        .unwrap();
    assert!(artwork_path.is_file());
    assert_eq!(Some(&artwork_path), fixture.store.artwork_path(&row.media_id).as_ref());
    assert_eq!(1, fixture.extractor.attempts());

    let published = Arc::clone(&fixture.coordinator.track_list());
    let outcome = fixture
        .coordinator
        .run_full_scan(ScanMode::WithArtwork)
        .await;
    assert_eq!(
        Some(ScanOutcome::Completed(ScanReport {
            unchanged: 1,
            ..Default::default()
        })),
        outcome
    );
    // Neither re-published nor re-extracted
    assert!(Arc::ptr_eq(&published, &fixture.coordinator.track_list()));
    assert_eq!(1, fixture.extractor.attempts());
    assert_eq!(
        Some(artwork_path),
        fixture.coordinator.cached_artwork_path(&row.media_id)
    );
}

#[tokio::test]
async fn scan_removes_vanished_tracks() {
    let fixture = Fixture::new(metadata_only());
    fixture
        .index_client
        .set_rows((0..3).map(new_row).collect());
    fixture
        .coordinator
        .run_full_scan(ScanMode::MetadataOnly)
        .await;
    assert_eq!(3, fixture.coordinator.track_list().len());

    fixture.index_client.set_rows(vec![new_row(1)]);
    let outcome = fixture
        .coordinator
        .run_full_scan(ScanMode::MetadataOnly)
        .await;

    assert_eq!(
        Some(ScanOutcome::Completed(ScanReport {
            removed: 2,
            unchanged: 1,
            ..Default::default()
        })),
        outcome
    );
    assert_eq!(1, fixture.coordinator.track_list().len());
    assert_eq!(1, fixture.store.load_all_tracks().unwrap().len());
    let manager = fixture.coordinator.strategy().manager();
    assert!(manager.get_track(&new_row(0).media_id).is_none());
    assert!(manager.get_track(&new_row(1).media_id).is_some());
}

#[tokio::test]
async fn failed_query_keeps_published_tracks() {
    let fixture = Fixture::new(metadata_only());
    fixture.index_client.set_rows(vec![new_row(1)]);
    fixture
        .coordinator
        .run_full_scan(ScanMode::MetadataOnly)
        .await;

    fixture.index_client.set_query_error(Some("unavailable"));
    let outcome = fixture
        .coordinator
        .run_full_scan(ScanMode::MetadataOnly)
        .await;

    assert!(matches!(outcome, Some(ScanOutcome::Failed(_))));
    assert!(fixture.coordinator.scan_state().last_error().is_some());
    assert_eq!(1, fixture.coordinator.track_list().len());
}

#[tokio::test]
async fn scan_after_permission_granted() {
    let fixture = Fixture::new(metadata_only());
    fixture.index_client.set_rows(vec![new_row(1)]);
    fixture.index_client.set_access(AccessStatus::Denied);

    let outcome = fixture
        .coordinator
        .run_full_scan(ScanMode::MetadataOnly)
        .await;
    assert_eq!(Some(ScanOutcome::PermissionRequired), outcome);
    assert_eq!(ScanState::PermissionRequired, *fixture.coordinator.scan_state());
    assert_eq!(0, fixture.index_client.queries());

    assert!(fixture.coordinator.on_permissions_changed().await.is_none());

    fixture.index_client.set_access(AccessStatus::Granted);
    let task = fixture.coordinator.on_permissions_changed().await.unwrap();
    assert!(matches!(task.await.unwrap(), ScanOutcome::Completed(_)));
    assert_eq!(ScanState::Completed(1), *fixture.coordinator.scan_state());
}

#[tokio::test]
async fn denied_access_skips_scanning_state() {
    let fixture = Fixture::new(metadata_only());
    fixture.index_client.set_rows(vec![new_row(1)]);
    fixture.index_client.set_access(AccessStatus::Denied);
    fixture.index_client.set_access_gate_open(false);
    let states = Arc::new(Mutex::new(Vec::new()));
    let observer = tokio::spawn(tasklet::on_scan_state_changed(
        fixture.coordinator.subscribe_scan_state_changed(),
        {
            let states = Arc::clone(&states);
            move |state| {
                states.lock().unwrap().push(state.clone());
                OnChanged::Continue
            }
        },
    ));

    let scan = fixture
        .coordinator
        .try_spawn_scan(ScanMode::MetadataOnly)
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    // Still checking access
    assert!(fixture.coordinator.is_scanning());
    assert_eq!(ScanState::Idle, *fixture.coordinator.scan_state());

    fixture.index_client.set_access_gate_open(true);
    assert_eq!(ScanOutcome::PermissionRequired, scan.await.unwrap());
    wait_until(|| states.lock().unwrap().len() == 2).await;
    assert_eq!(
        vec![ScanState::Idle, ScanState::PermissionRequired],
        *states.lock().unwrap()
    );
    assert_eq!(0, fixture.index_client.queries());

    fixture.index_client.set_access(AccessStatus::Granted);
    let scan = fixture.coordinator.on_permissions_changed().await.unwrap();
    assert!(matches!(scan.await.unwrap(), ScanOutcome::Completed(_)));
    wait_until(|| states.lock().unwrap().last() == Some(&ScanState::Completed(1))).await;

    observer.abort();
}

#[tokio::test(flavor = "multi_thread")]
async fn rescan_on_change_then_load_artwork_once() {
    let fixture = Fixture::new(metadata_only());
    let initial_scan = fixture.coordinator.start().await.unwrap();
    assert_eq!(
        ScanOutcome::Completed(ScanReport::default()),
        initial_scan.await.unwrap()
    );
    assert_eq!(ScanState::Completed(0), *fixture.coordinator.scan_state());

    let row = new_row(1);
    fixture
        .extractor
        .insert_image(row.locator.clone(), new_jpeg_image_data(64, 64));
    fixture.index_client.set_rows(vec![row.clone()]);
    fixture.index_client.notify_changed();
    let coordinator = Arc::clone(&fixture.coordinator);
    wait_until(|| *coordinator.scan_state() == ScanState::Completed(1)).await;
    assert_eq!(1, fixture.coordinator.track_list().len());

    let first = fixture
        .coordinator
        .load_artwork(&row.media_id, EmbeddedArtworkHint::Unknown)
        .await
        .unwrap();
    let second = fixture
        .coordinator
        .load_artwork(&row.media_id, EmbeddedArtworkHint::Unknown)
        .await
        .unwrap();
    assert_eq!(first, second);
    assert!(first.is_file());
    assert_eq!(1, fixture.extractor.attempts());

    fixture.coordinator.shutdown();
}

#[tokio::test]
async fn dropped_scan_future_does_not_cancel_scan() {
    let fixture = Fixture::new(metadata_only());
    fixture.index_client.set_rows((0..2).map(new_row).collect());
    fixture.index_client.set_query_gate_open(false);

    let dropped = tokio::time::timeout(
        Duration::from_millis(50),
        fixture.coordinator.run_full_scan(ScanMode::MetadataOnly),
    )
    .await;
    assert!(dropped.is_err());
    assert!(fixture.coordinator.is_scanning());

    fixture.index_client.set_query_gate_open(true);
    let coordinator = Arc::clone(&fixture.coordinator);
    wait_until(|| !coordinator.is_scanning()).await;
    assert_eq!(ScanState::Completed(2), *fixture.coordinator.scan_state());
    assert_eq!(2, fixture.coordinator.track_list().len());
    assert_eq!(2, fixture.store.load_all_tracks().unwrap().len());
}

#[tokio::test]
async fn observe_published_track_lists() {
    let fixture = Fixture::new(metadata_only());
    fixture.index_client.set_rows((0..3).map(new_row).collect());
    let track_counts = Arc::new(Mutex::new(Vec::new()));
    let observer = tokio::spawn(tasklet::on_track_list_changed(
        fixture.coordinator.subscribe_track_list_changed(),
        {
            let track_counts = Arc::clone(&track_counts);
            move |track_list| {
                track_counts.lock().unwrap().push(track_list.len());
                if track_list.is_empty() {
                    OnChanged::Continue
                } else {
                    OnChanged::Abort
                }
            }
        },
    ));

    fixture
        .coordinator
        .run_full_scan(ScanMode::MetadataOnly)
        .await;

    tokio::time::timeout(Duration::from_secs(5), observer)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(vec![0, 3], *track_counts.lock().unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn preload_artwork_of_published_track_lists() {
    let fixture = Fixture::new(metadata_only());
    let rows = (0..3).map(new_row).collect::<Vec<_>>();
    for row in &rows {
        fixture
            .extractor
            .insert_image(row.locator.clone(), new_jpeg_image_data(16, 16));
    }
    fixture.index_client.set_rows(rows.clone());
    let preloader = tokio::spawn(tasklet::on_track_list_changed_preload_artwork(
        &fixture.coordinator,
        PreloadStrategy::All,
    ));

    fixture
        .coordinator
        .run_full_scan(ScanMode::MetadataOnly)
        .await;
    let store = Arc::clone(&fixture.store);
    wait_until(|| rows.iter().all(|row| store.artwork_path(&row.media_id).is_some())).await;
    assert_eq!(3, fixture.extractor.attempts());

    // Stops together with the coordinator
    drop(fixture);
    tokio::time::timeout(Duration::from_secs(5), preloader)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn coalesce_change_notifications() {
    let fixture = Fixture::new(metadata_only());
    fixture.index_client.set_rows(vec![new_row(1)]);
    fixture.index_client.set_query_gate_open(false);

    let initial_scan = fixture.coordinator.start().await.unwrap();
    assert!(fixture.index_client.is_subscribed());
    let index_client = Arc::clone(&fixture.index_client);
    wait_until(|| index_client.queries() == 1).await;

    for _ in 0..5 {
        fixture.index_client.notify_changed();
    }
    assert!(fixture.coordinator.is_scanning());
    fixture.index_client.set_query_gate_open(true);

    // The follow-up scan has been spawned before the initial scan finishes
    assert!(matches!(
        initial_scan.await.unwrap(),
        ScanOutcome::Completed(_)
    ));
    let coordinator = Arc::clone(&fixture.coordinator);
    wait_until(|| !coordinator.is_scanning()).await;
    assert_eq!(2, fixture.index_client.queries());
    assert_eq!(ScanState::Completed(1), *fixture.coordinator.scan_state());
    assert_eq!(
        Some(ScanReport {
            unchanged: 1,
            ..Default::default()
        }),
        fixture.coordinator.last_scan_report()
    );

    fixture.coordinator.shutdown();
}

#[tokio::test]
async fn concurrent_scan_is_rejected() {
    let fixture = Fixture::new(metadata_only());
    fixture.index_client.set_query_gate_open(false);

    let first_scan = fixture
        .coordinator
        .try_spawn_scan(ScanMode::MetadataOnly)
        .unwrap();
    assert!(
        fixture
            .coordinator
            .run_full_scan(ScanMode::MetadataOnly)
            .await
            .is_none()
    );

    fixture.index_client.set_query_gate_open(true);
    assert!(matches!(first_scan.await.unwrap(), ScanOutcome::Completed(_)));
    assert_eq!(1, fixture.index_client.queries());
}

#[tokio::test]
async fn restore_tracks_from_store() {
    let store = Arc::new(FakeTrackStore::default());
    let tracks = (0..2).map(|index| new_row(index).normalize()).collect::<Vec<_>>();
    store.upsert_tracks(&tracks).unwrap();
    let fixture = Fixture::with_store(metadata_only(), store);
    fixture.index_client.set_rows((0..2).map(new_row).collect());
    fixture.index_client.set_query_gate_open(false);

    let initial_scan = fixture.coordinator.start().await.unwrap();
    // Published before the initial scan has finished
    assert_eq!(tracks[..], fixture.coordinator.track_list()[..]);

    fixture.index_client.set_query_gate_open(true);
    assert_eq!(
        ScanOutcome::Completed(ScanReport {
            unchanged: 2,
            ..Default::default()
        }),
        initial_scan.await.unwrap()
    );
}

#[tokio::test]
async fn search_published_tracks() {
    let fixture = Fixture::new(metadata_only());
    let rows = vec![
        RawRow {
            title: Some("Blue Train".to_owned()),
            ..new_row(1)
        },
        RawRow {
            title: Some("So What".to_owned()),
            genre: Some("Blues".to_owned()),
            ..new_row(2)
        },
        RawRow {
            title: Some("Giant Steps".to_owned()),
            ..new_row(3)
        },
    ];
    fixture.index_client.set_rows(rows);
    fixture
        .coordinator
        .run_full_scan(ScanMode::MetadataOnly)
        .await;

    let results = fixture.coordinator.search(" BLUE ");
    assert_eq!(2, results.len());
    // Served from the search tier
    assert!(Arc::ptr_eq(&results, &fixture.coordinator.search("blue")));
    assert_eq!(3, fixture.coordinator.search("").len());
    assert!(fixture.coordinator.search("bebop").is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn load_and_clear_artwork() {
    let fixture = Fixture::new(metadata_only());
    let row = new_row(1);
    fixture
        .extractor
        .insert_image(row.locator.clone(), new_jpeg_image_data(32, 32));
    fixture.index_client.set_rows(vec![row.clone(), new_row(2)]);
    fixture
        .coordinator
        .run_full_scan(ScanMode::MetadataOnly)
        .await;
    assert!(fixture.coordinator.cached_artwork_path(&row.media_id).is_none());

    let artwork_path = fixture
        .coordinator
        .load_artwork(&row.media_id, EmbeddedArtworkHint::Unknown)
        .await
        .unwrap();
    assert_eq!(Some(artwork_path), fixture.store.artwork_path(&row.media_id));
    assert!(
        fixture
            .coordinator
            .load_artwork(&new_row(2).media_id, EmbeddedArtworkHint::Unknown)
            .await
            .is_none()
    );
    assert!(
        fixture
            .coordinator
            .load_artwork(&MediaId::new("unknown"), EmbeddedArtworkHint::Present)
            .await
            .is_none()
    );

    let outcome = fixture.coordinator.clear_all_caches().await.unwrap();
    assert_eq!(1, outcome.removed_files);
    assert!(fixture.coordinator.cached_artwork_path(&row.media_id).is_none());
    let statistics = fixture.coordinator.cache_statistics().await.unwrap();
    assert_eq!(0, statistics.disk.files);
    // The published tracks are not affected
    assert_eq!(2, fixture.coordinator.track_list().len());
}

#[tokio::test(flavor = "multi_thread")]
async fn prefetch_artwork_of_selected_tracks() {
    let fixture = Fixture::new(metadata_only());
    let rows = (0..3).map(new_row).collect::<Vec<_>>();
    for row in &rows {
        fixture
            .extractor
            .insert_image(row.locator.clone(), new_jpeg_image_data(16, 16));
    }
    fixture.index_client.set_rows(rows.clone());
    fixture
        .coordinator
        .run_full_scan(ScanMode::MetadataOnly)
        .await;

    let outcome = fixture
        .coordinator
        .prefetch_artwork(&[rows[0].media_id.clone(), MediaId::new("unknown")])
        .await;

    assert_eq!(1, outcome.requested);
    assert_eq!(1, outcome.resolved);
    assert!(fixture.store.artwork_path(&rows[0].media_id).is_some());
    assert!(fixture.store.artwork_path(&rows[1].media_id).is_none());
}
