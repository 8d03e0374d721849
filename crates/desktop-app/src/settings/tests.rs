// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::{Arc, Mutex};

use discro::tasklet::OnChanged;
use test_log::test;

use super::*;

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
fn restore_defaults_from_empty_dir() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;

    let settings = State::restore_from_parent_dir(temp_dir.path())?;

    let database_config = settings.create_database_config()?;
    assert!(database_config.database_url.ends_with("melodex.sqlite"));
    assert_eq!(
        temp_dir.path().join(DEFAULT_ARTWORK_CACHE_DIR_NAME),
        settings.artwork_cache_dir()?
    );
    assert!(settings.music_dirs.is_empty());
    assert_eq!(DEFAULT_PREFETCH_COUNT, settings.coordinator_config().prefetch_count);

    Ok(())
}

#[test]
fn save_and_load() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let mut settings = State::restore_from_parent_dir(temp_dir.path())?;
    assert!(settings.update_music_dirs(vec![temp_dir.path().join("music")]));
    settings.disk_cache_capacity_mib = 1;
    settings.scan_mode = ScanMode::MetadataOnly;

    settings.save(temp_dir.path())?;

    let loaded = State::load(temp_dir.path())?;
    assert_eq!(settings, loaded);
    assert_eq!(1024 * 1024, loaded.strategy_config().disk_capacity_bytes);
    assert_eq!(settings.music_dirs, loaded.fs_index_config().root_dirs);

    Ok(())
}

#[test]
fn missing_fields_are_defaulted() -> anyhow::Result<()> {
    let settings: State = ron::de::from_str("(min_duration_secs: 10)")?;

    assert_eq!(Duration::from_secs(10), settings.index_filter().min_duration);
    assert_eq!(DEFAULT_MAX_DIM, settings.resolver_config().max_dim);
    assert!(settings.database_url.is_none());

    Ok(())
}

#[test]
fn update_music_dirs_without_effect() {
    let state = ObservableState::default();
    assert!(!state.update_music_dirs(Vec::new()));
    assert!(state.update_music_dirs(vec![PathBuf::from("/music")]));
    assert!(!state.update_music_dirs(vec![PathBuf::from("/music")]));
}

#[tokio::test]
async fn save_changed_settings() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let state = ObservableState::new(State::restore_from_parent_dir(temp_dir.path())?);
    let errors = Arc::new(Mutex::new(Vec::new()));
    let save_task = tokio::spawn(tasklet::on_state_changed_save_to_file(
        state.subscribe_changed(),
        temp_dir.path().to_path_buf(),
        {
            let errors = Arc::clone(&errors);
            move |err| errors.lock().unwrap().push(err.to_string())
        },
    ));

    // The initial settings are not saved
    assert_eq!(State::default(), State::load(temp_dir.path())?);

    state.update_music_dirs(vec![temp_dir.path().join("music")]);
    let expected = state.read().clone();
    wait_until(|| State::load(temp_dir.path()).is_ok_and(|loaded| loaded == expected)).await;
    drop(state);
    save_task.await?;

    assert!(errors.lock().unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn notify_music_dirs_changed() {
    let state = ObservableState::default();
    let notified = Arc::new(Mutex::new(Vec::new()));
    let task = tokio::spawn(tasklet::on_music_dirs_changed(state.subscribe_changed(), {
        let notified = Arc::clone(&notified);
        move |music_dirs| {
            notified.lock().unwrap().push(music_dirs.to_vec());
            OnChanged::Continue
        }
    }));

    state.update_music_dirs(vec![PathBuf::from("/music")]);
    wait_until(|| notified.lock().unwrap().len() == 2).await;
    drop(state);
    task.await.unwrap();

    assert_eq!(
        vec![Vec::new(), vec![PathBuf::from("/music")]],
        *notified.lock().unwrap()
    );
}
