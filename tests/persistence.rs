mod common;

use std::path::PathBuf;

use murmuration_io::{load_rkyv, load_simulation, IoError, SavedSimulation};
use murmuration_lib::app::App;
use murmuration_lib::model::config::{GlobalSetting, SettingValue};
use murmuration_lib::model::state::InitialState;

use common::{run, FlockBuilder};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("murmuration_it_{}_{}", std::process::id(), name))
}

#[test]
fn test_saved_flock_continues_identically() {
    let mut flock = FlockBuilder::new().with_count(150).with_seed(21).build();
    run(&mut flock, 10, 0.05);

    let path = temp_path("continue.json.gz");
    murmuration_io::save_simulation(&SavedSimulation::capture(&flock), &path)
        .expect("Failed to save flock");
    let mut restored = load_simulation(&path)
        .and_then(|saved| saved.restore())
        .expect("Failed to restore flock");
    std::fs::remove_file(&path).ok();

    assert_eq!(restored.tick(), flock.tick());
    run(&mut flock, 15, 0.05);
    run(&mut restored, 15, 0.05);
    assert_eq!(restored.current_state(), flock.current_state());
}

#[test]
fn test_app_backup_round_trip() {
    let mut config = murmuration_lib::model::config::FlockConfig::default();
    config.world.count = 80;
    config.world.seed = Some(4);
    let mut app = App::new(config, 0.05).expect("Failed to create app");
    app.run(5).expect("Failed to run app");

    let dir = temp_path("backups");
    let path = app.backup(&dir).expect("Failed to back up");
    assert!(path.to_string_lossy().ends_with(".json.gz"));

    let resumed = App::from_save(&path, 0.05).expect("Failed to resume");
    std::fs::remove_dir_all(&dir).ok();
    assert_eq!(resumed.flock.tick(), 5);
    assert_eq!(resumed.flock.current_state(), app.flock.current_state());
}

#[test]
fn test_state_archive_matches_live_state() {
    let mut config = murmuration_lib::model::config::FlockConfig::default();
    config.world.count = 64;
    let mut app = App::new(config, 0.05).expect("Failed to create app");
    app.run(3).expect("Failed to run app");

    let path = temp_path("state.rkyv");
    app.save_state_archive(&path).expect("Failed to archive");
    let state: InitialState = load_rkyv(&path).expect("Failed to load archive");
    std::fs::remove_file(&path).ok();

    assert_eq!(state, app.flock.current_state());

    // An archived state seeds a fresh run of the same shape.
    app.flock.restart(Some(state)).expect("Archived state should be accepted");
    assert_eq!(app.flock.tick(), 0);
}

#[test]
fn test_pending_physical_change_is_not_saved() {
    let mut flock = FlockBuilder::new().build();
    flock
        .set_global(GlobalSetting::Count, SettingValue::Number(30.0))
        .unwrap();
    run(&mut flock, 2, 0.05);

    let saved = SavedSimulation::capture(&flock);
    assert_eq!(saved.config.world.count, 100);
    saved.validate().expect("Snapshot should describe the running flock");
}

#[test]
fn test_missing_save_is_not_found() {
    let err = load_simulation(temp_path("nowhere.json")).unwrap_err();
    assert!(matches!(err, IoError::NotFound(_)));
}

#[test]
fn test_malformed_state_is_rejected_without_side_effects() {
    let mut flock = FlockBuilder::new().with_count(20).build();
    run(&mut flock, 3, 0.05);
    let before = flock.current_state();

    let mut short = flock.current_state();
    short.positions.pop();
    assert!(flock.restart(Some(short)).is_err());

    let mut wrong_count = flock.current_state();
    wrong_count.indices.push(20);
    assert!(flock.restart(Some(wrong_count)).is_err());

    assert_eq!(flock.current_state(), before);
    assert_eq!(flock.tick(), 3);
    assert_eq!(flock.metrics().counter("restarts_rejected"), 2);
}
