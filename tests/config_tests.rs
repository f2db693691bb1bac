// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration and settings persistence

use camera_core::Config;
use camera_core::settings::{JsonFileSettings, SettingValue, SettingsKey, SettingsStore};
use std::time::Duration;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.long_edge_budget, 1920);
    assert_eq!(config.continuous_focus_settle(), Duration::from_millis(500));
    assert_eq!(config.single_shot_focus_settle(), Duration::from_secs(1));
    assert_eq!(config.ui_min_zoom, 1.0);
}

#[test]
fn test_partial_config_file_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "long_edge_budget": 1024 }"#).unwrap();

    let config = Config::load(&path).unwrap();

    assert_eq!(config.long_edge_budget, 1024);
    assert_eq!(
        config.orientation_sample_interval(),
        Config::default().orientation_sample_interval()
    );
}

#[test]
fn test_invalid_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "not json").unwrap();

    assert!(Config::load(&path).is_err());
}

#[test]
fn test_settings_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let settings = JsonFileSettings::open(&path);
    settings.set(SettingsKey::FlashMode, SettingValue::Int(2));
    settings.set(SettingsKey::FocusLocked, SettingValue::Bool(true));
    settings.set(SettingsKey::ShutterSpeed, SettingValue::Float(0.25));
    drop(settings);

    let reopened = JsonFileSettings::open(&path);
    assert_eq!(reopened.get(SettingsKey::FlashMode), Some(SettingValue::Int(2)));
    assert_eq!(
        reopened.get(SettingsKey::FocusLocked),
        Some(SettingValue::Bool(true))
    );
    assert_eq!(
        reopened.get(SettingsKey::ShutterSpeed).and_then(SettingValue::as_f64),
        Some(0.25)
    );
}
