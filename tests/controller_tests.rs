// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the capture controller on the virtual platform

use camera_core::backends::camera::{
    CameraPosition, CaptureDevice, DeviceCapabilities, DeviceFocusMode, DeviceId,
    DeviceOrientation, ExposureMode, FlashMode, LensModel, LensType, PointOfInterest, ValueRange,
};
use camera_core::backends::motion::GravityVector;
use camera_core::backends::virtual_camera::{VirtualMotion, VirtualPlatform, phone_devices};
use camera_core::settings::{MemorySettings, SettingValue, SettingsKey, SettingsStore};
use camera_core::{CaptureController, CaptureError, Config, FocusMode, FocusState, SessionEvent};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn fast_config() -> Config {
    Config {
        continuous_focus_settle_ms: 20,
        single_shot_focus_settle_ms: 40,
        orientation_sample_interval_ms: 10,
        long_edge_budget: 400,
        ..Config::default()
    }
}

fn controller_with(
    platform: &VirtualPlatform,
    settings: Arc<MemorySettings>,
) -> CaptureController {
    CaptureController::new(
        Arc::new(platform.clone()),
        Arc::new(VirtualMotion::new()),
        settings,
        fast_config(),
    )
    .unwrap()
}

fn controller(platform: &VirtualPlatform) -> CaptureController {
    controller_with(platform, Arc::new(MemorySettings::new()))
}

fn back_wide(capabilities: DeviceCapabilities) -> CaptureDevice {
    CaptureDevice {
        id: DeviceId::new("back-wide"),
        name: "Back Wide Camera".to_string(),
        position: CameraPosition::Back,
        lens_type: LensType::Wide,
        capabilities,
    }
}

async fn back_lens(controller: &CaptureController, name: &str) -> LensModel {
    controller
        .available_lenses(CameraPosition::Back)
        .await
        .into_iter()
        .find(|lens| lens.name == name)
        .unwrap()
}

async fn wait_for_focus(controller: &CaptureController, state: FocusState) {
    for _ in 0..100 {
        if controller.focus_state() == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "focus never reached {:?}, still {:?}",
        state,
        controller.focus_state()
    );
}

// =============================================================================
// Session bootstrap and lenses
// =============================================================================

#[tokio::test]
async fn test_setup_activates_back_wide() {
    let platform = VirtualPlatform::phone();
    let controller = controller(&platform);

    controller.setup().await.unwrap();

    let state = controller.session_state();
    assert_eq!(state.camera_position, CameraPosition::Back);
    assert_eq!(
        state.active_device.map(|device| device.id),
        Some(DeviceId::new("back-wide"))
    );
    assert_eq!(controller.current_lens().unwrap().name, "1x");
    assert_eq!(platform.recorder().committed_inputs(), vec![DeviceId::new("back-wide")]);
    assert!(!controller.session_state().is_running);
}

#[tokio::test]
async fn test_setup_without_back_camera_fails() {
    let front_only: Vec<CaptureDevice> = phone_devices()
        .into_iter()
        .filter(|device| device.position == CameraPosition::Front)
        .collect();
    let platform = VirtualPlatform::new(front_only);
    let controller = controller(&platform);

    assert!(matches!(
        controller.setup().await,
        Err(CaptureError::DeviceNotFound(_))
    ));
}

#[tokio::test]
async fn test_start_and_stop_are_idempotent() {
    let platform = VirtualPlatform::phone();
    let controller = controller(&platform);
    controller.setup().await.unwrap();

    controller.start().await.unwrap();
    controller.start().await.unwrap();
    assert!(controller.session_state().is_running);

    controller.stop().await.unwrap();
    controller.stop().await.unwrap();
    assert!(!controller.session_state().is_running);
}

#[tokio::test]
async fn test_available_lenses_are_ordered() {
    let platform = VirtualPlatform::phone();
    let controller = controller(&platform);

    let back: Vec<String> = controller
        .available_lenses(CameraPosition::Back)
        .await
        .into_iter()
        .map(|lens| lens.name)
        .collect();
    assert_eq!(back, vec!["0.5x", "1x", "3x"]);

    let front = controller.available_lenses(CameraPosition::Front).await;
    assert_eq!(front.len(), 1);
    assert_eq!(front[0].name, "Front");
}

#[tokio::test]
async fn test_switch_lens_updates_envelope_and_resets_zoom() {
    let platform = VirtualPlatform::phone();
    let controller = controller(&platform);
    controller.setup().await.unwrap();
    controller.set_zoom(2.5);

    let telephoto = controller
        .available_lenses(CameraPosition::Back)
        .await
        .into_iter()
        .find(|lens| lens.name == "3x")
        .unwrap();
    let message = controller.switch_lens(telephoto).await.unwrap();

    assert_eq!(message, "Switched to 3x");
    assert_eq!(controller.zoom_factor(), 1.0);
    assert_eq!(controller.zoom_envelope().max, 15.0);
    assert_eq!(
        platform.recorder().committed_inputs(),
        vec![DeviceId::new("back-telephoto")]
    );
}

#[tokio::test]
async fn test_refused_lens_switch_keeps_previous_input() {
    let platform = VirtualPlatform::phone();
    let controller = controller(&platform);
    controller.setup().await.unwrap();
    platform
        .faults()
        .refuse_input(&DeviceId::new("back-telephoto"));

    let telephoto = controller
        .available_lenses(CameraPosition::Back)
        .await
        .into_iter()
        .find(|lens| lens.lens_type == LensType::Telephoto)
        .unwrap();
    let result = controller.switch_lens(telephoto).await;

    assert!(matches!(result, Err(CaptureError::DeviceNotAddable(_))));
    assert_eq!(
        controller
            .session_state()
            .active_device
            .map(|device| device.id),
        Some(DeviceId::new("back-wide"))
    );
    assert_eq!(platform.recorder().committed_inputs(), vec![DeviceId::new("back-wide")]);
    assert!(platform.recorder().max_committed_inputs() <= 1);
    assert_eq!(controller.current_lens().unwrap().name, "1x");
}

#[tokio::test]
async fn test_unknown_lens_is_not_available() {
    let platform = VirtualPlatform::new(
        phone_devices()
            .into_iter()
            .filter(|device| device.lens_type != LensType::Telephoto)
            .collect(),
    );
    let controller = controller(&platform);
    controller.setup().await.unwrap();

    let lens = camera_core::backends::camera::LensModel::new(
        LensType::Telephoto,
        CameraPosition::Back,
    );
    assert!(matches!(
        controller.switch_lens(lens).await,
        Err(CaptureError::LensNotAvailable(_))
    ));
}

#[tokio::test]
async fn test_back_lens_memory_survives_front_round_trip() {
    let platform = VirtualPlatform::phone();
    let controller = controller(&platform);
    controller.setup().await.unwrap();

    let ultra_wide = controller
        .available_lenses(CameraPosition::Back)
        .await
        .into_iter()
        .find(|lens| lens.name == "0.5x")
        .unwrap();
    controller.switch_lens(ultra_wide).await.unwrap();

    controller.toggle_position().await.unwrap();
    assert_eq!(controller.session_state().camera_position, CameraPosition::Front);
    assert_eq!(controller.last_selected_lens().unwrap().name, "0.5x");

    controller.toggle_position().await.unwrap();
    assert_eq!(controller.session_state().camera_position, CameraPosition::Back);
    assert_eq!(controller.current_lens().unwrap().name, "0.5x");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_lens_queries_do_not_wait_for_a_switch() {
    let platform = VirtualPlatform::phone();
    let controller = controller(&platform);
    controller.setup().await.unwrap();
    let telephoto = back_lens(&controller, "3x").await;
    platform.faults().set_input_delay(Duration::from_millis(300));

    let switching = tokio::spawn({
        let controller = controller.clone();
        async move { controller.switch_lens(telephoto).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = Instant::now();
    let lenses = controller.available_lenses(CameraPosition::Back).await;
    let current = controller.current_lens();
    let zoom_envelope = controller.zoom_envelope();
    assert!(
        started.elapsed() < Duration::from_millis(200),
        "lens queries waited {:?} for the switch",
        started.elapsed()
    );
    assert_eq!(lenses.len(), 3);
    assert_eq!(current.unwrap().name, "1x");
    assert_eq!(zoom_envelope.max, 2.96);

    switching.await.unwrap().unwrap();
    assert_eq!(controller.current_lens().unwrap().name, "3x");
}

// =============================================================================
// Zoom
// =============================================================================

#[tokio::test]
async fn test_zoom_before_setup_is_dropped() {
    let platform = VirtualPlatform::phone();
    let controller = controller(&platform);

    assert_eq!(controller.set_zoom(2.0), None);
}

#[tokio::test]
async fn test_zoom_is_clamped_to_device_range() {
    let platform = VirtualPlatform::phone();
    let controller = controller(&platform);
    controller.setup().await.unwrap();

    assert_eq!(controller.set_zoom(0.5), Some(1.0));
    assert_eq!(controller.set_zoom(20.0), Some(16.0));
    assert_eq!(controller.set_zoom(f64::NAN), None);

    let wide = platform.device_control(&DeviceId::new("back-wide")).unwrap();
    assert_eq!(wide.snapshot().zoom_factor, 16.0);
    assert_eq!(wide.unlocked_writes(), 0);
}

#[tokio::test]
async fn test_zoom_never_goes_below_ui_minimum() {
    let platform = VirtualPlatform::new(vec![back_wide(DeviceCapabilities {
        zoom_range: ValueRange::new(0.5, 10.0),
        ..DeviceCapabilities::default()
    })]);
    let controller = controller(&platform);
    controller.setup().await.unwrap();

    assert_eq!(controller.set_zoom(0.7), Some(1.0));
}

#[tokio::test]
async fn test_ui_minimum_zoom_holds_after_setup_and_switch() {
    let platform = VirtualPlatform::phone();
    let config = Config {
        ui_min_zoom: 2.0,
        ..fast_config()
    };
    let controller = CaptureController::new(
        Arc::new(platform.clone()),
        Arc::new(VirtualMotion::new()),
        Arc::new(MemorySettings::new()),
        config,
    )
    .unwrap();
    controller.setup().await.unwrap();
    assert_eq!(controller.zoom_factor(), 2.0);

    let telephoto = back_lens(&controller, "3x").await;
    controller.switch_lens(telephoto).await.unwrap();

    assert_eq!(controller.zoom_factor(), 2.0);
    assert_eq!(controller.zoom_envelope().min, 2.0);
    let tele = platform
        .device_control(&DeviceId::new("back-telephoto"))
        .unwrap();
    assert_eq!(tele.snapshot().zoom_factor, 2.0);
    assert_eq!(controller.set_zoom(1.0), Some(2.0));
}

#[tokio::test]
async fn test_zoom_matches_hardware_when_switch_cannot_lock() {
    let platform = VirtualPlatform::phone();
    let controller = controller(&platform);
    controller.setup().await.unwrap();
    assert_eq!(controller.set_zoom(3.0), Some(3.0));
    let telephoto = back_lens(&controller, "3x").await;

    platform.faults().set_lock_failures(true);
    controller.switch_lens(telephoto).await.unwrap();

    let tele = platform
        .device_control(&DeviceId::new("back-telephoto"))
        .unwrap();
    assert_eq!(controller.zoom_factor(), tele.snapshot().zoom_factor);
    assert_eq!(controller.zoom_factor(), 1.0);
}

#[tokio::test]
async fn test_zoom_publishes_change() {
    let platform = VirtualPlatform::phone();
    let controller = controller(&platform);
    controller.setup().await.unwrap();
    let mut events = controller.subscribe();

    controller.set_zoom(2.0);

    loop {
        match events.recv().await.unwrap() {
            SessionEvent::Zoom(factor) => {
                assert_eq!(factor, 2.0);
                break;
            }
            _ => continue,
        }
    }
}

// =============================================================================
// Focus
// =============================================================================

#[tokio::test]
async fn test_focus_lock_and_unlock() {
    let platform = VirtualPlatform::phone();
    let controller = controller(&platform);
    controller.setup().await.unwrap();
    wait_for_focus(&controller, FocusState::Focused).await;

    controller.lock_focus().await.unwrap();
    assert_eq!(controller.focus_mode(), FocusMode::Locked);
    assert_eq!(controller.focus_state(), FocusState::Locked);

    // Ignored while locked
    controller
        .focus_at(PointOfInterest::new(0.2, 0.8))
        .await
        .unwrap();
    assert_eq!(controller.focus_state(), FocusState::Locked);

    controller.unlock_focus().await.unwrap();
    assert_eq!(controller.focus_mode(), FocusMode::Continuous);
    assert_eq!(controller.focus_state(), FocusState::Focusing);
    wait_for_focus(&controller, FocusState::Focused).await;

    let wide = platform.device_control(&DeviceId::new("back-wide")).unwrap();
    assert_eq!(
        wide.snapshot().focus_mode,
        DeviceFocusMode::ContinuousAutoFocus
    );
}

#[tokio::test]
async fn test_focus_at_sets_point_of_interest() {
    let platform = VirtualPlatform::phone();
    let controller = controller(&platform);
    controller.setup().await.unwrap();

    let point = PointOfInterest::new(0.25, 0.75);
    controller.focus_at(point).await.unwrap();

    let wide = platform.device_control(&DeviceId::new("back-wide")).unwrap();
    assert_eq!(wide.snapshot().focus_point, Some(point));
    assert_eq!(controller.focus_state(), FocusState::Focusing);
    wait_for_focus(&controller, FocusState::Focused).await;
}

#[tokio::test]
async fn test_focus_lock_failure_marks_failed() {
    let platform = VirtualPlatform::phone();
    let controller = controller(&platform);
    controller.setup().await.unwrap();
    wait_for_focus(&controller, FocusState::Focused).await;
    platform.faults().set_lock_failures(true);

    let result = controller.lock_focus().await;

    assert!(matches!(result, Err(CaptureError::ConfigurationLockFailed(_))));
    assert_eq!(controller.focus_state(), FocusState::Failed);
}

#[tokio::test]
async fn test_manual_focus_ignores_taps() {
    let platform = VirtualPlatform::phone();
    let controller = controller(&platform);
    controller.setup().await.unwrap();
    wait_for_focus(&controller, FocusState::Focused).await;

    controller.set_focus_mode(FocusMode::Manual).await.unwrap();
    controller.focus_at(PointOfInterest::CENTER).await.unwrap();

    assert_eq!(controller.focus_mode(), FocusMode::Manual);
    assert_eq!(controller.focus_state(), FocusState::Focused);
}

#[tokio::test]
async fn test_focus_lock_is_persisted_and_restored() {
    let platform = VirtualPlatform::phone();
    let settings = Arc::new(MemorySettings::new());
    let controller = controller_with(&platform, Arc::clone(&settings));
    controller.setup().await.unwrap();
    controller.lock_focus().await.unwrap();
    assert_eq!(
        settings.get(SettingsKey::FocusLocked),
        Some(SettingValue::Bool(true))
    );

    let platform = VirtualPlatform::phone();
    let restored = controller_with(&platform, settings);
    restored.setup().await.unwrap();

    assert_eq!(restored.focus_mode(), FocusMode::Locked);
    let wide = platform.device_control(&DeviceId::new("back-wide")).unwrap();
    assert_eq!(wide.snapshot().focus_mode, DeviceFocusMode::Locked);
}

#[tokio::test]
async fn test_subject_area_change_refocuses_in_continuous_mode() {
    let platform = VirtualPlatform::phone();
    let controller = controller(&platform);
    controller.setup().await.unwrap();
    wait_for_focus(&controller, FocusState::Focused).await;
    let wide = platform.device_control(&DeviceId::new("back-wide")).unwrap();
    controller
        .focus_at(PointOfInterest::new(0.2, 0.2))
        .await
        .unwrap();
    wait_for_focus(&controller, FocusState::Focused).await;
    let mut events = controller.subscribe();

    controller.subject_area_changed().await.unwrap();

    assert_eq!(controller.focus_state(), FocusState::Focusing);
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::FocusState(FocusState::Focusing)
    );
    assert_eq!(wide.snapshot().focus_point, Some(PointOfInterest::CENTER));
    wait_for_focus(&controller, FocusState::Focused).await;
}

#[tokio::test]
async fn test_subject_area_change_ignored_outside_continuous_mode() {
    let platform = VirtualPlatform::phone();
    let controller = controller(&platform);
    controller.setup().await.unwrap();
    controller.set_focus_mode(FocusMode::Auto).await.unwrap();
    let point = PointOfInterest::new(0.3, 0.6);
    controller.focus_at(point).await.unwrap();
    wait_for_focus(&controller, FocusState::Focused).await;
    let mut events = controller.subscribe();

    controller.subject_area_changed().await.unwrap();

    assert_eq!(controller.focus_state(), FocusState::Focused);
    assert!(events.try_recv().is_err());
    let wide = platform.device_control(&DeviceId::new("back-wide")).unwrap();
    assert_eq!(wide.snapshot().focus_point, Some(point));
}

// =============================================================================
// Exposure, white balance and flash
// =============================================================================

#[tokio::test]
async fn test_exposure_bias_maps_onto_device_range() {
    let platform = VirtualPlatform::new(vec![back_wide(DeviceCapabilities {
        exposure_bias_range: ValueRange::new(-4.0, 4.0),
        ..DeviceCapabilities::default()
    })]);
    let controller = controller(&platform);
    controller.setup().await.unwrap();
    let wide = platform.device_control(&DeviceId::new("back-wide")).unwrap();

    controller.set_exposure_bias(-2.0).await.unwrap();
    assert_eq!(wide.snapshot().exposure_bias, -4.0);
    assert_eq!(wide.snapshot().exposure_mode, ExposureMode::ContinuousAuto);

    controller.set_exposure_bias(0.0).await.unwrap();
    assert_eq!(wide.snapshot().exposure_bias, 0.0);
    assert_eq!(controller.exposure_settings().iso, 0.0);
    assert_eq!(wide.unlocked_writes(), 0);
}

#[tokio::test]
async fn test_shutter_speed_waits_for_acknowledgement() {
    let platform = VirtualPlatform::phone();
    let controller = controller(&platform);
    controller.setup().await.unwrap();
    let delay = Duration::from_millis(100);
    platform.faults().set_exposure_ack_delay(delay);

    let started = Instant::now();
    controller.set_shutter_speed(2.0).await.unwrap();
    assert!(started.elapsed() >= delay);

    let wide = platform.device_control(&DeviceId::new("back-wide")).unwrap();
    let snapshot = wide.snapshot();
    assert_eq!(snapshot.exposure_mode, ExposureMode::Custom);
    assert_eq!(snapshot.exposure_duration, Duration::from_secs(1));
    assert_eq!(controller.exposure_settings().shutter_speed, 1.0);
    // Custom shutter runs at the baseline ISO
    assert_eq!(controller.exposure_settings().iso, 32.0);
}

#[tokio::test]
async fn test_iso_is_clamped_and_persisted() {
    let platform = VirtualPlatform::phone();
    let settings = Arc::new(MemorySettings::new());
    let controller = controller_with(&platform, Arc::clone(&settings));
    controller.setup().await.unwrap();

    controller.set_iso(10_000.0).await.unwrap();

    let wide = platform.device_control(&DeviceId::new("back-wide")).unwrap();
    assert_eq!(wide.snapshot().iso, 3072.0);
    assert_eq!(
        settings.get(SettingsKey::IsoValue),
        Some(SettingValue::Float(3072.0))
    );
}

#[tokio::test]
async fn test_iso_rejected_without_custom_exposure() {
    let platform = VirtualPlatform::new(vec![back_wide(DeviceCapabilities {
        exposure_modes: vec![ExposureMode::ContinuousAuto],
        ..DeviceCapabilities::default()
    })]);
    let controller = controller(&platform);
    controller.setup().await.unwrap();

    let err = controller.set_iso(100.0).await.unwrap_err();
    assert_eq!(
        err,
        CaptureError::UnsupportedMode("custom exposure mode".to_string())
    );
    assert_eq!(err.user_message(), "Device does not support custom exposure mode");
    let wide = platform.device_control(&DeviceId::new("back-wide")).unwrap();
    assert_eq!(wide.snapshot().exposure_mode, ExposureMode::ContinuousAuto);
}

#[tokio::test]
async fn test_auto_exposure_survives_restart() {
    let platform = VirtualPlatform::phone();
    let settings = Arc::new(MemorySettings::new());
    let controller = controller_with(&platform, Arc::clone(&settings));
    controller.setup().await.unwrap();

    controller.set_shutter_speed(0.01).await.unwrap();
    controller.set_iso(0.0).await.unwrap();

    let exposure = controller.exposure_settings();
    assert_eq!(exposure.iso, 0.0);
    assert_eq!(exposure.shutter_speed, 0.0);
    assert_eq!(
        settings.get(SettingsKey::ShutterSpeed),
        Some(SettingValue::Float(0.0))
    );

    let platform = VirtualPlatform::phone();
    let restored = controller_with(&platform, settings);
    restored.setup().await.unwrap();

    let wide = platform.device_control(&DeviceId::new("back-wide")).unwrap();
    assert_eq!(wide.snapshot().exposure_mode, ExposureMode::ContinuousAuto);
    assert_eq!(restored.exposure_settings().shutter_speed, 0.0);
}

#[tokio::test]
async fn test_auto_shutter_clears_stored_iso() {
    let platform = VirtualPlatform::phone();
    let controller = controller(&platform);
    controller.setup().await.unwrap();

    controller.set_iso(400.0).await.unwrap();
    controller.set_shutter_speed(0.0).await.unwrap();

    let exposure = controller.exposure_settings();
    assert_eq!(exposure.iso, 0.0);
    assert_eq!(exposure.shutter_speed, 0.0);
    let wide = platform.device_control(&DeviceId::new("back-wide")).unwrap();
    assert_eq!(wide.snapshot().exposure_mode, ExposureMode::ContinuousAuto);
}

#[tokio::test]
async fn test_custom_exposure_survives_restart() {
    let platform = VirtualPlatform::phone();
    let settings = Arc::new(MemorySettings::new());
    let controller = controller_with(&platform, Arc::clone(&settings));
    controller.setup().await.unwrap();
    controller.set_shutter_speed(0.01).await.unwrap();
    controller.set_iso(400.0).await.unwrap();

    let platform = VirtualPlatform::phone();
    let restored = controller_with(&platform, settings);
    restored.setup().await.unwrap();

    let wide = platform.device_control(&DeviceId::new("back-wide")).unwrap();
    let snapshot = wide.snapshot();
    assert_eq!(snapshot.exposure_mode, ExposureMode::Custom);
    assert_eq!(snapshot.exposure_duration, Duration::from_secs_f64(0.01));
    assert_eq!(snapshot.iso, 400.0);
}

#[tokio::test]
async fn test_exposure_setters_report_missing_device() {
    let platform = VirtualPlatform::phone();
    let controller = controller(&platform);

    assert!(matches!(
        controller.set_iso(100.0).await,
        Err(CaptureError::DeviceNotFound(_))
    ));
    assert!(matches!(
        controller.set_flash_mode(FlashMode::On).await,
        Err(CaptureError::DeviceNotFound(_))
    ));
    controller.set_flash_mode(FlashMode::Off).await.unwrap();
}

#[tokio::test]
async fn test_exposure_setters_report_lock_failure() {
    let platform = VirtualPlatform::phone();
    let settings = Arc::new(MemorySettings::new());
    let controller = controller_with(&platform, Arc::clone(&settings));
    controller.setup().await.unwrap();
    platform.faults().set_lock_failures(true);

    let err = controller.set_exposure_bias(1.0).await.unwrap_err();

    assert!(matches!(err, CaptureError::ConfigurationLockFailed(_)));
    assert_eq!(err.user_message(), "Camera is busy");
    assert_eq!(controller.exposure_settings().exposure_bias, 0.0);
    assert_eq!(settings.get(SettingsKey::ExposureValue), None);
}

#[tokio::test]
async fn test_non_finite_exposure_is_rejected() {
    let platform = VirtualPlatform::phone();
    let controller = controller(&platform);
    controller.setup().await.unwrap();

    assert!(matches!(
        controller.set_shutter_speed(f64::INFINITY).await,
        Err(CaptureError::UnsupportedMode(_))
    ));
    let wide = platform.device_control(&DeviceId::new("back-wide")).unwrap();
    assert_eq!(wide.snapshot().exposure_mode, ExposureMode::ContinuousAuto);
}

#[tokio::test]
async fn test_white_balance_preset_locks_gains() {
    let platform = VirtualPlatform::phone();
    let controller = controller(&platform);
    controller.setup().await.unwrap();

    controller
        .set_white_balance(camera_core::WhiteBalancePreset::Incandescent)
        .await
        .unwrap();

    let wide = platform.device_control(&DeviceId::new("back-wide")).unwrap();
    let snapshot = wide.snapshot();
    assert_eq!(
        snapshot.white_balance_mode,
        camera_core::backends::camera::WhiteBalanceMode::Locked
    );
    let gains = snapshot.white_balance_gains;
    for gain in [gains.red, gains.green, gains.blue] {
        assert!((1.0..=4.0).contains(&gain), "gain {} out of range", gain);
    }
}

#[tokio::test]
async fn test_front_camera_rejects_flash() {
    let platform = VirtualPlatform::phone();
    let controller = controller(&platform);
    controller.setup().await.unwrap();
    controller.switch_position(CameraPosition::Front).await.unwrap();

    assert!(matches!(
        controller.set_flash_mode(FlashMode::On).await,
        Err(CaptureError::UnsupportedMode(_))
    ));
    assert_eq!(controller.flash_mode(), FlashMode::Off);
    controller.set_flash_mode(FlashMode::Off).await.unwrap();
}

#[tokio::test]
async fn test_cycle_flash_mode() {
    let platform = VirtualPlatform::phone();
    let controller = controller(&platform);
    controller.setup().await.unwrap();

    controller.cycle_flash_mode().await.unwrap();
    assert_eq!(controller.flash_mode(), FlashMode::On);
    controller.cycle_flash_mode().await.unwrap();
    assert_eq!(controller.flash_mode(), FlashMode::Auto);
    controller.cycle_flash_mode().await.unwrap();
    assert_eq!(controller.flash_mode(), FlashMode::Off);
}

#[tokio::test]
async fn test_aspect_ratio_is_persisted() {
    let platform = VirtualPlatform::phone();
    let settings = Arc::new(MemorySettings::new());
    let controller = controller_with(&platform, Arc::clone(&settings));

    controller.set_aspect_ratio(camera_core::AspectRatio::Square);

    assert_eq!(settings.get(SettingsKey::RatioMode), Some(SettingValue::Int(1)));
    let restored = controller_with(&platform, settings);
    assert_eq!(restored.aspect_ratio(), camera_core::AspectRatio::Square);
}

#[tokio::test]
async fn test_orientation_publishes_changes_only() {
    let platform = VirtualPlatform::phone();
    let motion = Arc::new(VirtualMotion::new());
    let controller = CaptureController::new(
        Arc::new(platform.clone()),
        motion.clone(),
        Arc::new(MemorySettings::new()),
        fast_config(),
    )
    .unwrap();
    let mut orientation = controller.subscribe_orientation();
    controller.start_orientation_updates();

    // Upright samples match the initial orientation
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(!orientation.has_changed().unwrap());

    motion.set_gravity(GravityVector::new(-1.0, 0.0, 0.0));
    tokio::time::timeout(Duration::from_secs(2), orientation.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(*orientation.borrow_and_update(), DeviceOrientation::LandscapeLeft);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(!orientation.has_changed().unwrap());
    controller.stop_orientation_updates();
    assert!(!motion.is_active());
}
