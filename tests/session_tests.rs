// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the session controller on the synthetic camera

mod common;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use camera_session::backends::camera::types::{CameraPosition, FlashMode};
use camera_session::backends::camera::{SyntheticSettings, UnbindFailure};
use camera_session::backends::presentation::{PreviewBounds, SurfaceEvent};
use camera_session::pipelines::photo::{ViewRegion, encoding};
use camera_session::session::{AspectRatio, SessionState};
use camera_session::{CapturePayload, PhotoCaptureOptions, SessionConfiguration, SessionError};
use common::{Event, eventually, harness, is_picture, is_started, is_stopped, running};
use std::time::Duration;

fn slow_capture(ms: u64) -> SyntheticSettings {
    SyntheticSettings {
        capture_delay: Duration::from_millis(ms),
        ..SyntheticSettings::default()
    }
}

fn slow_focus(ms: u64) -> SyntheticSettings {
    SyntheticSettings {
        focus_duration: Duration::from_millis(ms),
        ..SyntheticSettings::default()
    }
}

fn failing_binds(attempts: &[u32]) -> SyntheticSettings {
    SyntheticSettings {
        fail_bind_attempts: attempts.to_vec(),
        ..SyntheticSettings::default()
    }
}

fn decode_payload(payload: &CapturePayload) -> image::DynamicImage {
    match payload {
        CapturePayload::Base64(data) => encoding::decode(&BASE64.decode(data).unwrap()).unwrap(),
        CapturePayload::FilePath(path) => encoding::decode(&std::fs::read(path).unwrap()).unwrap(),
    }
}

// ===== Lifecycle =====

#[test]
fn test_start_reports_centered_bounds() {
    let config = SessionConfiguration::builder()
        .aspect_ratio(AspectRatio::FOUR_THREE)
        .centered()
        .build();
    let h = running(SyntheticSettings::default(), config);

    let events = h.sink.events();
    assert_eq!(
        events[0],
        Event::Started(PreviewBounds {
            x: 0,
            y: 240,
            width: 1080,
            height: 1440
        })
    );
    assert!(h.controller.is_running());
    assert!(h.probe.is_bound());
}

#[test]
fn test_bind_failure_leaves_nothing_attached() {
    let h = harness(SyntheticSettings {
        fail_bind: true,
        ..SyntheticSettings::default()
    });
    h.controller.start_session(SessionConfiguration::default()).unwrap();
    h.sink
        .wait_for(|events| events.iter().any(|e| matches!(e, Event::StartError(_))));

    eventually(|| h.controller.state() == SessionState::Stopped);
    assert!(!h.probe.is_bound());
    assert!(h.controller.session_config().is_none());
    assert!(h.surface.events().contains(&SurfaceEvent::Released));
    assert_eq!(h.sink.count(is_started), 0);
}

#[test]
fn test_stop_is_idempotent_and_restartable() {
    let h = running(SyntheticSettings::default(), SessionConfiguration::default());
    h.stop_and_wait();
    h.controller.stop_session().unwrap();
    assert_eq!(h.sink.count(is_stopped), 1);
    assert_eq!(h.probe.unbinds(), 1);

    h.start(SessionConfiguration::default());
    assert!(h.controller.is_running());
    assert_eq!(h.probe.binds(), 2);
}

#[test]
fn test_unbind_error_during_teardown_still_stops() {
    for failure in [UnbindFailure::Error, UnbindFailure::Panic] {
        let h = running(
            SyntheticSettings {
                unbind_failure: Some(failure),
                ..SyntheticSettings::default()
            },
            SessionConfiguration::default(),
        );
        h.stop_and_wait();

        assert_eq!(h.controller.state(), SessionState::Stopped, "{:?}", failure);
        assert_eq!(h.sink.count(is_stopped), 1);
        assert_eq!(h.controller.active_operations(), 0);
        assert!(!h.controller.is_stopping());
        assert!(h.controller.session_config().is_none());
        assert!(h.surface.events().contains(&SurfaceEvent::Released));

        h.start(SessionConfiguration::default());
        assert!(h.controller.is_running(), "{:?}", failure);
    }
}

#[test]
fn test_operations_rejected_when_not_running() {
    let h = harness(SyntheticSettings::default());
    let err = h
        .controller
        .capture_photo(PhotoCaptureOptions::default())
        .unwrap_err();
    assert!(matches!(err, SessionError::NotReady(_)));
    assert!(matches!(h.controller.capture_sample(80), Err(SessionError::NotReady(_))));
    assert!(matches!(h.controller.set_zoom(2.0), Err(SessionError::NotReady(_))));
}

// ===== Deferred stop =====

#[test]
fn test_picture_taken_before_stopped_when_stop_races_capture() {
    let h = running(slow_capture(150), SessionConfiguration::default());

    h.controller.capture_photo(PhotoCaptureOptions::default()).unwrap();
    h.controller.stop_session().unwrap();

    assert!(h.controller.is_stop_deferred());
    assert!(h.controller.is_stopping());
    assert!(h.controller.is_busy());
    assert!(!h.controller.is_running());
    assert_eq!(h.controller.state(), SessionState::StopPending);

    // Preview is detached right away, the camera stays bound
    eventually(|| h.surface.events().contains(&SurfaceEvent::Detached));
    assert!(h.probe.is_bound());

    let events = h.sink.wait_for(|events| events.iter().any(is_stopped));
    let picture = events.iter().position(is_picture).expect("picture taken");
    let stopped = events.iter().position(is_stopped).expect("stopped");
    assert!(picture < stopped, "events out of order: {:?}", events);

    assert_eq!(h.controller.state(), SessionState::Stopped);
    assert!(!h.probe.is_bound());
    assert_eq!(h.probe.unbinds(), 1);
    assert!(!h.controller.is_busy());
}

#[test]
fn test_admission_refused_while_stop_pending() {
    let h = running(slow_capture(150), SessionConfiguration::default());
    h.controller.capture_photo(PhotoCaptureOptions::default()).unwrap();
    h.controller.stop_session().unwrap();

    assert!(matches!(
        h.controller.capture_photo(PhotoCaptureOptions::default()),
        Err(SessionError::Busy(_))
    ));
    assert!(matches!(h.controller.set_focus(0.5, 0.5), Err(SessionError::Busy(_))));
    assert!(matches!(h.controller.set_zoom(2.0), Err(SessionError::Busy(_))));
    assert!(matches!(
        h.controller.start_session(SessionConfiguration::default()),
        Err(SessionError::Busy(_))
    ));

    h.sink.wait_for(|events| events.iter().any(is_stopped));
    assert_eq!(h.sink.count(is_picture), 1);
}

#[test]
fn test_several_captures_drain_before_single_teardown() {
    let h = running(slow_capture(40), SessionConfiguration::default());
    for _ in 0..3 {
        h.controller.capture_photo(PhotoCaptureOptions::default()).unwrap();
    }
    h.controller.stop_session().unwrap();

    let events = h.sink.wait_for(|events| events.iter().any(is_stopped));
    assert_eq!(events.iter().filter(|e| is_picture(e)).count(), 3);
    assert_eq!(events.last(), Some(&Event::Stopped));

    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(h.sink.count(is_stopped), 1);
    assert_eq!(h.probe.unbinds(), 1);
}

// ===== Capture =====

#[test]
fn test_photo_is_upright_jpeg_with_normal_orientation() {
    let h = running(
        SyntheticSettings {
            orientation: 6,
            ..SyntheticSettings::default()
        },
        SessionConfiguration::default(),
    );
    h.controller
        .capture_photo(PhotoCaptureOptions {
            width: Some(240),
            ..PhotoCaptureOptions::default()
        })
        .unwrap();

    let events = h.sink.wait_for(|events| events.iter().any(is_picture));
    let Some(Event::PictureTaken(payload, metadata)) = events.iter().find(|e| is_picture(e)) else {
        panic!("no picture");
    };

    // 640x480 sensor rotated to 480x640, then fitted to width 240
    let image = decode_payload(payload);
    assert_eq!((image.width(), image.height()), (240, 320));
    assert_eq!(metadata.get("Orientation").map(String::as_str), Some("1"));
    assert_eq!(metadata.get("PixelXDimension").map(String::as_str), Some("240"));
    assert_eq!(metadata.get("Make").map(String::as_str), Some("Synthetic"));
}

#[test]
fn test_photo_cropped_to_preview_without_explicit_size() {
    let config = SessionConfiguration::builder()
        .aspect_ratio(AspectRatio::SIXTEEN_NINE)
        .build();
    let h = running(SyntheticSettings::default(), config);
    h.controller.capture_photo(PhotoCaptureOptions::default()).unwrap();

    let events = h.sink.wait_for(|events| events.iter().any(is_picture));
    let Some(Event::PictureTaken(payload, _)) = events.iter().find(|e| is_picture(e)) else {
        panic!("no picture");
    };
    // Bound at 640x360 for 16:9; preview is 1080x1920 portrait
    let image = decode_payload(payload);
    let ratio = image.width() as f64 / image.height() as f64;
    assert!((ratio - 1080.0 / 1920.0).abs() < 0.02, "ratio {}", ratio);
}

#[test]
fn test_store_to_file_and_gallery() {
    let config = SessionConfiguration::builder().store_to_file(true).build();
    let h = running(SyntheticSettings::default(), config);
    h.controller
        .capture_photo(PhotoCaptureOptions {
            save_to_gallery: true,
            ..PhotoCaptureOptions::default()
        })
        .unwrap();

    let events = h.sink.wait_for(|events| events.iter().any(is_picture));
    let Some(Event::PictureTaken(CapturePayload::FilePath(path), _)) =
        events.iter().find(|e| is_picture(e))
    else {
        panic!("expected a file payload: {:?}", events);
    };
    assert!(path.starts_with(h.dir.path().join("cache")));
    assert!(path.exists());

    let gallery: Vec<_> = std::fs::read_dir(h.dir.path().join("gallery"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(gallery.len(), 1);
    assert!(gallery[0].starts_with("IMG_") && gallery[0].ends_with(".jpg"));
}

#[test]
fn test_capture_failure_reported_through_callback() {
    let h = running(
        SyntheticSettings {
            fail_capture: true,
            ..SyntheticSettings::default()
        },
        SessionConfiguration::default(),
    );
    h.controller.capture_photo(PhotoCaptureOptions::default()).unwrap();
    h.sink
        .wait_for(|events| events.iter().any(|e| matches!(e, Event::PictureError(_))));
    eventually(|| h.controller.active_operations() == 0);
    assert!(!h.controller.is_capturing());
    assert_eq!(h.sink.count(is_picture), 0);
}

#[test]
fn test_invalid_quality_rejected() {
    let h = running(SyntheticSettings::default(), SessionConfiguration::default());
    let err = h
        .controller
        .capture_photo(PhotoCaptureOptions {
            quality: 101,
            ..PhotoCaptureOptions::default()
        })
        .unwrap_err();
    assert!(matches!(err, SessionError::InvalidArgument(_)));
}

#[test]
fn test_samples() {
    let h = running(SyntheticSettings::default(), SessionConfiguration::default());
    let is_sample = |e: &Event| matches!(e, Event::SampleTaken(_));

    h.controller.capture_sample(80).unwrap();
    h.controller.capture_downscaled_sample(80, 120).unwrap();
    let events = h.sink.wait_count(2, is_sample);

    let sizes: Vec<(u32, u32)> = events
        .iter()
        .filter_map(|e| match e {
            Event::SampleTaken(data) => {
                let image = encoding::decode(&BASE64.decode(data).unwrap()).unwrap();
                Some((image.width(), image.height()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(sizes, vec![(320, 240), (160, 120)]);

    // Default preview is the whole 1080x1920 screen
    h.controller
        .capture_cropped_sample(
            80,
            ViewRegion {
                x: 0,
                y: 0,
                width: 540,
                height: 960,
            },
        )
        .unwrap();
    h.sink.wait_count(3, is_sample);
    assert_eq!(h.probe.samples(), 3);
}

// ===== Focus =====

#[test]
fn test_focus_range_checks() {
    let h = running(SyntheticSettings::default(), SessionConfiguration::default());
    for (x, y) in [(-0.1, 0.5), (1.1, 0.5), (0.5, -0.1), (0.5, 1.1)] {
        assert!(
            matches!(h.controller.set_focus(x, y), Err(SessionError::InvalidArgument(_))),
            "({}, {}) accepted",
            x,
            y
        );
    }
    h.controller.set_focus(0.0, 0.0).unwrap();
    h.controller.set_focus(1.0, 1.0).unwrap();
}

#[test]
fn test_second_focus_cancels_first_quietly() {
    let h = running(slow_focus(200), SessionConfiguration::default());
    h.controller.set_focus(0.2, 0.2).unwrap();
    // Let the first sweep reach the backend before superseding it
    std::thread::sleep(Duration::from_millis(50));
    h.controller.set_focus(0.8, 0.8).unwrap();

    eventually(|| h.probe.focus_completed() + h.probe.focus_cancelled() == 2);
    assert_eq!(h.probe.focus_cancelled(), 1);
    assert_eq!(h.probe.focus_completed(), 1);

    // One hide per admitted request
    eventually(|| {
        h.surface
            .count(|e| matches!(e, SurfaceEvent::HideIndicator(_)))
            == 2
    });
    assert_eq!(
        h.surface
            .count(|e| matches!(e, SurfaceEvent::ShowIndicator(_))),
        2
    );

    // Nothing surfaced to the host
    let events = h.sink.events();
    assert_eq!(events.len(), 1, "unexpected callbacks: {:?}", events);
    eventually(|| h.controller.active_operations() == 0);
}

#[test]
fn test_focus_busy_during_capture() {
    let h = running(slow_capture(150), SessionConfiguration::default());
    h.controller.capture_photo(PhotoCaptureOptions::default()).unwrap();
    assert!(h.controller.is_capturing());
    assert!(matches!(h.controller.set_focus(0.5, 0.5), Err(SessionError::Busy(_))));
    h.sink.wait_for(|events| events.iter().any(is_picture));
}

#[test]
fn test_stop_cancels_outstanding_focus() {
    let h = running(slow_focus(2_000), SessionConfiguration::default());
    h.controller.set_focus(0.5, 0.5).unwrap();
    std::thread::sleep(Duration::from_millis(50));
    h.controller.stop_session().unwrap();

    h.sink.wait_for(|events| events.iter().any(is_stopped));
    assert_eq!(h.probe.focus_cancelled(), 1);
    assert_eq!(h.probe.focus_completed(), 0);
}

#[test]
fn test_focus_indicator_can_be_disabled() {
    let config = SessionConfiguration::builder()
        .disable_focus_indicator(true)
        .build();
    let h = running(SyntheticSettings::default(), config);
    h.controller.set_focus(0.5, 0.5).unwrap();
    eventually(|| h.probe.focus_completed() == 1);
    eventually(|| h.controller.active_operations() == 0);
    assert_eq!(
        h.surface
            .count(|e| matches!(e, SurfaceEvent::ShowIndicator(_) | SurfaceEvent::HideIndicator(_))),
        0
    );
}

// ===== Controls =====

#[tokio::test]
async fn test_zoom_clamped_and_recorded() {
    let h = running(SyntheticSettings::default(), SessionConfiguration::default());

    assert_eq!(h.controller.set_zoom(25.0).unwrap().await, Ok(10.0));
    assert_eq!(h.controller.session_config().unwrap().zoom_factor, 10.0);

    let zoom = h.controller.zoom_factors().unwrap().await.unwrap();
    assert_eq!((zoom.min, zoom.max, zoom.current), (1.0, 10.0, 10.0));
    assert_eq!(zoom.lens.device_type, "wideAngle");

    assert!(matches!(
        h.controller.set_zoom(f32::NAN),
        Err(SessionError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_exposure_compensation() {
    let h = running(SyntheticSettings::default(), SessionConfiguration::default());

    let range = h.controller.exposure_compensation_range().unwrap().await.unwrap();
    assert_eq!((range.min, range.max, range.step), (-2.0, 2.0, 0.5));

    assert_eq!(h.controller.set_exposure_compensation(1.2).unwrap().await, Ok(1.0));
    assert_eq!(h.controller.exposure_compensation().unwrap().await, Ok(1.0));
    assert_eq!(h.controller.set_exposure_compensation(9.0).unwrap().await, Ok(2.0));

    assert!(h.controller.set_exposure_mode("lock").unwrap().await.is_ok());
    assert!(h.controller.set_exposure_mode("Continuous").unwrap().await.is_ok());
    assert!(matches!(
        h.controller.set_exposure_mode("auto"),
        Err(SessionError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_focus_resets_exposure_to_neutral() {
    let h = running(SyntheticSettings::default(), SessionConfiguration::default());
    h.controller.set_exposure_compensation(1.5).unwrap().await.unwrap();
    h.controller.set_focus(0.5, 0.5).unwrap();
    eventually(|| h.probe.focus_completed() == 1);
    assert_eq!(h.controller.exposure_compensation().unwrap().await, Ok(0.0));
}

#[tokio::test]
async fn test_flash_modes_and_torch() {
    let h = running(SyntheticSettings::default(), SessionConfiguration::default());

    let modes = h.controller.supported_flash_modes().unwrap().await.unwrap();
    assert_eq!(modes, FlashMode::ALL.to_vec());

    h.controller.set_flash_mode("torch").unwrap().await.unwrap();
    assert_eq!(h.controller.flash_mode().unwrap().await, Ok(FlashMode::Torch));
    h.controller.set_flash_mode("AUTO").unwrap().await.unwrap();
    assert_eq!(h.controller.flash_mode().unwrap().await, Ok(FlashMode::Auto));

    assert!(matches!(
        h.controller.set_flash_mode("strobe"),
        Err(SessionError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_flip_rebinds_to_front_camera() {
    let h = running(SyntheticSettings::default(), SessionConfiguration::default());
    assert_eq!(h.controller.current_device_id().as_deref(), Some("synthetic-rear"));

    h.controller.flip_camera().unwrap().await.unwrap();
    assert_eq!(h.controller.current_device_id().as_deref(), Some("synthetic-front"));
    assert_eq!(h.sink.count(is_started), 2);
    assert_eq!(h.probe.binds(), 2);

    // Front camera has no flash unit
    let modes = h.controller.supported_flash_modes().unwrap().await.unwrap();
    assert_eq!(modes, vec![FlashMode::Off]);
    assert!(h.controller.set_flash_mode("on").unwrap().await.is_err());
}

#[tokio::test]
async fn test_switch_to_unknown_device_keeps_configuration() {
    let h = running(SyntheticSettings::default(), SessionConfiguration::default());
    let before = h.controller.session_config().unwrap();

    let result = h.controller.switch_to_device("no-such-camera").unwrap().await;
    assert!(matches!(result, Err(SessionError::Hardware(_))));
    assert_eq!(h.controller.session_config().unwrap(), before);
    assert_eq!(h.sink.count(|e| matches!(e, Event::StartError(_))), 1);
    assert!(h.controller.is_running());

    h.controller.switch_to_device("synthetic-front").unwrap().await.unwrap();
    let config = h.controller.session_config().unwrap();
    assert_eq!(config.device_id.as_deref(), Some("synthetic-front"));

    let devices = h.controller.devices().unwrap().await.unwrap();
    assert_eq!(devices.len(), 2);
}

#[tokio::test]
async fn test_failed_flip_restores_previous_camera() {
    let h = running(failing_binds(&[2]), SessionConfiguration::default());
    let before = h.controller.session_config().unwrap();

    let result = h.controller.flip_camera().unwrap().await;
    assert!(matches!(result, Err(SessionError::Hardware(_))));
    assert_eq!(h.sink.count(|e| matches!(e, Event::StartError(_))), 1);

    assert_eq!(h.controller.state(), SessionState::Running);
    assert!(h.controller.is_running());
    assert_eq!(h.controller.current_device_id().as_deref(), Some("synthetic-rear"));
    assert_eq!(h.controller.session_config().unwrap(), before);
    assert_eq!(before.position, CameraPosition::Rear);
    assert!(h.probe.is_bound());
    assert_eq!(h.probe.binds(), 2);

    h.controller.flip_camera().unwrap().await.unwrap();
    assert_eq!(h.controller.current_device_id().as_deref(), Some("synthetic-front"));
    assert_eq!(h.controller.session_config().unwrap().position, CameraPosition::Front);
}

#[tokio::test]
async fn test_failed_aspect_ratio_rebind_keeps_configuration() {
    let h = running(failing_binds(&[2]), SessionConfiguration::default());
    let before = h.controller.session_config().unwrap();

    let result = h.controller.set_aspect_ratio(Some("16:9"), None, None).unwrap().await;
    assert!(matches!(result, Err(SessionError::Hardware(_))));
    assert_eq!(h.controller.session_config().unwrap(), before);
    assert!(h.controller.is_running());
    assert_eq!(h.controller.current_device_id().as_deref(), Some("synthetic-rear"));
    assert!(h.probe.is_bound());
}

#[tokio::test]
async fn test_failed_restore_stops_session() {
    let h = running(failing_binds(&[2, 3]), SessionConfiguration::default());

    let result = h.controller.flip_camera().unwrap().await;
    assert!(matches!(result, Err(SessionError::Hardware(_))));
    h.sink.wait_for(|events| events.iter().any(is_stopped));

    assert_eq!(h.controller.state(), SessionState::Stopped);
    assert!(!h.controller.is_running());
    assert!(h.controller.current_device_id().is_none());
    assert!(h.controller.session_config().is_none());
    assert!(!h.probe.is_bound());
    assert_eq!(h.controller.active_operations(), 0);

    h.start(SessionConfiguration::default());
    assert_eq!(h.controller.current_device_id().as_deref(), Some("synthetic-rear"));
}

#[tokio::test]
async fn test_aspect_ratio_change_recenters_and_restarts() {
    let h = running(SyntheticSettings::default(), SessionConfiguration::default());

    let bounds = h
        .controller
        .set_aspect_ratio(Some("4:3"), None, None)
        .unwrap()
        .await
        .unwrap()
        .expect("bounds");
    assert_eq!((bounds.x, bounds.y, bounds.width, bounds.height), (0, 240, 1080, 1440));

    let config = h.controller.session_config().unwrap();
    assert_eq!(config.aspect_ratio, Some(AspectRatio::FOUR_THREE));
    assert!(config.is_centered());
    assert_eq!(h.sink.count(is_started), 2);

    // Same ratio again does nothing
    assert_eq!(
        h.controller.set_aspect_ratio(Some("4:3"), None, None).unwrap().await,
        Ok(None)
    );
    assert_eq!(h.sink.count(is_started), 2);

    assert!(matches!(
        h.controller.set_aspect_ratio(Some("wide"), None, None),
        Err(SessionError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_grid_mode_forwarded_to_surface() {
    let h = running(SyntheticSettings::default(), SessionConfiguration::default());
    h.controller.set_grid_mode("3x3").unwrap().await.unwrap();
    assert_eq!(h.controller.session_config().unwrap().grid_mode.to_string(), "3x3");
    eventually(|| {
        h.surface
            .count(|e| matches!(e, SurfaceEvent::Grid(mode) if mode.divisions() == 3))
            == 1
    });
    assert!(matches!(h.controller.set_grid_mode("5x5"), Err(SessionError::InvalidArgument(_))));
}

#[test]
fn test_display_compensation_applied_to_started_bounds() {
    let settings = camera_session::Settings::from_toml_str(
        r#"
        [[display_compensation]]
        aspect_ratio = "4:3"
        shrink_px = 2
        "#,
    )
    .unwrap();
    let h = common::harness_with(SyntheticSettings::default(), settings);
    h.start(
        SessionConfiguration::builder()
            .aspect_ratio(AspectRatio::FOUR_THREE)
            .centered()
            .build(),
    );
    let Event::Started(bounds) = &h.sink.events()[0] else {
        panic!("expected started");
    };
    assert_eq!((bounds.width, bounds.height), (1078, 1438));
}

// ===== Recording =====

#[tokio::test]
async fn test_recording_round_trip() {
    let config = SessionConfiguration::builder().video_mode_enabled(true).build();
    let h = running(SyntheticSettings::default(), config);

    let path = h.controller.start_record_video().unwrap().await.unwrap();
    assert!(path.exists());
    assert!(h.controller.is_recording());
    assert!(matches!(h.controller.start_record_video(), Err(SessionError::Busy(_))));
    assert!(matches!(h.controller.flip_camera(), Err(SessionError::Busy(_))));

    let (tx, rx) = std::sync::mpsc::channel();
    h.controller.stop_record_video(move |result| {
        let _ = tx.send(result);
    });
    let result = rx.recv_timeout(common::WAIT).unwrap();
    assert_eq!(result, Ok(format!("file://{}", path.display())));
    assert!(!h.controller.is_recording());

    let (tx, rx) = std::sync::mpsc::channel();
    h.controller.stop_record_video(move |result| {
        let _ = tx.send(result);
    });
    assert_eq!(
        rx.recv_timeout(common::WAIT).unwrap(),
        Err("No video recording in progress".to_string())
    );
}

#[test]
fn test_recording_needs_video_mode() {
    let h = running(SyntheticSettings::default(), SessionConfiguration::default());
    assert!(matches!(
        h.controller.start_record_video(),
        Err(SessionError::NotReady(_))
    ));
    assert!(!h.controller.is_recording());
}

#[tokio::test]
async fn test_teardown_stops_active_recording() {
    let config = SessionConfiguration::builder().video_mode_enabled(true).build();
    let h = running(SyntheticSettings::default(), config);
    h.controller.start_record_video().unwrap().await.unwrap();
    h.stop_and_wait();
    assert!(!h.controller.is_recording());
    assert!(!h.probe.is_bound());
}
