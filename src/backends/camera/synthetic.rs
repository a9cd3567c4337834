// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic camera backend
//!
//! Renders gradient test frames instead of talking to hardware. Used by the
//! CLI demo and by the test suite; timing and failure injection are
//! configurable through [`SyntheticSettings`].

use super::types::*;
use super::{FinalizeCallback, HardwareBackend, RecordingSession};
use crate::pipelines::photo::encoding;
use crate::pipelines::photo::metadata::{EXIF_DATE_FORMAT, tags, to_dms_string};
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const FOCUS_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Behaviour knobs for the synthetic camera
#[derive(Debug, Clone)]
pub struct SyntheticSettings {
    /// Sensor-native still size (before orientation)
    pub photo_size: (u32, u32),
    pub sample_size: (u32, u32),
    /// EXIF orientation reported with stills; also drives sample rotation
    pub orientation: u16,
    pub capture_delay: Duration,
    pub focus_duration: Duration,
    pub fail_bind: bool,
    /// 1-based bind attempts that fail, counted over the backend's lifetime
    pub fail_bind_attempts: Vec<u32>,
    pub fail_capture: bool,
    pub unbind_failure: Option<UnbindFailure>,
    pub has_flash: bool,
}

/// How [`SyntheticBackend::unbind`] misbehaves when asked to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnbindFailure {
    Error,
    Panic,
}

impl Default for SyntheticSettings {
    fn default() -> Self {
        Self {
            photo_size: (640, 480),
            sample_size: (320, 240),
            orientation: 1,
            capture_delay: Duration::ZERO,
            focus_duration: Duration::from_millis(20),
            fail_bind: false,
            fail_bind_attempts: Vec::new(),
            fail_capture: false,
            unbind_failure: None,
            has_flash: true,
        }
    }
}

/// Counters shared with tests to observe what the backend was asked to do
#[derive(Debug, Clone, Default)]
pub struct SyntheticProbe {
    inner: Arc<ProbeCounters>,
}

#[derive(Debug, Default)]
struct ProbeCounters {
    binds: AtomicU32,
    unbinds: AtomicU32,
    photos: AtomicU32,
    samples: AtomicU32,
    focus_completed: AtomicU32,
    focus_cancelled: AtomicU32,
    bound: AtomicBool,
}

impl SyntheticProbe {
    pub fn binds(&self) -> u32 {
        self.inner.binds.load(Ordering::SeqCst)
    }

    pub fn unbinds(&self) -> u32 {
        self.inner.unbinds.load(Ordering::SeqCst)
    }

    pub fn photos(&self) -> u32 {
        self.inner.photos.load(Ordering::SeqCst)
    }

    pub fn samples(&self) -> u32 {
        self.inner.samples.load(Ordering::SeqCst)
    }

    pub fn focus_completed(&self) -> u32 {
        self.inner.focus_completed.load(Ordering::SeqCst)
    }

    pub fn focus_cancelled(&self) -> u32 {
        self.inner.focus_cancelled.load(Ordering::SeqCst)
    }

    /// Whether the camera is currently held
    pub fn is_bound(&self) -> bool {
        self.inner.bound.load(Ordering::SeqCst)
    }
}

/// Gradient-rendering camera
pub struct SyntheticBackend {
    settings: SyntheticSettings,
    devices: Vec<CameraDevice>,
    bound: Option<BindInfo>,
    bind_attempts: u32,
    zoom: ZoomFactors,
    exposure: ExposureState,
    exposure_locked: bool,
    flash: FlashMode,
    torch: bool,
    recording: Option<Arc<AtomicBool>>,
    probe: SyntheticProbe,
}

impl SyntheticBackend {
    pub fn new(settings: SyntheticSettings) -> Self {
        let devices = vec![
            CameraDevice {
                id: "synthetic-rear".to_string(),
                name: "Synthetic Rear Camera".to_string(),
                position: CameraPosition::Rear,
                has_flash: settings.has_flash,
                lenses: vec![LensInfo::default()],
            },
            CameraDevice {
                id: "synthetic-front".to_string(),
                name: "Synthetic Front Camera".to_string(),
                position: CameraPosition::Front,
                has_flash: false,
                lenses: vec![LensInfo::default()],
            },
        ];

        Self {
            settings,
            devices,
            bound: None,
            bind_attempts: 0,
            zoom: ZoomFactors::FALLBACK,
            exposure: ExposureState {
                min_index: -4,
                max_index: 4,
                step: 0.5,
                index: 0,
            },
            exposure_locked: false,
            flash: FlashMode::Off,
            torch: false,
            recording: None,
            probe: SyntheticProbe::default(),
        }
    }

    /// Handle for observing backend activity from another thread
    pub fn probe(&self) -> SyntheticProbe {
        self.probe.clone()
    }

    fn bound_device(&self) -> BackendResult<&CameraDevice> {
        let info = self.bound.as_ref().ok_or(BackendError::NotBound)?;
        self.devices
            .iter()
            .find(|d| d.id == info.device_id)
            .ok_or_else(|| BackendError::DeviceNotFound(info.device_id.clone()))
    }

    fn render(&self, width: u32, height: u32, seed: u32) -> BackendResult<Vec<u8>> {
        let shade = (seed * 37 % 256) as u8;
        let frame = RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                shade,
            ])
        });
        encoding::encode_jpeg(&frame, 90)
            .map_err(|e| BackendError::CaptureFailed(e.to_string()))
    }

    fn simulate_latency(&self) {
        if !self.settings.capture_delay.is_zero() {
            std::thread::sleep(self.settings.capture_delay);
        }
    }
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new(SyntheticSettings::default())
    }
}

impl HardwareBackend for SyntheticBackend {
    fn devices(&self) -> Vec<CameraDevice> {
        self.devices.clone()
    }

    fn bind(&mut self, request: &BindRequest) -> BackendResult<BindInfo> {
        self.bind_attempts += 1;
        if self.settings.fail_bind || self.settings.fail_bind_attempts.contains(&self.bind_attempts) {
            return Err(BackendError::BindFailed(format!(
                "synthetic bind failure on attempt {}",
                self.bind_attempts
            )));
        }

        let device = match &request.device_id {
            Some(id) => self
                .devices
                .iter()
                .find(|d| &d.id == id)
                .ok_or_else(|| BackendError::DeviceNotFound(id.clone()))?,
            None => self
                .devices
                .iter()
                .find(|d| d.position == request.position)
                .ok_or_else(|| BackendError::DeviceNotFound(request.position.to_string()))?,
        };

        let (mut width, mut height) = self.settings.photo_size;
        if let Some((rw, rh)) = request.aspect_ratio.filter(|(w, h)| *w > 0 && *h > 0) {
            // Keep the long edge, derive the short one from the requested ratio
            let long = width.max(height);
            let short = (long as u64 * rw.min(rh) as u64 / rw.max(rh) as u64) as u32;
            (width, height) = if width >= height { (long, short.max(1)) } else { (short.max(1), long) };
        }

        let info = BindInfo {
            device_id: device.id.clone(),
            position: device.position,
            capture_width: width,
            capture_height: height,
        };

        info!(device = %info.device_id, width, height, "Synthetic camera bound");
        self.bound = Some(info.clone());
        self.zoom.current = 1.0;
        self.probe.inner.binds.fetch_add(1, Ordering::SeqCst);
        self.probe.inner.bound.store(true, Ordering::SeqCst);
        Ok(info)
    }

    fn unbind(&mut self) -> BackendResult<()> {
        match self.settings.unbind_failure {
            Some(UnbindFailure::Error) => {
                return Err(BackendError::Other("synthetic unbind failure".into()));
            }
            Some(UnbindFailure::Panic) => panic!("synthetic unbind panic"),
            None => {}
        }
        if self.bound.take().is_some() {
            debug!("Synthetic camera unbound");
            self.probe.inner.unbinds.fetch_add(1, Ordering::SeqCst);
        }
        self.torch = false;
        self.probe.inner.bound.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    fn capture_photo(&mut self, request: &CaptureRequest) -> BackendResult<RawCapture> {
        let device = self.bound_device()?.clone();
        self.simulate_latency();
        if self.settings.fail_capture {
            return Err(BackendError::CaptureFailed("synthetic capture failure".into()));
        }

        let info = self.bound.as_ref().ok_or(BackendError::NotBound)?;
        let (width, height) = (info.capture_width, info.capture_height);
        let count = self.probe.inner.photos.fetch_add(1, Ordering::SeqCst) + 1;
        let data = self.render(width, height, count)?;

        let now = chrono::Local::now().format(EXIF_DATE_FORMAT).to_string();
        let mut metadata = MetadataMap::new();
        metadata.insert(tags::MAKE.into(), "Synthetic".into());
        metadata.insert(tags::MODEL.into(), device.name.clone());
        metadata.insert(tags::ORIENTATION.into(), self.settings.orientation.to_string());
        metadata.insert(tags::IMAGE_WIDTH.into(), width.to_string());
        metadata.insert(tags::IMAGE_LENGTH.into(), height.to_string());
        metadata.insert(tags::DATE_TIME.into(), now.clone());
        metadata.insert(tags::DATE_TIME_ORIGINAL.into(), now);
        metadata.insert("Flash".into(), self.flash.to_string());
        let exposure = if self.exposure_locked { "locked" } else { "auto" };
        metadata.insert("ExposureMode".into(), exposure.into());

        if let Some(location) = request.location {
            let lat_ref = if location.latitude < 0.0 { "S" } else { "N" };
            let lon_ref = if location.longitude < 0.0 { "W" } else { "E" };
            metadata.insert(tags::GPS_LATITUDE.into(), to_dms_string(location.latitude));
            metadata.insert(tags::GPS_LATITUDE_REF.into(), lat_ref.into());
            metadata.insert(tags::GPS_LONGITUDE.into(), to_dms_string(location.longitude));
            metadata.insert(tags::GPS_LONGITUDE_REF.into(), lon_ref.into());
            if let Some(altitude) = location.altitude {
                metadata.insert(tags::GPS_ALTITUDE.into(), format!("{:.1}", altitude));
            }
        }

        debug!(width, height, bytes = data.len(), "Synthetic still captured");
        Ok(RawCapture {
            data: Arc::from(data),
            width,
            height,
            rotation: SensorRotation::from_exif_orientation(self.settings.orientation),
            metadata,
        })
    }

    fn capture_sample(&mut self) -> BackendResult<RawCapture> {
        self.bound_device()?;
        if self.settings.fail_capture {
            return Err(BackendError::CaptureFailed("synthetic sample failure".into()));
        }

        let (width, height) = self.settings.sample_size;
        let count = self.probe.inner.samples.fetch_add(1, Ordering::SeqCst) + 1;
        let data = self.render(width, height, count)?;
        Ok(RawCapture {
            data: Arc::from(data),
            width,
            height,
            rotation: SensorRotation::from_exif_orientation(self.settings.orientation),
            metadata: MetadataMap::new(),
        })
    }

    fn focus(&mut self, point: FocusPoint, cancel: &CancellationToken) -> BackendResult<()> {
        self.bound_device()?;
        debug!(x = point.x, y = point.y, "Synthetic focus started");

        let mut waited = Duration::ZERO;
        while waited < self.settings.focus_duration {
            if cancel.is_cancelled() {
                self.probe.inner.focus_cancelled.fetch_add(1, Ordering::SeqCst);
                return Err(BackendError::Cancelled);
            }
            std::thread::sleep(FOCUS_POLL_INTERVAL);
            waited += FOCUS_POLL_INTERVAL;
        }

        if cancel.is_cancelled() {
            self.probe.inner.focus_cancelled.fetch_add(1, Ordering::SeqCst);
            return Err(BackendError::Cancelled);
        }
        self.probe.inner.focus_completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn zoom_factors(&self) -> BackendResult<ZoomFactors> {
        self.bound_device()?;
        Ok(self.zoom)
    }

    fn set_zoom(&mut self, ratio: f32) -> BackendResult<()> {
        self.bound_device()?;
        self.zoom.current = self.zoom.clamp(ratio);
        Ok(())
    }

    fn exposure_state(&self) -> BackendResult<ExposureState> {
        self.bound_device()?;
        Ok(self.exposure)
    }

    fn set_exposure_index(&mut self, index: i32) -> BackendResult<()> {
        self.bound_device()?;
        self.exposure.index = index.clamp(self.exposure.min_index, self.exposure.max_index);
        Ok(())
    }

    fn set_exposure_locked(&mut self, locked: bool) -> BackendResult<()> {
        self.bound_device()?;
        self.exposure_locked = locked;
        Ok(())
    }

    fn has_flash_unit(&self) -> bool {
        self.bound_device().map(|d| d.has_flash).unwrap_or(false)
    }

    fn set_flash_mode(&mut self, mode: FlashMode) -> BackendResult<()> {
        if mode == FlashMode::Torch {
            return Err(BackendError::Unsupported("torch is not a capture flash mode".into()));
        }
        if mode != FlashMode::Off && !self.has_flash_unit() {
            return Err(BackendError::Unsupported("camera has no flash unit".into()));
        }
        self.flash = mode;
        Ok(())
    }

    fn set_torch(&mut self, enabled: bool) -> BackendResult<()> {
        if enabled && !self.has_flash_unit() {
            return Err(BackendError::Unsupported("camera has no flash unit".into()));
        }
        self.torch = enabled;
        Ok(())
    }

    fn start_recording(
        &mut self,
        output: PathBuf,
        with_audio: bool,
    ) -> BackendResult<Box<dyn RecordingSession>> {
        self.bound_device()?;
        if self.recording.as_ref().is_some_and(|active| active.load(Ordering::SeqCst)) {
            return Err(BackendError::RecordingInProgress);
        }

        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::File::create(&output)?;

        let active = Arc::new(AtomicBool::new(true));
        self.recording = Some(Arc::clone(&active));
        info!(path = %output.display(), with_audio, "Synthetic recording started");
        Ok(Box::new(SyntheticRecording { output, active }))
    }
}

struct SyntheticRecording {
    output: PathBuf,
    active: Arc<AtomicBool>,
}

impl RecordingSession for SyntheticRecording {
    fn output_path(&self) -> &Path {
        &self.output
    }

    fn stop(self: Box<Self>, on_finalize: FinalizeCallback) {
        self.active.store(false, Ordering::SeqCst);
        let output = self.output.clone();
        let spawned = std::thread::Builder::new()
            .name("synthetic-recorder".into())
            .spawn(move || {
                if output.exists() {
                    on_finalize(Ok(output))
                } else {
                    on_finalize(Err(format!("recording output {} vanished", output.display())))
                }
            });
        if let Err(e) = spawned {
            warn!(error = %e, "Failed to spawn recorder finalizer thread");
        }
    }
}
