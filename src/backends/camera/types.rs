// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera hardware abstraction

//! Shared types for camera hardware backends

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Key/value camera metadata as reported by the hardware (EXIF-style tag names)
pub type MetadataMap = BTreeMap<String, String>;

/// Which way a camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CameraPosition {
    Front,
    #[default]
    Rear,
}

impl CameraPosition {
    /// The opposite facing, used by flip
    pub fn flipped(self) -> Self {
        match self {
            CameraPosition::Front => CameraPosition::Rear,
            CameraPosition::Rear => CameraPosition::Front,
        }
    }
}

impl std::fmt::Display for CameraPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraPosition::Front => write!(f, "front"),
            CameraPosition::Rear => write!(f, "rear"),
        }
    }
}

impl std::str::FromStr for CameraPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "front" => Ok(CameraPosition::Front),
            "rear" | "back" => Ok(CameraPosition::Rear),
            other => Err(format!("unknown camera position '{}'", other)),
        }
    }
}

/// Sensor rotation relative to the natural orientation of the display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SensorRotation {
    #[default]
    None,
    /// 90 degrees clockwise
    Rotate90,
    Rotate180,
    /// 270 degrees clockwise
    Rotate270,
}

impl SensorRotation {
    /// Create rotation from an integer degree value (normalised to 0-360).
    pub fn from_degrees_int(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => SensorRotation::Rotate90,
            180 => SensorRotation::Rotate180,
            270 => SensorRotation::Rotate270,
            _ => SensorRotation::None,
        }
    }

    /// Rotation implied by an EXIF orientation tag value
    ///
    /// Mirrored variants map onto the rotation they include (5 and 6 to 90,
    /// 7 and 8 to 270), matching how sample frames report rotation.
    pub fn from_exif_orientation(orientation: u16) -> Self {
        match orientation {
            3 | 4 => SensorRotation::Rotate180,
            5 | 6 => SensorRotation::Rotate90,
            7 | 8 => SensorRotation::Rotate270,
            _ => SensorRotation::None,
        }
    }

    pub fn degrees(&self) -> u32 {
        match self {
            SensorRotation::None => 0,
            SensorRotation::Rotate90 => 90,
            SensorRotation::Rotate180 => 180,
            SensorRotation::Rotate270 => 270,
        }
    }

    /// True when applying this rotation swaps width and height
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, SensorRotation::Rotate90 | SensorRotation::Rotate270)
    }
}

impl std::fmt::Display for SensorRotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// A camera the backend can bind to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraDevice {
    /// Stable identifier used by `switch_to_device`
    pub id: String,
    pub name: String,
    pub position: CameraPosition,
    pub has_flash: bool,
    pub lenses: Vec<LensInfo>,
}

/// Physical lens description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LensInfo {
    pub focal_length: f32,
    /// "wideAngle", "ultraWide", "telephoto"
    pub device_type: String,
    pub base_zoom_ratio: f32,
    pub digital_zoom: f32,
}

impl Default for LensInfo {
    fn default() -> Self {
        Self {
            focal_length: 4.25,
            device_type: "wideAngle".to_string(),
            base_zoom_ratio: 1.0,
            digital_zoom: 1.0,
        }
    }
}

/// Zoom range and current ratio of the bound camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomFactors {
    pub min: f32,
    pub max: f32,
    pub current: f32,
}

impl ZoomFactors {
    /// Range reported when the camera cannot be queried
    pub const FALLBACK: ZoomFactors = ZoomFactors {
        min: 1.0,
        max: 10.0,
        current: 1.0,
    };

    /// Clamp a requested ratio into the supported range
    pub fn clamp(&self, ratio: f32) -> f32 {
        if ratio.is_nan() {
            return self.current;
        }
        ratio.clamp(self.min, self.max)
    }
}

/// Exposure compensation capabilities and current index
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExposureState {
    pub min_index: i32,
    pub max_index: i32,
    /// EV per index step
    pub step: f32,
    pub index: i32,
}

impl ExposureState {
    /// Step used for EV conversions; non-positive steps are treated as 1
    pub fn effective_step(&self) -> f32 {
        if self.step > 0.0 { self.step } else { 1.0 }
    }

    /// EV range as (min, max)
    pub fn ev_range(&self) -> (f32, f32) {
        let step = self.effective_step();
        (self.min_index as f32 * step, self.max_index as f32 * step)
    }

    pub fn current_ev(&self) -> f32 {
        self.index as f32 * self.effective_step()
    }

    /// Index for an EV value, rounded and clamped into range
    pub fn index_for_ev(&self, ev: f32) -> i32 {
        let index = (ev / self.effective_step()).round() as i32;
        index.clamp(self.min_index, self.max_index)
    }

    /// Index closest to 0 EV inside the supported range
    pub fn neutral_index(&self) -> i32 {
        0i32.clamp(self.min_index, self.max_index)
    }
}

/// Exposure behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExposureMode {
    Lock,
    #[default]
    Continuous,
}

impl std::fmt::Display for ExposureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExposureMode::Lock => write!(f, "LOCK"),
            ExposureMode::Continuous => write!(f, "CONTINUOUS"),
        }
    }
}

impl std::str::FromStr for ExposureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOCK" => Ok(ExposureMode::Lock),
            "CONTINUOUS" => Ok(ExposureMode::Continuous),
            other => Err(format!("unknown exposure mode '{}'", other)),
        }
    }
}

/// Flash behaviour for still capture, plus torch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FlashMode {
    #[default]
    Off,
    On,
    Auto,
    /// Continuous light, independent of capture
    Torch,
}

impl FlashMode {
    pub const ALL: [FlashMode; 4] = [
        FlashMode::Off,
        FlashMode::On,
        FlashMode::Auto,
        FlashMode::Torch,
    ];
}

impl std::fmt::Display for FlashMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlashMode::Off => write!(f, "off"),
            FlashMode::On => write!(f, "on"),
            FlashMode::Auto => write!(f, "auto"),
            FlashMode::Torch => write!(f, "torch"),
        }
    }
}

impl std::str::FromStr for FlashMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(FlashMode::Off),
            "on" => Ok(FlashMode::On),
            "auto" => Ok(FlashMode::Auto),
            "torch" => Ok(FlashMode::Torch),
            other => Err(format!("unknown flash mode '{}'", other)),
        }
    }
}

/// Geographic position to stamp into a capture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
}

/// Normalised focus point, both axes in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocusPoint {
    pub x: f32,
    pub y: f32,
}

impl FocusPoint {
    /// Returns `None` when either coordinate falls outside [0, 1]
    pub fn new(x: f32, y: f32) -> Option<Self> {
        let in_range = |v: f32| (0.0..=1.0).contains(&v);
        (in_range(x) && in_range(y)).then_some(Self { x, y })
    }
}

/// What the backend needs to know to bind a camera
#[derive(Debug, Clone, PartialEq)]
pub struct BindRequest {
    /// Explicit device; takes precedence over `position`
    pub device_id: Option<String>,
    pub position: CameraPosition,
    /// Requested width:height, if any
    pub aspect_ratio: Option<(u32, u32)>,
    pub video_enabled: bool,
    pub audio_enabled: bool,
}

/// Result of a successful bind
#[derive(Debug, Clone, PartialEq)]
pub struct BindInfo {
    pub device_id: String,
    pub position: CameraPosition,
    /// Resolution of the still capture stream
    pub capture_width: u32,
    pub capture_height: u32,
}

/// Parameters for a single still capture
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureRequest {
    pub location: Option<GeoLocation>,
}

/// Encoded frame straight from the hardware
#[derive(Debug, Clone)]
pub struct RawCapture {
    /// Encoded image bytes (JPEG for stills and samples)
    pub data: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
    /// Rotation the consumer must apply to display the frame upright
    pub rotation: SensorRotation,
    pub metadata: MetadataMap,
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// Hardware or driver is not available
    NotAvailable(String),
    /// Binding the camera to the session failed
    BindFailed(String),
    /// Requested device does not exist
    DeviceNotFound(String),
    /// An operation needs a bound camera
    NotBound,
    /// Still or sample capture failed
    CaptureFailed(String),
    /// Focus/metering action failed
    FocusFailed(String),
    /// Superseded by a newer request
    Cancelled,
    /// Feature not supported by the bound camera
    Unsupported(String),
    /// Recording already in progress
    RecordingInProgress,
    /// No active recording to stop
    NoRecordingInProgress,
    /// I/O error
    IoError(String),
    /// Other error
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Camera not available: {}", msg),
            BackendError::BindFailed(msg) => write!(f, "Bind failed: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::NotBound => write!(f, "Camera is not bound"),
            BackendError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
            BackendError::FocusFailed(msg) => write!(f, "Focus failed: {}", msg),
            BackendError::Cancelled => write!(f, "Cancelled"),
            BackendError::Unsupported(msg) => write!(f, "Not supported: {}", msg),
            BackendError::RecordingInProgress => write!(f, "Recording already in progress"),
            BackendError::NoRecordingInProgress => write!(f, "No video recording in progress"),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::IoError(err.to_string())
    }
}
