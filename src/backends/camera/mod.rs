// SPDX-License-Identifier: MPL-2.0

//! Camera hardware abstraction
//!
//! ```text
//! ┌─────────────────────┐
//! │  SessionController  │  ← lifecycle, gate, callbacks
//! └──────────┬──────────┘
//!            │ jobs on the hardware executor
//!            ▼
//! ┌─────────────────────┐
//! │ HardwareBackend     │  ← common interface
//! └──────────┬──────────┘
//!            │
//!            ▼
//!     ┌────────────┐
//!     │ Synthetic  │  ← test/demo implementation
//!     └────────────┘
//! ```
//!
//! A backend is owned by exactly one hardware executor thread, so every
//! method takes `&mut self` and nothing here needs interior locking.

pub mod synthetic;
pub mod types;

pub use synthetic::{SyntheticBackend, SyntheticProbe, SyntheticSettings, UnbindFailure};
pub use types::*;

use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Called once a recording has been finalized, with the output file or an error message
pub type FinalizeCallback = Box<dyn FnOnce(Result<PathBuf, String>) + Send>;

/// Camera hardware interface
///
/// Implementations bind a camera to the session, take stills and low-latency
/// samples, drive focus/zoom/exposure/flash and produce recordings.
pub trait HardwareBackend: Send {
    // ===== Enumeration =====

    /// Cameras this backend can bind to
    fn devices(&self) -> Vec<CameraDevice>;

    // ===== Lifecycle =====

    /// Bind a camera to the session, replacing any previous binding
    fn bind(&mut self, request: &BindRequest) -> BackendResult<BindInfo>;

    /// Release the camera. Must be safe to call when nothing is bound.
    fn unbind(&mut self) -> BackendResult<()>;

    fn is_bound(&self) -> bool;

    // ===== Capture =====

    /// Full quality still capture
    fn capture_photo(&mut self, request: &CaptureRequest) -> BackendResult<RawCapture>;

    /// Low latency frame from the sample stream
    fn capture_sample(&mut self) -> BackendResult<RawCapture>;

    // ===== Controls =====

    /// Run a focus/metering action on `point`
    ///
    /// Implementations should poll `cancel` and return
    /// `BackendError::Cancelled` once it fires.
    fn focus(&mut self, point: FocusPoint, cancel: &CancellationToken) -> BackendResult<()>;

    fn zoom_factors(&self) -> BackendResult<ZoomFactors>;

    /// Set the zoom ratio; callers clamp into `zoom_factors()` first
    fn set_zoom(&mut self, ratio: f32) -> BackendResult<()>;

    fn exposure_state(&self) -> BackendResult<ExposureState>;

    fn set_exposure_index(&mut self, index: i32) -> BackendResult<()>;

    fn set_exposure_locked(&mut self, locked: bool) -> BackendResult<()>;

    fn has_flash_unit(&self) -> bool;

    /// Flash behaviour for subsequent stills (never `Torch`)
    fn set_flash_mode(&mut self, mode: FlashMode) -> BackendResult<()>;

    fn set_torch(&mut self, enabled: bool) -> BackendResult<()>;

    // ===== Recording =====

    /// Start recording into `output`
    fn start_recording(
        &mut self,
        output: PathBuf,
        with_audio: bool,
    ) -> BackendResult<Box<dyn RecordingSession>>;
}

/// An in-flight recording
pub trait RecordingSession: Send {
    fn output_path(&self) -> &Path;

    /// Stop recording; `on_finalize` fires once the container is finalized,
    /// possibly on another thread
    fn stop(self: Box<Self>, on_finalize: FinalizeCallback);
}
