// SPDX-License-Identifier: GPL-3.0-only

//! Session lifecycle and operation admission
//!
//! ```text
//!  Idle ──start──▶ Starting ──bind ok──▶ Running ──stop, ops active──▶ StopPending
//!    ▲                │                     │                              │
//!    │           bind failed          stop, idle                    last release
//!    │                ▼                     ▼                              ▼
//!    └──────────── Stopped ◀──────────── teardown ◀────────────────────────┘
//! ```
//!
//! Every hardware command runs on the hardware executor. Operations that
//! touch hardware (captures, focus, rebinds, controls) hold an
//! [`AdmittedOperation`] for their whole lifetime; dropping the last one
//! after a stop request queues the teardown.
//!
//! The operation handlers live next to this file, split by concern:
//! `capture.rs`, `controls.rs` and `recording.rs`.

use super::configuration::SessionConfiguration;
use super::executor::Executor;
use super::focus::FocusCoordinator;
use super::gate::{OperationGate, OperationToken, ReleaseOutcome, StopDisposition};
use super::state::{CaptureLock, SessionState};
use super::command::CommandHandle;
use crate::backends::camera::types::{BindInfo, FlashMode};
use crate::backends::camera::{HardwareBackend, RecordingSession};
use crate::backends::presentation::{PresentationSurface, PreviewBounds};
use crate::config::Settings;
use crate::constants::threads;
use crate::errors::{SessionError, SessionResult};
use crate::events::EventSink;
use crate::pipelines::photo::CapturePipeline;
use crate::storage::PersistenceSink;
use parking_lot::{Mutex, RwLock};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, error, info, warn};

/// State owned by the hardware executor
pub(super) struct HardwareSlot {
    pub backend: Box<dyn HardwareBackend>,
    pub recording: Option<Box<dyn RecordingSession>>,
}

/// Collaborators a session is assembled from
pub struct SessionParts {
    pub backend: Box<dyn HardwareBackend>,
    pub surface: Box<dyn PresentationSurface>,
    pub events: Arc<dyn EventSink>,
    pub storage: Arc<dyn PersistenceSink>,
    pub settings: Settings,
}

pub(super) struct SessionInner {
    pub hardware: Executor<HardwareSlot>,
    pub presentation: Executor<Box<dyn PresentationSurface>>,
    pub gate: OperationGate,
    pub capture_lock: CaptureLock,
    pub focus: FocusCoordinator,
    pub state: Mutex<SessionState>,
    /// Current snapshot; swapped whole, never edited
    pub config: RwLock<Option<Arc<SessionConfiguration>>>,
    pub current_device: Mutex<Option<String>>,
    pub flash_mode: Mutex<FlashMode>,
    pub recording_active: AtomicBool,
    /// Bumped on every start so a late teardown cannot stop a newer session
    pub generation: AtomicU64,
    pub events: Arc<dyn EventSink>,
    pub storage: Arc<dyn PersistenceSink>,
    pub pipeline: CapturePipeline,
    pub settings: Settings,
}

/// An operation holding a gate token
///
/// Dropping it releases the token (and the capture lock, for photo
/// captures). The release that drains a stopping gate queues the teardown.
pub(super) struct AdmittedOperation {
    inner: Arc<SessionInner>,
    token: Option<OperationToken>,
    photo_capture: bool,
    generation: u64,
}

impl AdmittedOperation {
    pub fn new(inner: &Arc<SessionInner>, token: OperationToken) -> Self {
        Self {
            inner: Arc::clone(inner),
            token: Some(token),
            photo_capture: false,
            generation: inner.generation.load(Ordering::SeqCst),
        }
    }

    /// Mark this operation as a still capture for the capture lock
    pub fn hold_capture_lock(&mut self) {
        if !self.photo_capture {
            self.inner.capture_lock.begin_capture();
            self.photo_capture = true;
        }
    }
}

impl Drop for AdmittedOperation {
    fn drop(&mut self) {
        if self.photo_capture {
            self.inner.capture_lock.end_capture();
        }
        let Some(token) = self.token.take() else {
            return;
        };
        if let ReleaseOutcome::Drained = self.inner.gate.release(token) {
            info!("Last operation finished; running deferred stop");
            self.inner.schedule_teardown(self.generation);
        }
    }
}

impl SessionInner {
    pub fn admit(self: &Arc<Self>, name: &'static str) -> SessionResult<AdmittedOperation> {
        let token = self.gate.admit(name)?;
        Ok(AdmittedOperation::new(self, token))
    }

    /// Queue `job` on the hardware executor; `op` is released after it runs
    pub fn dispatch<F>(self: &Arc<Self>, op: AdmittedOperation, job: F) -> SessionResult<()>
    where
        F: FnOnce(&Arc<SessionInner>, &mut HardwareSlot) + Send + 'static,
    {
        let inner = Arc::clone(self);
        let posted = self.hardware.post(move |slot| {
            job(&inner, slot);
            drop(op);
        });
        if posted {
            Ok(())
        } else {
            Err(executor_gone(self.hardware.name()))
        }
    }

    /// Admit `name`, run `job` on the hardware executor and report through a handle
    pub fn command<T, F>(self: &Arc<Self>, name: &'static str, job: F) -> SessionResult<CommandHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce(&Arc<SessionInner>, &mut HardwareSlot) -> SessionResult<T> + Send + 'static,
    {
        let op = self.admit(name)?;
        self.command_with(op, name, job)
    }

    /// Like [`command`](Self::command) for an operation admitted by the caller
    pub fn command_with<T, F>(
        self: &Arc<Self>,
        op: AdmittedOperation,
        name: &'static str,
        job: F,
    ) -> SessionResult<CommandHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce(&Arc<SessionInner>, &mut HardwareSlot) -> SessionResult<T> + Send + 'static,
    {
        let (handle, completer) = CommandHandle::channel();
        self.dispatch(op, move |inner, slot| {
            let result = job(inner, slot);
            if let Err(e) = &result {
                debug!(name, error = %e, "Command failed");
            }
            completer.complete(result);
        })?;
        Ok(handle)
    }

    /// Read-only hardware query; needs a running session but no admission
    pub fn query<T, F>(self: &Arc<Self>, job: F) -> SessionResult<CommandHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce(&mut HardwareSlot) -> SessionResult<T> + Send + 'static,
    {
        let state = *self.state.lock();
        if !matches!(state, SessionState::Running | SessionState::StopPending) {
            return Err(SessionError::NotReady(format!("session is {}", state)));
        }
        let (handle, completer) = CommandHandle::channel();
        if self.hardware.post(move |slot| completer.complete(job(slot))) {
            Ok(handle)
        } else {
            Err(executor_gone(self.hardware.name()))
        }
    }

    pub fn config_snapshot(&self) -> Option<Arc<SessionConfiguration>> {
        self.config.read().clone()
    }

    /// Swap in `update(current)`; returns the new snapshot
    pub fn replace_config(
        &self,
        update: impl FnOnce(&SessionConfiguration) -> SessionConfiguration,
    ) -> Option<Arc<SessionConfiguration>> {
        let mut guard = self.config.write();
        let next = Arc::new(update(guard.as_ref()?));
        *guard = Some(Arc::clone(&next));
        Some(next)
    }

    /// Bounds to report through `on_started`, with display compensation applied
    pub fn reported_bounds(&self, config: &SessionConfiguration) -> PreviewBounds {
        let bounds = self
            .presentation
            .call(|surface| surface.preview_bounds())
            .unwrap_or_default();
        self.settings.compensate(bounds, config.aspect_ratio)
    }

    /// Unbind then bind under `config`
    ///
    /// Only the bound device is updated; the caller decides what happens to
    /// the stored configuration.
    fn rebind(&self, slot: &mut HardwareSlot, config: &SessionConfiguration) -> SessionResult<BindInfo> {
        if let Err(e) = slot.backend.unbind() {
            warn!(error = %e, "Unbind before rebind failed");
        }
        let info = match slot.backend.bind(&config.bind_request()) {
            Ok(info) => info,
            Err(e) => {
                *self.current_device.lock() = None;
                return Err(e.into());
            }
        };
        self.apply_initial_zoom(slot, config);
        *self.current_device.lock() = Some(info.device_id.clone());
        debug!(
            device = %info.device_id,
            width = info.capture_width,
            height = info.capture_height,
            "Camera rebound"
        );
        Ok(info)
    }

    /// Rebind under `next` and store it as the session configuration
    ///
    /// `on_started` reports the new bounds. A failed bind leaves the stored
    /// configuration alone, reports `on_start_error` and binds `previous`
    /// again; if that fails too the session is stopped.
    pub fn switch_configuration(
        self: &Arc<Self>,
        slot: &mut HardwareSlot,
        previous: &Arc<SessionConfiguration>,
        next: Arc<SessionConfiguration>,
    ) -> SessionResult<PreviewBounds> {
        match self.rebind(slot, &next) {
            Ok(_) => {
                *self.config.write() = Some(Arc::clone(&next));
                let bounds = self.reported_bounds(&next);
                self.events.on_started(bounds);
                Ok(bounds)
            }
            Err(e) => {
                warn!(error = %e, "Rebind failed");
                self.events.on_start_error(&e.to_string());
                self.restore_binding(slot, previous);
                Err(e)
            }
        }
    }

    fn restore_binding(self: &Arc<Self>, slot: &mut HardwareSlot, previous: &Arc<SessionConfiguration>) {
        {
            let previous = Arc::clone(previous);
            self.presentation.post(move |surface| surface.update_layout(&previous));
        }
        match self.rebind(slot, previous) {
            Ok(info) => info!(device = %info.device_id, "Previous camera restored"),
            Err(e) => {
                error!(error = %e, "Previous camera could not be restored; stopping session");
                self.request_stop();
            }
        }
    }

    fn apply_initial_zoom(&self, slot: &mut HardwareSlot, config: &SessionConfiguration) {
        if (config.zoom_factor - 1.0).abs() <= f32::EPSILON {
            return;
        }
        let ratio = match slot.backend.zoom_factors() {
            Ok(factors) => factors.clamp(config.zoom_factor),
            Err(_) => config.zoom_factor,
        };
        if let Err(e) = slot.backend.set_zoom(ratio) {
            warn!(ratio, error = %e, "Failed to restore zoom");
        }
    }

    fn bind_on_start(self: &Arc<Self>, slot: &mut HardwareSlot, config: Arc<SessionConfiguration>) {
        let attached = {
            let config = Arc::clone(&config);
            self.presentation.call(move |surface| surface.attach(&config))
        };
        match attached {
            Some(Ok(())) => {}
            Some(Err(reason)) => return self.fail_start(slot, format!("Failed to attach preview: {}", reason)),
            None => return self.fail_start(slot, executor_gone(self.presentation.name()).to_string()),
        }

        let info = match slot.backend.bind(&config.bind_request()) {
            Ok(info) => info,
            Err(e) => return self.fail_start(slot, SessionError::from(e).to_string()),
        };
        self.apply_initial_zoom(slot, &config);
        *self.current_device.lock() = Some(info.device_id.clone());

        let running = {
            let mut state = self.state.lock();
            if *state == SessionState::Starting && self.gate.open() {
                *state = SessionState::Running;
                true
            } else {
                false
            }
        };

        if running {
            info!(
                device = %info.device_id,
                width = info.capture_width,
                height = info.capture_height,
                "Session running"
            );
            self.events.on_started(self.reported_bounds(&config));
        } else {
            debug!("Stop requested while binding; teardown follows");
        }
    }

    fn fail_start(&self, slot: &mut HardwareSlot, reason: String) {
        warn!(reason = %reason, "Session start failed");
        if let Err(e) = slot.backend.unbind() {
            warn!(error = %e, "Unbind after failed start also failed");
        }
        if self.presentation.call(|surface| surface.release()).is_none() {
            warn!("Preview could not be released after failed start");
        }
        *self.current_device.lock() = None;
        *self.config.write() = None;
        self.gate.reset();
        self.capture_lock.reset();
        *self.state.lock() = SessionState::Stopped;
        self.events.on_start_error(&reason);
    }

    /// Move towards `Stopped`; safe to call from either executor
    pub fn request_stop(self: &Arc<Self>) {
        let disposition = {
            let mut state = self.state.lock();
            if matches!(
                *state,
                SessionState::Idle | SessionState::Stopped | SessionState::StopPending
            ) {
                debug!(state = %*state, "Stop ignored");
                return;
            }
            self.capture_lock.mark_stop_requested();
            let disposition = self.gate.request_stop();
            if let StopDisposition::Deferred { .. } = disposition {
                *state = SessionState::StopPending;
            }
            disposition
        };

        match disposition {
            StopDisposition::Immediate => {
                info!("Stopping session");
                self.schedule_teardown(self.generation.load(Ordering::SeqCst));
            }
            StopDisposition::Deferred { active } => {
                info!(active, "Stop deferred until operations finish");
                self.presentation.post(|surface| surface.detach());
                self.focus.cancel_outstanding();
            }
            StopDisposition::AlreadyPending => debug!("Stop already pending"),
        }
    }

    pub fn schedule_teardown(self: &Arc<Self>, generation: u64) {
        let inner = Arc::clone(self);
        if !self.hardware.post(move |slot| inner.teardown(slot, generation)) {
            error!("Hardware executor gone; teardown could not be queued");
        }
    }

    /// Release everything; always ends in `Stopped` with `on_stopped`
    fn teardown(&self, slot: &mut HardwareSlot, generation: u64) {
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "Stale teardown skipped");
            return;
        }
        info!("Tearing down session");

        self.focus.cancel_outstanding();

        if let Some(recording) = slot.recording.take() {
            self.recording_active.store(false, Ordering::SeqCst);
            recording.stop(Box::new(|result| match result {
                Ok(path) => info!(path = %path.display(), "Recording finalized during teardown"),
                Err(e) => warn!(error = %e, "Recording finalize failed during teardown"),
            }));
        }

        match panic::catch_unwind(AssertUnwindSafe(|| slot.backend.unbind())) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let err = SessionError::Fatal(format!("unbind failed: {}", e));
                warn!(error = %err, "Teardown continues after error");
            }
            Err(_) => {
                let err = SessionError::Fatal("unbind panicked".into());
                warn!(error = %err, "Teardown continues after error");
            }
        }

        if self.presentation.call(|surface| surface.release()).is_none() {
            warn!("Preview could not be released during teardown");
        }

        self.gate.reset();
        self.capture_lock.reset();
        *self.config.write() = None;
        *self.current_device.lock() = None;
        *self.flash_mode.lock() = FlashMode::Off;
        *self.state.lock() = SessionState::Stopped;

        info!("Session stopped");
        self.events.on_stopped();
    }
}

fn executor_gone(name: &str) -> SessionError {
    SessionError::Fatal(format!("{} executor has shut down", name))
}

/// Camera session embedded in a host UI
///
/// All methods return immediately. Results arrive through the
/// [`EventSink`] or through the returned [`CommandHandle`]s.
pub struct SessionController {
    pub(super) inner: Arc<SessionInner>,
}

impl SessionController {
    /// Spawn the hardware and presentation executors
    pub fn new(parts: SessionParts) -> SessionResult<Self> {
        let hardware = Executor::spawn(
            threads::HARDWARE_EXECUTOR,
            HardwareSlot {
                backend: parts.backend,
                recording: None,
            },
        )?;
        let presentation = Executor::spawn(threads::PRESENTATION_EXECUTOR, parts.surface)?;

        let pipeline = CapturePipeline::new(parts.settings.overlay.clone());
        Ok(Self {
            inner: Arc::new(SessionInner {
                hardware,
                presentation,
                gate: OperationGate::new(),
                capture_lock: CaptureLock::new(),
                focus: FocusCoordinator::new(),
                state: Mutex::new(SessionState::Idle),
                config: RwLock::new(None),
                current_device: Mutex::new(None),
                flash_mode: Mutex::new(FlashMode::Off),
                recording_active: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                events: parts.events,
                storage: parts.storage,
                pipeline,
                settings: parts.settings,
            }),
        })
    }

    /// Bind the camera and show the preview
    ///
    /// Fails with `Busy` unless the session is idle or stopped. The outcome
    /// is reported through `on_started` or `on_start_error`.
    pub fn start_session(&self, config: SessionConfiguration) -> SessionResult<()> {
        let inner = &self.inner;
        let generation = {
            let mut state = inner.state.lock();
            if !state.can_start() {
                return Err(SessionError::Busy(format!("session is {}", *state)));
            }
            *state = SessionState::Starting;
            inner.generation.fetch_add(1, Ordering::SeqCst) + 1
        };

        inner.gate.reset();
        inner.capture_lock.reset();
        let config = Arc::new(config);
        *inner.config.write() = Some(Arc::clone(&config));

        info!(
            generation,
            position = %config.position,
            device = ?config.device_id,
            "Starting session"
        );

        let job_inner = Arc::clone(inner);
        if !inner.hardware.post(move |slot| job_inner.bind_on_start(slot, config)) {
            *inner.config.write() = None;
            *inner.state.lock() = SessionState::Stopped;
            return Err(executor_gone(inner.hardware.name()));
        }
        Ok(())
    }

    /// Stop the session, waiting for admitted operations to finish
    ///
    /// With nothing in flight the teardown is queued right away. Otherwise
    /// the preview is detached, new operations are refused and the last
    /// finishing operation runs the teardown. Idempotent.
    pub fn stop_session(&self) -> SessionResult<()> {
        self.inner.request_stop();
        Ok(())
    }

    // ===== Diagnostics =====

    /// Running and not stopping
    pub fn is_running(&self) -> bool {
        *self.inner.state.lock() == SessionState::Running && !self.inner.gate.is_stopping()
    }

    /// A still capture is between shutter and callback
    pub fn is_capturing(&self) -> bool {
        self.inner.capture_lock.is_capturing()
    }

    /// Capturing, or a stop has been requested
    pub fn is_busy(&self) -> bool {
        self.inner.capture_lock.is_busy()
    }

    pub fn is_stop_deferred(&self) -> bool {
        self.inner.gate.is_deferred()
    }

    pub fn is_stopping(&self) -> bool {
        self.inner.gate.is_stopping()
    }

    pub fn is_recording(&self) -> bool {
        self.inner.recording_active.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.lock()
    }

    pub fn session_config(&self) -> Option<Arc<SessionConfiguration>> {
        self.inner.config_snapshot()
    }

    pub fn current_device_id(&self) -> Option<String> {
        self.inner.current_device.lock().clone()
    }

    /// Number of operations currently holding a gate token
    pub fn active_operations(&self) -> u32 {
        self.inner.gate.active_count()
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Err(e) = self.stop_session() {
            warn!(error = %e, "Failed to stop session on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::SyntheticBackend;
    use crate::backends::presentation::HeadlessSurface;
    use crate::events::LoggingEventSink;
    use crate::storage::FileSystemStorage;
    use std::time::{Duration, Instant};

    fn controller(dir: &std::path::Path) -> SessionController {
        SessionController::new(SessionParts {
            backend: Box::new(SyntheticBackend::default()),
            surface: Box::new(HeadlessSurface::new(1080, 1920)),
            events: Arc::new(LoggingEventSink),
            storage: Arc::new(FileSystemStorage::rooted_at(dir)),
            settings: Settings::default(),
        })
        .unwrap()
    }

    fn wait_for_state(controller: &SessionController, state: SessionState) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while controller.state() != state {
            assert!(Instant::now() < deadline, "timed out waiting for {}", state);
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_operations_refused_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());
        let err = controller.set_focus(0.5, 0.5).unwrap_err();
        assert!(matches!(err, SessionError::NotReady(_)));
        assert!(controller.stop_session().is_ok());
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[test]
    fn test_start_twice_is_busy() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());
        controller.start_session(SessionConfiguration::default()).unwrap();
        let err = controller.start_session(SessionConfiguration::default()).unwrap_err();
        assert!(matches!(err, SessionError::Busy(_)));
        wait_for_state(&controller, SessionState::Running);
    }

    #[test]
    fn test_stop_then_restart() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());
        controller.start_session(SessionConfiguration::default()).unwrap();
        wait_for_state(&controller, SessionState::Running);
        assert_eq!(controller.current_device_id().as_deref(), Some("synthetic-rear"));

        controller.stop_session().unwrap();
        wait_for_state(&controller, SessionState::Stopped);
        assert!(controller.session_config().is_none());
        assert!(!controller.is_stopping());

        controller.start_session(SessionConfiguration::default()).unwrap();
        wait_for_state(&controller, SessionState::Running);
        assert!(controller.is_running());
    }

    #[test]
    fn test_stop_while_starting_never_runs() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());
        controller.start_session(SessionConfiguration::default()).unwrap();
        controller.stop_session().unwrap();
        wait_for_state(&controller, SessionState::Stopped);
        assert!(!controller.is_running());
    }
}
