// SPDX-License-Identifier: GPL-3.0-only

//! Video recording start/stop

use super::command::CommandHandle;
use super::controller::SessionController;
use crate::backends::camera::types::BackendError;
use crate::errors::{SessionError, SessionResult};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{info, warn};

/// Receives `file://<path>` once the recording is finalized, or an error message
pub type RecordingCallback = Box<dyn FnOnce(Result<String, String>) + Send>;

impl SessionController {
    /// Start recording into a fresh file from the persistence sink
    ///
    /// Needs a running session with video mode enabled. Resolves to the
    /// output path once the recorder is running.
    pub fn start_record_video(&self) -> SessionResult<CommandHandle<PathBuf>> {
        let config = self
            .inner
            .config_snapshot()
            .ok_or_else(|| SessionError::NotReady("session is not running".into()))?;
        if !config.video_mode_enabled {
            return Err(SessionError::NotReady("video mode is not enabled".into()));
        }
        if self.inner.recording_active.swap(true, Ordering::SeqCst) {
            return Err(SessionError::Busy("a recording is already in progress".into()));
        }

        let with_audio = config.audio_enabled();
        let handle = self.inner.command("startRecordVideo", move |inner, slot| {
            let started = inner
                .storage
                .video_output_path()
                .map_err(BackendError::from)
                .and_then(|path| slot.backend.start_recording(path, with_audio));
            match started {
                Ok(recording) => {
                    let path = recording.output_path().to_path_buf();
                    info!(path = %path.display(), with_audio, "Recording started");
                    slot.recording = Some(recording);
                    Ok(path)
                }
                Err(e) => {
                    inner.recording_active.store(false, Ordering::SeqCst);
                    warn!(error = %e, "Failed to start recording");
                    Err(e.into())
                }
            }
        });
        if handle.is_err() {
            self.inner.recording_active.store(false, Ordering::SeqCst);
        }
        handle
    }

    /// Stop the active recording; `callback` fires once the file is finalized
    ///
    /// Works while a stop is pending so a recording can be closed cleanly.
    pub fn stop_record_video(&self, callback: impl FnOnce(Result<String, String>) + Send + 'static) {
        let callback: Arc<Mutex<Option<RecordingCallback>>> =
            Arc::new(Mutex::new(Some(Box::new(callback))));
        let fail = |callback: &Arc<Mutex<Option<RecordingCallback>>>, message: String| {
            if let Some(callback) = callback.lock().take() {
                callback(Err(message));
            }
        };

        if !self.inner.recording_active.load(Ordering::SeqCst) {
            fail(&callback, BackendError::NoRecordingInProgress.to_string());
            return;
        }

        let job_callback = Arc::clone(&callback);
        let inner = Arc::clone(&self.inner);
        let posted = self.inner.hardware.post(move |slot| {
            let Some(callback) = job_callback.lock().take() else {
                return;
            };
            match slot.recording.take() {
                Some(recording) => {
                    inner.recording_active.store(false, Ordering::SeqCst);
                    info!(path = %recording.output_path().display(), "Stopping recording");
                    recording.stop(Box::new(move |result| {
                        callback(result.map(|path| format!("file://{}", path.display())))
                    }));
                }
                None => callback(Err(BackendError::NoRecordingInProgress.to_string())),
            }
        });
        if !posted {
            fail(&callback, "hardware executor has shut down".to_string());
        }
    }
}
