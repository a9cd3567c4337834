// SPDX-License-Identifier: GPL-3.0-only

//! Focus, zoom, exposure, flash and rebinding commands

use super::command::CommandHandle;
use super::configuration::{AspectRatio, GridMode, SessionConfiguration};
use super::controller::{AdmittedOperation, HardwareSlot, SessionController, SessionInner};
use super::focus::{FocusOutcome, FocusRequest};
use crate::backends::camera::types::{
    BackendError, CameraDevice, ExposureMode, FlashMode, LensInfo, ZoomFactors,
};
use crate::backends::presentation::PreviewBounds;
use crate::errors::{SessionError, SessionResult};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Zoom range of the bound camera plus its lens
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoomInfo {
    pub min: f32,
    pub max: f32,
    pub current: f32,
    pub lens: LensInfo,
}

/// Exposure compensation range in EV
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExposureRange {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

fn invalid(message: String) -> SessionError {
    SessionError::InvalidArgument(message)
}

impl SessionController {
    // ===== Focus =====

    /// Tap-to-focus at normalised preview coordinates
    ///
    /// A newer request cancels the previous one. Rejected with `Busy` while
    /// a still capture or a stop is in progress.
    pub fn set_focus(&self, x: f32, y: f32) -> SessionResult<()> {
        let inner = &self.inner;
        let (token, request) = inner.focus.request(x, y, &inner.capture_lock, &inner.gate)?;
        let op = AdmittedOperation::new(inner, token);

        let show_indicator = inner.settings.focus_indicator
            && !inner
                .config_snapshot()
                .is_some_and(|c| c.disable_focus_indicator);
        if show_indicator {
            let id = request.id();
            inner
                .presentation
                .post(move |surface| surface.show_focus_indicator(x, y, id));
        }

        debug!(x, y, id = request.id(), "Focus admitted");
        inner.dispatch(op, move |inner, slot| inner.run_focus(slot, request, show_indicator))
    }

    // ===== Zoom =====

    /// Set the zoom ratio, clamped to the camera's range; resolves to the applied ratio
    pub fn set_zoom(&self, ratio: f32) -> SessionResult<CommandHandle<f32>> {
        if !ratio.is_finite() {
            return Err(invalid(format!("zoom ratio must be finite, got {}", ratio)));
        }
        self.inner.command("setZoom", move |inner, slot| {
            let factors = slot.backend.zoom_factors().unwrap_or(ZoomFactors::FALLBACK);
            let applied = factors.clamp(ratio);
            slot.backend.set_zoom(applied)?;
            inner.replace_config(|c| c.with_zoom(applied));
            debug!(requested = ratio, applied, "Zoom set");
            Ok(applied)
        })
    }

    pub fn zoom_factors(&self) -> SessionResult<CommandHandle<ZoomInfo>> {
        let device = self.current_device_id();
        self.inner.query(move |slot| {
            let factors = slot.backend.zoom_factors()?;
            let lens = slot
                .backend
                .devices()
                .into_iter()
                .find(|d| Some(&d.id) == device.as_ref())
                .and_then(|d| d.lenses.into_iter().next())
                .unwrap_or_default();
            Ok(ZoomInfo {
                min: factors.min,
                max: factors.max,
                current: factors.current,
                lens,
            })
        })
    }

    // ===== Exposure =====

    /// `LOCK` or `CONTINUOUS`, case-insensitive
    pub fn set_exposure_mode(&self, mode: &str) -> SessionResult<CommandHandle<()>> {
        let mode: ExposureMode = mode.parse().map_err(invalid)?;
        self.inner.command("setExposureMode", move |_, slot| {
            slot.backend.set_exposure_locked(mode == ExposureMode::Lock)?;
            debug!(%mode, "Exposure mode set");
            Ok(())
        })
    }

    /// Apply compensation in EV; resolves to the EV actually applied
    pub fn set_exposure_compensation(&self, ev: f32) -> SessionResult<CommandHandle<f32>> {
        if !ev.is_finite() {
            return Err(invalid(format!("exposure compensation must be finite, got {}", ev)));
        }
        self.inner.command("setExposureCompensation", move |_, slot| {
            let state = slot.backend.exposure_state()?;
            let index = state.index_for_ev(ev);
            slot.backend.set_exposure_index(index)?;
            let applied = index as f32 * state.effective_step();
            debug!(requested = ev, applied, index, "Exposure compensation set");
            Ok(applied)
        })
    }

    pub fn exposure_compensation_range(&self) -> SessionResult<CommandHandle<ExposureRange>> {
        self.inner.query(|slot| {
            let state = slot.backend.exposure_state()?;
            let (min, max) = state.ev_range();
            Ok(ExposureRange {
                min,
                max,
                step: state.effective_step(),
            })
        })
    }

    pub fn exposure_compensation(&self) -> SessionResult<CommandHandle<f32>> {
        self.inner
            .query(|slot| Ok(slot.backend.exposure_state()?.current_ev()))
    }

    // ===== Flash =====

    /// `off`, `on`, `auto` or `torch`
    pub fn set_flash_mode(&self, mode: &str) -> SessionResult<CommandHandle<()>> {
        let mode: FlashMode = mode.parse().map_err(invalid)?;
        self.inner.command("setFlashMode", move |inner, slot| {
            if mode == FlashMode::Torch {
                slot.backend.set_torch(true)?;
                slot.backend.set_flash_mode(FlashMode::Off)?;
            } else {
                slot.backend.set_torch(false)?;
                slot.backend.set_flash_mode(mode)?;
            }
            *inner.flash_mode.lock() = mode;
            debug!(%mode, "Flash mode set");
            Ok(())
        })
    }

    pub fn supported_flash_modes(&self) -> SessionResult<CommandHandle<Vec<FlashMode>>> {
        self.inner.query(|slot| {
            Ok(if slot.backend.has_flash_unit() {
                FlashMode::ALL.to_vec()
            } else {
                vec![FlashMode::Off]
            })
        })
    }

    pub fn flash_mode(&self) -> SessionResult<CommandHandle<FlashMode>> {
        let inner = Arc::clone(&self.inner);
        self.inner.query(move |_| Ok(*inner.flash_mode.lock()))
    }

    // ===== Layout and devices =====

    /// Change the preview aspect ratio and rebind
    ///
    /// `None` clears the ratio. Without explicit coordinates the preview is
    /// re-centered; an unchanged ratio without coordinates does nothing.
    /// Resolves to the new preview bounds, also reported via `on_started`.
    pub fn set_aspect_ratio(
        &self,
        ratio: Option<&str>,
        x: Option<i32>,
        y: Option<i32>,
    ) -> SessionResult<CommandHandle<Option<PreviewBounds>>> {
        let ratio = ratio.map(|r| r.parse::<AspectRatio>()).transpose()?;
        let op = self.inner.admit("setAspectRatio")?;

        let current = self
            .inner
            .config_snapshot()
            .ok_or_else(|| SessionError::NotReady("no active configuration".into()))?;
        if current.aspect_ratio == ratio && x.is_none() && y.is_none() {
            debug!(?ratio, "Aspect ratio unchanged");
            return Ok(CommandHandle::ready(Ok(None)));
        }

        info!(?ratio, "Changing aspect ratio");
        self.inner.command_with(op, "setAspectRatio", move |inner, slot| {
            let previous = inner
                .config_snapshot()
                .ok_or_else(|| SessionError::NotReady("no active configuration".into()))?;
            let next = previous.with_aspect_ratio(ratio);
            let next = Arc::new(if x.is_none() && y.is_none() {
                next.centered()
            } else {
                SessionConfiguration {
                    x: x.unwrap_or(next.x),
                    y: y.unwrap_or(next.y),
                    centered: false,
                    ..next
                }
            });

            {
                let next = Arc::clone(&next);
                inner.presentation.post(move |surface| surface.update_layout(&next));
            }
            let grid_mode = next.grid_mode;
            let bounds = inner.switch_configuration(slot, &previous, next)?;
            inner.presentation.post(move |surface| surface.set_grid_mode(grid_mode));
            Ok(Some(bounds))
        })
    }

    /// `none`, `3x3` or `4x4`
    pub fn set_grid_mode(&self, mode: &str) -> SessionResult<CommandHandle<()>> {
        let mode: GridMode = mode.parse()?;
        self.inner.command("setGridMode", move |inner, _| {
            inner.replace_config(|c| c.with_grid_mode(mode));
            inner.presentation.post(move |surface| surface.set_grid_mode(mode));
            debug!(%mode, "Grid mode set");
            Ok(())
        })
    }

    /// Switch between front and rear cameras
    pub fn flip_camera(&self) -> SessionResult<CommandHandle<PreviewBounds>> {
        self.ensure_not_recording()?;
        self.inner.command("flipCamera", move |inner, slot| {
            let previous = inner
                .config_snapshot()
                .ok_or_else(|| SessionError::NotReady("no active configuration".into()))?;
            let next = Arc::new(previous.with_position(previous.position.flipped()));
            info!(position = %next.position, "Flipping camera");
            inner.switch_configuration(slot, &previous, next)
        })
    }

    /// Bind the camera with id `device_id`
    ///
    /// An unknown id fails the rebind and keeps the current configuration.
    pub fn switch_to_device(&self, device_id: &str) -> SessionResult<CommandHandle<PreviewBounds>> {
        if device_id.trim().is_empty() {
            return Err(invalid("device id must not be empty".into()));
        }
        self.ensure_not_recording()?;
        let device_id = device_id.to_string();

        self.inner.command("switchToDevice", move |inner, slot| {
            if !slot.backend.devices().iter().any(|d| d.id == device_id) {
                let err = BackendError::DeviceNotFound(device_id);
                warn!(error = %err, "Device switch refused");
                inner.events.on_start_error(&err.to_string());
                return Err(err.into());
            }
            let previous = inner
                .config_snapshot()
                .ok_or_else(|| SessionError::NotReady("no active configuration".into()))?;
            let next = Arc::new(previous.with_device_id(device_id.clone()));

            let bounds = inner.switch_configuration(slot, &previous, next)?;
            info!(device = %device_id, "Switched camera");
            Ok(bounds)
        })
    }

    /// Cameras the backend knows about; works without a running session
    pub fn devices(&self) -> SessionResult<CommandHandle<Vec<CameraDevice>>> {
        let (handle, completer) = CommandHandle::channel();
        if self
            .inner
            .hardware
            .post(move |slot| completer.complete(Ok(slot.backend.devices())))
        {
            Ok(handle)
        } else {
            Err(SessionError::Fatal("hardware executor has shut down".into()))
        }
    }

    fn ensure_not_recording(&self) -> SessionResult<()> {
        if self.is_recording() {
            return Err(SessionError::Busy("cannot change camera while recording".into()));
        }
        Ok(())
    }
}

impl SessionInner {
    fn run_focus(&self, slot: &mut HardwareSlot, request: FocusRequest, hide_indicator: bool) {
        let result = if request.is_cancelled() {
            Err(BackendError::Cancelled)
        } else {
            // Metering starts from neutral compensation
            match slot.backend.exposure_state() {
                Ok(state) if state.index != state.neutral_index() => {
                    if let Err(e) = slot.backend.set_exposure_index(state.neutral_index()) {
                        warn!(error = %e, "Failed to reset exposure before focus");
                    }
                }
                Ok(_) => {}
                Err(e) => debug!(error = %e, "Exposure state unavailable before focus"),
            }
            slot.backend.focus(request.point(), request.cancel_token())
        };

        match self.focus.complete(&request, result) {
            FocusOutcome::Focused => debug!(id = request.id(), "Focus locked"),
            FocusOutcome::Cancelled => {}
            FocusOutcome::Failed(e) => warn!(id = request.id(), error = %e, "Focus failed"),
        }

        if hide_indicator {
            let id = request.id();
            self.presentation
                .post(move |surface| surface.hide_focus_indicator(id));
        }
    }
}
