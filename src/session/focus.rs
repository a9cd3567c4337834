// SPDX-License-Identifier: GPL-3.0-only

//! Focus request coordination
//!
//! At most one focus/metering request is outstanding per session. A new
//! request cancels the previous one; a stop cancels whatever is left.

use super::gate::{OperationGate, OperationToken};
use super::state::CaptureLock;
use crate::backends::camera::types::{BackendError, BackendResult, FocusPoint};
use crate::errors::{SessionError, SessionResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One admitted focus request
#[derive(Debug)]
pub struct FocusRequest {
    id: u64,
    point: FocusPoint,
    cancel: CancellationToken,
}

impl FocusRequest {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn point(&self) -> FocusPoint {
        self.point
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// How a focus request ended
#[derive(Debug, Clone, PartialEq)]
pub enum FocusOutcome {
    Focused,
    /// Superseded or stopped; never reported to the host
    Cancelled,
    Failed(BackendError),
}

#[derive(Debug)]
struct Outstanding {
    id: u64,
    cancel: CancellationToken,
}

/// Last-request-wins focus coordination
#[derive(Debug, Default)]
pub struct FocusCoordinator {
    outstanding: Mutex<Option<Outstanding>>,
    next_id: AtomicU64,
}

impl FocusCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate, admit and register a focus request
    ///
    /// Rejections, in order: coordinates outside [0, 1] (`InvalidArgument`),
    /// capture or stop in progress (`Busy`), then whatever the gate says.
    /// On success any previous request has been cancelled.
    pub fn request(
        &self,
        x: f32,
        y: f32,
        capture_lock: &CaptureLock,
        gate: &OperationGate,
    ) -> SessionResult<(OperationToken, FocusRequest)> {
        let point = FocusPoint::new(x, y).ok_or_else(|| {
            SessionError::InvalidArgument(format!(
                "focus coordinates must be within [0, 1], got ({}, {})",
                x, y
            ))
        })?;

        if capture_lock.is_busy() {
            return Err(SessionError::Busy(
                "cannot focus while capturing or stopping".into(),
            ));
        }

        let token = gate.admit("setFocus")?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        let previous = self.outstanding.lock().replace(Outstanding {
            id,
            cancel: cancel.clone(),
        });
        if let Some(previous) = previous {
            debug!(previous = previous.id, id, "Superseding outstanding focus request");
            previous.cancel.cancel();
        }

        Ok((token, FocusRequest { id, point, cancel }))
    }

    /// Record the end of `request`
    ///
    /// Clears the outstanding handle only if it still refers to `request`.
    pub fn complete(&self, request: &FocusRequest, result: BackendResult<()>) -> FocusOutcome {
        {
            let mut outstanding = self.outstanding.lock();
            if outstanding.as_ref().is_some_and(|o| o.id == request.id) {
                *outstanding = None;
            }
        }

        match result {
            Ok(()) if !request.is_cancelled() => {
                debug!(id = request.id, "Focus completed");
                FocusOutcome::Focused
            }
            Ok(()) | Err(BackendError::Cancelled) => {
                debug!(id = request.id, "Focus cancelled by newer request");
                FocusOutcome::Cancelled
            }
            Err(e) if request.is_cancelled() => {
                debug!(id = request.id, error = %e, "Focus cancelled by newer request");
                FocusOutcome::Cancelled
            }
            Err(e) => {
                warn!(id = request.id, error = %e, "Focus failed");
                FocusOutcome::Failed(e)
            }
        }
    }

    /// Cancel whatever request is outstanding; returns whether there was one
    pub fn cancel_outstanding(&self) -> bool {
        match self.outstanding.lock().take() {
            Some(outstanding) => {
                debug!(id = outstanding.id, "Cancelling outstanding focus request");
                outstanding.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn outstanding_id(&self) -> Option<u64> {
        self.outstanding.lock().as_ref().map(|o| o.id)
    }
}
