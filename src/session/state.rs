// SPDX-License-Identifier: GPL-3.0-only

//! Session lifecycle state and the capture lock

use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;

/// Lifecycle of a camera session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// Bind in progress
    Starting,
    Running,
    /// Stop requested while operations are still in flight
    StopPending,
    Stopped,
}

impl SessionState {
    /// A new session may be started from here
    pub fn can_start(&self) -> bool {
        matches!(self, SessionState::Idle | SessionState::Stopped)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Running => "running",
            SessionState::StopPending => "stop-pending",
            SessionState::Stopped => "stopped",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Default)]
struct CaptureFlags {
    photos_in_flight: u32,
    stop_requested: bool,
}

/// Narrow lock over "a photo is being captured/processed" and "stop requested"
///
/// Lets focus requests bail out early without consulting the gate.
#[derive(Debug, Default)]
pub struct CaptureLock {
    flags: Mutex<CaptureFlags>,
}

impl CaptureLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_capture(&self) {
        self.flags.lock().photos_in_flight += 1;
    }

    pub fn end_capture(&self) {
        let mut flags = self.flags.lock();
        flags.photos_in_flight = flags.photos_in_flight.saturating_sub(1);
    }

    pub fn mark_stop_requested(&self) {
        self.flags.lock().stop_requested = true;
    }

    pub fn is_capturing(&self) -> bool {
        self.flags.lock().photos_in_flight > 0
    }

    pub fn is_stop_requested(&self) -> bool {
        self.flags.lock().stop_requested
    }

    /// Capturing or stopping
    pub fn is_busy(&self) -> bool {
        let flags = self.flags.lock();
        flags.photos_in_flight > 0 || flags.stop_requested
    }

    pub fn reset(&self) {
        *self.flags.lock() = CaptureFlags::default();
    }
}
