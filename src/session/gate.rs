// SPDX-License-Identifier: GPL-3.0-only

//! Operation admission gate
//!
//! Every hardware-touching operation holds an [`OperationToken`] for its
//! whole duration. A stop request that arrives while tokens are out is
//! deferred; the release that drains the gate reports
//! [`ReleaseOutcome::Drained`] exactly once, and its caller runs teardown.

use crate::errors::SessionError;
use parking_lot::Mutex;
use std::fmt;
use tracing::{debug, trace};

/// Observable gate counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GateState {
    pub active_count: u32,
    pub stop_pending: bool,
}

/// Why an admission was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateError {
    /// The session is not accepting operations (starting or stopped)
    Closed,
    /// A stop has been requested
    StopPending,
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateError::Closed => write!(f, "session is not running"),
            GateError::StopPending => write!(f, "session is stopping"),
        }
    }
}

impl std::error::Error for GateError {}

impl From<GateError> for SessionError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Closed => SessionError::NotReady(err.to_string()),
            GateError::StopPending => SessionError::Busy(err.to_string()),
        }
    }
}

/// What `request_stop` decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopDisposition {
    /// Nothing in flight: the caller runs teardown now
    Immediate,
    /// Teardown will be signalled by the last release
    Deferred { active: u32 },
    /// A stop was already requested; nothing to do
    AlreadyPending,
}

/// Result of releasing a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released { active: u32 },
    /// Last operation finished under a pending stop; the caller runs teardown
    Drained,
    /// Token belongs to a previous session; ignored
    Stale,
}

/// Proof of admission for one operation
///
/// Not `Clone`: a token is released exactly once, by value.
#[derive(Debug)]
#[must_use = "an admitted operation must release its token"]
pub struct OperationToken {
    id: u64,
    name: &'static str,
    epoch: u64,
}

impl OperationToken {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[derive(Debug, Default)]
struct GateInner {
    active_count: u32,
    stop_pending: bool,
    accepting: bool,
    teardown_fired: bool,
    epoch: u64,
    next_id: u64,
}

/// Reference-counted admission/drain gate
#[derive(Debug, Default)]
pub struct OperationGate {
    inner: Mutex<GateInner>,
}

impl OperationGate {
    /// A closed gate; nothing is admitted until [`open`](Self::open)
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous session: counters to zero, admission closed
    ///
    /// Tokens handed out before the reset become stale.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.active_count = 0;
        inner.stop_pending = false;
        inner.accepting = false;
        inner.teardown_fired = false;
        inner.epoch += 1;
        trace!(epoch = inner.epoch, "Gate reset");
    }

    /// Start admitting operations
    ///
    /// Returns false, leaving the gate closed, if a stop was requested
    /// since the last reset.
    pub fn open(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.stop_pending {
            debug!("Gate stays closed: stop requested during start");
            return false;
        }
        inner.accepting = true;
        true
    }

    /// Admit one operation
    pub fn admit(&self, name: &'static str) -> Result<OperationToken, GateError> {
        let mut inner = self.inner.lock();
        if inner.stop_pending {
            debug!(name, active = inner.active_count, "Admission refused: stop pending");
            return Err(GateError::StopPending);
        }
        if !inner.accepting {
            debug!(name, "Admission refused: session not running");
            return Err(GateError::Closed);
        }

        inner.active_count += 1;
        inner.next_id += 1;
        let token = OperationToken {
            id: inner.next_id,
            name,
            epoch: inner.epoch,
        };
        trace!(name, id = token.id, active = inner.active_count, "Operation admitted");
        Ok(token)
    }

    /// Release a token
    pub fn release(&self, token: OperationToken) -> ReleaseOutcome {
        let mut inner = self.inner.lock();
        if token.epoch != inner.epoch {
            debug!(name = token.name, id = token.id, "Stale token released; ignored");
            return ReleaseOutcome::Stale;
        }

        inner.active_count = inner.active_count.saturating_sub(1);
        trace!(name = token.name, id = token.id, active = inner.active_count, "Operation released");

        if inner.active_count == 0 && inner.stop_pending && !inner.teardown_fired {
            inner.teardown_fired = true;
            debug!(name = token.name, "Last operation released; deferred teardown due");
            return ReleaseOutcome::Drained;
        }
        ReleaseOutcome::Released {
            active: inner.active_count,
        }
    }

    /// Mark the session as stopping
    pub fn request_stop(&self) -> StopDisposition {
        let mut inner = self.inner.lock();
        if inner.stop_pending {
            return StopDisposition::AlreadyPending;
        }
        inner.stop_pending = true;
        inner.accepting = false;

        if inner.active_count == 0 {
            inner.teardown_fired = true;
            debug!("Stop requested with no active operations");
            StopDisposition::Immediate
        } else {
            debug!(active = inner.active_count, "Stop deferred until operations drain");
            StopDisposition::Deferred {
                active: inner.active_count,
            }
        }
    }

    /// Stop requested and operations still running
    pub fn is_deferred(&self) -> bool {
        let inner = self.inner.lock();
        inner.stop_pending && inner.active_count > 0
    }

    pub fn is_stopping(&self) -> bool {
        self.inner.lock().stop_pending
    }

    pub fn is_accepting(&self) -> bool {
        self.inner.lock().accepting
    }

    pub fn active_count(&self) -> u32 {
        self.inner.lock().active_count
    }

    pub fn snapshot(&self) -> GateState {
        let inner = self.inner.lock();
        GateState {
            active_count: inner.active_count,
            stop_pending: inner.stop_pending,
        }
    }
}
