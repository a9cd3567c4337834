// SPDX-License-Identifier: GPL-3.0-only

//! Camera session coordination
//!
//! - [`controller`]: lifecycle, admission and teardown
//! - [`gate`]: admission/drain gate
//! - [`focus`]: last-request-wins focus coordination
//! - [`executor`]: single-threaded job executors
//! - [`configuration`]: immutable session snapshots
//! - [`command`]: completion handles for queued commands

mod capture;
pub mod command;
pub mod configuration;
mod controls;
pub mod controller;
pub mod executor;
pub mod focus;
pub mod gate;
mod recording;
pub mod state;

pub use capture::PhotoCaptureOptions;
pub use command::CommandHandle;
pub use configuration::{AspectRatio, GridMode, SessionConfiguration};
pub use controller::{SessionController, SessionParts};
pub use controls::{ExposureRange, ZoomInfo};
pub use recording::RecordingCallback;
pub use state::SessionState;
