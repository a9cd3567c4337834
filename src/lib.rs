// SPDX-License-Identifier: MPL-2.0

//! Camera session coordination for embedded camera previews
//!
//! This library runs a live camera session inside a host UI: it binds and
//! unbinds the camera, admits concurrent captures, focus and
//! reconfiguration requests, and makes sure teardown never races with an
//! operation that is still using the hardware.
//!
//! # Architecture
//!
//! - [`session`]: lifecycle, operation gate, focus coordination, executors
//! - [`backends`]: camera hardware and preview surface abstractions
//! - [`pipelines`]: photo/sample post-processing (orientation, resize, overlay, EXIF)
//! - [`events`]: callbacks delivered to the host
//! - [`storage`]: gallery, cache and recording output files
//! - [`config`]: service settings
//!
//! # Example
//!
//! ```ignore
//! let controller = SessionController::new(SessionParts {
//!     backend: Box::new(SyntheticBackend::default()),
//!     surface: Box::new(HeadlessSurface::new(1080, 1920)),
//!     events: Arc::new(LoggingEventSink),
//!     storage: Arc::new(settings.storage()),
//!     settings,
//! })?;
//! controller.start_session(SessionConfiguration::default())?;
//! controller.capture_photo(PhotoCaptureOptions::default())?;
//! controller.stop_session()?;
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod events;
pub mod pipelines;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use config::Settings;
pub use errors::{SessionError, SessionResult};
pub use events::{CapturePayload, EventSink, LoggingEventSink};
pub use session::{
    CommandHandle, PhotoCaptureOptions, SessionConfiguration, SessionController, SessionParts,
    SessionState,
};
pub use storage::{FileSystemStorage, PersistenceSink};
