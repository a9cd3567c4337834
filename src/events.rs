// SPDX-License-Identifier: MPL-2.0

//! Callbacks delivered to the host

use crate::backends::camera::types::MetadataMap;
use crate::backends::presentation::PreviewBounds;
use std::path::PathBuf;
use tracing::{error, info};

/// How a finished photo is handed over
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturePayload {
    /// Base64-encoded JPEG bytes
    Base64(String),
    /// Path of a file holding the JPEG
    FilePath(PathBuf),
}

impl CapturePayload {
    /// String form sent across the host bridge
    pub fn as_bridge_value(&self) -> String {
        match self {
            CapturePayload::Base64(data) => data.clone(),
            CapturePayload::FilePath(path) => path.to_string_lossy().into_owned(),
        }
    }
}

/// Receiver of lifecycle and result notifications
///
/// Callbacks arrive on the hardware executor thread and must not block on
/// session operations that wait for that thread.
pub trait EventSink: Send + Sync {
    fn on_started(&self, bounds: PreviewBounds);
    fn on_start_error(&self, message: &str);
    fn on_stopped(&self);
    fn on_picture_taken(&self, payload: CapturePayload, metadata: &MetadataMap);
    fn on_picture_taken_error(&self, message: &str);
    fn on_sample_taken(&self, data: String);
    fn on_sample_taken_error(&self, message: &str);
}

/// Sink that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEventSink;

impl EventSink for LoggingEventSink {
    fn on_started(&self, bounds: PreviewBounds) {
        info!(
            x = bounds.x,
            y = bounds.y,
            width = bounds.width,
            height = bounds.height,
            "Session started"
        );
    }

    fn on_start_error(&self, message: &str) {
        error!(message, "Session failed to start");
    }

    fn on_stopped(&self) {
        info!("Session stopped");
    }

    fn on_picture_taken(&self, payload: CapturePayload, metadata: &MetadataMap) {
        match payload {
            CapturePayload::Base64(data) => {
                info!(size = data.len(), tags = metadata.len(), "Picture taken (base64)")
            }
            CapturePayload::FilePath(path) => {
                info!(path = %path.display(), tags = metadata.len(), "Picture taken")
            }
        }
    }

    fn on_picture_taken_error(&self, message: &str) {
        error!(message, "Picture capture failed");
    }

    fn on_sample_taken(&self, data: String) {
        info!(size = data.len(), "Sample taken");
    }

    fn on_sample_taken_error(&self, message: &str) {
        error!(message, "Sample capture failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_value() {
        assert_eq!(CapturePayload::Base64("abc".into()).as_bridge_value(), "abc");
        assert_eq!(
            CapturePayload::FilePath(PathBuf::from("/tmp/capture_1.jpg")).as_bridge_value(),
            "/tmp/capture_1.jpg"
        );
    }
}
