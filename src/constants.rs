// SPDX-License-Identifier: GPL-3.0-only

//! Crate-wide constants

use std::time::Duration;

/// Capture quality defaults (JPEG quality, 0-100)
pub mod quality {
    /// Used by the CLI when `--quality` is omitted
    pub const DEFAULT_PHOTO_QUALITY: u8 = 85;

    /// Default for preview samples
    pub const DEFAULT_SAMPLE_QUALITY: u8 = 85;

    pub const MAX_QUALITY: u8 = 100;
}

/// Timestamp/location pill geometry (pixels unless noted)
pub mod overlay {
    /// Font height as a fraction of the image width
    pub const FONT_SCALE: f32 = 0.035;

    pub const MIN_FONT_PX: f32 = 10.0;

    pub const PADDING_HORIZONTAL: u32 = 16;

    pub const PADDING_VERTICAL: u32 = 10;

    /// Distance from the top and right image edges
    pub const EDGE_MARGIN: u32 = 12;

    /// Vertical gap between stacked pills
    pub const PILL_GAP: u32 = 8;

    pub const CORNER_RADIUS: u32 = 10;

    /// Pill background, RGBA
    pub const BACKGROUND: [u8; 4] = [31, 31, 31, 56];

    pub const TEXT_COLOR: [u8; 3] = [255, 255, 255];
}

/// Output file naming
pub mod file_names {
    pub const GALLERY_PREFIX: &str = "IMG_";

    pub const CAPTURE_PREFIX: &str = "capture_";

    pub const VIDEO_PREFIX: &str = "video_";

    pub const VIDEO_EXTENSION: &str = "mp4";

    /// chrono format for gallery and cache file stamps
    pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

    /// Subdirectory used under the platform pictures/videos directories
    pub const APP_DIRECTORY: &str = "CameraPreview";
}

/// Executor thread names
pub mod threads {
    pub const HARDWARE_EXECUTOR: &str = "camera-hardware";

    pub const PRESENTATION_EXECUTOR: &str = "camera-presentation";
}

/// Software tag written into rewritten EXIF
pub const EXIF_SOFTWARE: &str = concat!("camera-session ", env!("GIT_VERSION"));

/// How long the CLI simulation waits for callbacks before giving up
pub const SIMULATION_TIMEOUT: Duration = Duration::from_secs(10);
