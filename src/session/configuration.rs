// SPDX-License-Identifier: GPL-3.0-only

//! Session configuration snapshots
//!
//! A [`SessionConfiguration`] is never edited in place. Setters on the
//! controller derive a new value with one of the `with_*` methods and swap
//! it in whole.

use crate::backends::camera::types::{BindRequest, CameraPosition};
use crate::errors::SessionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Preview aspect ratio as width:height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub const FOUR_THREE: AspectRatio = AspectRatio { width: 4, height: 3 };
    pub const SIXTEEN_NINE: AspectRatio = AspectRatio { width: 16, height: 9 };

    /// width / height
    pub fn value(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl FromStr for AspectRatio {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SessionError::InvalidArgument(format!("malformed aspect ratio '{}'", s));
        let (w, h) = s.trim().split_once(':').ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(AspectRatio { width, height })
    }
}

impl TryFrom<String> for AspectRatio {
    type Error = SessionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AspectRatio> for String {
    fn from(ratio: AspectRatio) -> Self {
        ratio.to_string()
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

/// Composition grid drawn over the preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum GridMode {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "3x3")]
    ThreeByThree,
    #[serde(rename = "4x4")]
    FourByFour,
}

impl GridMode {
    /// Number of cells per side, 0 when hidden
    pub fn divisions(&self) -> u32 {
        match self {
            GridMode::None => 0,
            GridMode::ThreeByThree => 3,
            GridMode::FourByFour => 4,
        }
    }
}

impl FromStr for GridMode {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "none" => Ok(GridMode::None),
            "3x3" => Ok(GridMode::ThreeByThree),
            "4x4" => Ok(GridMode::FourByFour),
            other => Err(SessionError::InvalidArgument(format!(
                "unknown grid mode '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for GridMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridMode::None => write!(f, "none"),
            GridMode::ThreeByThree => write!(f, "3x3"),
            GridMode::FourByFour => write!(f, "4x4"),
        }
    }
}

/// Immutable description of one camera session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfiguration {
    /// Explicit device; overrides `position` when set
    pub device_id: Option<String>,
    pub position: CameraPosition,
    /// Preview origin in host coordinates; -1 means centered
    pub x: i32,
    pub y: i32,
    /// Preview size; 0 means "fill the host"
    pub width: u32,
    pub height: u32,
    pub padding_bottom: u32,
    /// Render the preview behind the host UI
    pub to_back: bool,
    /// Deliver photos as file paths instead of base64
    pub store_to_file: bool,
    pub enable_opacity: bool,
    pub disable_exif_header_stripping: bool,
    pub disable_audio: bool,
    pub zoom_factor: f32,
    pub aspect_ratio: Option<AspectRatio>,
    pub grid_mode: GridMode,
    pub disable_focus_indicator: bool,
    pub video_mode_enabled: bool,
    pub centered: bool,
}

impl Default for SessionConfiguration {
    fn default() -> Self {
        Self {
            device_id: None,
            position: CameraPosition::Rear,
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            padding_bottom: 0,
            to_back: false,
            store_to_file: false,
            enable_opacity: false,
            disable_exif_header_stripping: false,
            disable_audio: false,
            zoom_factor: 1.0,
            aspect_ratio: None,
            grid_mode: GridMode::None,
            disable_focus_indicator: false,
            video_mode_enabled: false,
            centered: false,
        }
    }
}

impl SessionConfiguration {
    pub fn builder() -> SessionConfigurationBuilder {
        SessionConfigurationBuilder::default()
    }

    pub fn with_zoom(&self, zoom_factor: f32) -> Self {
        Self {
            zoom_factor,
            ..self.clone()
        }
    }

    pub fn with_aspect_ratio(&self, aspect_ratio: Option<AspectRatio>) -> Self {
        Self {
            aspect_ratio,
            ..self.clone()
        }
    }

    /// Switch facing; an explicit device id no longer applies
    pub fn with_position(&self, position: CameraPosition) -> Self {
        Self {
            position,
            device_id: None,
            ..self.clone()
        }
    }

    pub fn with_device_id(&self, device_id: impl Into<String>) -> Self {
        Self {
            device_id: Some(device_id.into()),
            ..self.clone()
        }
    }

    pub fn with_grid_mode(&self, grid_mode: GridMode) -> Self {
        Self {
            grid_mode,
            ..self.clone()
        }
    }

    /// Re-center the preview in the host
    pub fn centered(&self) -> Self {
        Self {
            x: -1,
            y: -1,
            centered: true,
            ..self.clone()
        }
    }

    pub fn is_centered(&self) -> bool {
        self.centered || (self.x == -1 && self.y == -1)
    }

    /// Audio is recorded unless explicitly disabled
    pub fn audio_enabled(&self) -> bool {
        !self.disable_audio
    }

    /// Hardware-facing subset of this configuration
    pub fn bind_request(&self) -> BindRequest {
        BindRequest {
            device_id: self.device_id.clone(),
            position: self.position,
            aspect_ratio: self.aspect_ratio.map(|r| (r.width, r.height)),
            video_enabled: self.video_mode_enabled,
            audio_enabled: self.video_mode_enabled && self.audio_enabled(),
        }
    }
}

/// Builder for [`SessionConfiguration`]
#[derive(Debug, Clone, Default)]
pub struct SessionConfigurationBuilder {
    config: SessionConfiguration,
}

impl SessionConfigurationBuilder {
    pub fn device_id(mut self, id: impl Into<String>) -> Self {
        self.config.device_id = Some(id.into());
        self
    }

    pub fn position(mut self, position: CameraPosition) -> Self {
        self.config.position = position;
        self
    }

    pub fn origin(mut self, x: i32, y: i32) -> Self {
        self.config.x = x;
        self.config.y = y;
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    pub fn padding_bottom(mut self, padding: u32) -> Self {
        self.config.padding_bottom = padding;
        self
    }

    pub fn to_back(mut self, to_back: bool) -> Self {
        self.config.to_back = to_back;
        self
    }

    pub fn store_to_file(mut self, store: bool) -> Self {
        self.config.store_to_file = store;
        self
    }

    pub fn enable_opacity(mut self, enable: bool) -> Self {
        self.config.enable_opacity = enable;
        self
    }

    pub fn disable_exif_header_stripping(mut self, disable: bool) -> Self {
        self.config.disable_exif_header_stripping = disable;
        self
    }

    pub fn disable_audio(mut self, disable: bool) -> Self {
        self.config.disable_audio = disable;
        self
    }

    pub fn zoom_factor(mut self, zoom: f32) -> Self {
        self.config.zoom_factor = zoom;
        self
    }

    pub fn aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.config.aspect_ratio = Some(ratio);
        self
    }

    pub fn grid_mode(mut self, mode: GridMode) -> Self {
        self.config.grid_mode = mode;
        self
    }

    pub fn disable_focus_indicator(mut self, disable: bool) -> Self {
        self.config.disable_focus_indicator = disable;
        self
    }

    pub fn video_mode_enabled(mut self, enabled: bool) -> Self {
        self.config.video_mode_enabled = enabled;
        self
    }

    pub fn centered(mut self) -> Self {
        self.config = self.config.centered();
        self
    }

    pub fn build(self) -> SessionConfiguration {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_ratio_parsing() {
        assert_eq!("4:3".parse::<AspectRatio>().unwrap(), AspectRatio::FOUR_THREE);
        assert_eq!(" 16 : 9 ".parse::<AspectRatio>().unwrap(), AspectRatio::SIXTEEN_NINE);
        for bad in ["", "4", "4:0", "a:b", "4:3:2", "-4:3"] {
            assert!(
                matches!(bad.parse::<AspectRatio>(), Err(SessionError::InvalidArgument(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_with_methods_leave_original_untouched() {
        let base = SessionConfiguration::builder()
            .device_id("cam-1")
            .zoom_factor(2.0)
            .build();
        let flipped = base.with_position(CameraPosition::Front);

        assert_eq!(base.device_id.as_deref(), Some("cam-1"));
        assert_eq!(base.position, CameraPosition::Rear);
        assert_eq!(flipped.device_id, None);
        assert_eq!(flipped.position, CameraPosition::Front);
        assert_eq!(flipped.zoom_factor, 2.0);
    }

    #[test]
    fn test_centered_sets_sentinel_origin() {
        let config = SessionConfiguration::builder().origin(10, 20).build().centered();
        assert_eq!((config.x, config.y), (-1, -1));
        assert!(config.is_centered());
    }

    #[test]
    fn test_json_uses_host_field_names() {
        let json = r#"{"position":"front","aspectRatio":"16:9","gridMode":"3x3","storeToFile":true}"#;
        let config: SessionConfiguration = serde_json::from_str(json).unwrap();
        assert_eq!(config.position, CameraPosition::Front);
        assert_eq!(config.aspect_ratio, Some(AspectRatio::SIXTEEN_NINE));
        assert_eq!(config.grid_mode, GridMode::ThreeByThree);
        assert!(config.store_to_file);
        assert_eq!(config.zoom_factor, 1.0);
    }

    #[test]
    fn test_bind_request_audio_follows_video_mode() {
        let config = SessionConfiguration::builder().video_mode_enabled(true).build();
        assert!(config.bind_request().audio_enabled);

        let muted = SessionConfiguration::builder()
            .video_mode_enabled(true)
            .disable_audio(true)
            .build();
        assert!(!muted.bind_request().audio_enabled);
        assert!(!SessionConfiguration::default().bind_request().audio_enabled);
    }
}
