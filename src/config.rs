// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::presentation::PreviewBounds;
use crate::constants::{file_names, quality};
use crate::pipelines::photo::OverlayStyle;
use crate::session::configuration::AspectRatio;
use crate::storage::FileSystemStorage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Shrink the reported preview bounds for one aspect ratio
///
/// Some displays show a one or two pixel seam along the preview edge at
/// particular ratios. Hosts list the offending ratios here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisplayCompensation {
    pub aspect_ratio: AspectRatio,
    pub shrink_px: u32,
}

/// Service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Gallery directory (defaults to the platform pictures directory)
    pub gallery_dir: Option<PathBuf>,
    /// Where file-path photo payloads are written
    pub cache_dir: Option<PathBuf>,
    /// Recording output directory (defaults to the platform videos directory)
    pub video_dir: Option<PathBuf>,
    pub default_sample_quality: u8,
    pub overlay: OverlayStyle,
    /// Show the focus ring on tap-to-focus unless the session disables it
    pub focus_indicator: bool,
    pub display_compensation: Vec<DisplayCompensation>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gallery_dir: None,
            cache_dir: None,
            video_dir: None,
            default_sample_quality: quality::DEFAULT_SAMPLE_QUALITY,
            overlay: OverlayStyle::default(),
            focus_indicator: true,
            display_compensation: Vec::new(),
        }
    }
}

/// Failure loading [`Settings`]
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "Failed to read {}: {}", path.display(), source)
            }
            ConfigError::Parse(e) => write!(f, "Invalid settings: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(ConfigError::Parse)
    }

    /// Apply the first matching compensation rule to `bounds`
    pub fn compensate(&self, bounds: PreviewBounds, ratio: Option<AspectRatio>) -> PreviewBounds {
        let Some(ratio) = ratio else {
            return bounds;
        };
        match self
            .display_compensation
            .iter()
            .find(|rule| rule.aspect_ratio == ratio)
        {
            Some(rule) => PreviewBounds {
                width: bounds.width.saturating_sub(rule.shrink_px),
                height: bounds.height.saturating_sub(rule.shrink_px),
                ..bounds
            },
            None => bounds,
        }
    }

    /// Filesystem storage rooted at the configured or platform directories
    pub fn storage(&self) -> FileSystemStorage {
        FileSystemStorage::new(
            self.gallery_dir.clone().unwrap_or_else(default_gallery_dir),
            self.cache_dir.clone().unwrap_or_else(default_cache_dir),
            self.video_dir.clone().unwrap_or_else(default_video_dir),
        )
    }
}

fn home_or_current() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn default_gallery_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(home_or_current)
        .join(file_names::APP_DIRECTORY)
}

fn default_video_dir() -> PathBuf {
    dirs::video_dir()
        .unwrap_or_else(home_or_current)
        .join(file_names::APP_DIRECTORY)
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(file_names::APP_DIRECTORY)
}
