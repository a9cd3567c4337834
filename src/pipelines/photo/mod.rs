// SPDX-License-Identifier: MPL-2.0

//! Capture post-processing pipeline
//!
//! ```text
//! raw JPEG ─▶ decode ─▶ orient ─▶ resize | crop-to-preview ─▶ overlay ─▶ JPEG ─▶ EXIF
//!                                                                         │
//!                                          source tags + overlay tags ◀───┘
//! ```
//!
//! The pipeline is synchronous and side-effect free: it reads the raw bytes
//! and source metadata, and returns new bytes plus a merged metadata map.
//! Each stage consumes the previous pixel buffer by value.

pub mod encoding;
pub mod exif;
pub mod geometry;
pub mod metadata;
pub mod orientation;
pub mod overlay;
pub mod sample;

pub use encoding::EncodingFormat;
pub use geometry::{Size, ViewRegion};
pub use metadata::MetadataMap;
pub use overlay::OverlayStyle;
pub use sample::SampleTransform;

use crate::backends::camera::types::SensorRotation;
use crate::constants::EXIF_SOFTWARE;
use crate::errors::PipelineError;
use chrono::{DateTime, Local};
use image::DynamicImage;
use image::imageops::FilterType;
use metadata::{MetadataOverlay, tags};
use tracing::{debug, warn};

/// Per-capture options
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoRequest {
    /// JPEG quality, 0-100
    pub quality: u8,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    /// Visible preview size; used only when no explicit size is given
    pub crop_target: Option<Size>,
    pub embed_timestamp: bool,
    pub embed_location: bool,
}

impl Default for PhotoRequest {
    fn default() -> Self {
        Self {
            quality: crate::constants::quality::DEFAULT_PHOTO_QUALITY,
            max_width: None,
            max_height: None,
            crop_target: None,
            embed_timestamp: false,
            embed_location: false,
        }
    }
}

/// Pipeline output
#[derive(Debug, Clone)]
pub struct ProcessedPhoto {
    /// Final JPEG, with a rewritten EXIF segment when that succeeded
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Source tags with the pipeline's rewrites applied
    pub metadata: MetadataMap,
}

/// Photo and sample post-processing
#[derive(Debug, Clone, Default)]
pub struct CapturePipeline {
    style: OverlayStyle,
}

impl CapturePipeline {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Run the full still pipeline
    pub fn process_photo(
        &self,
        raw: &[u8],
        source: &MetadataMap,
        request: &PhotoRequest,
    ) -> Result<ProcessedPhoto, PipelineError> {
        self.process_photo_at(raw, source, request, Local::now())
    }

    /// [`process_photo`](Self::process_photo) with an explicit fallback clock
    pub fn process_photo_at(
        &self,
        raw: &[u8],
        source: &MetadataMap,
        request: &PhotoRequest,
        now: DateTime<Local>,
    ) -> Result<ProcessedPhoto, PipelineError> {
        let image = encoding::decode(raw)?;
        let image = orientation::apply_exif_orientation(image, metadata::orientation(source));
        let image = self.resize_or_crop(image, request);

        let mut rgb = image.into_rgb8();
        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            return Err(PipelineError::InvalidDimensions { width, height });
        }

        let mut labels = Vec::new();
        if request.embed_timestamp {
            labels.push(metadata::timestamp_label(source, now));
        }
        if request.embed_location {
            match metadata::location_label(source) {
                Some(location) => labels.push(location),
                None => debug!("No GPS tags; location label skipped"),
            }
        }
        if !labels.is_empty() {
            let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
            overlay::draw_labels(&mut rgb, &labels, &self.style);
        }

        let encoded = encoding::encode_jpeg(&rgb, request.quality)?;
        drop(rgb);

        let mut rewrites = MetadataOverlay::new();
        rewrites.record_output(width, height);
        if !source.contains_key(tags::SOFTWARE) {
            rewrites.set(tags::SOFTWARE, EXIF_SOFTWARE);
        }
        let merged = rewrites.merged(source);

        let bytes = match exif::embed(&encoded, &merged, width, height) {
            Ok(with_exif) => with_exif,
            Err(e) => {
                warn!(error = %e, "Failed to write EXIF; keeping bare JPEG");
                encoded
            }
        };

        debug!(width, height, size = bytes.len(), "Photo processed");
        Ok(ProcessedPhoto {
            bytes,
            width,
            height,
            metadata: merged,
        })
    }

    /// Rotate and optionally shrink or crop a sample, then encode it
    pub fn process_sample(
        &self,
        raw: &[u8],
        rotation: SensorRotation,
        quality: u8,
        transform: &SampleTransform,
    ) -> Result<Vec<u8>, PipelineError> {
        let image = encoding::decode(raw)?;
        let image = orientation::apply_rotation(image, rotation);
        let image = transform.apply(image);
        encoding::encode_jpeg(&image.into_rgb8(), quality)
    }

    fn resize_or_crop(&self, image: DynamicImage, request: &PhotoRequest) -> DynamicImage {
        let source = Size::new(image.width(), image.height());

        if request.max_width.is_some() || request.max_height.is_some() {
            let target = geometry::fit_within(source, request.max_width, request.max_height);
            if target == source {
                return image;
            }
            debug!(from = ?source, to = ?target, "Resizing photo");
            return image.resize_exact(target.width, target.height, FilterType::Lanczos3);
        }

        match request.crop_target.filter(|t| !t.is_empty()) {
            Some(target) => {
                let rect = geometry::center_crop_to_aspect(source, target);
                if rect.width == source.width && rect.height == source.height {
                    return image;
                }
                debug!(?rect, preview = ?target, "Cropping photo to preview aspect");
                image.crop_imm(rect.x, rect.y, rect.width, rect.height)
            }
            None => image,
        }
    }
}
