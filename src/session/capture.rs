// SPDX-License-Identifier: GPL-3.0-only

//! Still and sample capture

use super::controller::{HardwareSlot, SessionController, SessionInner};
use crate::backends::camera::types::{CaptureRequest, GeoLocation, MetadataMap};
use crate::constants::quality::{DEFAULT_PHOTO_QUALITY, MAX_QUALITY};
use crate::errors::{SessionError, SessionResult};
use crate::events::CapturePayload;
use crate::pipelines::photo::{PhotoRequest, SampleTransform, Size, ViewRegion};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::{debug, info, warn};

/// Options for [`SessionController::capture_photo`]
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoCaptureOptions {
    /// JPEG quality, 0-100
    pub quality: u8,
    pub save_to_gallery: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub location: Option<GeoLocation>,
    pub embed_timestamp: bool,
    pub embed_location: bool,
}

impl Default for PhotoCaptureOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_PHOTO_QUALITY,
            save_to_gallery: false,
            width: None,
            height: None,
            location: None,
            embed_timestamp: false,
            embed_location: false,
        }
    }
}

/// Which sample flavour was asked for
#[derive(Debug, Clone, Copy)]
enum SampleKind {
    Full,
    Downscaled(u32),
    Region(ViewRegion),
}

fn check_quality(quality: u8) -> SessionResult<()> {
    if quality > MAX_QUALITY {
        return Err(SessionError::InvalidArgument(format!(
            "quality must be within 0-100, got {}",
            quality
        )));
    }
    Ok(())
}

impl SessionController {
    /// Take a still photo
    ///
    /// The result arrives through `on_picture_taken` or
    /// `on_picture_taken_error`. A stop requested meanwhile waits for it.
    pub fn capture_photo(&self, options: PhotoCaptureOptions) -> SessionResult<()> {
        check_quality(options.quality)?;
        if options.width == Some(0) || options.height == Some(0) {
            return Err(SessionError::InvalidArgument("target size must be positive".into()));
        }

        let mut op = self.inner.admit("capturePhoto")?;
        op.hold_capture_lock();
        debug!(
            quality = options.quality,
            width = ?options.width,
            height = ?options.height,
            gallery = options.save_to_gallery,
            "Photo capture admitted"
        );

        self.inner.dispatch(op, move |inner, slot| {
            match inner.take_photo(slot, &options) {
                Ok((payload, metadata)) => inner.events.on_picture_taken(payload, &metadata),
                Err(e) => {
                    warn!(error = %e, "Photo capture failed");
                    inner.events.on_picture_taken_error(&e.to_string());
                }
            }
        })
    }

    /// Grab a frame from the sample stream as base64 JPEG
    pub fn capture_sample(&self, quality: u8) -> SessionResult<()> {
        self.sample("captureSample", quality, SampleKind::Full)
    }

    /// Sample shrunk so its shorter side is at most `max_size`
    pub fn capture_downscaled_sample(&self, quality: u8, max_size: u32) -> SessionResult<()> {
        if max_size == 0 {
            return Err(SessionError::InvalidArgument("max size must be positive".into()));
        }
        self.sample("captureDownscaledSample", quality, SampleKind::Downscaled(max_size))
    }

    /// Sample cropped to a rectangle in preview-view coordinates
    pub fn capture_cropped_sample(&self, quality: u8, region: ViewRegion) -> SessionResult<()> {
        self.sample("captureCroppedSample", quality, SampleKind::Region(region))
    }

    fn sample(&self, name: &'static str, quality: u8, kind: SampleKind) -> SessionResult<()> {
        check_quality(quality)?;
        let op = self.inner.admit(name)?;
        self.inner.dispatch(op, move |inner, slot| {
            match inner.take_sample(slot, quality, kind) {
                Ok(data) => inner.events.on_sample_taken(data),
                Err(e) => {
                    warn!(name, error = %e, "Sample capture failed");
                    inner.events.on_sample_taken_error(&e.to_string());
                }
            }
        })
    }
}

impl SessionInner {
    fn take_photo(
        &self,
        slot: &mut HardwareSlot,
        options: &PhotoCaptureOptions,
    ) -> SessionResult<(CapturePayload, MetadataMap)> {
        let raw = slot.backend.capture_photo(&CaptureRequest {
            location: options.location,
        })?;

        // Match the visible preview unless an explicit size was requested
        let crop_target = if options.width.is_none() && options.height.is_none() {
            self.presentation
                .call(|surface| surface.preview_bounds())
                .filter(|bounds| !bounds.is_empty())
                .map(|bounds| Size::new(bounds.width, bounds.height))
        } else {
            None
        };

        let request = PhotoRequest {
            quality: options.quality,
            max_width: options.width,
            max_height: options.height,
            crop_target,
            embed_timestamp: options.embed_timestamp,
            embed_location: options.embed_location,
        };
        let processed = self.pipeline.process_photo(&raw.data, &raw.metadata, &request)?;

        if options.save_to_gallery {
            match self.storage.save_to_gallery(&processed.bytes) {
                Ok(path) => debug!(path = %path.display(), "Photo saved to gallery"),
                Err(e) => warn!(error = %e, "Failed to save photo to gallery"),
            }
        }

        let store_to_file = self.config_snapshot().is_some_and(|c| c.store_to_file);
        let payload = if store_to_file {
            match self.storage.write_capture_file(&processed.bytes) {
                Ok(path) => CapturePayload::FilePath(path),
                Err(e) => {
                    warn!(error = %e, "Failed to write capture file; sending base64");
                    CapturePayload::Base64(BASE64.encode(&processed.bytes))
                }
            }
        } else {
            CapturePayload::Base64(BASE64.encode(&processed.bytes))
        };

        info!(
            width = processed.width,
            height = processed.height,
            size = processed.bytes.len(),
            "Photo captured"
        );
        Ok((payload, processed.metadata))
    }

    fn take_sample(&self, slot: &mut HardwareSlot, quality: u8, kind: SampleKind) -> SessionResult<String> {
        let raw = slot.backend.capture_sample()?;

        let transform = match kind {
            SampleKind::Full => SampleTransform::Passthrough,
            SampleKind::Downscaled(max_size) => SampleTransform::Downscale { max_size },
            SampleKind::Region(region) => {
                match self.presentation.call(|surface| surface.view_size()).flatten() {
                    Some((width, height)) => SampleTransform::Region {
                        region,
                        view: Size::new(width, height),
                    },
                    None => {
                        debug!("Preview has no size; sending the full sample");
                        SampleTransform::Passthrough
                    }
                }
            }
        };

        let bytes = self
            .pipeline
            .process_sample(&raw.data, raw.rotation, quality, &transform)?;
        Ok(BASE64.encode(bytes))
    }
}
