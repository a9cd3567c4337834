// SPDX-License-Identifier: GPL-3.0-only

//! Preview sample transforms
//!
//! Samples skip overlays, EXIF and persistence. At most one geometric
//! transform is applied after rotation.

use super::geometry::{self, Size, ViewRegion};
use image::DynamicImage;
use image::imageops::FilterType;
use tracing::debug;

/// What to do with a sample frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleTransform {
    /// Send the frame as captured (after rotation)
    Passthrough,
    /// Shrink so the shorter side is at most `max_size`
    Downscale { max_size: u32 },
    /// Crop to a region given in preview-view coordinates
    Region { region: ViewRegion, view: Size },
}

impl SampleTransform {
    pub fn apply(&self, image: DynamicImage) -> DynamicImage {
        match *self {
            SampleTransform::Passthrough => image,
            SampleTransform::Downscale { max_size } => downscale(image, max_size),
            SampleTransform::Region { region, view } => crop_region(image, region, view),
        }
    }
}

/// Uniform downscale; the input is returned untouched when already small
pub fn downscale(image: DynamicImage, max_size: u32) -> DynamicImage {
    let source = Size::new(image.width(), image.height());
    match geometry::downscale_to_max(source, max_size) {
        Some(target) => {
            debug!(
                from = ?source,
                to = ?target,
                "Downscaling sample"
            );
            image.resize_exact(target.width, target.height, FilterType::Triangle)
        }
        None => image,
    }
}

/// Crop to a view region; the full frame is returned if nothing maps inside
pub fn crop_region(image: DynamicImage, region: ViewRegion, view: Size) -> DynamicImage {
    let source = Size::new(image.width(), image.height());
    let mapping = geometry::map_view_region(source, view, region);
    match mapping.rect {
        Some(rect) => {
            debug!(scale = mapping.scale, ?rect, "Cropping sample to region");
            image.crop_imm(rect.x, rect.y, rect.width, rect.height)
        }
        None => {
            debug!(?region, "Region maps outside the frame; sending full frame");
            image
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn blank(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
    }

    #[test]
    fn test_small_image_passes_through() {
        let out = downscale(blank(200, 100), 100);
        assert_eq!((out.width(), out.height()), (200, 100));
    }

    #[test]
    fn test_downscale_keeps_aspect() {
        let out = downscale(blank(800, 400), 100);
        assert_eq!((out.width(), out.height()), (200, 100));
    }

    #[test]
    fn test_region_crop() {
        let transform = SampleTransform::Region {
            region: ViewRegion { x: 10, y: 10, width: 20, height: 30 },
            view: Size::new(100, 100),
        };
        let out = transform.apply(blank(200, 200));
        assert_eq!((out.width(), out.height()), (40, 60));
    }

    #[test]
    fn test_empty_region_returns_original() {
        let transform = SampleTransform::Region {
            region: ViewRegion { x: 10, y: 10, width: 0, height: 30 },
            view: Size::new(100, 100),
        };
        let out = transform.apply(blank(120, 90));
        assert_eq!((out.width(), out.height()), (120, 90));
    }
}
