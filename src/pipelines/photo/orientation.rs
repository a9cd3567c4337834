// SPDX-License-Identifier: GPL-3.0-only

//! Orientation normalisation
//!
//! Pixels leave this stage upright; the EXIF orientation tag is then
//! rewritten to 1 so no consumer rotates a second time.

use crate::backends::camera::types::SensorRotation;
use image::DynamicImage;
use tracing::debug;

/// Apply an EXIF orientation (1-8) to the pixels
pub fn apply_exif_orientation(image: DynamicImage, orientation: u16) -> DynamicImage {
    if orientation != 1 {
        debug!(orientation, "Normalising EXIF orientation");
    }
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        // transpose
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        // transverse
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}

/// Rotate clockwise by a sensor rotation (used for samples)
pub fn apply_rotation(image: DynamicImage, rotation: SensorRotation) -> DynamicImage {
    match rotation {
        SensorRotation::None => image,
        SensorRotation::Rotate90 => image.rotate90(),
        SensorRotation::Rotate180 => image.rotate180(),
        SensorRotation::Rotate270 => image.rotate270(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    /// 3x2 image with a red pixel at the top-left corner
    fn marked() -> DynamicImage {
        let mut img = RgbImage::from_pixel(3, 2, Rgb([0, 0, 0]));
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        DynamicImage::ImageRgb8(img)
    }

    fn red_at(image: &DynamicImage) -> (u32, u32) {
        image
            .pixels()
            .find(|(_, _, p)| p.0[0] == 255)
            .map(|(x, y, _)| (x, y))
            .unwrap()
    }

    #[test]
    fn test_rotate_90_swaps_dimensions() {
        let out = apply_exif_orientation(marked(), 6);
        assert_eq!(out.dimensions(), (2, 3));
        assert_eq!(red_at(&out), (1, 0));
    }

    #[test]
    fn test_transpose_and_transverse() {
        // transpose maps (x, y) to (y, x)
        assert_eq!(red_at(&apply_exif_orientation(marked(), 5)), (0, 0));
        // transverse maps (x, y) to (h-1-y, w-1-x)
        assert_eq!(red_at(&apply_exif_orientation(marked(), 7)), (1, 2));
    }

    #[test]
    fn test_unknown_orientation_is_identity() {
        assert_eq!(red_at(&apply_exif_orientation(marked(), 0)), (0, 0));
        assert_eq!(apply_exif_orientation(marked(), 9).dimensions(), (3, 2));
    }

    #[test]
    fn test_sample_rotation_270() {
        let out = apply_rotation(marked(), SensorRotation::Rotate270);
        assert_eq!(out.dimensions(), (2, 3));
        assert_eq!(red_at(&out), (0, 2));
    }
}
