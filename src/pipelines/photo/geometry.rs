// SPDX-License-Identifier: GPL-3.0-only

//! Size and rectangle arithmetic for resize and crop stages

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Pixel rectangle inside an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Rectangle in preview-view coordinates; may extend past the view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewRegion {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Largest size with `source`'s aspect ratio inside the given bounds
///
/// With one bound, the other side follows the aspect ratio. Returns
/// `source` unchanged when neither bound is given.
pub fn fit_within(source: Size, max_width: Option<u32>, max_height: Option<u32>) -> Size {
    if source.is_empty() {
        return source;
    }
    let (sw, sh) = (source.width as f64, source.height as f64);

    let (width, height) = match (max_width, max_height) {
        (Some(w), Some(h)) => {
            let scale = (w as f64 / sw).min(h as f64 / sh);
            (sw * scale, sh * scale)
        }
        (Some(w), None) => (w as f64, sh * w as f64 / sw),
        (None, Some(h)) => (sw * h as f64 / sh, h as f64),
        (None, None) => return source,
    };

    Size::new((width.round() as u32).max(1), (height.round() as u32).max(1))
}

/// Centered crop of `source` matching `target`'s aspect ratio
///
/// Trims the axis that is too long. Returns the full frame when the ratios
/// already match or `target` is empty.
pub fn center_crop_to_aspect(source: Size, target: Size) -> Rect {
    let full = Rect {
        x: 0,
        y: 0,
        width: source.width,
        height: source.height,
    };
    if source.is_empty() || target.is_empty() {
        return full;
    }

    let source_ratio = source.width as f64 / source.height as f64;
    let target_ratio = target.width as f64 / target.height as f64;

    if source_ratio > target_ratio {
        let width = ((source.height as f64 * target_ratio).round() as u32).clamp(1, source.width);
        Rect {
            x: (source.width - width) / 2,
            y: 0,
            width,
            height: source.height,
        }
    } else if source_ratio < target_ratio {
        let height = ((source.width as f64 / target_ratio).round() as u32).clamp(1, source.height);
        Rect {
            x: 0,
            y: (source.height - height) / 2,
            width: source.width,
            height,
        }
    } else {
        full
    }
}

/// Uniform downscale so the shorter side equals `max_size`
///
/// `None` when the shorter side is already within `max_size`; images are
/// never upscaled.
pub fn downscale_to_max(source: Size, max_size: u32) -> Option<Size> {
    let smallest = source.width.min(source.height);
    if max_size == 0 || smallest <= max_size {
        return None;
    }
    let scale = max_size as f64 / smallest as f64;
    Some(Size::new(
        ((source.width as f64 * scale).round() as u32).max(1),
        ((source.height as f64 * scale).round() as u32).max(1),
    ))
}

/// A view region translated into image pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionMapping {
    /// Image pixels per view pixel
    pub scale: f64,
    /// Where the view's origin falls in the image
    pub offset_x: f64,
    pub offset_y: f64,
    /// Clamped source rectangle; `None` when nothing of it is left
    pub rect: Option<Rect>,
}

/// Map a preview-view rectangle into image pixel coordinates
///
/// Uses `scale = max(image.w / view.w, image.h / view.h)` with the view
/// centered over the image, then clamps the result to the image bounds.
pub fn map_view_region(image: Size, view: Size, region: ViewRegion) -> RegionMapping {
    if image.is_empty() || view.is_empty() {
        return RegionMapping {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            rect: None,
        };
    }

    let scale_x = image.width as f64 / view.width as f64;
    let scale_y = image.height as f64 / view.height as f64;
    let scale = scale_x.max(scale_y);

    let offset_x = (image.width as f64 - view.width as f64 * scale) / 2.0;
    let offset_y = (image.height as f64 - view.height as f64 * scale) / 2.0;

    let x = (region.x as f64 * scale + offset_x).round() as i64;
    let y = (region.y as f64 * scale + offset_y).round() as i64;
    let width = (region.width as f64 * scale).round() as i64;
    let height = (region.height as f64 * scale).round() as i64;

    let x = x.clamp(0, image.width as i64);
    let y = y.clamp(0, image.height as i64);
    let width = width.min(image.width as i64 - x);
    let height = height.min(image.height as i64 - y);

    let rect = (width > 0 && height > 0).then(|| Rect {
        x: x as u32,
        y: y as u32,
        width: width as u32,
        height: height as u32,
    });

    RegionMapping {
        scale,
        offset_x,
        offset_y,
        rect,
    }
}
