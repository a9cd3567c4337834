// SPDX-License-Identifier: GPL-3.0-only

//! Timestamp and location label rendering
//!
//! Labels are drawn as translucent rounded "pills" anchored to the top-right
//! corner, stacked downward. Text uses a built-in 5x7 bitmap face covering
//! the characters timestamps and coordinates need.

use crate::constants::overlay as defaults;
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
/// Advance per character in glyph cells (glyph plus one cell of spacing)
const GLYPH_ADVANCE: u32 = GLYPH_WIDTH + 1;

/// Pill appearance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OverlayStyle {
    /// Font height as a fraction of image width
    pub font_scale: f32,
    pub min_font_px: f32,
    pub padding_horizontal: u32,
    pub padding_vertical: u32,
    pub margin: u32,
    pub gap: u32,
    pub corner_radius: u32,
    /// RGBA
    pub background: [u8; 4],
    pub text_color: [u8; 3],
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            font_scale: defaults::FONT_SCALE,
            min_font_px: defaults::MIN_FONT_PX,
            padding_horizontal: defaults::PADDING_HORIZONTAL,
            padding_vertical: defaults::PADDING_VERTICAL,
            margin: defaults::EDGE_MARGIN,
            gap: defaults::PILL_GAP,
            corner_radius: defaults::CORNER_RADIUS,
            background: defaults::BACKGROUND,
            text_color: defaults::TEXT_COLOR,
        }
    }
}

impl OverlayStyle {
    /// Font height in pixels for an image of `image_width`
    pub fn font_px(&self, image_width: u32) -> f32 {
        (image_width as f32 * self.font_scale).max(self.min_font_px)
    }
}

/// Placement of one pill, in image pixels (may extend past the left edge)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PillLayout {
    pub left: i64,
    pub top: i64,
    pub width: u32,
    pub height: u32,
    /// Size of one glyph cell
    pub cell: u32,
}

/// Compute pill rectangles for `labels` on an image `image_width` wide
pub fn layout_pills(labels: &[&str], image_width: u32, style: &OverlayStyle) -> Vec<PillLayout> {
    let font_px = style.font_px(image_width);
    let cell = ((font_px / GLYPH_HEIGHT as f32).floor() as u32).max(1);
    let line_height = (font_px.round() as u32).max(GLYPH_HEIGHT * cell);

    let mut top = style.margin as i64;
    labels
        .iter()
        .map(|label| {
            let width = text_width(label, cell) + 2 * style.padding_horizontal;
            let height = line_height + 2 * style.padding_vertical;
            let left = image_width as i64 - width as i64 - style.margin as i64;
            let pill = PillLayout {
                left,
                top,
                width,
                height,
                cell,
            };
            top += height as i64 + style.gap as i64;
            pill
        })
        .collect()
}

/// Draw each label in its own pill, top-right anchored, in order
pub fn draw_labels(image: &mut RgbImage, labels: &[&str], style: &OverlayStyle) {
    if labels.is_empty() {
        return;
    }
    let pills = layout_pills(labels, image.width(), style);
    for (label, pill) in labels.iter().zip(&pills) {
        fill_rounded_rect(image, pill, style);
        draw_text(image, label, pill, style);
    }
    debug!(count = labels.len(), "Overlay labels drawn");
}

fn text_width(text: &str, cell: u32) -> u32 {
    let chars = text.chars().count() as u32;
    if chars == 0 {
        return 0;
    }
    chars * GLYPH_ADVANCE * cell - cell
}

fn fill_rounded_rect(image: &mut RgbImage, pill: &PillLayout, style: &OverlayStyle) {
    let [br, bg, bb, alpha] = style.background;
    let radius = style.corner_radius.min(pill.width / 2).min(pill.height / 2) as i64;
    let (img_w, img_h) = (image.width() as i64, image.height() as i64);

    for py in 0..pill.height as i64 {
        let y = pill.top + py;
        if y < 0 || y >= img_h {
            continue;
        }
        for px in 0..pill.width as i64 {
            let x = pill.left + px;
            if x < 0 || x >= img_w {
                continue;
            }
            if !inside_rounded(px, py, pill.width as i64, pill.height as i64, radius) {
                continue;
            }
            let pixel = image.get_pixel_mut(x as u32, y as u32);
            pixel.0 = [
                blend(pixel.0[0], br, alpha),
                blend(pixel.0[1], bg, alpha),
                blend(pixel.0[2], bb, alpha),
            ];
        }
    }
}

fn inside_rounded(px: i64, py: i64, width: i64, height: i64, radius: i64) -> bool {
    if radius == 0 {
        return true;
    }
    // Nearest corner circle center, if the point lies in a corner square
    let cx = if px < radius {
        radius
    } else if px >= width - radius {
        width - radius - 1
    } else {
        return true;
    };
    let cy = if py < radius {
        radius
    } else if py >= height - radius {
        height - radius - 1
    } else {
        return true;
    };
    let (dx, dy) = (px - cx, py - cy);
    dx * dx + dy * dy <= radius * radius
}

fn blend(under: u8, over: u8, alpha: u8) -> u8 {
    let a = alpha as u32;
    ((under as u32 * (255 - a) + over as u32 * a + 127) / 255) as u8
}

fn draw_text(image: &mut RgbImage, text: &str, pill: &PillLayout, style: &OverlayStyle) {
    let cell = pill.cell as i64;
    let text_height = GLYPH_HEIGHT as i64 * cell;
    let inner_height = pill.height as i64 - 2 * style.padding_vertical as i64;
    let origin_y = pill.top + style.padding_vertical as i64 + (inner_height - text_height) / 2;
    let mut origin_x = pill.left + style.padding_horizontal as i64;
    let color = Rgb(style.text_color);
    let (img_w, img_h) = (image.width() as i64, image.height() as i64);

    for ch in text.chars() {
        let rows = glyph(ch);
        for (row, &bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                    continue;
                }
                let x0 = origin_x + col as i64 * cell;
                let y0 = origin_y + row as i64 * cell;
                for y in y0.max(0)..(y0 + cell).min(img_h) {
                    for x in x0.max(0)..(x0 + cell).min(img_w) {
                        image.put_pixel(x as u32, y as u32, color);
                    }
                }
            }
        }
        origin_x += GLYPH_ADVANCE as i64 * cell;
    }
}

/// Rows of a 5x7 glyph, most significant of the low 5 bits is the left column
fn glyph(ch: char) -> [u8; 7] {
    match ch {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ',' => [0x00, 0x00, 0x00, 0x00, 0x0C, 0x04, 0x08],
        _ => [0x00; 7],
    }
}
