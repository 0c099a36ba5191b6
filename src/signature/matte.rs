//! Soft-alpha matting and bounding-box crop.

use image::{Rgba, RgbaImage};
use serde::Serialize;

use super::filters::{Mask, Plane};

/// Build the output bitmap: pure black ink whose alpha follows local
/// contrast, so anti-aliased stroke edges stay smooth. Pixels outside `kept`
/// are fully transparent.
pub fn soft_alpha(blurred: &Plane, means: &Plane, kept: &Mask, gain: f32) -> RgbaImage {
    let mut out = RgbaImage::new(blurred.width as u32, blurred.height as u32);
    for (i, pixel) in out.pixels_mut().enumerate() {
        let alpha = if kept.bits[i] {
            contrast_alpha(blurred.data[i], means.data[i], gain)
        } else {
            0
        };
        *pixel = Rgba([0, 0, 0, alpha]);
    }
    out
}

/// `clamp((1 - value / mean) * 255 * gain, 0, 255)`.
pub fn contrast_alpha(value: f32, mean: f32, gain: f32) -> u8 {
    if !(mean > 0.0) {
        return 0;
    }
    ((1.0 - value / mean) * 255.0 * gain).clamp(0.0, 255.0).round() as u8
}

/// A crop rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CropBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Bounding box of pixels with alpha above `visibility`, grown by `padding`
/// on every side and clipped to the image. `None` when nothing is visible.
pub fn visible_bounds(bitmap: &RgbaImage, visibility: u8, padding: u32) -> Option<CropBox> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in bitmap.enumerate_pixels() {
        if pixel[3] <= visibility {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((min_x, min_y, max_x, max_y)) => (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y)),
        });
    }

    let (min_x, min_y, max_x, max_y) = bounds?;
    let x0 = min_x.saturating_sub(padding);
    let y0 = min_y.saturating_sub(padding);
    let x1 = max_x.saturating_add(padding).min(bitmap.width() - 1);
    let y1 = max_y.saturating_add(padding).min(bitmap.height() - 1);
    Some(CropBox {
        x: x0,
        y: y0,
        width: x1 - x0 + 1,
        height: y1 - y0 + 1,
    })
}

pub fn crop(bitmap: &RgbaImage, bounds: CropBox) -> RgbaImage {
    image::imageops::crop_imm(bitmap, bounds.x, bounds.y, bounds.width, bounds.height).to_image()
}
