//! Intensity filters over flat buffers: grayscale, Gaussian blur, integral
//! image and adaptive threshold.

use image::RgbaImage;

/// A single-channel floating-point image, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl Plane {
    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    /// Read with coordinates clamped to the nearest valid pixel.
    #[inline]
    fn get_clamped(&self, x: isize, y: isize) -> f32 {
        let cx = x.clamp(0, self.width as isize - 1) as usize;
        let cy = y.clamp(0, self.height as isize - 1) as usize;
        self.get(cx, cy)
    }
}

/// A binary mask, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    pub width: usize,
    pub height: usize,
    pub bits: Vec<bool>,
}

impl Mask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width * height],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.bits[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        self.bits[y * self.width + x] = value;
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }
}

/// Luminance per pixel (`0.299R + 0.587G + 0.114B`).
///
/// Transparent pixels are composited over white first, so a canvas drawing
/// (black strokes on a transparent background) reads as ink on paper.
pub fn grayscale(bitmap: &RgbaImage) -> Plane {
    let data = bitmap
        .pixels()
        .map(|p| {
            let [r, g, b, a] = p.0;
            let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
            let coverage = a as f32 / 255.0;
            luma * coverage + 255.0 * (1.0 - coverage)
        })
        .collect();
    Plane {
        width: bitmap.width() as usize,
        height: bitmap.height() as usize,
        data,
    }
}

/// 1-4-6-4-1 binomial weights; the 5×5 kernel is their outer product.
const GAUSS_5: [f32; 5] = [1.0, 4.0, 6.0, 4.0, 1.0];

/// 5×5 Gaussian blur with edge clamping.
pub fn gaussian_blur(plane: &Plane) -> Plane {
    let mut out = Plane::filled(plane.width, plane.height, 0.0);
    if plane.data.is_empty() {
        return out;
    }
    let weight_sum: f32 = GAUSS_5.iter().sum::<f32>().powi(2);

    for y in 0..plane.height {
        for x in 0..plane.width {
            let mut acc = 0.0;
            for (ky, wy) in GAUSS_5.iter().enumerate() {
                for (kx, wx) in GAUSS_5.iter().enumerate() {
                    let sx = x as isize + kx as isize - 2;
                    let sy = y as isize + ky as isize - 2;
                    acc += wy * wx * plane.get_clamped(sx, sy);
                }
            }
            out.data[y * plane.width + x] = acc / weight_sum;
        }
    }
    out
}

/// Summed-area table with a zero row and column in front, so any rectangle
/// sum is four lookups.
#[derive(Debug, Clone)]
pub struct IntegralImage {
    width: usize,
    height: usize,
    sums: Vec<f64>,
}

impl IntegralImage {
    pub fn new(plane: &Plane) -> Self {
        let stride = plane.width + 1;
        let mut sums = vec![0.0; stride * (plane.height + 1)];
        for y in 0..plane.height {
            let mut row = 0.0;
            for x in 0..plane.width {
                row += plane.get(x, y) as f64;
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row;
            }
        }
        Self {
            width: plane.width,
            height: plane.height,
            sums,
        }
    }

    /// Sum over the inclusive rectangle `(x0, y0)..=(x1, y1)`.
    pub fn sum(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> f64 {
        let stride = self.width + 1;
        self.sums[(y1 + 1) * stride + x1 + 1] - self.sums[y0 * stride + x1 + 1] - self.sums[(y1 + 1) * stride + x0]
            + self.sums[y0 * stride + x0]
    }

    /// Mean over the `block × block` window centred on `(x, y)`, clipped to
    /// the image.
    pub fn window_mean(&self, x: usize, y: usize, block: usize) -> f32 {
        let half = block / 2;
        let x0 = x.saturating_sub(half);
        let y0 = y.saturating_sub(half);
        let x1 = (x + half).min(self.width - 1);
        let y1 = (y + half).min(self.height - 1);
        let count = ((x1 - x0 + 1) * (y1 - y0 + 1)) as f64;
        (self.sum(x0, y0, x1, y1) / count) as f32
    }
}

/// Local means for every pixel.
pub fn local_means(plane: &Plane, block: usize) -> Plane {
    let mut out = Plane::filled(plane.width, plane.height, 0.0);
    if plane.data.is_empty() {
        return out;
    }
    let integral = IntegralImage::new(plane);
    for y in 0..plane.height {
        for x in 0..plane.width {
            out.data[y * plane.width + x] = integral.window_mean(x, y, block);
        }
    }
    out
}

/// A pixel is ink when it is more than `c` darker than its local mean.
pub fn adaptive_threshold(blurred: &Plane, means: &Plane, c: f32) -> Mask {
    let mut mask = Mask::new(blurred.width, blurred.height);
    for (bit, (value, mean)) in mask.bits.iter_mut().zip(blurred.data.iter().zip(&means.data)) {
        *bit = *value < *mean - c;
    }
    mask
}
